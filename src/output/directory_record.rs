// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{DateTime, Datelike, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme, frame::RgbFrame, model::ImageDetection, output::Render,
  pipeline::FrameResult,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期分目录保存每帧的检测记录（JSON）和标注图像（PNG）
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    Ok(DirectoryRecordOutput::new(uri.path(), always))
  }
}

pub fn detection_record(frame: &RgbFrame, detections: &[ImageDetection]) -> serde_json::Value {
  json!({
    "width": frame.width(),
    "height": frame.height(),
    "detections": detections
      .iter()
      .map(|d| json!({
        "label_id": d.label_id,
        "label": d.label,
        "score": d.score,
        "bbox": d.bbox,
      }))
      .collect::<Vec<_>>(),
  })
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, always: bool) -> Self {
    Self {
      directory: directory.into(),
      frame_counter: AtomicU16::new(0),
      always,
    }
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// 不带扩展名的记录路径 `<dir>/<yyyy>/<mm>/<dd>/<HH-MM-SS>-<id>`
  fn frame_stem(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn write_record(
    &self,
    stem: &Path,
    frame: &RgbFrame,
    result: &FrameResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    let record = detection_record(frame, &result.detections);
    std::fs::write(
      stem.with_extension("json"),
      serde_json::to_vec_pretty(&record)?,
    )?;

    if let Some(image) = &result.annotated {
      image.save(stem.with_extension("png"))?;
    }

    debug!("记录已写入 {}", stem.display());
    Ok(())
  }
}

impl Render<RgbFrame, FrameResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbFrame, result: &FrameResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }
    let stem = self.frame_stem(Utc::now())?;
    self.write_record(&stem, frame, result)
  }
}
