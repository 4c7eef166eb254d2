// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/log_output.rs - 以日志形式发布检测结果
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

use std::convert::Infallible;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, output::Render, pipeline::FrameResult};

#[derive(Error, Debug)]
#[error("URI 方案不匹配")]
pub struct LogOutputSchemeMismatch;

pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputSchemeMismatch;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputSchemeMismatch);
    }
    Ok(LogOutput)
  }
}

impl Render<RgbFrame, FrameResult> for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &RgbFrame, result: &FrameResult) -> Result<(), Self::Error> {
    info!(
      width = frame.width(),
      height = frame.height(),
      count = result.detections.len(),
      "帧检测完成"
    );
    for (index, det) in result.detections.iter().enumerate() {
      info!(
        index,
        label_id = det.label_id,
        label = %det.label,
        score = det.score,
        x_min = det.bbox[0],
        y_min = det.bbox[1],
        x_max = det.bbox[2],
        y_max = det.bbox[3],
        "detection"
      );
    }
    Ok(())
  }
}
