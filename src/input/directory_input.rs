// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/directory_input.rs - 目录图像序列输入
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

use std::{collections::VecDeque, path::PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, input::read_image_file::read_rgb_frame};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum DirectoryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按文件名顺序逐帧读取目录中的图片，无法解码的文件会被跳过
pub struct DirectoryInput {
  pending: VecDeque<PathBuf>,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = DirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DirectoryInputError::SchemeMismatch);
    }
    Self::open(url.path())
  }
}

impl DirectoryInput {
  pub fn open(directory: impl Into<PathBuf>) -> Result<Self, DirectoryInputError> {
    let directory = directory.into();
    let mut files = std::fs::read_dir(&directory)?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| path.is_file() && is_image_file(path))
      .collect::<Vec<_>>();
    files.sort();

    info!("目录 {} 中共有 {} 张图片", directory.display(), files.len());

    Ok(Self {
      pending: files.into(),
    })
  }

  pub fn remaining(&self) -> usize {
    self.pending.len()
  }
}

fn is_image_file(path: &std::path::Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_lowercase();
      IMAGE_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

impl Iterator for DirectoryInput {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.pending.pop_front() {
      match read_rgb_frame(&path) {
        Ok(frame) => {
          debug!("读取 {}", path.display());
          return Some(frame);
        }
        Err(e) => warn!("无法读取 {}, 已跳过: {}", path.display(), e),
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("shanan-detect-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn iterates_sorted_and_skips_broken_files() {
    let dir = scratch_dir("directory-input");
    image::RgbImage::new(4, 4).save(dir.join("b.png")).unwrap();
    image::RgbImage::new(8, 2).save(dir.join("a.png")).unwrap();
    std::fs::write(dir.join("c.png"), b"not an image").unwrap();
    std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

    let input = DirectoryInput::open(&dir).unwrap();
    assert_eq!(input.remaining(), 3);

    let sizes = input.map(|f| (f.width(), f.height())).collect::<Vec<_>>();
    assert_eq!(sizes, vec![(8, 2), (4, 4)]);

    let _ = std::fs::remove_dir_all(dir);
  }

  #[test]
  fn missing_directory_is_an_error() {
    let url = Url::parse("folder:///definitely/not/here").unwrap();
    assert!(matches!(
      DirectoryInput::from_url(&url),
      Err(DirectoryInputError::IoError(_))
    ));
  }
}
