// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - NHWC 帧定义
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

use image::RgbImage;
use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameDataError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 图像尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
  pub width: u32,
  pub height: u32,
}

impl ImageSize {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  pub fn is_degenerate(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn byte_len(&self) -> usize {
    RGB_CHANNELS * self.width as usize * self.height as usize
  }
}

/// 任意尺寸的 RGB 交织帧，行优先存储
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
  size: ImageSize,
  data: Box<[u8]>,
}

impl RgbFrame {
  pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameDataError> {
    let size = ImageSize::new(width, height);
    if data.len() != size.byte_len() {
      return Err(FrameDataError::LengthMismatch {
        expected: size.byte_len(),
        actual: data.len(),
      });
    }

    Ok(Self {
      size,
      data: data.into_boxed_slice(),
    })
  }

  /// 以单一颜色填充的帧
  pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
    let size = ImageSize::new(width, height);
    let data = color
      .iter()
      .copied()
      .cycle()
      .take(size.byte_len())
      .collect::<Vec<_>>();
    Self {
      size,
      data: data.into_boxed_slice(),
    }
  }

  pub fn size(&self) -> ImageSize {
    self.size
  }

  pub fn width(&self) -> u32 {
    self.size.width
  }

  pub fn height(&self) -> u32 {
    self.size.height
  }

}

impl AsNhwcFrame for RgbFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    let size = ImageSize::new(image.width(), image.height());
    Self {
      size,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_mismatched_buffer() {
    let err = RgbFrame::new(4, 2, vec![0; 10]).unwrap_err();
    assert_eq!(
      err,
      FrameDataError::LengthMismatch {
        expected: 24,
        actual: 10
      }
    );
  }

  #[test]
  fn zero_sized_frame_is_representable() {
    let frame = RgbFrame::new(0, 5, Vec::new()).unwrap();
    assert!(frame.size().is_degenerate());
  }

  #[test]
  fn filled_frame_repeats_color() {
    let frame = RgbFrame::filled(2, 1, [1, 2, 3]);
    assert_eq!(frame.as_nhwc(), &[1, 2, 3, 1, 2, 3]);
  }
}
