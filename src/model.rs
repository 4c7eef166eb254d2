// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;

use crate::frame::{ImageSize, RGB_CHANNELS};

/// 检测器接口：固定输入形状，输入 NHWC 字节张量，输出张量空间中的检测框
pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 原始输入张量形状，约定为 `[batch, height, width, channels]`
  fn input_tensor_shape(&self) -> Vec<usize>;

  /// 检测器自行负责阈值过滤以及按分数降序截断到 `top_k`
  fn detect(
    &self,
    tensor: &[u8],
    score_threshold: f32,
    top_k: usize,
  ) -> Result<Vec<RawDetection>, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Error = M::Error;

  fn input_tensor_shape(&self) -> Vec<usize> {
    (**self).input_tensor_shape()
  }

  fn detect(
    &self,
    tensor: &[u8],
    score_threshold: f32,
    top_k: usize,
  ) -> Result<Vec<RawDetection>, Self::Error> {
    (**self).detect(tensor, score_threshold, top_k)
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("输入张量形状无效: {0:?}, 期望 [1, height, width, 3]")]
pub struct TensorShapeError(pub Vec<usize>);

/// 检测器输入张量形状 `(1, height, width, 3)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorShape {
  pub height: usize,
  pub width: usize,
}

impl TensorShape {
  pub const BATCH: usize = 1;
  pub const CHANNELS: usize = RGB_CHANNELS;

  pub fn from_dims(dims: &[usize]) -> Result<Self, TensorShapeError> {
    match *dims {
      [batch, height, width, channels]
        if batch == Self::BATCH && channels == Self::CHANNELS && height > 0 && width > 0 =>
      {
        Ok(Self { height, width })
      }
      _ => Err(TensorShapeError(dims.to_vec())),
    }
  }

  pub fn image_size(&self) -> ImageSize {
    ImageSize::new(self.width as u32, self.height as u32)
  }
}

/// 检测器输出，坐标为缩放后张量空间中的像素
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
  pub label_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

/// 映射回原图像素空间的检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDetection {
  pub label_id: u32,
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_nhwc_rgb_shape() {
    let shape = TensorShape::from_dims(&[1, 300, 320, 3]).unwrap();
    assert_eq!(shape.image_size(), ImageSize::new(320, 300));
  }

  #[test]
  fn rejects_malformed_shapes() {
    for dims in [
      vec![1, 300, 300],
      vec![2, 300, 300, 3],
      vec![1, 300, 300, 1],
      vec![1, 0, 300, 3],
      vec![1, 3, 300, 300, 1],
    ] {
      assert_eq!(
        TensorShape::from_dims(&dims),
        Err(TensorShapeError(dims.clone()))
      );
    }
  }
}
