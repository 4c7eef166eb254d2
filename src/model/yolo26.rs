// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/yolo26.rs - YOLO26 端到端检测模型
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

use std::{path::PathBuf, sync::Mutex};

use ort::{
  session::Session,
  tensor::TensorElementType,
  value::{DynValue, Tensor},
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::RGB_CHANNELS,
  model::{Model, RawDetection},
};

const YOLO26_NUM_INPUTS: usize = 1;
// 每个候选: [x_min, y_min, x_max, y_max, score, class_id]
const YOLO26_DET_STRIDE: usize = 6;

#[derive(Error, Debug)]
pub enum Yolo26Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("输入张量长度错误: 期望 {expected}, 实际 {actual}")]
  InputSize { expected: usize, actual: usize },
  #[error("推理会话不可用")]
  SessionPoisoned,
}

/// 模型原生输入布局，对外统一报告为 `[1, H, W, 3]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLayout {
  /// `[1, H, W, 3]` uint8，原样送入
  NhwcU8,
  /// `[1, H, W, 3]` float32，归一化到 [0, 1]
  NhwcF32,
  /// `[1, 3, H, W]` float32，归一化到 [0, 1]（常见的 YOLO 导出格式）
  NchwF32,
}

impl InputLayout {
  /// 依据模型输入的元素类型与形状确定布局，返回布局和 NHWC 形状
  fn resolve(ty: TensorElementType, dims: &[i64]) -> Result<(Self, Vec<usize>), Yolo26Error> {
    let dims = dims
      .iter()
      .map(|&d| if d < 0 { 0 } else { d as usize })
      .collect::<Vec<_>>();
    let channels = RGB_CHANNELS;

    match (ty, dims.as_slice()) {
      (TensorElementType::Float32, &[batch, c, height, width]) if c == channels => {
        Ok((Self::NchwF32, vec![batch, height, width, channels]))
      }
      (TensorElementType::Float32, &[_, _, _, c]) if c == channels => Ok((Self::NhwcF32, dims)),
      (TensorElementType::Uint8, &[_, _, _, c]) if c == channels => Ok((Self::NhwcU8, dims)),
      _ => Err(Yolo26Error::ModelInvalid(format!(
        "不支持的模型输入: {:?} {:?}",
        ty, dims
      ))),
    }
  }

  /// 将 NHWC uint8 张量转换为模型原生输入
  fn to_value(self, tensor: &[u8], nhwc: &[usize]) -> Result<DynValue, Yolo26Error> {
    let shape = nhwc.iter().map(|&d| d as i64).collect::<Vec<_>>();
    let value = match self {
      Self::NhwcU8 => Tensor::from_array((shape, tensor.to_vec()))?.into_dyn(),
      Self::NhwcF32 => {
        let data = tensor.iter().map(|&v| v as f32 / 255.0).collect::<Vec<_>>();
        Tensor::from_array((shape, data))?.into_dyn()
      }
      Self::NchwF32 => {
        let nchw = vec![shape[0], shape[3], shape[1], shape[2]];
        Tensor::from_array((nchw, nhwc_to_nchw_f32(tensor)))?.into_dyn()
      }
    };
    Ok(value)
  }
}

/// 交错 RGB 字节转换为按通道分平面的归一化浮点数据
fn nhwc_to_nchw_f32(tensor: &[u8]) -> Vec<f32> {
  let plane = tensor.len() / RGB_CHANNELS;
  let mut out = vec![0.0f32; tensor.len()];
  for (i, pixel) in tensor.chunks_exact(RGB_CHANNELS).enumerate() {
    for (c, &v) in pixel.iter().enumerate() {
      out[c * plane + i] = v as f32 / 255.0;
    }
  }
  out
}

pub struct Yolo26Builder {
  model_path: PathBuf,
  intra_threads: usize,
}

impl Yolo26Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      intra_threads: 4,
    }
  }

  pub fn intra_threads(mut self, intra_threads: usize) -> Self {
    self.intra_threads = intra_threads;
    self
  }

  pub fn build(self) -> Result<Yolo26, Yolo26Error> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let session = Session::builder()?
      .with_intra_threads(self.intra_threads)?
      .commit_from_memory(&model_data)?;

    if session.inputs.len() != YOLO26_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        YOLO26_NUM_INPUTS,
        session.inputs.len()
      );
      return Err(Yolo26Error::ModelInvalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        YOLO26_NUM_INPUTS,
        session.inputs.len()
      )));
    }

    let input_type = &session.inputs[0].input_type;
    let (ty, dims) = input_type
      .tensor_type()
      .zip(input_type.tensor_shape())
      .ok_or_else(|| Yolo26Error::ModelInvalid("模型输入不是张量".to_string()))?;
    let (layout, input_shape) =
      InputLayout::resolve(ty, dims).inspect_err(|e| error!("{}", e))?;
    debug!("模型输入: {:?} {:?}, 布局 {:?}", ty, &**dims, layout);
    info!("模型加载完成");

    Ok(Yolo26 {
      session: Mutex::new(session),
      layout,
      input_shape,
    })
  }
}

/// 以 ONNX Runtime 执行的 YOLO26 模型，接收 NHWC uint8 张量并按模型输入
/// 布局转换，输出为 `[1, N, 6]` 的端到端检测结果（张量像素坐标）
pub struct Yolo26 {
  session: Mutex<Session>,
  layout: InputLayout,
  input_shape: Vec<usize>,
}

impl Model for Yolo26 {
  type Error = Yolo26Error;

  fn input_tensor_shape(&self) -> Vec<usize> {
    self.input_shape.clone()
  }

  fn detect(
    &self,
    tensor: &[u8],
    score_threshold: f32,
    top_k: usize,
  ) -> Result<Vec<RawDetection>, Self::Error> {
    let expected = self.input_shape.iter().product::<usize>();
    if tensor.len() != expected {
      return Err(Yolo26Error::InputSize {
        expected,
        actual: tensor.len(),
      });
    }

    let input = self.layout.to_value(tensor, &self.input_shape)?;

    debug!("执行模型推理");
    let mut session = self
      .session
      .lock()
      .map_err(|_| Yolo26Error::SessionPoisoned)?;
    let outputs = session.run(ort::inputs![input])?;
    let (_, data) = outputs[0].try_extract_tensor::<f32>()?;

    Ok(postprocess(data, score_threshold, top_k))
  }
}

fn postprocess(data: &[f32], score_threshold: f32, top_k: usize) -> Vec<RawDetection> {
  let mut items = data
    .chunks_exact(YOLO26_DET_STRIDE)
    .filter(|c| c[4] >= score_threshold)
    .map(|c| RawDetection {
      label_id: c[5].max(0.0) as u32,
      score: c[4],
      bbox: [c[0], c[1], c[2].max(c[0]), c[3].max(c[1])],
    })
    .collect::<Vec<_>>();

  items.sort_by(|a, b| b.score.total_cmp(&a.score));
  items.truncate(top_k);
  debug!("检测到 {} 个物体", items.len());
  items
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nchw_float_input_is_reported_as_nhwc() {
    let (layout, shape) =
      InputLayout::resolve(TensorElementType::Float32, &[1, 3, 640, 480]).unwrap();
    assert_eq!(layout, InputLayout::NchwF32);
    assert_eq!(shape, vec![1, 640, 480, 3]);
  }

  #[test]
  fn nhwc_inputs_keep_their_shape() {
    let (layout, shape) =
      InputLayout::resolve(TensorElementType::Uint8, &[1, 300, 320, 3]).unwrap();
    assert_eq!(layout, InputLayout::NhwcU8);
    assert_eq!(shape, vec![1, 300, 320, 3]);

    let (layout, shape) =
      InputLayout::resolve(TensorElementType::Float32, &[1, 300, 320, 3]).unwrap();
    assert_eq!(layout, InputLayout::NhwcF32);
    assert_eq!(shape, vec![1, 300, 320, 3]);
  }

  #[test]
  fn dynamic_dims_become_zero() {
    let (_, shape) = InputLayout::resolve(TensorElementType::Float32, &[1, 3, -1, -1]).unwrap();
    assert_eq!(shape, vec![1, 0, 0, 3]);
  }

  #[test]
  fn unsupported_inputs_are_rejected() {
    assert!(matches!(
      InputLayout::resolve(TensorElementType::Int64, &[1, 3, 640, 640]),
      Err(Yolo26Error::ModelInvalid(_))
    ));
    assert!(matches!(
      InputLayout::resolve(TensorElementType::Float32, &[1, 640, 640]),
      Err(Yolo26Error::ModelInvalid(_))
    ));
  }

  #[test]
  fn interleaved_bytes_split_into_normalized_planes() {
    // 2 个像素: (255, 0, 51), (0, 102, 255)
    let tensor = [255u8, 0, 51, 0, 102, 255];
    let planes = nhwc_to_nchw_f32(&tensor);
    let expected = [1.0, 0.0, 0.0, 0.4, 0.2, 1.0];
    for (got, want) in planes.iter().zip(expected) {
      assert!((got - want).abs() < 1e-6, "{got} != {want}");
    }
  }

  #[test]
  fn postprocess_filters_sorts_and_truncates() {
    let data = [
      10.0, 10.0, 20.0, 20.0, 0.4, 1.0, //
      0.0, 0.0, 5.0, 5.0, 0.1, 2.0, //
      30.0, 30.0, 60.0, 60.0, 0.9, 3.0, //
      1.0, 1.0, 2.0, 2.0, 0.6, 4.0,
    ];
    let items = postprocess(&data, 0.3, 2);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].label_id, 3);
    assert_eq!(items[1].label_id, 4);
  }
}
