// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 检测流水线
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
use tracing::{debug, error, info, warn};

use crate::{
  config::PipelineConfig,
  frame::{AsNhwcFrame, ImageSize, RgbFrame},
  label::LabelTable,
  letterbox::{LetterboxError, ScaleRatio, letterbox},
  model::{ImageDetection, Model, RawDetection, TensorShape, TensorShapeError},
  output::draw::Draw,
};

/// 启动阶段错误，流水线不会进入就绪状态
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error(transparent)]
  InvalidTensorShape(#[from] TensorShapeError),
  #[error("参数错误: {0}")]
  InvalidConfig(String),
  #[error("字体加载错误: {0}")]
  Font(#[from] ab_glyph::InvalidFont),
}

/// 单帧错误，跳过该帧后继续处理
#[derive(Error, Debug)]
pub enum FrameError {
  #[error("缩放错误: {0}")]
  Letterbox(#[from] LetterboxError),
  #[error("检测器调用失败: {0}")]
  Detect(Box<dyn std::error::Error + Send + Sync>),
}

/// 单帧处理结果
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
  /// 原图像素空间中的检测结果，顺序与检测器输出一致
  pub detections: Vec<ImageDetection>,
  /// 开启 `image_view` 时在原图副本上绘制的结果
  pub annotated: Option<RgbImage>,
}

impl FrameResult {
  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 将张量空间中的检测框映射回原图
///
/// 每个坐标乘以 `原图尺寸 / 内容占据尺寸`，结果截断到原图范围内。
pub fn remap(raw: &RawDetection, ratio: ScaleRatio, source: ImageSize) -> RawDetection {
  let (footprint_w, footprint_h) = ratio.footprint(source);
  let fx = source.width as f32 / footprint_w;
  let fy = source.height as f32 / footprint_h;
  let (max_x, max_y) = (source.width as f32, source.height as f32);

  let [x_min, y_min, x_max, y_max] = raw.bbox;
  RawDetection {
    label_id: raw.label_id,
    score: raw.score,
    bbox: [
      (x_min * fx).clamp(0.0, max_x),
      (y_min * fy).clamp(0.0, max_y),
      (x_max * fx).clamp(0.0, max_x),
      (y_max * fy).clamp(0.0, max_y),
    ],
  }
}

/// 检测流水线：缩放 → 张量 → 检测 → 坐标映射 → 可选绘制
///
/// 构造成功即为就绪状态；帧之间不保留任何状态。
pub struct DetectionPipeline<M> {
  model: M,
  labels: LabelTable,
  config: PipelineConfig,
  shape: TensorShape,
  draw: Option<Draw>,
  running: bool,
}

impl<M: Model> DetectionPipeline<M> {
  pub fn new(model: M, labels: LabelTable, config: PipelineConfig) -> Result<Self, PipelineError> {
    config.validate().map_err(PipelineError::InvalidConfig)?;

    let dims = model.input_tensor_shape();
    let shape = TensorShape::from_dims(&dims).inspect_err(|e| error!("{}", e))?;
    info!(
      "模型输入张量: [1, {}, {}, 3], 保持长宽比: {}",
      shape.height, shape.width, config.keep_aspect_ratio
    );

    let draw = if config.image_view {
      Some(Draw::new()?)
    } else {
      None
    };

    Ok(Self {
      model,
      labels,
      config,
      shape,
      draw,
      running: true,
    })
  }

  /// 开始接收帧
  pub fn start(&mut self) {
    if !self.running {
      info!("流水线开始接收帧");
    }
    self.running = true;
  }

  /// 停止接收帧，之后送达的帧会被忽略
  pub fn stop(&mut self) {
    if self.running {
      info!("流水线停止接收帧");
    }
    self.running = false;
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  /// 处理一帧，失败时记录日志并返回 `None`
  pub fn handle_frame(&self, frame: &RgbFrame) -> Option<FrameResult> {
    if !self.running {
      debug!("流水线已停止，忽略该帧");
      return None;
    }

    match self.process(frame) {
      Ok(result) => Some(result),
      Err(e) => {
        warn!("跳过该帧: {}", e);
        None
      }
    }
  }

  pub fn process(&self, frame: &RgbFrame) -> Result<FrameResult, FrameError> {
    let source = frame.size();
    let resized = letterbox(frame, self.shape.image_size(), self.config.keep_aspect_ratio)?;
    debug!(
      "缩放比例: ({:.4}, {:.4}), 内容区域: {}x{}",
      resized.ratio.x, resized.ratio.y, resized.content.width, resized.content.height
    );

    let tensor = resized.as_nhwc();
    let raw = self
      .model
      .detect(tensor, self.config.score_threshold, self.config.top_k)
      .map_err(|e| FrameError::Detect(Box::new(e)))?;

    if self.config.verbose {
      info!("检测结果数量: {}", raw.len());
    }

    let detections = raw
      .iter()
      .take(self.config.top_k)
      .map(|item| {
        let mapped = remap(item, resized.ratio, source);
        ImageDetection {
          label_id: mapped.label_id,
          label: self.labels.get(mapped.label_id).to_string(),
          score: mapped.score,
          bbox: mapped.bbox,
        }
      })
      .collect::<Vec<_>>();

    if self.config.verbose {
      for det in &detections {
        info!(
          "  - {} ({}): {:.2}% at [{:.1}, {:.1}, {:.1}, {:.1}]",
          det.label,
          det.label_id,
          det.score * 100.0,
          det.bbox[0],
          det.bbox[1],
          det.bbox[2],
          det.bbox[3]
        );
      }
    }

    let annotated = self
      .draw
      .as_ref()
      .map(|draw| draw.draw_detections(frame, &detections));

    Ok(FrameResult {
      detections,
      annotated,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(bbox: [f32; 4]) -> RawDetection {
    RawDetection {
      label_id: 1,
      score: 0.9,
      bbox,
    }
  }

  fn assert_close(actual: [f32; 4], expected: [f32; 4], tolerance: f32) {
    for (a, e) in actual.iter().zip(expected) {
      assert!((a - e).abs() <= tolerance, "{actual:?} != {expected:?}");
    }
  }

  #[test]
  fn vga_letterbox_remap() {
    let source = ImageSize::new(640, 480);
    let ratio = ScaleRatio {
      x: 300.0 / 640.0,
      y: 225.0 / 480.0,
    };
    let mapped = remap(&raw([10.0, 10.0, 50.0, 50.0]), ratio, source);
    assert_close(mapped.bbox, [21.333, 21.333, 106.667, 106.667], 1e-2);
    assert_eq!(mapped.label_id, 1);
    assert_eq!(mapped.score, 0.9);
  }

  #[test]
  fn identity_ratio_keeps_coordinates() {
    let mapped = remap(
      &raw([1.0, 2.0, 3.0, 4.0]),
      ScaleRatio::IDENTITY,
      ImageSize::new(10, 10),
    );
    assert_eq!(mapped.bbox, [1.0, 2.0, 3.0, 4.0]);
  }

  #[test]
  fn boxes_in_padding_are_clamped() {
    let source = ImageSize::new(640, 480);
    let ratio = ScaleRatio {
      x: 300.0 / 640.0,
      y: 225.0 / 480.0,
    };
    let mapped = remap(&raw([-5.0, 200.0, 310.0, 299.0]), ratio, source);
    assert_eq!(mapped.bbox[0], 0.0);
    assert_eq!(mapped.bbox[2], 640.0);
    assert_eq!(mapped.bbox[3], 480.0);
    assert!(mapped.bbox[1] > 400.0 && mapped.bbox[1] < 480.0);
  }
}
