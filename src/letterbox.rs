// 该文件是 Shanan （山南西风） 项目的一部分。
// src/letterbox.rs - 等比缩放与填充
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

use image::{Rgb, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::frame::{AsNhwcFrame, ImageSize, RgbFrame};

/// 画布中未被内容覆盖部分的填充值
pub const LETTERBOX_BACKGROUND: u8 = 0;

const RESIZE_FILTER: FilterType = FilterType::Triangle;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LetterboxError {
  #[error("图像尺寸退化: 源 {source_width}x{source_height}, 目标 {target_width}x{target_height}")]
  Degenerate {
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
  },
  #[error("像素缓冲区与尺寸 {0}x{1} 不符")]
  InvalidBuffer(u32, u32),
}

/// 内容在画布中所占尺寸与源图尺寸之比
///
/// 拉伸模式下为 `(w / W, h / H)`；保持长宽比时为 `(round(W·s) / W, round(H·s) / H)`，
/// 即内容实际占据的像素数而非统一缩放因子 `s`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRatio {
  pub x: f32,
  pub y: f32,
}

impl ScaleRatio {
  pub const IDENTITY: ScaleRatio = ScaleRatio { x: 1.0, y: 1.0 };

  fn from_footprint(content: ImageSize, source: ImageSize) -> Self {
    Self {
      x: content.width as f32 / source.width as f32,
      y: content.height as f32 / source.height as f32,
    }
  }

  /// 内容在张量空间中的宽高（像素）
  pub fn footprint(&self, source: ImageSize) -> (f32, f32) {
    (
      self.x * source.width as f32,
      self.y * source.height as f32,
    )
  }
}

/// 缩放结果：恰好为目标尺寸的画布、比例以及内容区域大小
#[derive(Debug, Clone)]
pub struct Letterboxed {
  pub frame: RgbFrame,
  pub ratio: ScaleRatio,
  pub content: ImageSize,
}

impl AsNhwcFrame for Letterboxed {
  fn as_nhwc(&self) -> &[u8] {
    self.frame.as_nhwc()
  }
}

/// 将任意尺寸的帧变换为 `target` 尺寸
///
/// `preserve_aspect_ratio` 为真时按统一比例缩放，内容贴靠左上角，其余区域以
/// [`LETTERBOX_BACKGROUND`] 填充；否则两轴独立拉伸。
pub fn letterbox(
  source: &RgbFrame,
  target: ImageSize,
  preserve_aspect_ratio: bool,
) -> Result<Letterboxed, LetterboxError> {
  let size = source.size();
  if size.is_degenerate() || target.is_degenerate() {
    return Err(LetterboxError::Degenerate {
      source_width: size.width,
      source_height: size.height,
      target_width: target.width,
      target_height: target.height,
    });
  }

  if size == target {
    debug!("源尺寸与目标一致，直接复制");
    return Ok(Letterboxed {
      frame: source.clone(),
      ratio: ScaleRatio::IDENTITY,
      content: target,
    });
  }

  let image = RgbImage::from_raw(size.width, size.height, source.as_nhwc().to_vec())
    .ok_or(LetterboxError::InvalidBuffer(size.width, size.height))?;

  if !preserve_aspect_ratio {
    let resized = image::imageops::resize(&image, target.width, target.height, RESIZE_FILTER);
    debug!(
      "拉伸缩放: {}x{} -> {}x{}",
      size.width, size.height, target.width, target.height
    );
    return Ok(Letterboxed {
      frame: RgbFrame::from(resized),
      ratio: ScaleRatio::from_footprint(target, size),
      content: target,
    });
  }

  let content = content_footprint(size, target);
  let resized = image::imageops::resize(&image, content.width, content.height, RESIZE_FILTER);
  let mut canvas = RgbImage::from_pixel(
    target.width,
    target.height,
    Rgb([LETTERBOX_BACKGROUND; 3]),
  );
  image::imageops::replace(&mut canvas, &resized, 0, 0);

  debug!(
    "等比缩放: {}x{} -> 内容 {}x{}, 画布 {}x{}",
    size.width, size.height, content.width, content.height, target.width, target.height
  );

  Ok(Letterboxed {
    frame: RgbFrame::from(canvas),
    ratio: ScaleRatio::from_footprint(content, size),
    content,
  })
}

/// 统一缩放后内容占据的尺寸，每轴至少 1 像素且不超过画布
pub fn content_footprint(source: ImageSize, target: ImageSize) -> ImageSize {
  let sw = source.width as f64;
  let sh = source.height as f64;
  let scale = (target.width as f64 / sw).min(target.height as f64 / sh);

  let width = ((sw * scale).round() as u32).clamp(1, target.width);
  let height = ((sh * scale).round() as u32).clamp(1, target.height);
  ImageSize::new(width, height)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gradient(width: u32, height: u32) -> RgbFrame {
    let image = RgbImage::from_fn(width, height, |x, y| {
      Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    RgbFrame::from(image)
  }

  #[test]
  fn identity_is_byte_copy() {
    let source = gradient(32, 24);
    for keep in [false, true] {
      let out = letterbox(&source, ImageSize::new(32, 24), keep).unwrap();
      assert_eq!(out.frame, source);
      assert_eq!(out.ratio, ScaleRatio::IDENTITY);
    }
  }

  #[test]
  fn output_matches_target_size() {
    let source = gradient(64, 20);
    for keep in [false, true] {
      let out = letterbox(&source, ImageSize::new(30, 40), keep).unwrap();
      assert_eq!(out.frame.size(), ImageSize::new(30, 40));
      assert_eq!(out.frame.as_nhwc().len(), 30 * 40 * 3);
    }
  }

  #[test]
  fn stretch_ratio_is_per_axis() {
    let out = letterbox(&gradient(100, 50), ImageSize::new(25, 25), false).unwrap();
    assert_eq!(out.ratio, ScaleRatio { x: 0.25, y: 0.5 });
    assert_eq!(out.content, ImageSize::new(25, 25));
  }

  #[test]
  fn vga_into_square_canvas() {
    let out = letterbox(&gradient(640, 480), ImageSize::new(300, 300), true).unwrap();
    assert_eq!(out.content, ImageSize::new(300, 225));
    assert!((out.ratio.x - 300.0 / 640.0).abs() < 1e-6);
    assert!((out.ratio.y - 225.0 / 480.0).abs() < 1e-6);
    let (fw, fh) = out.ratio.footprint(ImageSize::new(640, 480));
    assert!((fw - 300.0).abs() < 1e-3);
    assert!((fh - 225.0).abs() < 1e-3);
  }

  #[test]
  fn padding_fills_bottom_rows() {
    let source = RgbFrame::filled(40, 20, [200, 100, 50]);
    let out = letterbox(&source, ImageSize::new(20, 20), true).unwrap();
    assert_eq!(out.content, ImageSize::new(20, 10));

    let data = out.frame.as_nhwc();
    let row = 20 * 3;
    assert_eq!(&data[0..3], &[200, 100, 50]);
    assert!(data[10 * row..].iter().all(|&b| b == LETTERBOX_BACKGROUND));
  }

  #[test]
  fn padding_fills_right_columns() {
    let source = RgbFrame::filled(10, 40, [9, 9, 9]);
    let out = letterbox(&source, ImageSize::new(20, 20), true).unwrap();
    assert_eq!(out.content, ImageSize::new(5, 20));

    let data = out.frame.as_nhwc();
    for y in 0..20usize {
      for x in 5..20usize {
        let idx = (y * 20 + x) * 3;
        assert_eq!(&data[idx..idx + 3], &[0, 0, 0]);
      }
    }
  }

  #[test]
  fn limiting_axis_hits_target() {
    let cases = [
      ((640, 480), (300, 300)),
      ((480, 640), (300, 300)),
      ((1920, 1080), (640, 640)),
      ((123, 457), (320, 240)),
      ((50, 10), (300, 300)),
    ];
    for ((sw, sh), (tw, th)) in cases {
      let content = content_footprint(ImageSize::new(sw, sh), ImageSize::new(tw, th));
      assert!(content.width <= tw && content.height <= th);
      assert!(
        (content.width == tw) ^ (content.height == th),
        "{sw}x{sh} -> {tw}x{th} gave {content:?}"
      );
    }
  }

  #[test]
  fn extreme_aspect_keeps_one_pixel() {
    let content = content_footprint(ImageSize::new(10_000, 1), ImageSize::new(300, 300));
    assert_eq!(content, ImageSize::new(300, 1));
  }

  #[test]
  fn degenerate_source_fails_fast() {
    let source = RgbFrame::new(0, 10, Vec::new()).unwrap();
    let err = letterbox(&source, ImageSize::new(300, 300), true).unwrap_err();
    assert!(matches!(err, LetterboxError::Degenerate { source_width: 0, .. }));

    let source = RgbFrame::new(10, 0, Vec::new()).unwrap();
    assert!(letterbox(&source, ImageSize::new(300, 300), false).is_err());
  }
}
