// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};

use crate::{
  frame::{AsNhwcFrame, RgbFrame},
  model::ImageDetection,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色

static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

impl ToRgbImage for RgbFrame {
  fn to_rgb_image(&self) -> RgbImage {
    let (width, height) = (self.width(), self.height());
    // RgbFrame 构造时已校验长度
    RgbImage::from_raw(width, height, self.as_nhwc().to_vec())
      .unwrap_or_else(|| RgbImage::new(width, height))
  }
}

pub struct Draw {
  font: FontRef<'static>,
  font_size: f32,
  color: [u8; 3],
}

impl Draw {
  pub fn new() -> Result<Self, InvalidFont> {
    Ok(Self {
      font: FontRef::try_from_slice(FONT_DATA)?,
      font_size: LABEL_FONT_SIZE,
      color: BOX_COLOR,
    })
  }

  /// 在原图副本上绘制检测框与分数
  pub fn draw_detections(&self, frame: &RgbFrame, detections: &[ImageDetection]) -> RgbImage {
    let mut image = frame.to_rgb_image();
    for detection in detections {
      self.draw_bbox_with_label(&mut image, detection);
    }
    image
  }

  // bbox 为原图像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &ImageDetection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let bbox = &detection.bbox;
    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.color);
    for thickness in 0..BOX_THICKNESS {
      let width = x_max - x_min - 2 * thickness;
      let height = y_max - y_min - 2 * thickness;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + thickness, y_min + thickness).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label = if detection.label.is_empty() {
      format!("{:.2}", detection.score)
    } else {
      format!("{} {:.2}", detection.label, detection.score)
    };

    // 标签置于框上方，空间不足时贴在图像顶端
    let text_width = (label.chars().count() as f32 * LABEL_CHAR_WIDTH) as i32;
    let label_x = x_min;
    let label_y = (y_min - LABEL_TEXT_HEIGHT).max(0);
    let label_width = text_width.min(w - label_x).max(0) as u32;

    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width, LABEL_TEXT_HEIGHT as u32);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y + LABEL_TEXT_VERTICAL_PADDING,
        PxScale::from(self.font_size),
        &self.font,
        &label,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(bbox: [f32; 4]) -> ImageDetection {
    ImageDetection {
      label_id: 0,
      label: "person".to_string(),
      score: 0.87,
      bbox,
    }
  }

  #[test]
  fn frame_converts_to_image() {
    let data = (0..2 * 3 * 3).map(|v| v as u8).collect::<Vec<_>>();
    let frame = RgbFrame::new(2, 3, data.clone()).unwrap();
    let image = frame.to_rgb_image();
    assert_eq!(image.dimensions(), (2, 3));
    assert_eq!(image.get_pixel(1, 0), &Rgb([3, 4, 5]));
    assert_eq!(image.get_pixel(0, 2), &Rgb([12, 13, 14]));
    assert_eq!(image.into_raw(), data);
  }

  #[test]
  fn draws_box_outline_on_copy() {
    let frame = RgbFrame::filled(100, 80, [0, 0, 0]);
    let draw = Draw::new().unwrap();
    let image = draw.draw_detections(&frame, &[detection([40.0, 40.0, 90.0, 70.0])]);

    assert_eq!(image.get_pixel(40, 55), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(65, 55), &Rgb([0, 0, 0]));
    assert!(frame.as_nhwc().iter().all(|&b| b == 0));
  }

  #[test]
  fn out_of_range_boxes_are_clamped() {
    let frame = RgbFrame::filled(50, 50, [0, 0, 0]);
    let draw = Draw::new().unwrap();
    let image = draw.draw_detections(&frame, &[detection([-20.0, 30.0, 500.0, 400.0])]);
    assert_eq!(image.dimensions(), (50, 50));
    assert_eq!(image.get_pixel(0, 40), &Rgb(BOX_COLOR));
  }
}
