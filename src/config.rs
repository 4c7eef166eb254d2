// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 推理流水线参数
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

pub const DEFAULT_TOP_K: usize = 2;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.3;

/// 每帧处理所需的参数
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
  /// 最多保留的检测数
  pub top_k: usize,
  /// 置信度阈值 (0.0 - 1.0)，交由检测器过滤
  pub score_threshold: f32,
  /// 是否保持长宽比（填充）缩放
  pub keep_aspect_ratio: bool,
  /// 是否生成标注图像
  pub image_view: bool,
  /// 是否逐个输出检测结果
  pub verbose: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      top_k: DEFAULT_TOP_K,
      score_threshold: DEFAULT_SCORE_THRESHOLD,
      keep_aspect_ratio: false,
      image_view: false,
      verbose: false,
    }
  }
}

impl PipelineConfig {
  pub fn validate(&self) -> Result<(), String> {
    if !(0.0..=1.0).contains(&self.score_threshold) {
      return Err(format!(
        "置信度阈值必须位于 [0, 1]，实际为 {}",
        self.score_threshold
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.top_k, 2);
    assert_eq!(config.score_threshold, 0.3);
    assert!(!config.keep_aspect_ratio && !config.image_view && !config.verbose);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn threshold_out_of_range() {
    for score_threshold in [-0.1, 1.5, f32::NAN] {
      let config = PipelineConfig {
        score_threshold,
        ..Default::default()
      };
      assert!(config.validate().is_err());
    }
  }
}
