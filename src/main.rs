// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use shanan_detect::{
  FromUrl,
  config::{DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K, PipelineConfig},
  input::InputWrapper,
  label::LabelTable,
  model::Yolo26Builder,
  output::OutputWrapper,
  pipeline::DetectionPipeline,
  task::{ContinuousTask, Task},
};

/// 目标检测流水线参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型文件路径
  #[arg(long, value_name = "FILE")]
  pub model_file: PathBuf,
  /// 标签文件路径
  #[arg(long, value_name = "FILE")]
  pub label_file: PathBuf,
  /// 每帧最多保留的检测数
  #[arg(long, default_value_t = DEFAULT_TOP_K)]
  pub top_k: usize,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD, value_name = "THRESHOLD")]
  pub score_threshold: f32,
  /// 保持长宽比缩放（其余区域填充）
  #[arg(long)]
  pub keep_aspect_ratio: bool,
  /// 输出标注图像
  #[arg(long)]
  pub image_view: bool,
  /// 逐个输出检测结果
  #[arg(long)]
  pub verbose: bool,
  /// 输入来源，如 image:///path/a.jpg 或 folder:///path/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，如 log://、image:///path/out.png 或 folder:///path/records?always
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 最大处理帧数，0 表示无限制
  #[arg(long, value_name = "FRAME_NUMBER", default_value_t = 0)]
  pub frame_number: usize,
}

impl Args {
  fn pipeline_config(&self) -> PipelineConfig {
    PipelineConfig {
      top_k: self.top_k,
      score_threshold: self.score_threshold,
      keep_aspect_ratio: self.keep_aspect_ratio,
      image_view: self.image_view,
      verbose: self.verbose,
    }
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model_file.display());
  info!("标签文件路径: {}", args.label_file.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = LabelTable::from_file(&args.label_file)
    .with_context(|| format!("无法加载标签: {}", args.label_file.display()))?;
  let model = Yolo26Builder::new(&args.model_file)
    .build()
    .with_context(|| format!("无法加载模型: {}", args.model_file.display()))?;
  let mut pipeline = DetectionPipeline::new(model, labels, args.pipeline_config())?;

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let frame_number = (args.frame_number > 0).then_some(args.frame_number);
  let summary = ContinuousTask::default()
    .with_frame_number(frame_number)
    .with_ctrlc()?
    .run_task(input, &mut pipeline, &output)?;

  info!("处理完成: {:?}", summary);
  Ok(())
}
