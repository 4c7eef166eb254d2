// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 任务循环
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

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Instant,
};
use tracing::{info, warn};

use crate::{
  frame::RgbFrame,
  model::Model,
  output::Render,
  pipeline::{DetectionPipeline, FrameResult},
};

/// 任务统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  pub frames: usize,
  pub skipped: usize,
  pub detections: usize,
}

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    pipeline: &mut DetectionPipeline<M>,
    output: &O,
  ) -> Result<TaskSummary, Self::Error>;
}

fn run_frame<M, O>(
  pipeline: &DetectionPipeline<M>,
  output: &O,
  frame: &RgbFrame,
  summary: &mut TaskSummary,
) -> anyhow::Result<()>
where
  M: Model,
  O: Render<RgbFrame, FrameResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  summary.frames += 1;
  let now = Instant::now();
  let Some(result) = pipeline.handle_frame(frame) else {
    summary.skipped += 1;
    return Ok(());
  };
  let elapsed_a = now.elapsed();
  summary.detections += result.detections.len();
  output.render_result(frame, &result)?;
  let elapsed_b = now.elapsed();
  info!("推理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
  Ok(())
}

/// 只处理第一帧
pub struct OneShotTask;

impl<I, M, O> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = RgbFrame>,
  M: Model,
  O: Render<RgbFrame, FrameResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    pipeline: &mut DetectionPipeline<M>,
    output: &O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let mut summary = TaskSummary::default();
    pipeline.start();
    run_frame(pipeline, output, &frame, &mut summary)?;
    pipeline.stop();
    Ok(summary)
  }
}

/// 持续处理直到输入耗尽、达到帧数上限或收到停止信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  stop: Option<Arc<AtomicBool>>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 外部置位后在下一帧开始前退出
  pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
    self.stop = Some(stop);
    self
  }

  /// 安装 Ctrl-C 处理器，收到信号后置位停止标志
  pub fn with_ctrlc(self) -> Result<Self, ctrlc::Error> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      flag.store(true, Ordering::SeqCst);
    })?;
    Ok(self.with_stop_flag(stop))
  }

  fn should_stop(&self) -> bool {
    self
      .stop
      .as_ref()
      .map(|s| s.load(Ordering::SeqCst))
      .unwrap_or(false)
  }
}

impl<I, M, O> Task<I, M, O> for ContinuousTask
where
  I: Iterator<Item = RgbFrame>,
  M: Model,
  O: Render<RgbFrame, FrameResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    pipeline: &mut DetectionPipeline<M>,
    output: &O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let mut summary = TaskSummary::default();
    pipeline.start();

    for frame in input {
      if self.should_stop() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      if self.frame_number.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.frames);
        break;
      }
      info!("处理第 {} 帧图像", summary.frames + 1);
      run_frame(pipeline, output, &frame, &mut summary)?;
    }

    pipeline.stop();
    info!(
      "任务完成，共 {} 帧，跳过 {} 帧，检测 {} 个物体",
      summary.frames, summary.skipped, summary.detections
    );
    Ok(summary)
  }
}
