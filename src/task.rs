// 该文件是 Huolong （火龙） 项目的一部分。
// src/task.rs - 单次与连续批处理任务
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

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use image::RgbImage;
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::{AnalysisResult, Engine};
use crate::input::ScanInput;
use crate::output::Render;

pub trait Task<I, O>: Sized {
  type Error;
  fn run_task(self, input: I, engine: &Engine, output: O) -> Result<TaskReport, Self::Error>;
}

/// 一次任务的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskReport {
  pub processed: usize,
  pub valid: usize,
  pub failed: usize,
}

impl TaskReport {
  fn record(&mut self, result: &AnalysisResult) {
    self.processed += 1;
    if result.is_valid_fruit {
      self.valid += 1;
    }
  }
}

pub struct OneShotTask;

impl<RE, I, O> Task<I, O> for OneShotTask
where
  RE: std::error::Error + Send + Sync + 'static,
  I: IntoIterator<Item = ScanInput>,
  O: Render<RgbImage, AnalysisResult, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, engine: &Engine, output: O) -> Result<TaskReport, Self::Error> {
    info!("开始任务...");
    let scan = input
      .into_iter()
      .next()
      .ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("读取 {}，开始分析...", scan.path.display());
    let now = Instant::now();
    let result = engine.analyze(&scan.image, &scan.request)?;
    info!("分析完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&scan.image, &result)?;

    let mut report = TaskReport::default();
    report.record(&result);
    Ok(report)
  }
}

/// 逐幅处理全部输入；Ctrl-C 后处理完当前图像即退出
#[derive(Default, Debug)]
pub struct ContinuousTask {
  limit: Option<usize>,
  stop: Option<Arc<AtomicBool>>,
}

impl ContinuousTask {
  pub fn with_limit(mut self, limit: Option<usize>) -> Self {
    self.limit = limit;
    self
  }

  /// 使用外部停止标志，不再安装 Ctrl-C 处理器
  pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
    self.stop = Some(stop);
    self
  }

  fn stop_flag(&self) -> Result<Arc<AtomicBool>, ctrlc::Error> {
    if let Some(stop) = &self.stop {
      return Ok(stop.clone());
    }
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，处理完当前图像后退出...");
      flag.store(true, Ordering::SeqCst);
      std::thread::spawn(|| {
        std::thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(stop)
  }
}

impl<RE, I, O> Task<I, O> for ContinuousTask
where
  RE: std::error::Error + Send + Sync + 'static,
  I: IntoIterator<Item = ScanInput>,
  O: Render<RgbImage, AnalysisResult, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, engine: &Engine, output: O) -> Result<TaskReport, Self::Error> {
    info!("开始任务...");
    let stop = self.stop_flag()?;
    let mut report = TaskReport::default();

    for scan in input {
      if stop.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      let now = Instant::now();
      match engine.analyze(&scan.image, &scan.request) {
        Ok(result) => {
          output.render_result(&scan.image, &result)?;
          report.record(&result);
          info!(
            "第 {} 幅 {}: 等级 {}，耗时 {:.2?}",
            report.processed,
            scan.path.display(),
            result.grade.map_or("N/A", |g| g.as_str()),
            now.elapsed()
          );
        }
        Err(e) => {
          report.failed += 1;
          warn!("{} 分析失败: {}", scan.path.display(), e);
        }
      }
      if self.limit.is_some_and(|n| report.processed + report.failed >= n) {
        info!("达到指定数量 {}，退出任务循环", report.processed + report.failed);
        break;
      }
    }

    info!(
      "任务完成: 处理 {}，有效 {}，失败 {}",
      report.processed, report.valid, report.failed
    );
    Ok(report)
  }
}
