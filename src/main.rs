// 该文件是 Huolong （火龙） 项目的一部分。
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

mod args;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use huolong::engine::LabelRequest;
use huolong::input::InputWrapper;
use huolong::output::OutputWrapper;
use huolong::task::{ContinuousTask, OneShotTask, Task};
use huolong::{EngineBuilder, FromUrl};

use args::{Args, Command};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  info!("数据目录: {}", args.data);

  let engine = EngineBuilder::from_url(&args.data)?
    .with_config(args.engine.to_config())
    .build()?;

  match args.command {
    Command::Detect { input, output } => {
      info!("输入来源: {}", input);
      info!("输出路径: {}", output);
      let input = InputWrapper::from_url(&input)?;
      let output = OutputWrapper::from_url(&output)?;
      OneShotTask.run_task(input, &engine, output)?;
    }
    Command::Batch {
      input,
      output,
      limit,
    } => {
      info!("输入来源: {}", input);
      info!("输出路径: {}", output);
      let input = InputWrapper::from_url(&input)?;
      let output = OutputWrapper::from_url(&output)?;
      let report = ContinuousTask::default()
        .with_limit(limit)
        .run_task(input, &engine, output)?;
      print_json(&report)?;
    }
    Command::Label {
      analysis_id,
      grade,
      weight,
      price,
      label_currency,
    } => {
      let outcome = engine.apply_correction(&LabelRequest {
        analysis_id,
        correct_grade: grade,
        correct_weight_grams: weight,
        correct_price_per_kg: price,
        currency: label_currency,
      })?;
      print_json(&outcome)?;
    }
    Command::Calibrate => {
      engine.recalibrate()?;
      print_json(engine.calibration().as_ref())?;
    }
    Command::Report { batch, from, to } => match batch {
      Some(batch) => print_json(&engine.logged_batch_report(&batch)?)?,
      None => print_json(&engine.logged_date_range_report(from, to)?)?,
    },
    Command::Model { retrain } => {
      if retrain {
        let status = engine.retrain_price_model()?;
        info!("重训练结果: {:?}", status);
      }
      print_json(engine.price_model().as_ref())?;
    }
  }

  Ok(())
}
