// 该文件是 Huolong （火龙） 项目的一部分。
// src/args.rs - 命令行参数
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

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use url::Url;
use uuid::Uuid;

use huolong::EngineConfig;
use huolong::config::DEFAULT_CURRENCY;
use huolong::grading::Grade;

/// Huolong 火龙果分级与定价
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 数据目录，例如 folder:///var/lib/huolong
  #[arg(long, env = "HUOLONG_DATA", value_name = "URL")]
  pub data: Url,

  #[command(flatten)]
  pub engine: EngineArgs,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(ClapArgs, Debug)]
pub struct EngineArgs {
  /// 价格货币
  #[arg(long, env = "HUOLONG_CURRENCY", default_value = DEFAULT_CURRENCY)]
  pub currency: String,

  /// 内存历史容量
  #[arg(long, env = "HUOLONG_HISTORY", default_value_t = 20)]
  pub history_capacity: usize,

  /// 果实检测最低置信度
  #[arg(long, default_value_t = 0.35, value_name = "THRESHOLD")]
  pub min_confidence: f32,

  /// 每隔多少次扫描后台重新校准，0 表示关闭
  #[arg(long, env = "HUOLONG_RECALIBRATE_EVERY", default_value_t = 25)]
  pub recalibrate_every: usize,

  /// 结果中附带 base64 分割预览
  #[arg(long)]
  pub preview: bool,

  /// 收集主动学习样本
  #[arg(long, env = "HUOLONG_SELFTRAIN")]
  pub selftrain: bool,
}

impl EngineArgs {
  pub fn to_config(&self) -> EngineConfig {
    let mut config = EngineConfig {
      currency: self.currency.clone(),
      history_capacity: self.history_capacity,
      min_detection_confidence: self.min_confidence,
      recalibrate_every: (self.recalibrate_every > 0).then_some(self.recalibrate_every),
      preview: self.preview,
      ..EngineConfig::default()
    };
    config.selftrain.enabled = self.selftrain;
    config
  }
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 分析单幅图像
  Detect {
    /// 输入图像，例如 image:///tmp/fruit.jpg?batch=b1
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    /// 输出，stdout: 或 folder:///path
    #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
    output: Url,
  },
  /// 批量分析目录中的图像，Ctrl-C 中断
  Batch {
    /// 输入目录，例如 folder:///tmp/images?batch=b1&trusted
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
    output: Url,
    /// 最多处理的图像数
    #[arg(long, value_name = "COUNT")]
    limit: Option<usize>,
  },
  /// 提交人工修正
  Label {
    #[arg(long, value_name = "UUID")]
    analysis_id: Uuid,
    #[arg(long)]
    grade: Option<Grade>,
    #[arg(long, value_name = "GRAMS")]
    weight: Option<f64>,
    #[arg(long, value_name = "PRICE")]
    price: Option<f64>,
    /// 修正价格的货币，缺省为 --currency
    #[arg(long)]
    label_currency: Option<String>,
  },
  /// 由扫描日志重新计算校准阈值
  Calibrate,
  /// 基于扫描日志的汇总报表
  Report {
    #[arg(long)]
    batch: Option<String>,
    /// 起始日期 YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,
    /// 结束日期 YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,
  },
  /// 查看价格模型，可选重训练
  Model {
    #[arg(long)]
    retrain: bool,
  },
}
