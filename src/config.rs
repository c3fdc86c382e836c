// 该文件是 Huolong （火龙） 项目的一部分。
// src/config.rs - 引擎配置
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

pub const DEFAULT_CURRENCY: &str = "PHP";

/// 自训练样本收集策略
#[derive(Debug, Clone, PartialEq)]
pub struct SelftrainConfig {
  pub enabled: bool,
  pub min_relevance: f64,
  pub conf_low: f64,
  pub conf_high: f64,
  pub min_blur: f64,
}

impl Default for SelftrainConfig {
  fn default() -> Self {
    SelftrainConfig {
      enabled: false,
      min_relevance: 0.08,
      conf_low: 0.35,
      conf_high: 0.60,
      min_blur: 25.0,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
  /// 价格与修正使用的货币，统一大写
  pub currency: String,
  /// 内存历史容量
  pub history_capacity: usize,
  /// 果实检测的最低置信度
  pub min_detection_confidence: f32,
  /// 每隔多少次扫描在后台重新校准；`None` 关闭
  pub recalibrate_every: Option<usize>,
  /// 无病害检测证据时的缺陷上限
  pub heuristic_defect_ceiling: f64,
  /// 是否生成 base64 分割预览
  pub preview: bool,
  pub selftrain: SelftrainConfig,
}

impl Default for EngineConfig {
  fn default() -> Self {
    EngineConfig {
      currency: DEFAULT_CURRENCY.to_string(),
      history_capacity: 20,
      min_detection_confidence: 0.35,
      recalibrate_every: Some(25),
      heuristic_defect_ceiling: 45.0,
      preview: false,
      selftrain: SelftrainConfig::default(),
    }
  }
}
