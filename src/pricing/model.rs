// 该文件是 Huolong （火龙） 项目的一部分。
// src/pricing/model.rs - 价格模型文档
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

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{PricingError, RidgeFit};
use crate::features::FeatureVector;

pub const MODEL_TYPE: &str = "ridge_linear";
pub const MODEL_TARGET: &str = "price_per_kg";
const DEFAULT_COEF: [f64; 8] = [180.0, 0.9, 0.3, -6.0, 120.0, 15.0, 12.0, 8.0];
const DEFAULT_LAMBDA: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mae: Option<f64>,
}

/// 持久化的岭回归价格模型；训练成功后整体替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModel {
  #[serde(rename = "type")]
  pub kind: String,
  pub target: String,
  pub currency: String,
  pub feature_names: Vec<String>,
  pub coef: Vec<f64>,
  pub lambda: f64,
  #[serde(default)]
  pub n_samples: usize,
  #[serde(default)]
  pub metrics: ModelMetrics,
  #[serde(default)]
  pub trained_at: Option<DateTime<Utc>>,
}

/// 结果中附带的模型摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
  #[serde(rename = "type")]
  pub kind: String,
  pub n_samples: usize,
  pub trained_at: Option<DateTime<Utc>>,
  pub mae: Option<f64>,
}

impl PriceModel {
  pub fn default_for(currency: &str) -> Self {
    PriceModel {
      kind: MODEL_TYPE.to_string(),
      target: MODEL_TARGET.to_string(),
      currency: currency.to_uppercase(),
      feature_names: FeatureVector::NAMES.iter().map(|s| s.to_string()).collect(),
      coef: DEFAULT_COEF.to_vec(),
      lambda: DEFAULT_LAMBDA,
      n_samples: 0,
      metrics: ModelMetrics::default(),
      trained_at: None,
    }
  }

  pub fn load(path: &Path) -> Result<Self, PricingError> {
    let data = std::fs::read_to_string(path)?;
    let model: PriceModel = serde_json::from_str(&data)?;
    if model.coef.is_empty() || model.coef.len() != model.feature_names.len() {
      return Err(PricingError::InvalidModel(format!(
        "{} 个系数对应 {} 个特征",
        model.coef.len(),
        model.feature_names.len()
      )));
    }
    Ok(model)
  }

  /// 文件不存在或损坏时使用默认系数
  pub fn load_or_default(path: &Path, currency: &str) -> Self {
    if !path.exists() {
      info!("价格模型 {} 不存在，使用默认系数", path.display());
      return Self::default_for(currency);
    }
    match Self::load(path) {
      Ok(model) => {
        info!(
          "加载价格模型 {}: 样本 {}, MAE {:?}",
          path.display(),
          model.n_samples,
          model.metrics.mae
        );
        model
      }
      Err(e) => {
        warn!("价格模型 {} 加载失败，使用默认系数: {}", path.display(), e);
        Self::default_for(currency)
      }
    }
  }

  /// 先写临时文件再改名，读者不会看到写了一半的模型
  pub fn save(&self, path: &Path) -> Result<(), PricingError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
  }

  /// `coef · [1, 特征...]`；长度不符或结果非有限时为 0，即不参与混合
  pub fn predict(&self, features: &FeatureVector) -> f64 {
    let row = features.design_row();
    if self.coef.len() != row.len() {
      return 0.0;
    }
    let price: f64 = self.coef.iter().zip(row).map(|(c, x)| c * x).sum();
    if price.is_finite() { price } else { 0.0 }
  }

  pub(super) fn with_fit(&self, fit: RidgeFit, lambda: f64, n_samples: usize) -> Self {
    PriceModel {
      kind: MODEL_TYPE.to_string(),
      target: MODEL_TARGET.to_string(),
      currency: self.currency.clone(),
      feature_names: FeatureVector::NAMES.iter().map(|s| s.to_string()).collect(),
      coef: fit.coef,
      lambda,
      n_samples,
      metrics: ModelMetrics { mae: Some(fit.mae) },
      trained_at: Some(Utc::now()),
    }
  }

  pub fn summary(&self) -> ModelSummary {
    ModelSummary {
      kind: self.kind.clone(),
      n_samples: self.n_samples,
      trained_at: self.trained_at,
      mae: self.metrics.mae,
    }
  }
}
