// 该文件是 Huolong （火龙） 项目的一部分。
// src/pricing.rs - 价格估计与模型重训练
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

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::features::FeatureVector;
use crate::store::CorrectionRecord;
use crate::utils::round_to;

mod baseline;
mod model;
mod ridge;

pub use self::baseline::{
  BaselineInputs, PriceBounds, RETAIL_BAD_MIN, RETAIL_GOOD_MAX, RETAIL_GOOD_MIN,
  baseline_price_per_kg, blend_weight,
};
pub use self::model::{ModelMetrics, ModelSummary, PriceModel};
pub use self::ridge::{RidgeFit, TrainingRow, fit_ridge};

/// 少于该数量的带价格修正不重训练
pub const MIN_TRAINING_ROWS: usize = 5;

#[derive(Error, Debug)]
pub enum PricingError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("模型文件无效: {0}")]
  InvalidModel(String),
  #[error("正规方程奇异，无法求解")]
  Singular,
}

/// 单次扫描的价格分解
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceEstimate {
  pub price_per_kg: f64,
  /// 截断进区间后的模型价格，模型不参与时为 0
  pub model_price: f64,
  pub baseline_price: f64,
  pub model_weight: f64,
  pub bounds: PriceBounds,
}

impl PriceEstimate {
  pub const INVALID: PriceEstimate = PriceEstimate {
    price_per_kg: 0.0,
    model_price: 0.0,
    baseline_price: 0.0,
    model_weight: 0.0,
    bounds: PriceBounds::ZERO,
  };

  /// 模型价格与基准价按样本数加权混合，结果始终落在区间内
  pub fn blend(
    model: &PriceModel,
    features: &FeatureVector,
    bounds: PriceBounds,
    inputs: &BaselineInputs,
  ) -> Self {
    let baseline_price = baseline_price_per_kg(&bounds, inputs);
    let raw = model.predict(features);
    let (model_price, model_weight) = if raw > 0.0 {
      (bounds.clamp(raw), blend_weight(model.n_samples))
    } else {
      (0.0, 0.0)
    };
    let blended = model_weight * model_price + (1.0 - model_weight) * baseline_price;
    PriceEstimate {
      price_per_kg: bounds.clamp(round_to(blended, 2)),
      model_price,
      baseline_price,
      model_weight,
      bounds,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelUpdate {
  Updated(PriceModel),
  NoUpdate { rows: usize, need: usize },
}

impl ModelUpdate {
  pub fn is_updated(&self) -> bool {
    matches!(self, ModelUpdate::Updated(_))
  }
}

/// 只取带价格与特征、且货币一致（缺省视为一致）的修正记录
pub fn training_rows<'a>(
  corrections: impl IntoIterator<Item = &'a CorrectionRecord>,
  currency: &str,
) -> Vec<TrainingRow> {
  corrections
    .into_iter()
    .filter(|c| {
      c.currency
        .as_deref()
        .is_none_or(|cur| cur.eq_ignore_ascii_case(currency))
    })
    .filter_map(|c| {
      let price = c.correct_price_per_kg.filter(|p| p.is_finite())?;
      Some(TrainingRow {
        features: c.features?,
        price_per_kg: price,
      })
    })
    .collect()
}

/// 拟合新模型；不落盘，也不修改当前模型
pub fn retrain(current: &PriceModel, rows: &[TrainingRow]) -> Result<ModelUpdate, PricingError> {
  if rows.len() < MIN_TRAINING_ROWS {
    info!("价格修正样本不足: {} < {}，模型保持不变", rows.len(), MIN_TRAINING_ROWS);
    return Ok(ModelUpdate::NoUpdate {
      rows: rows.len(),
      need: MIN_TRAINING_ROWS,
    });
  }
  let lambda = if current.lambda.is_finite() && current.lambda >= 0.0 {
    current.lambda
  } else {
    warn!("模型正则系数 {} 无效，改用 1.0", current.lambda);
    1.0
  };
  let fit = fit_ridge(rows, lambda)?;
  info!("价格模型重训练完成: 样本 {}, MAE {:.3}", rows.len(), fit.mae);
  Ok(ModelUpdate::Updated(current.with_fit(fit, lambda, rows.len())))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::features::RiskLevel;
  use crate::grading::Grade;
  use chrono::Utc;

  fn correction(price: Option<f64>, currency: Option<&str>, with_features: bool) -> CorrectionRecord {
    CorrectionRecord {
      analysis_id: uuid::Uuid::nil(),
      correct_grade: None,
      correct_weight_grams: None,
      correct_price_per_kg: price,
      currency: currency.map(String::from),
      timestamp: Utc::now(),
      features: with_features.then(|| FeatureVector {
        quality_score: 80.0,
        ripeness_score: 88.0,
        ..Default::default()
      }),
    }
  }

  #[test]
  fn training_rows_filter_currency_and_missing_fields() {
    let records = vec![
      correction(Some(150.0), Some("php"), true),
      correction(Some(150.0), None, true),
      correction(Some(150.0), Some("USD"), true),
      correction(None, Some("PHP"), true),
      correction(Some(150.0), Some("PHP"), false),
    ];
    assert_eq!(training_rows(&records, "PHP").len(), 2);
  }

  #[test]
  fn too_few_rows_leave_model_unchanged() {
    let model = PriceModel::default_for("PHP");
    let rows: Vec<_> = (0..4)
      .map(|i| TrainingRow {
        features: FeatureVector::default(),
        price_per_kg: 100.0 + i as f64,
      })
      .collect();
    assert_eq!(
      retrain(&model, &rows).unwrap(),
      ModelUpdate::NoUpdate { rows: 4, need: 5 }
    );
  }

  #[test]
  fn retrain_replaces_coefficients() {
    let model = PriceModel::default_for("PHP");
    let rows: Vec<_> = (0..8)
      .map(|i| TrainingRow {
        features: FeatureVector {
          quality_score: 70.0 + i as f64 * 3.0,
          ripeness_score: 80.0 + i as f64,
          defect_probability: (i % 3) as f64,
          fruit_area_ratio: 0.2 + i as f64 * 0.01,
          color_score: 5.0 + (i % 2) as f64,
          grade_ordinal: (1 + i % 3) as f64,
          size_ordinal: (1 + i % 2) as f64,
        },
        price_per_kg: 160.0 + i as f64 * 4.0,
      })
      .collect();
    let ModelUpdate::Updated(updated) = retrain(&model, &rows).unwrap() else {
      panic!("expected update");
    };
    assert_eq!(updated.n_samples, 8);
    assert_eq!(updated.coef.len(), 8);
    assert!(updated.metrics.mae.is_some());
    assert!(updated.trained_at.is_some());
    assert_ne!(updated.coef, model.coef);
  }

  #[test]
  fn estimate_is_clamped_for_every_level() {
    let mut model = PriceModel::default_for("PHP");
    model.n_samples = 100;
    let levels = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
    for grade in [Grade::A, Grade::B, Grade::C] {
      for defect in levels {
        for insect in levels {
          let bounds = PriceBounds::per_kg(grade, defect, true, insect);
          let fv = FeatureVector {
            quality_score: 95.0,
            ripeness_score: 90.0,
            fruit_area_ratio: 0.5,
            color_score: 9.0,
            grade_ordinal: Grade::ordinal_of(Some(grade)),
            size_ordinal: 3.0,
            ..Default::default()
          };
          let inputs = BaselineInputs {
            quality_score: 95.0,
            ripeness_score: 90.0,
            defect_probability: 0.0,
            insect_score: 10.0,
          };
          let est = PriceEstimate::blend(&model, &fv, bounds, &inputs);
          assert!(bounds.contains(est.price_per_kg), "{est:?}");
          assert_eq!(est.model_weight, 0.70);
        }
      }
    }
  }

  #[test]
  fn untrained_model_uses_baseline_only() {
    let model = PriceModel::default_for("PHP");
    let bounds = PriceBounds::per_kg(Grade::B, RiskLevel::Low, true, RiskLevel::Low);
    let inputs = BaselineInputs {
      quality_score: 80.0,
      ripeness_score: 88.0,
      defect_probability: 1.0,
      insect_score: 0.0,
    };
    let est = PriceEstimate::blend(&model, &FeatureVector::default(), bounds, &inputs);
    assert_eq!(est.model_weight, 0.0);
    assert_eq!(est.price_per_kg, bounds.clamp(round_to(est.baseline_price, 2)));
  }
}
