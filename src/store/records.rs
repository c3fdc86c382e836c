// 该文件是 Huolong （火龙） 项目的一部分。
// src/store/records.rs - 扫描与修正记录
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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::{FeatureVector, RiskLevel, SizeCategory};
use crate::grading::{Grade, MarketLabel, grade_label};

/// 扫描记录里的精简预测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
  #[serde(with = "grade_label")]
  pub grade: Option<Grade>,
  pub price_per_kg: f64,
  pub currency: String,
  pub weight_grams: u32,
  #[serde(default)]
  pub size_category: Option<SizeCategory>,
  pub market_value_label: MarketLabel,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub defect_level: Option<RiskLevel>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub batch_id: Option<String>,
}

/// `scans.jsonl` 的一行，校准与报表的语料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
  pub id: Uuid,
  pub timestamp: DateTime<Utc>,
  pub features: FeatureVector,
  pub prediction: Prediction,
}

impl ScanRecord {
  pub fn is_valid(&self) -> bool {
    self.prediction.grade.is_some() && self.prediction.market_value_label != MarketLabel::Rejected
  }
}

/// `labels.jsonl` 的一行；带价格的修正附带重算后的特征
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRecord {
  pub analysis_id: Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_grade: Option<Grade>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_weight_grams: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_price_per_kg: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub currency: Option<String>,
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub features: Option<FeatureVector>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_scan_serializes_grade_as_na() {
    let record = ScanRecord {
      id: Uuid::new_v4(),
      timestamp: Utc::now(),
      features: FeatureVector::default(),
      prediction: Prediction {
        grade: None,
        price_per_kg: 0.0,
        currency: "PHP".to_string(),
        weight_grams: 0,
        size_category: None,
        market_value_label: MarketLabel::Rejected,
        defect_level: None,
        batch_id: None,
      },
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["prediction"]["grade"], "N/A");
    assert!(json["prediction"].get("batch_id").is_none());
    let back: ScanRecord = serde_json::from_value(json).unwrap();
    assert!(!back.is_valid());
  }

  #[test]
  fn correction_without_price_omits_fields() {
    let record = CorrectionRecord {
      analysis_id: Uuid::nil(),
      correct_grade: Some(Grade::B),
      correct_weight_grams: None,
      correct_price_per_kg: None,
      currency: Some("PHP".to_string()),
      timestamp: Utc::now(),
      features: None,
    };
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("correct_price_per_kg"));
    assert!(json.contains(r#""correct_grade":"B""#));
  }
}
