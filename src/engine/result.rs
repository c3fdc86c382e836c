// 该文件是 Huolong （火龙） 项目的一部分。
// src/engine/result.rs - 单次扫描的完整结果
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
use serde::Serialize;
use uuid::Uuid;

use crate::detection::{BoundingBox, Detection, DetectionSummary};
use crate::features::{
  FeatureVector, FruitStatus, FruitVariety, ImageQuality, RiskLevel, ShapeQuality, SizeCategory,
  WingCondition,
};
use crate::grading::{Grade, GradeStage, MarketLabel, grade_label};
use crate::history::ScanView;
use crate::pricing::{ModelSummary, PriceEstimate};
use crate::segment::MaskSource;
use crate::store::Prediction;

/// 果实区域平均颜色与颜色评分
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorAnalysis {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub score: f64,
}

/// 果实区域来自检测器还是仅颜色线索
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionBackend {
  Detector,
  Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
  pub id: Uuid,
  pub timestamp: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub batch_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lat: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lon: Option<f64>,
  pub image_width: u32,
  pub image_height: u32,

  pub is_valid_fruit: bool,
  pub warning_message: Option<String>,
  pub fruit_type: FruitVariety,
  pub fruit_status: FruitStatus,
  #[serde(with = "grade_label")]
  pub grade: Option<Grade>,
  /// 改变了等级的流水线阶段
  pub grade_trace: Vec<(GradeStage, Grade)>,
  pub size_category: Option<SizeCategory>,
  pub weight_grams_est: u32,

  pub ripeness_score: f64,
  pub quality_score: f64,
  pub quality_index: f64,
  pub defect_probability: f64,
  pub defect_level: Option<RiskLevel>,
  pub shape_quality: ShapeQuality,
  pub wing_tip_signal: f64,
  pub wings_condition: WingCondition,
  pub disease_status: RiskLevel,
  pub disease_description: &'static str,
  pub insect_risk_score: f64,
  pub insect_risk_level: RiskLevel,
  pub shelf_life_days: u32,
  pub shelf_life_label: &'static str,

  pub fruit_area_ratio: f64,
  pub segmentation_bbox: BoundingBox,
  pub segmentation_source: MaskSource,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub segmentation_preview_base64: Option<String>,

  pub market_value_label: MarketLabel,
  pub market_value_score: u32,
  pub sorting_lane: &'static str,
  pub estimated_price_per_kg: f64,
  pub price_breakdown: PriceEstimate,
  pub currency: String,
  pub price_model: ModelSummary,

  pub detections: Vec<Detection>,
  pub disease_detections: Vec<Detection>,
  pub detection_backend: DetectionBackend,
  pub detection_summary: DetectionSummary,
  pub image_quality: ImageQuality,
  pub color_analysis: ColorAnalysis,
  pub features: FeatureVector,
  pub recommendations: Vec<String>,
  pub notes: String,
  pub label_corrected: bool,
}

impl AnalysisResult {
  /// 写入扫描日志的精简预测
  pub fn prediction(&self) -> Prediction {
    Prediction {
      grade: self.grade,
      price_per_kg: self.estimated_price_per_kg,
      currency: self.currency.clone(),
      weight_grams: self.weight_grams_est,
      size_category: self.size_category,
      market_value_label: self.market_value_label,
      defect_level: self.defect_level,
      batch_id: self.batch_id.clone(),
    }
  }

  /// 人工修正覆盖等级、重量与价格，特征中的等级序号随之更新
  pub(crate) fn apply_label(
    &mut self,
    grade: Option<Grade>,
    weight_grams: Option<f64>,
    price_per_kg: Option<f64>,
    currency: &str,
  ) {
    if let Some(grade) = grade {
      self.grade = Some(grade);
      self.features.grade_ordinal = Grade::ordinal_of(Some(grade));
    }
    if let Some(weight) = weight_grams {
      self.weight_grams_est = weight.round().max(0.0) as u32;
    }
    if let Some(price) = price_per_kg {
      self.estimated_price_per_kg = price;
      self.currency = currency.to_string();
    }
    self.label_corrected = true;
  }
}

impl ScanView for AnalysisResult {
  fn timestamp(&self) -> DateTime<Utc> {
    self.timestamp
  }

  fn grade(&self) -> Option<Grade> {
    self.grade
  }

  fn quality_score(&self) -> f64 {
    self.quality_score
  }

  fn ripeness_score(&self) -> f64 {
    self.ripeness_score
  }

  fn defect_level(&self) -> Option<RiskLevel> {
    self.defect_level
  }

  fn batch_id(&self) -> Option<&str> {
    self.batch_id.as_deref()
  }
}
