// 该文件是 Huolong （火龙） 项目的一部分。
// src/features.rs - 特征定义
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

use serde::{Deserialize, Serialize};

use crate::grading::Grade;

mod extractor;
mod insect;
mod quality;

pub use self::extractor::{FeatureExtractor, RegionFeatures};
pub use self::insect::InsectRisk;
pub use self::quality::ImageQuality;

/// 低 / 中 / 高 三档等级，用于缺陷、虫害与病害
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

impl RiskLevel {
  /// 按两个切点划分
  pub fn from_cuts(value: f64, medium: f64, high: f64) -> Self {
    if value < medium {
      RiskLevel::Low
    } else if value < high {
      RiskLevel::Medium
    } else {
      RiskLevel::High
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      RiskLevel::Low => "low",
      RiskLevel::Medium => "medium",
      RiskLevel::High => "high",
    }
  }
}

impl std::fmt::Display for RiskLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeCategory {
  Small,
  Medium,
  Large,
}

impl SizeCategory {
  const SMALL_BELOW: f64 = 0.12;
  const MEDIUM_BELOW: f64 = 0.26;

  pub fn from_area_ratio(ratio: f64) -> Self {
    if ratio < Self::SMALL_BELOW {
      SizeCategory::Small
    } else if ratio < Self::MEDIUM_BELOW {
      SizeCategory::Medium
    } else {
      SizeCategory::Large
    }
  }

  pub fn ordinal(&self) -> f64 {
    match self {
      SizeCategory::Small => 1.0,
      SizeCategory::Medium => 2.0,
      SizeCategory::Large => 3.0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FruitStatus {
  Unripe,
  Ripe,
  Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeQuality {
  #[serde(rename = "Perfectly Oval")]
  PerfectlyOval,
  #[serde(rename = "Slightly Irregular")]
  SlightlyIrregular,
  #[serde(rename = "Irregular/Deformed")]
  Irregular,
}

impl ShapeQuality {
  /// 0-10 分
  pub fn score(&self) -> f64 {
    match self {
      ShapeQuality::PerfectlyOval => 10.0,
      ShapeQuality::SlightlyIrregular => 8.0,
      ShapeQuality::Irregular => 5.0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WingCondition {
  #[serde(rename = "Green & Firm")]
  GreenFirm,
  #[serde(rename = "Green with Red Tips")]
  GreenRedTips,
  #[serde(rename = "Red/Pink & Soft")]
  RedPinkSoft,
}

impl WingCondition {
  pub fn as_str(&self) -> &'static str {
    match self {
      WingCondition::GreenFirm => "Green & Firm",
      WingCondition::GreenRedTips => "Green with Red Tips",
      WingCondition::RedPinkSoft => "Red/Pink & Soft",
    }
  }

  pub fn from_signal(signal: f64) -> Self {
    if signal < -5.0 {
      WingCondition::GreenFirm
    } else if signal < 10.0 {
      WingCondition::GreenRedTips
    } else {
      WingCondition::RedPinkSoft
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FruitVariety {
  #[serde(rename = "Yellow (Selenicereus megalanthus)")]
  Yellow,
  #[serde(rename = "White (Hylocereus undatus)")]
  White,
  #[serde(rename = "Pink (Hylocereus undatus)")]
  Pink,
  #[serde(rename = "Unknown Object")]
  Unknown,
}

impl FruitVariety {
  pub fn as_str(&self) -> &'static str {
    match self {
      FruitVariety::Yellow => "Yellow (Selenicereus megalanthus)",
      FruitVariety::White => "White (Hylocereus undatus)",
      FruitVariety::Pink => "Pink (Hylocereus undatus)",
      FruitVariety::Unknown => "Unknown Object",
    }
  }
}

/// 价格模型与校准共用的特征向量，也是唯一持久化的训练信号
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
  /// [0, 100]
  pub quality_score: f64,
  /// [0, 100]
  pub ripeness_score: f64,
  /// [0, 90]
  pub defect_probability: f64,
  /// [0, 1]
  pub fruit_area_ratio: f64,
  /// [0, 10]
  pub color_score: f64,
  /// A=3, B=2, C=1, 其它 0
  #[serde(alias = "grade_num")]
  pub grade_ordinal: f64,
  /// Large=3, Medium=2, Small=1
  #[serde(alias = "size_num")]
  pub size_ordinal: f64,
}

impl FeatureVector {
  /// 与模型系数对齐的特征名，首项为截距
  pub const NAMES: [&'static str; 8] = [
    "intercept",
    "quality_score",
    "ripeness_score",
    "defect_probability",
    "fruit_area_ratio",
    "color_score",
    "grade_ordinal",
    "size_ordinal",
  ];

  pub fn new(region: &RegionFeatures, grade: Option<Grade>) -> Self {
    FeatureVector {
      quality_score: region.quality_score,
      ripeness_score: region.ripeness_score,
      defect_probability: region.defect_probability,
      fruit_area_ratio: region.fruit_area_ratio,
      color_score: region.color_score,
      grade_ordinal: Grade::ordinal_of(grade),
      size_ordinal: region.size_category.ordinal(),
    }
  }

  /// `[1, 特征...]`
  pub fn design_row(&self) -> [f64; 8] {
    [
      1.0,
      self.quality_score,
      self.ripeness_score,
      self.defect_probability,
      self.fruit_area_ratio,
      self.color_score,
      self.grade_ordinal,
      self.size_ordinal,
    ]
  }
}
