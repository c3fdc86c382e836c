// 该文件是 Huolong （火龙） 项目的一部分。
// src/grading/decision.rs - 有效性、病害与综合品质指数判定
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
use tracing::debug;

use super::{DecisionError, GradeContext, GradeResolution};
use crate::calibration::CalibrationProfile;
use crate::detection::{BoundingBox, Detection, DetectionSummary, best_confidence, count_inside};
use crate::features::{RegionFeatures, RiskLevel, SizeCategory};

/// 小于该尺寸的图像直接判为无效
const MIN_IMAGE_SIDE: u32 = 8;
const RELEVANCE_UNTRUSTED: f64 = 0.20;
const RELEVANCE_TRUSTED: f64 = 0.08;
const TRUSTED_MIN_CONF: f32 = 0.20;

const DISEASE_STRONG_CONF: f64 = 0.70;
const DISEASE_MODERATE_CONF: f64 = 0.45;
const LOW_LIGHT_INSECT_SCORE: f64 = 55.0;
const FRESH_MIN_RIPENESS: f64 = 75.0;
const FRESH_MAX_DISEASE_CONF: f64 = 0.30;

const RIPENESS_TARGET: f64 = 88.0;
const RIPENESS_FALLOFF: f64 = 2.5;
const DETECTOR_TERM_FLOOR: f64 = 40.0;

const NOT_FRUIT_WARNING: &str = "The image is not a dragon fruit or not related to dragonfruit";
const TOO_SMALL_WARNING: &str = "The image is too small to analyze";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validity {
  pub valid: bool,
  pub warning: Option<String>,
}

impl Validity {
  fn rejected(reason: &str) -> Self {
    Validity {
      valid: false,
      warning: Some(reason.to_string()),
    }
  }
}

/// 有效性门限：可信采集路径放宽为“检测置信度或颜色占比”之一满足
pub fn check_validity(
  width: u32,
  height: u32,
  fruit: &DetectionSummary,
  relevance_ratio: f64,
  trusted: bool,
) -> Validity {
  if width < MIN_IMAGE_SIDE || height < MIN_IMAGE_SIDE {
    return Validity::rejected(TOO_SMALL_WARNING);
  }
  let valid = if trusted {
    fruit.best_conf >= TRUSTED_MIN_CONF || relevance_ratio >= RELEVANCE_TRUSTED
  } else {
    fruit.count > 0 || relevance_ratio >= RELEVANCE_UNTRUSTED
  };
  if valid {
    Validity {
      valid: true,
      warning: None,
    }
  } else {
    Validity::rejected(NOT_FRUIT_WARNING)
  }
}

/// 病害检测器给出的证据
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiseaseEvidence {
  pub best_conf: f64,
  pub count: usize,
  /// 中心落在主目标框内的检测数
  pub inside_primary: usize,
}

impl DiseaseEvidence {
  pub fn from_detections(detections: &[Detection], primary: &BoundingBox) -> Self {
    DiseaseEvidence {
      best_conf: best_confidence(detections) as f64,
      count: detections.len(),
      inside_primary: count_inside(detections, primary),
    }
  }

  pub fn is_present(&self) -> bool {
    self.count > 0
  }
}

pub fn disease_description(status: RiskLevel) -> &'static str {
  match status {
    RiskLevel::Low => "Healthy",
    RiskLevel::Medium => "Minor Spotting",
    RiskLevel::High => "Potential Rot/Fungal Infection",
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
  pub disease_status: RiskLevel,
  pub defect_level: RiskLevel,
  /// 经新鲜候选衰减后的虫害等级
  pub insect_level: RiskLevel,
  pub fresh_candidate: bool,
  pub quality_index: f64,
  pub resolution: GradeResolution,
}

fn finite(stage: &'static str, value: f64) -> Result<f64, DecisionError> {
  if value.is_finite() {
    Ok(value)
  } else {
    Err(DecisionError::NonFinite { stage, value })
  }
}

/// 基于一份校准快照的判定，单次扫描内阈值不变
pub struct DecisionEngine<'a> {
  profile: &'a CalibrationProfile,
}

impl<'a> DecisionEngine<'a> {
  pub fn new(profile: &'a CalibrationProfile) -> Self {
    DecisionEngine { profile }
  }

  pub fn defect_level(&self, defect_probability: f64) -> RiskLevel {
    RiskLevel::from_cuts(
      defect_probability,
      self.profile.defect_medium_gate,
      self.profile.defect_high_gate,
    )
  }

  /// 三档病害判定，按强证据、中等证据、弱光组合、缺陷门限的顺序
  pub fn disease_status(&self, features: &RegionFeatures, disease: &DiseaseEvidence) -> RiskLevel {
    let defect = features.defect_probability;
    if disease.best_conf >= DISEASE_STRONG_CONF && disease.inside_primary >= 1 {
      RiskLevel::High
    } else if disease.best_conf >= DISEASE_MODERATE_CONF
      && disease.count >= 1
      && defect >= self.profile.defect_medium_gate
    {
      RiskLevel::Medium
    } else if features.low_light
      && defect >= self.profile.defect_high_gate
      && features.insect.score >= LOW_LIGHT_INSECT_SCORE
    {
      RiskLevel::High
    } else if defect >= self.profile.defect_medium_gate {
      RiskLevel::Medium
    } else {
      RiskLevel::Low
    }
  }

  pub fn fresh_candidate(&self, features: &RegionFeatures, disease: &DiseaseEvidence) -> bool {
    features.quality_score > self.profile.fresh_quality_floor
      && features.ripeness_score >= FRESH_MIN_RIPENESS
      && disease.best_conf < FRESH_MAX_DISEASE_CONF
      && disease.count == 0
      && features.defect_probability < self.profile.fresh_defect_cap
  }

  /// 加权综合品质指数，截断到 [0, 100]
  pub fn quality_index(
    &self,
    features: &RegionFeatures,
    fruit_conf: f64,
    defect_level: RiskLevel,
    disease_best_conf: f64,
  ) -> Result<f64, DecisionError> {
    let ripeness_fit =
      (100.0 - RIPENESS_FALLOFF * (features.ripeness_score - RIPENESS_TARGET).abs()).clamp(0.0, 100.0);
    let defect_term = 100.0 - (4.0 * features.defect_probability).min(100.0);
    let insect_term = 100.0 - features.insect.score;
    let shape_term = features.shape_quality.score() * 10.0;
    let detector_term = (fruit_conf * 100.0).max(DETECTOR_TERM_FLOOR);

    let weighted = 0.34 * features.quality_score
      + 0.20 * ripeness_fit
      + 0.22 * defect_term
      + 0.10 * insect_term
      + 0.08 * shape_term
      + 0.06 * detector_term;

    let mut bonus = match features.size_category {
      SizeCategory::Large => 3.0,
      SizeCategory::Medium => 1.0,
      SizeCategory::Small => -4.0,
    };
    if features.color_score >= 6.5 {
      bonus += 2.0;
    } else if features.color_score <= 2.0 {
      bonus -= 3.0;
    }
    bonus += match defect_level {
      RiskLevel::Low => 0.0,
      RiskLevel::Medium => -5.0,
      RiskLevel::High => -12.0,
    };
    if disease_best_conf >= DISEASE_STRONG_CONF {
      bonus -= 10.0;
    }

    Ok(finite("quality_index", weighted + bonus)?.clamp(0.0, 100.0))
  }

  /// 依次完成病害、品质指数与等级判定；任何数值异常返回错误，由调用方转入无效分支
  pub fn decide(
    &self,
    features: &RegionFeatures,
    fruit_conf: f64,
    disease: &DiseaseEvidence,
  ) -> Result<Decision, DecisionError> {
    finite("quality_score", features.quality_score)?;
    finite("ripeness_score", features.ripeness_score)?;
    finite("defect_probability", features.defect_probability)?;
    finite("insect_score", features.insect.score)?;

    let defect_level = self.defect_level(features.defect_probability);
    let mut disease_status = self.disease_status(features, disease);
    let mut insect_level = features.insect.level;

    let fresh_candidate = self.fresh_candidate(features, disease);
    if fresh_candidate {
      disease_status = RiskLevel::Low;
      if insect_level == RiskLevel::High {
        insect_level = RiskLevel::Medium;
      }
    }

    let quality_index = self.quality_index(features, fruit_conf, defect_level, disease.best_conf)?;
    let resolution = GradeResolution::resolve(&GradeContext {
      quality_index,
      quality_score: features.quality_score,
      defect_level,
      insect_level,
      disease_status,
      disease_best_conf: disease.best_conf,
      fresh_candidate,
      floor_c_quality: self.profile.grade_floor_c_quality,
      floor_b_quality: self.profile.grade_floor_b_quality,
    });

    debug!(
      "判定: 病害 {}, 缺陷 {}, 虫害 {}, 指数 {:.2}, 等级 {} -> {}",
      disease_status, defect_level, insect_level, quality_index, resolution.base, resolution.grade
    );

    Ok(Decision {
      disease_status,
      defect_level,
      insect_level,
      fresh_candidate,
      quality_index,
      resolution,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::features::{
    FruitStatus, FruitVariety, InsectRisk, ShapeQuality, WingCondition,
  };
  use crate::grading::Grade;

  fn features(quality: f64, ripeness: f64, defect: f64) -> RegionFeatures {
    RegionFeatures {
      mean_rgb: [200.0, 80.0, 120.0],
      brightness: 133.0,
      saturation: 120.0,
      redness: 0.5,
      greenness: 0.2,
      ripeness_score: ripeness,
      fruit_status: FruitStatus::Ripe,
      quality_score: quality,
      dark_ratio: defect / 9.0,
      defect_probability: defect,
      fruit_area_ratio: 0.3,
      size_category: SizeCategory::Large,
      weight_grams: 695,
      aspect_ratio: 1.2,
      fill_ratio: 0.8,
      shape_quality: ShapeQuality::PerfectlyOval,
      wing_tip_signal: 20.0,
      wings_condition: WingCondition::RedPinkSoft,
      insect: InsectRisk::default(),
      color_score: 6.5,
      variety: FruitVariety::Pink,
      low_light: false,
      whole_image_fallback: false,
    }
  }

  #[test]
  fn untrusted_path_needs_color_or_detection() {
    let none = DetectionSummary::default();
    assert!(!check_validity(64, 64, &none, 0.05, false).valid);
    assert!(check_validity(64, 64, &none, 0.05, false).warning.is_some());
    assert!(check_validity(64, 64, &none, 0.20, false).valid);
    // 可信路径的颜色门限更宽
    assert!(check_validity(64, 64, &none, 0.10, true).valid);
    assert!(!check_validity(4, 64, &none, 0.9, true).valid);
  }

  #[test]
  fn strong_disease_evidence_is_high_regardless_of_defect() {
    let profile = CalibrationProfile::default();
    let engine = DecisionEngine::new(&profile);
    let disease = DiseaseEvidence {
      best_conf: 0.92,
      count: 2,
      inside_primary: 2,
    };
    for defect in [0.0, 1.0, 50.0] {
      let d = engine.decide(&features(90.0, 90.0, defect), 0.9, &disease).unwrap();
      assert_eq!(d.disease_status, RiskLevel::High);
      assert!(!d.fresh_candidate);
    }
  }

  #[test]
  fn fresh_candidate_clears_heuristic_alarms() {
    let profile = CalibrationProfile::default();
    let engine = DecisionEngine::new(&profile);
    let mut f = features(90.0, 90.0, 1.0);
    f.insect = InsectRisk {
      score: 70.0,
      level: RiskLevel::High,
      blob_count: 9,
      dark_ratio: 0.5,
    };
    let d = engine.decide(&f, 0.0, &DiseaseEvidence::default()).unwrap();
    assert!(d.fresh_candidate);
    assert_eq!(d.disease_status, RiskLevel::Low);
    assert_eq!(d.insect_level, RiskLevel::Medium);
    assert!(d.resolution.grade.rank() >= Grade::B.rank());
  }

  #[test]
  fn low_light_tier_needs_insect_and_high_gate() {
    let profile = CalibrationProfile::default();
    let engine = DecisionEngine::new(&profile);
    let mut f = features(60.0, 70.0, 10.0);
    f.low_light = true;
    f.insect.score = 60.0;
    assert_eq!(engine.disease_status(&f, &DiseaseEvidence::default()), RiskLevel::High);
    f.insect.score = 40.0;
    assert_eq!(engine.disease_status(&f, &DiseaseEvidence::default()), RiskLevel::Medium);
  }

  #[test]
  fn quality_index_is_bounded_and_non_finite_fails() {
    let profile = CalibrationProfile::default();
    let engine = DecisionEngine::new(&profile);
    for (q, r, d) in [(0.0, 10.0, 90.0), (98.0, 88.0, 0.0), (50.0, 99.0, 45.0)] {
      let f = features(q, r, d);
      let qi = engine
        .quality_index(&f, 1.0, engine.defect_level(d), 0.0)
        .unwrap();
      assert!((0.0..=100.0).contains(&qi));
    }
    let f = features(f64::NAN, 80.0, 1.0);
    assert!(matches!(
      engine.decide(&f, 0.5, &DiseaseEvidence::default()),
      Err(DecisionError::NonFinite { stage: "quality_score", .. })
    ));
  }

  #[test]
  fn evidence_counts_centers_inside_box() {
    let det = |x: f32, conf: f32| Detection {
      x0: x,
      y0: 10.0,
      x1: x + 10.0,
      y1: 20.0,
      confidence: conf,
      class_id: 0,
      class_name: None,
    };
    let bbox = BoundingBox { x0: 0, y0: 0, x1: 50, y1: 50 };
    let e = DiseaseEvidence::from_detections(&[det(5.0, 0.8), det(80.0, 0.9)], &bbox);
    assert_eq!(e.count, 2);
    assert_eq!(e.inside_primary, 1);
    assert!((e.best_conf - 0.9).abs() < 1e-6);
  }
}
