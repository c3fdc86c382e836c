// 该文件是 Huolong （火龙） 项目的一部分。
// src/calibration.rs - 自适应阈值校准
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

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::features::FeatureVector;
use crate::utils::percentile;

/// 少于该样本数时只使用默认阈值
pub const MIN_CALIBRATION_SAMPLES: usize = 12;

/// 阈值的安全区间与默认值
#[derive(Debug, Clone, Copy)]
pub struct Band {
  pub lo: f64,
  pub hi: f64,
  pub default: f64,
}

impl Band {
  const fn new(lo: f64, hi: f64, default: f64) -> Self {
    Band { lo, hi, default }
  }

  pub fn clamp(&self, value: f64) -> f64 {
    if value.is_finite() {
      value.clamp(self.lo, self.hi)
    } else {
      self.default
    }
  }
}

pub const DEFECT_MEDIUM_GATE: Band = Band::new(2.0, 12.0, 3.0);
pub const DEFECT_HIGH_GATE: Band = Band::new(5.0, 25.0, 7.0);
pub const FRESH_QUALITY_FLOOR: Band = Band::new(70.0, 92.0, 80.0);
pub const FRESH_DEFECT_CAP: Band = Band::new(1.5, 8.0, 3.0);
pub const GRADE_FLOOR_C_QUALITY: Band = Band::new(50.0, 75.0, 60.0);
pub const GRADE_FLOOR_B_QUALITY: Band = Band::new(70.0, 90.0, 78.0);

/// 由历史特征百分位数得出的判定阈值；只会整体替换，不会原地修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
  pub defect_medium_gate: f64,
  pub defect_high_gate: f64,
  pub fresh_quality_floor: f64,
  pub fresh_defect_cap: f64,
  pub grade_floor_c_quality: f64,
  pub grade_floor_b_quality: f64,
  pub sample_count: usize,
  pub computed_at: Option<DateTime<Utc>>,
}

impl Default for CalibrationProfile {
  fn default() -> Self {
    CalibrationProfile {
      defect_medium_gate: DEFECT_MEDIUM_GATE.default,
      defect_high_gate: DEFECT_HIGH_GATE.default,
      fresh_quality_floor: FRESH_QUALITY_FLOOR.default,
      fresh_defect_cap: FRESH_DEFECT_CAP.default,
      grade_floor_c_quality: GRADE_FLOOR_C_QUALITY.default,
      grade_floor_b_quality: GRADE_FLOOR_B_QUALITY.default,
      sample_count: 0,
      computed_at: None,
    }
  }
}

impl CalibrationProfile {
  pub fn is_default(&self) -> bool {
    self.computed_at.is_none()
  }

  /// 阈值名到数值的映射
  pub fn thresholds(&self) -> BTreeMap<&'static str, f64> {
    BTreeMap::from([
      ("defect_medium_gate", self.defect_medium_gate),
      ("defect_high_gate", self.defect_high_gate),
      ("fresh_quality_floor", self.fresh_quality_floor),
      ("fresh_defect_cap", self.fresh_defect_cap),
      ("grade_floor_c_quality", self.grade_floor_c_quality),
      ("grade_floor_b_quality", self.grade_floor_b_quality),
    ])
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationSkip {
  InsufficientData { have: usize, need: usize },
  Degenerate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
  Updated(CalibrationProfile),
  NoUpdate(CalibrationSkip),
}

impl CalibrationOutcome {
  /// 无更新时退回默认阈值
  pub fn into_profile(self) -> CalibrationProfile {
    match self {
      CalibrationOutcome::Updated(profile) => profile,
      CalibrationOutcome::NoUpdate(_) => CalibrationProfile::default(),
    }
  }
}

/// 由有效扫描（已排除无效/拒收）的特征计算阈值
pub fn calibrate<'a>(samples: impl IntoIterator<Item = &'a FeatureVector>) -> CalibrationOutcome {
  let (defects, qualities): (Vec<f64>, Vec<f64>) = samples
    .into_iter()
    .filter(|f| f.defect_probability.is_finite() && f.quality_score.is_finite())
    .map(|f| (f.defect_probability, f.quality_score))
    .unzip();

  if defects.len() < MIN_CALIBRATION_SAMPLES {
    debug!(
      "校准样本不足: {} < {}，沿用默认阈值",
      defects.len(),
      MIN_CALIBRATION_SAMPLES
    );
    return CalibrationOutcome::NoUpdate(CalibrationSkip::InsufficientData {
      have: defects.len(),
      need: MIN_CALIBRATION_SAMPLES,
    });
  }

  let stats = (
    percentile(&defects, 75.0),
    percentile(&defects, 90.0),
    percentile(&qualities, 25.0),
    percentile(&qualities, 50.0),
  );
  let (Some(d75), Some(d90), Some(q25), Some(q50)) = stats else {
    warn!("校准百分位计算失败，沿用默认阈值");
    return CalibrationOutcome::NoUpdate(CalibrationSkip::Degenerate);
  };

  let defect_medium_gate = DEFECT_MEDIUM_GATE.clamp(d75 + 1.0);
  let defect_high_gate = DEFECT_HIGH_GATE.clamp((d90 + 2.0).max(defect_medium_gate + 1.0));
  let profile = CalibrationProfile {
    defect_medium_gate,
    defect_high_gate,
    fresh_quality_floor: FRESH_QUALITY_FLOOR.clamp(q50 - 2.0),
    fresh_defect_cap: FRESH_DEFECT_CAP.clamp(d75),
    grade_floor_c_quality: GRADE_FLOOR_C_QUALITY.clamp(q25 - 5.0),
    grade_floor_b_quality: GRADE_FLOOR_B_QUALITY.clamp(q50),
    sample_count: defects.len(),
    computed_at: Some(Utc::now()),
  };

  info!(
    "校准完成: 样本 {}, 阈值 {:?}",
    profile.sample_count,
    profile.thresholds()
  );
  CalibrationOutcome::Updated(profile)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(defect: f64, quality: f64) -> FeatureVector {
    FeatureVector {
      defect_probability: defect,
      quality_score: quality,
      ..Default::default()
    }
  }

  fn assert_in_bands(p: &CalibrationProfile) {
    for (value, band) in [
      (p.defect_medium_gate, DEFECT_MEDIUM_GATE),
      (p.defect_high_gate, DEFECT_HIGH_GATE),
      (p.fresh_quality_floor, FRESH_QUALITY_FLOOR),
      (p.fresh_defect_cap, FRESH_DEFECT_CAP),
      (p.grade_floor_c_quality, GRADE_FLOOR_C_QUALITY),
      (p.grade_floor_b_quality, GRADE_FLOOR_B_QUALITY),
    ] {
      assert!(value >= band.lo && value <= band.hi, "{value} not in [{}, {}]", band.lo, band.hi);
    }
  }

  #[test]
  fn too_few_samples_keeps_defaults() {
    let samples: Vec<_> = (0..11).map(|i| sample(i as f64, 80.0)).collect();
    let outcome = calibrate(&samples);
    assert_eq!(
      outcome,
      CalibrationOutcome::NoUpdate(CalibrationSkip::InsufficientData { have: 11, need: 12 })
    );
    assert_eq!(outcome.into_profile(), CalibrationProfile::default());
  }

  #[test]
  fn degenerate_distributions_stay_in_bands() {
    for (defect, quality) in [(0.0, 0.0), (90.0, 100.0), (0.0, 100.0), (90.0, 0.0)] {
      let samples: Vec<_> = (0..20).map(|_| sample(defect, quality)).collect();
      let CalibrationOutcome::Updated(profile) = calibrate(&samples) else {
        panic!("expected update");
      };
      assert_in_bands(&profile);
      assert!(profile.defect_high_gate > profile.defect_medium_gate);
    }
  }

  #[test]
  fn tracks_distribution_within_bands() {
    let samples: Vec<_> = (0..40)
      .map(|i| sample(i as f64 * 0.2, 70.0 + i as f64 * 0.5))
      .collect();
    let CalibrationOutcome::Updated(profile) = calibrate(&samples) else {
      panic!("expected update");
    };
    assert_in_bands(&profile);
    assert_eq!(profile.sample_count, 40);
    // p75 of defect = 5.85
    assert!((profile.defect_medium_gate - 6.85).abs() < 1e-9);
    assert!(!profile.is_default());
  }

  #[test]
  fn non_finite_rows_are_dropped() {
    let mut samples: Vec<_> = (0..11).map(|_| sample(1.0, 80.0)).collect();
    samples.push(sample(f64::NAN, 80.0));
    assert!(matches!(
      calibrate(&samples),
      CalibrationOutcome::NoUpdate(CalibrationSkip::InsufficientData { have: 11, .. })
    ));
  }
}
