// 该文件是 Huolong （火龙） 项目的一部分。
// src/pricing/baseline.rs - 价格区间与启发式基准价
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

use crate::features::RiskLevel;
use crate::grading::Grade;

/// 零售价（每公斤），好果区间与坏果下限
pub const RETAIL_GOOD_MIN: f64 = 136.17;
pub const RETAIL_GOOD_MAX: f64 = 245.11;
pub const RETAIL_BAD_MIN: f64 = 40.0;

const RIPENESS_TARGET: f64 = 88.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBounds {
  pub lo: f64,
  pub hi: f64,
}

impl PriceBounds {
  pub const ZERO: PriceBounds = PriceBounds { lo: 0.0, hi: 0.0 };

  /// 按等级查表，再按缺陷与虫害等级收窄；无效果实为 (0, 0)
  pub fn per_kg(grade: Grade, defect: RiskLevel, valid: bool, insect: RiskLevel) -> Self {
    if !valid {
      return Self::ZERO;
    }
    let (mut lo, mut hi) = match grade {
      Grade::A => (RETAIL_GOOD_MIN * 0.95, RETAIL_GOOD_MAX),
      Grade::B => (RETAIL_GOOD_MIN * 0.80, RETAIL_GOOD_MAX * 0.93),
      _ => (RETAIL_GOOD_MIN * 0.45, RETAIL_GOOD_MIN * 0.90),
    };
    let (dl, dh) = match defect {
      RiskLevel::High => (0.85, 0.80),
      RiskLevel::Medium => (0.95, 0.92),
      RiskLevel::Low => (1.0, 1.0),
    };
    let (il, ih) = match insect {
      RiskLevel::High => (0.90, 0.85),
      RiskLevel::Medium => (0.97, 0.95),
      RiskLevel::Low => (1.0, 1.0),
    };
    lo *= dl * il;
    hi *= dh * ih;
    let lo = lo.max(RETAIL_BAD_MIN);
    PriceBounds { lo, hi: hi.max(lo) }
  }

  pub fn midpoint(&self) -> f64 {
    (self.lo + self.hi) / 2.0
  }

  pub fn clamp(&self, price: f64) -> f64 {
    if price.is_finite() {
      price.clamp(self.lo, self.hi)
    } else {
      self.lo
    }
  }

  pub fn contains(&self, price: f64) -> bool {
    price >= self.lo && price <= self.hi
  }
}

/// 基准价的输入，分数均为原始量纲
#[derive(Debug, Clone, Copy)]
pub struct BaselineInputs {
  pub quality_score: f64,
  pub ripeness_score: f64,
  pub defect_probability: f64,
  pub insect_score: f64,
}

fn unit(value: f64) -> f64 {
  if value.is_finite() { (value / 100.0).clamp(0.0, 1.0) } else { 0.0 }
}

/// 区间中点乘以品质、成熟度、缺陷与虫害因子，再截断回区间
pub fn baseline_price_per_kg(bounds: &PriceBounds, inputs: &BaselineInputs) -> f64 {
  let q = unit(inputs.quality_score);
  let d = unit(inputs.defect_probability);
  let i = unit(inputs.insect_score);
  let ripeness_factor = if inputs.ripeness_score.is_finite() {
    (1.0 - 0.004 * (inputs.ripeness_score - RIPENESS_TARGET).abs()).clamp(0.8, 1.0)
  } else {
    0.8
  };
  let price = bounds.midpoint()
    * (0.85 + 0.30 * q)
    * ripeness_factor
    * (1.0 - 0.35 * d)
    * (1.0 - 0.20 * i);
  bounds.clamp(price)
}

/// 训练样本越多，模型价格权重越大
pub fn blend_weight(n_samples: usize) -> f64 {
  match n_samples {
    0..5 => 0.0,
    5..20 => 0.25,
    20..50 => 0.45,
    _ => 0.70,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const LEVELS: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

  #[test]
  fn bounds_are_ordered_and_floored() {
    for grade in [Grade::A, Grade::B, Grade::C, Grade::D, Grade::E] {
      for defect in LEVELS {
        for insect in LEVELS {
          let b = PriceBounds::per_kg(grade, defect, true, insect);
          assert!(b.lo >= RETAIL_BAD_MIN);
          assert!(b.hi >= b.lo);
        }
      }
    }
    assert_eq!(PriceBounds::per_kg(Grade::A, RiskLevel::Low, false, RiskLevel::Low), PriceBounds::ZERO);
  }

  #[test]
  fn grade_a_clean_bounds() {
    let b = PriceBounds::per_kg(Grade::A, RiskLevel::Low, true, RiskLevel::Low);
    assert!((b.lo - 129.3615).abs() < 1e-9);
    assert_eq!(b.hi, RETAIL_GOOD_MAX);
  }

  #[test]
  fn baseline_stays_in_bounds() {
    for defect in LEVELS {
      let bounds = PriceBounds::per_kg(Grade::B, defect, true, RiskLevel::Medium);
      for (q, r, d, i) in [(0.0, 0.0, 90.0, 100.0), (98.0, 88.0, 0.0, 0.0), (f64::NAN, 50.0, 5.0, 5.0)] {
        let price = baseline_price_per_kg(
          &bounds,
          &BaselineInputs {
            quality_score: q,
            ripeness_score: r,
            defect_probability: d,
            insect_score: i,
          },
        );
        assert!(bounds.contains(price), "{price} outside {bounds:?}");
      }
    }
  }

  #[test]
  fn blend_weight_steps() {
    assert_eq!(blend_weight(0), 0.0);
    assert_eq!(blend_weight(4), 0.0);
    assert_eq!(blend_weight(5), 0.25);
    assert_eq!(blend_weight(20), 0.45);
    assert_eq!(blend_weight(50), 0.70);
  }
}
