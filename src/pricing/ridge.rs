// 该文件是 Huolong （火龙） 项目的一部分。
// src/pricing/ridge.rs - 岭回归拟合
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

use nalgebra::{DMatrix, DVector};

use super::PricingError;
use crate::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingRow {
  pub features: FeatureVector,
  pub price_per_kg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
  pub coef: Vec<f64>,
  /// 训练集平均绝对误差
  pub mae: f64,
}

/// 解 `(XᵀX + λI′) β = Xᵀy`，`I′` 的截距位置为 0
pub fn fit_ridge(rows: &[TrainingRow], lambda: f64) -> Result<RidgeFit, PricingError> {
  let p = FeatureVector::NAMES.len();
  let n = rows.len();
  if n == 0 {
    return Err(PricingError::Singular);
  }

  let design: Vec<[f64; 8]> = rows.iter().map(|r| r.features.design_row()).collect();
  let x = DMatrix::from_fn(n, p, |i, j| design[i][j]);
  let y = DVector::from_iterator(n, rows.iter().map(|r| r.price_per_kg));

  let xt = x.transpose();
  let mut normal = &xt * &x;
  for j in 1..p {
    normal[(j, j)] += lambda;
  }
  let rhs = &xt * &y;

  let beta = normal.lu().solve(&rhs).ok_or(PricingError::Singular)?;
  if beta.iter().any(|b| !b.is_finite()) {
    return Err(PricingError::Singular);
  }

  let residuals = &x * &beta - &y;
  let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n as f64;

  Ok(RidgeFit {
    coef: beta.iter().copied().collect(),
    mae,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn synthetic_rows(n: usize, coef: &[f64; 8]) -> Vec<TrainingRow> {
    (0..n)
      .map(|i| {
        let features = FeatureVector {
          quality_score: 60.0 + ((i * 7) % 37) as f64,
          ripeness_score: 50.0 + ((i * 11) % 45) as f64,
          defect_probability: ((i * 3) % 13) as f64,
          fruit_area_ratio: 0.05 + ((i * 5) % 17) as f64 / 40.0,
          color_score: ((i * 13) % 10) as f64,
          grade_ordinal: (i % 4) as f64,
          size_ordinal: (1 + (i * 7) % 3) as f64,
        };
        let row = features.design_row();
        let price = coef.iter().zip(row).map(|(c, x)| c * x).sum();
        TrainingRow {
          features,
          price_per_kg: price,
        }
      })
      .collect()
  }

  #[test]
  fn recovers_exact_linear_relation() {
    let truth = [150.0, 0.8, 0.2, -4.0, 90.0, 6.0, 10.0, 5.0];
    let rows = synthetic_rows(40, &truth);
    let fit = fit_ridge(&rows, 1e-9).unwrap();
    assert!(fit.mae < 1e-5, "mae = {}", fit.mae);
    for (got, want) in fit.coef.iter().zip(truth) {
      assert!((got - want).abs() < 1e-4, "{got} vs {want}");
    }
  }

  #[test]
  fn penalty_shrinks_but_stays_finite() {
    let truth = [150.0, 0.8, 0.2, -4.0, 90.0, 6.0, 10.0, 5.0];
    let rows = synthetic_rows(12, &truth);
    let fit = fit_ridge(&rows, 50.0).unwrap();
    assert_eq!(fit.coef.len(), 8);
    assert!(fit.coef.iter().all(|c| c.is_finite()));
    assert!(fit.mae > 0.0);
  }

  #[test]
  fn empty_rows_are_rejected() {
    assert!(matches!(fit_ridge(&[], 1.0), Err(PricingError::Singular)));
  }
}
