// 该文件是 Huolong （火龙） 项目的一部分。
// src/utils.rs - 数值工具
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

/// 线性插值百分位数（与常见数值库的默认插值方式一致）
///
/// 空输入返回 `None`，调用方需自行决定回退值。
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
  if sorted.is_empty() {
    return None;
  }
  sorted.sort_by(|a, b| a.total_cmp(b));

  let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
  let lo = rank.floor() as usize;
  let hi = rank.ceil() as usize;
  let frac = rank - lo as f64;
  Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// 限幅，非有限值落到下界
pub fn clamp_finite(value: f64, lo: f64, hi: f64) -> f64 {
  if !value.is_finite() {
    return lo;
  }
  value.clamp(lo, hi)
}

pub fn round_to(value: f64, digits: i32) -> f64 {
  let scale = 10f64.powi(digits);
  (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn percentile_interpolates_between_ranks() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(percentile(&values, 50.0), Some(3.0));
    assert_eq!(percentile(&values, 0.0), Some(1.0));
    assert_eq!(percentile(&values, 100.0), Some(5.0));
    let p10 = percentile(&values, 10.0).unwrap();
    assert!((p10 - 1.4).abs() < 1e-12);
  }

  #[test]
  fn percentile_of_empty_is_none() {
    assert_eq!(percentile(&[], 50.0), None);
    assert_eq!(percentile(&[f64::NAN], 50.0), None);
  }

  #[test]
  fn clamp_finite_rejects_nan() {
    assert_eq!(clamp_finite(f64::NAN, 2.0, 5.0), 2.0);
    assert_eq!(clamp_finite(9.0, 2.0, 5.0), 5.0);
    assert_eq!(round_to(1.23456, 2), 1.23);
  }
}
