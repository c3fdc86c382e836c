// 该文件是 Huolong （火龙） 项目的一部分。
// src/features/insect.rs - 虫害风险估计
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

use super::RiskLevel;
use crate::segment::SegmentationMask;
use crate::utils::percentile;

const EXTREME_DARK_FLOOR: f64 = 20.0;
const EXTREME_DARK_OFFSET: f64 = 30.0;
const EXTREME_DARK_PERCENTILE: f64 = 5.0;
/// 虫眼斑点的像素面积范围
const BLOB_MIN_AREA: usize = 3;
const BLOB_MAX_AREA: usize = 80;
const LEVEL_MEDIUM: f64 = 25.0;
const LEVEL_HIGH: f64 = 55.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsectRisk {
  /// [0, 100]
  pub score: f64,
  pub level: RiskLevel,
  pub blob_count: usize,
  /// 极暗像素占比（百分数）
  pub dark_ratio: f64,
}

impl Default for InsectRisk {
  fn default() -> Self {
    InsectRisk {
      score: 0.0,
      level: RiskLevel::Low,
      blob_count: 0,
      dark_ratio: 0.0,
    }
  }
}

impl InsectRisk {
  /// `gray` 为逐像素灰度（行优先），`roi` 为参与统计的区域
  pub fn assess(gray: &[f64], roi: &SegmentationMask) -> Self {
    let roi_values: Vec<f64> = gray
      .iter()
      .zip(roi.as_slice())
      .filter(|(_, m)| **m)
      .map(|(g, _)| *g)
      .collect();
    let Some(p5) = percentile(&roi_values, EXTREME_DARK_PERCENTILE) else {
      return InsectRisk::default();
    };
    let threshold = EXTREME_DARK_FLOOR.max(p5 - EXTREME_DARK_OFFSET);

    let (width, height) = roi.dimensions();
    let dark = SegmentationMask::from_fn(width, height, |x, y| {
      let idx = y as usize * width as usize + x as usize;
      roi.get(x, y) && gray[idx] < threshold
    });

    let roi_pixels = roi_values.len() as f64;
    let dark_ratio = dark.count() as f64 / roi_pixels * 100.0;
    let blob_count = dark
      .component_sizes()
      .into_iter()
      .filter(|size| (BLOB_MIN_AREA..=BLOB_MAX_AREA).contains(size))
      .count();
    // 每万像素斑点数
    let density = blob_count as f64 * 10_000.0 / roi_pixels;

    let score = (0.6 * (density * 5.0).min(100.0) + 0.4 * (dark_ratio * 10.0).min(100.0))
      .clamp(0.0, 100.0);

    InsectRisk {
      score,
      level: RiskLevel::from_cuts(score, LEVEL_MEDIUM, LEVEL_HIGH),
      blob_count,
      dark_ratio,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gray_field(width: u32, height: u32, dots: &[(u32, u32)]) -> Vec<f64> {
    let mut gray = vec![150.0; (width * height) as usize];
    for &(cx, cy) in dots {
      for y in cy..cy + 3 {
        for x in cx..cx + 3 {
          gray[(y * width + x) as usize] = 10.0;
        }
      }
    }
    gray
  }

  #[test]
  fn clean_surface_is_low_risk() {
    let roi = SegmentationMask::from_fn(40, 40, |_, _| true);
    let risk = InsectRisk::assess(&gray_field(40, 40, &[]), &roi);
    assert_eq!(risk.blob_count, 0);
    assert_eq!(risk.level, RiskLevel::Low);
  }

  #[test]
  fn scattered_dots_raise_risk() {
    let dots: Vec<(u32, u32)> = (0..12).map(|i| (2 + (i % 4) * 9, 2 + (i / 4) * 12)).collect();
    let roi = SegmentationMask::from_fn(40, 40, |_, _| true);
    let risk = InsectRisk::assess(&gray_field(40, 40, &dots), &roi);
    assert_eq!(risk.blob_count, 12);
    assert_eq!(risk.level, RiskLevel::High);
    assert!(risk.score <= 100.0);
  }

  #[test]
  fn pixels_outside_roi_are_ignored() {
    let dots: Vec<(u32, u32)> = (0..6).map(|i| (2 + i * 6, 30)).collect();
    let roi = SegmentationMask::from_fn(40, 40, |_, y| y < 20);
    let risk = InsectRisk::assess(&gray_field(40, 40, &dots), &roi);
    assert_eq!(risk.blob_count, 0);
  }

  #[test]
  fn empty_roi_is_default() {
    let roi = SegmentationMask::new(10, 10);
    assert_eq!(InsectRisk::assess(&vec![0.0; 100], &roi), InsectRisk::default());
  }
}
