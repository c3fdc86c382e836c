// 该文件是 Huolong （火龙） 项目的一部分。
// src/features/extractor.rs - 掩码区域特征提取
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

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
  FruitStatus, FruitVariety, InsectRisk, ShapeQuality, SizeCategory, WingCondition,
};
use crate::segment::{FusedMask, SegmentationMask};
use crate::utils::percentile;

// 缺陷暗点自适应阈值
const DEFECT_DARK_FLOOR: f64 = 35.0;
const DEFECT_DARK_OFFSET: f64 = 18.0;
const DEFECT_SCALE: f64 = 9.0;
const DEFECT_CEILING: f64 = 90.0;
/// 没有病害检测证据时的缺陷上限
const HEURISTIC_DEFECT_CEILING: f64 = 45.0;

// 估重（克）
const WEIGHT_BASE: f64 = 200.0;
const WEIGHT_PER_AREA: f64 = 1650.0;
const WEIGHT_MIN: f64 = 180.0;
const WEIGHT_MAX: f64 = 900.0;

/// 果翼尖端取包围框上部的比例
const WING_TIP_FRACTION: f64 = 0.30;
const LOW_LIGHT_BRIGHTNESS: f64 = 70.0;

/// 从融合掩码区域提取的全部特征
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFeatures {
  pub mean_rgb: [f64; 3],
  pub brightness: f64,
  pub saturation: f64,
  pub redness: f64,
  pub greenness: f64,
  pub ripeness_score: f64,
  pub fruit_status: FruitStatus,
  pub quality_score: f64,
  pub dark_ratio: f64,
  pub defect_probability: f64,
  pub fruit_area_ratio: f64,
  pub size_category: SizeCategory,
  pub weight_grams: u32,
  pub aspect_ratio: f64,
  pub fill_ratio: f64,
  pub shape_quality: ShapeQuality,
  pub wing_tip_signal: f64,
  pub wings_condition: WingCondition,
  pub insect: InsectRisk,
  pub color_score: f64,
  pub variety: FruitVariety,
  pub low_light: bool,
  /// 掩码为空，改用整幅图像统计
  pub whole_image_fallback: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
  heuristic_defect_ceiling: f64,
}

impl Default for FeatureExtractor {
  fn default() -> Self {
    FeatureExtractor {
      heuristic_defect_ceiling: HEURISTIC_DEFECT_CEILING,
    }
  }
}

fn mean_color(image: &RgbImage, pixels: impl Iterator<Item = (u32, u32)>) -> Option<[f64; 3]> {
  let mut sum = [0.0f64; 3];
  let mut n = 0usize;
  for (x, y) in pixels {
    let p = image.get_pixel(x, y);
    sum[0] += p[0] as f64;
    sum[1] += p[1] as f64;
    sum[2] += p[2] as f64;
    n += 1;
  }
  if n == 0 {
    return None;
  }
  let n = n as f64;
  Some([sum[0] / n, sum[1] / n, sum[2] / n])
}

/// 红、绿通道在总强度中的占比
fn red_green_ratios(rgb: [f64; 3]) -> (f64, f64) {
  let total = rgb[0] + rgb[1] + rgb[2] + 0.1;
  (rgb[0] / total, rgb[1] / total)
}

/// 青果与熟果采用不同线性公式，交界处存在跳变
fn ripeness(redness: f64, greenness: f64) -> (f64, FruitStatus) {
  if greenness > redness {
    ((50.0 - greenness * 100.0).max(10.0), FruitStatus::Unripe)
  } else {
    ((60.0 + redness * 100.0).min(99.0), FruitStatus::Ripe)
  }
}

fn shape_of(aspect: f64, fill: f64) -> ShapeQuality {
  if aspect <= 1.45 && fill >= 0.60 {
    ShapeQuality::PerfectlyOval
  } else if aspect <= 1.8 && fill >= 0.45 {
    ShapeQuality::SlightlyIrregular
  } else {
    ShapeQuality::Irregular
  }
}

fn variety_of(rgb: [f64; 3], brightness: f64, saturation: f64) -> FruitVariety {
  let [r, g, b] = rgb;
  if r > 110.0 && g > 110.0 && b < 120.0 && (r - g).abs() < 70.0 {
    FruitVariety::Yellow
  } else if brightness > 175.0 && saturation < 55.0 {
    FruitVariety::White
  } else {
    FruitVariety::Pink
  }
}

impl FeatureExtractor {
  pub fn with_heuristic_defect_ceiling(mut self, ceiling: f64) -> Self {
    self.heuristic_defect_ceiling = ceiling;
    self
  }

  /// 所有子分数只依赖像素、掩码与是否存在病害检测证据
  pub fn extract(&self, image: &RgbImage, fused: &FusedMask, disease_evidence: bool) -> RegionFeatures {
    let (width, height) = image.dimensions();
    let total_pixels = (width as usize * height as usize).max(1);

    let whole_image_fallback = fused.mask.is_empty();
    let roi = if whole_image_fallback {
      warn!("融合掩码为空，使用整幅图像统计");
      SegmentationMask::from_fn(width, height, |_, _| true)
    } else {
      fused.mask.clone()
    };

    let mean_rgb = mean_color(image, roi.selected()).unwrap_or([0.0; 3]);
    let (redness, greenness) = red_green_ratios(mean_rgb);
    let (ripeness_score, fruit_status) = ripeness(redness, greenness);

    let brightness = (mean_rgb[0] + mean_rgb[1] + mean_rgb[2]) / 3.0;
    let saturation = mean_rgb.iter().copied().fold(f64::MIN, f64::max)
      - mean_rgb.iter().copied().fold(f64::MAX, f64::min);
    let quality_score = (brightness / 255.0 * 100.0 + 40.0).min(98.0);

    // 缺陷：区域内低于自适应阈值的暗像素比例
    let gray: Vec<f64> = image
      .pixels()
      .map(|p| (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0)
      .collect();
    let roi_gray: Vec<f64> = gray
      .iter()
      .zip(roi.as_slice())
      .filter(|(_, m)| **m)
      .map(|(g, _)| *g)
      .collect();
    let dark_ratio = match percentile(&roi_gray, 10.0) {
      Some(p10) => {
        let threshold = DEFECT_DARK_FLOOR.max(p10 - DEFECT_DARK_OFFSET);
        let dark = roi_gray.iter().filter(|g| **g < threshold).count();
        dark as f64 / roi_gray.len().max(1) as f64 * 100.0
      }
      None => 0.0,
    };
    let mut defect_probability = (dark_ratio * DEFECT_SCALE).min(DEFECT_CEILING);
    if !disease_evidence {
      defect_probability = defect_probability.min(self.heuristic_defect_ceiling);
    }

    let fruit_area_ratio = if whole_image_fallback {
      0.0
    } else {
      fused.mask.count() as f64 / total_pixels as f64
    };
    let size_category = SizeCategory::from_area_ratio(fruit_area_ratio);
    let weight_grams = (WEIGHT_BASE + WEIGHT_PER_AREA * fruit_area_ratio)
      .clamp(WEIGHT_MIN, WEIGHT_MAX)
      .round() as u32;

    let aspect_ratio = fused.bbox.aspect_ratio();
    let fill_ratio = if whole_image_fallback {
      1.0
    } else {
      fused.mask.count() as f64 / fused.bbox.area().max(1) as f64
    };
    let shape_quality = shape_of(aspect_ratio, fill_ratio);

    // 果翼尖端最先转色，只看包围框上部
    let tip_rows = ((fused.bbox.height() as f64 * WING_TIP_FRACTION).ceil() as u32).max(1);
    let tip_end = fused.bbox.y0 + tip_rows;
    let tip_rgb = mean_color(image, roi.selected().filter(|(_, y)| *y < tip_end)).unwrap_or(mean_rgb);
    let (tip_red, tip_green) = red_green_ratios(tip_rgb);
    let wing_tip_signal = ((tip_red - tip_green) * 100.0).clamp(-100.0, 100.0);

    let insect = InsectRisk::assess(&gray, &roi);
    let color_score = ((redness - greenness) * 10.0 + 3.5).clamp(0.0, 10.0);

    let features = RegionFeatures {
      mean_rgb,
      brightness,
      saturation,
      redness,
      greenness,
      ripeness_score,
      fruit_status,
      quality_score,
      dark_ratio,
      defect_probability,
      fruit_area_ratio,
      size_category,
      weight_grams,
      aspect_ratio,
      fill_ratio,
      shape_quality,
      wing_tip_signal,
      wings_condition: WingCondition::from_signal(wing_tip_signal),
      insect,
      color_score,
      variety: variety_of(mean_rgb, brightness, saturation),
      low_light: brightness < LOW_LIGHT_BRIGHTNESS,
      whole_image_fallback,
    };
    debug!(
      "特征: 成熟度 {:.1}, 品质 {:.1}, 缺陷 {:.2}, 面积比 {:.4}, 虫害 {:.1}",
      features.ripeness_score,
      features.quality_score,
      features.defect_probability,
      features.fruit_area_ratio,
      features.insect.score
    );
    features
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::BoundingBox;
  use crate::segment::{ColorCues, MaskFuser};
  use image::Rgb;

  fn fuse(image: &RgbImage) -> FusedMask {
    MaskFuser.fuse(&ColorCues::from_image(image), None, None)
  }

  #[test]
  fn green_bright_fruit_is_unripe_and_clean() {
    let image = RgbImage::from_pixel(48, 48, Rgb([90, 200, 90]));
    let features = FeatureExtractor::default().extract(&image, &fuse(&image), false);
    assert!(features.ripeness_score < 50.0);
    assert_eq!(features.fruit_status, FruitStatus::Unripe);
    assert_eq!(features.defect_probability, 0.0);
    assert_eq!(features.size_category, SizeCategory::Large);
  }

  #[test]
  fn red_fruit_is_ripe() {
    let image = RgbImage::from_pixel(32, 32, Rgb([220, 50, 110]));
    let features = FeatureExtractor::default().extract(&image, &fuse(&image), false);
    assert_eq!(features.fruit_status, FruitStatus::Ripe);
    assert!(features.ripeness_score > 75.0 && features.ripeness_score <= 99.0);
    assert_eq!(features.wings_condition, WingCondition::RedPinkSoft);
  }

  #[test]
  fn empty_mask_uses_whole_image() {
    let image = RgbImage::from_pixel(20, 20, Rgb([5, 5, 5]));
    let fused = fuse(&image);
    let features = FeatureExtractor::default().extract(&image, &fused, false);
    assert!(features.whole_image_fallback);
    assert_eq!(features.fruit_area_ratio, 0.0);
    assert!(features.low_light);
    assert!(features.quality_score.is_finite());
  }

  #[test]
  fn heuristic_defect_is_capped_without_evidence() {
    // 一半像素为暗斑，强制缺陷率饱和
    let image = RgbImage::from_fn(40, 40, |x, _| {
      if x % 2 == 0 { Rgb([210, 60, 120]) } else { Rgb([20, 5, 10]) }
    });
    let bbox = BoundingBox::full(40, 40);
    let fused = MaskFuser.fuse(&ColorCues::from_image(&image), Some(&bbox), None);
    let fused = FusedMask {
      mask: SegmentationMask::from_rect(&bbox, 40, 40),
      ..fused
    };
    let extractor = FeatureExtractor::default();
    assert_eq!(extractor.extract(&image, &fused, false).defect_probability, 45.0);
    assert_eq!(extractor.extract(&image, &fused, true).defect_probability, 90.0);
  }

  #[test]
  fn wing_tip_reads_upper_band() {
    // 上部偏红，下部偏绿
    let image = RgbImage::from_fn(30, 30, |_, y| {
      if y < 9 { Rgb([210, 60, 110]) } else { Rgb([70, 190, 80]) }
    });
    let fused = fuse(&image);
    let features = FeatureExtractor::default().extract(&image, &fused, false);
    assert!(features.wing_tip_signal > 10.0);
    assert_eq!(features.fruit_status, FruitStatus::Unripe);
  }
}
