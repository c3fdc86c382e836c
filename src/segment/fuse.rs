// 该文件是 Huolong （火龙） 项目的一部分。
// src/segment/fuse.rs - 检测框与颜色掩码融合
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
use tracing::{debug, warn};

use super::{ColorCues, SegmentationMask, denoise};
use crate::detection::BoundingBox;

/// 最终掩码的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskSource {
  /// 主检测框与颜色掩码的交集
  DetectorBox,
  /// 交集为空，直接使用主检测框
  DetectorBoxRaw,
  /// 检测掩码与颜色掩码的交集
  DetectorMask,
  /// 交集为空，直接使用检测掩码
  DetectorMaskRaw,
  /// 无检测，仅颜色线索（已去噪）
  ColorCue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedMask {
  pub mask: SegmentationMask,
  pub bbox: BoundingBox,
  pub source: MaskSource,
}

impl FusedMask {
  fn new(mask: SegmentationMask, source: MaskSource) -> Self {
    let bbox = mask.bbox_or_full();
    FusedMask { mask, bbox, source }
  }

  pub fn area_ratio(&self) -> f64 {
    self.mask.count() as f64 / self.mask.len().max(1) as f64
  }
}

/// 掩码融合器，优先级：主检测框 > 检测掩码 > 颜色线索
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskFuser;

impl MaskFuser {
  pub fn fuse(
    &self,
    cues: &ColorCues,
    primary: Option<&BoundingBox>,
    detector_mask: Option<&SegmentationMask>,
  ) -> FusedMask {
    let color = cues.union();
    let (width, height) = color.dimensions();

    if let Some(bbox) = primary {
      let rect = SegmentationMask::from_rect(bbox, width, height);
      return Self::intersect_or_fallback(
        rect,
        color,
        MaskSource::DetectorBox,
        MaskSource::DetectorBoxRaw,
      );
    }

    if let Some(mask) = detector_mask {
      if mask.dimensions() == color.dimensions() && !mask.is_empty() {
        return Self::intersect_or_fallback(
          mask.clone(),
          color,
          MaskSource::DetectorMask,
          MaskSource::DetectorMaskRaw,
        );
      }
      warn!(
        "检测掩码尺寸 {:?} 与图像 {:?} 不一致或为空，改用颜色线索",
        mask.dimensions(),
        color.dimensions()
      );
    }

    FusedMask::new(denoise(color), MaskSource::ColorCue)
  }

  /// 颜色线索失效（如光照异常）时信任检测器
  fn intersect_or_fallback(
    region: SegmentationMask,
    color: &SegmentationMask,
    fused: MaskSource,
    raw: MaskSource,
  ) -> FusedMask {
    let inter = region.and(color);
    if inter.is_empty() {
      debug!("检测区域与颜色掩码无交集，使用原始检测区域");
      FusedMask::new(region, raw)
    } else {
      FusedMask::new(inter, fused)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn scene() -> RgbImage {
    // 中心粉红果实，四周深蓝背景
    RgbImage::from_fn(60, 60, |x, y| {
      if (15..45).contains(&x) && (15..45).contains(&y) {
        Rgb([205, 60, 120])
      } else {
        Rgb([15, 15, 70])
      }
    })
  }

  #[test]
  fn detector_box_is_filtered_by_color() {
    let cues = ColorCues::from_image(&scene());
    let bbox = BoundingBox { x0: 5, y0: 5, x1: 54, y1: 54 };
    let fused = MaskFuser.fuse(&cues, Some(&bbox), None);
    assert_eq!(fused.source, MaskSource::DetectorBox);
    assert_eq!(fused.mask.count(), 30 * 30);
    assert_eq!(fused.bbox, BoundingBox { x0: 15, y0: 15, x1: 44, y1: 44 });
  }

  #[test]
  fn empty_intersection_falls_back_to_raw_box() {
    let dark = RgbImage::from_pixel(40, 30, Rgb([5, 5, 5]));
    let cues = ColorCues::from_image(&dark);
    let bbox = BoundingBox { x0: 4, y0: 3, x1: 20, y1: 18 };
    let fused = MaskFuser.fuse(&cues, Some(&bbox), None);
    assert_eq!(fused.source, MaskSource::DetectorBoxRaw);
    assert_eq!(fused.mask, SegmentationMask::from_rect(&bbox, 40, 30));
    assert_eq!(fused.bbox, bbox);
  }

  #[test]
  fn mismatched_detector_mask_is_ignored() {
    let cues = ColorCues::from_image(&scene());
    let wrong = SegmentationMask::from_fn(10, 10, |_, _| true);
    let fused = MaskFuser.fuse(&cues, None, Some(&wrong));
    assert_eq!(fused.source, MaskSource::ColorCue);
    assert!(fused.mask.get(30, 30));
  }

  #[test]
  fn detector_mask_used_without_primary_box() {
    let cues = ColorCues::from_image(&scene());
    let mask = SegmentationMask::from_fn(60, 60, |x, y| x < 30 && y < 30);
    let fused = MaskFuser.fuse(&cues, None, Some(&mask));
    assert_eq!(fused.source, MaskSource::DetectorMask);
    assert_eq!(fused.mask.count(), 15 * 15);
  }

  #[test]
  fn fusion_is_idempotent() {
    let cues = ColorCues::from_image(&scene());
    let bbox = BoundingBox { x0: 10, y0: 10, x1: 50, y1: 50 };
    assert_eq!(
      MaskFuser.fuse(&cues, Some(&bbox), None),
      MaskFuser.fuse(&cues, Some(&bbox), None)
    );
    assert_eq!(MaskFuser.fuse(&cues, None, None), MaskFuser.fuse(&cues, None, None));
  }

  #[test]
  fn all_background_defaults_to_full_extent() {
    let dark = RgbImage::from_pixel(20, 10, Rgb([5, 5, 5]));
    let fused = MaskFuser.fuse(&ColorCues::from_image(&dark), None, None);
    assert!(fused.mask.is_empty());
    assert_eq!(fused.bbox, BoundingBox::full(20, 10));
  }
}
