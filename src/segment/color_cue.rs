// 该文件是 Huolong （火龙） 项目的一部分。
// src/segment/color_cue.rs - 颜色线索分割
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

use super::SegmentationMask;

/// 四种果皮/果肉颜色的逐像素判定
///
/// - 粉红/红：红色主导，绿色偏低
/// - 黄：红绿均高，蓝色偏低（黄皮品种）
/// - 绿：绿色主导（鳞片、未熟果皮）
/// - 白：高亮低饱和（果肉）
#[derive(Debug, Clone)]
pub struct ColorCues {
  pub pink_red: SegmentationMask,
  pub yellow: SegmentationMask,
  pub green: SegmentationMask,
  pub white: SegmentationMask,
  union: SegmentationMask,
}

#[inline]
pub(crate) fn is_pink_red(r: f32, g: f32, b: f32) -> bool {
  r > g * 1.2 && r > b * 0.8 && r > 50.0
}

#[inline]
pub(crate) fn is_yellow(r: f32, g: f32, b: f32) -> bool {
  r > 100.0 && g > 100.0 && b < 100.0
}

#[inline]
pub(crate) fn is_green(r: f32, g: f32, b: f32) -> bool {
  g > r * 1.05 && g > b * 1.05 && g > 40.0
}

#[inline]
pub(crate) fn is_white(r: f32, g: f32, b: f32) -> bool {
  r > 150.0 && g > 150.0 && b > 150.0 && (r - g).abs() < 30.0 && (g - b).abs() < 30.0
}

impl ColorCues {
  pub fn from_image(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let cue = |f: fn(f32, f32, f32) -> bool| {
      SegmentationMask::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        f(p[0] as f32, p[1] as f32, p[2] as f32)
      })
    };

    let pink_red = cue(is_pink_red);
    let yellow = cue(is_yellow);
    let green = cue(is_green);
    let white = cue(is_white);
    let union = pink_red.or(&yellow).or(&green).or(&white);

    ColorCues {
      pink_red,
      yellow,
      green,
      white,
      union,
    }
  }

  /// 任一颜色命中的像素
  pub fn union(&self) -> &SegmentationMask {
    &self.union
  }

  /// 命中像素占整幅图像的比例
  pub fn relevance_ratio(&self) -> f64 {
    let total = self.union.len().max(1);
    self.union.count() as f64 / total as f64
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn classifies_reference_colors() {
    assert!(is_pink_red(200.0, 60.0, 120.0));
    assert!(is_yellow(220.0, 200.0, 40.0));
    assert!(is_green(60.0, 160.0, 70.0));
    assert!(is_white(230.0, 225.0, 215.0));
    assert!(!is_white(230.0, 180.0, 215.0));
    assert!(!is_pink_red(40.0, 20.0, 20.0));
  }

  #[test]
  fn relevance_counts_union_once() {
    // 左半部分粉红，右半部分深蓝背景
    let image = RgbImage::from_fn(10, 10, |x, _| {
      if x < 5 { Rgb([210, 50, 120]) } else { Rgb([10, 10, 80]) }
    });
    let cues = ColorCues::from_image(&image);
    assert_eq!(cues.pink_red.count(), 50);
    assert!((cues.relevance_ratio() - 0.5).abs() < 1e-9);
  }
}
