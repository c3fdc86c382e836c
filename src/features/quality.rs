// 该文件是 Huolong （火龙） 项目的一部分。
// src/features/quality.rs - 图像质量指标
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

use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::laplacian_filter;
use serde::{Deserialize, Serialize};

use crate::utils::round_to;

/// 整幅图像的拍摄质量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageQuality {
  /// 平均亮度 [0, 1]
  pub brightness: f64,
  /// 灰度标准差 [0, 1]
  pub contrast: f64,
  /// 灰度图 3x3 拉普拉斯响应的方差，越小越模糊
  pub blur: f64,
  /// 各通道到灰度的平均距离 [0, 1]
  pub saturation: f64,
}

fn variance(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let n = values.len() as f64;
  let mean = values.iter().sum::<f64>() / n;
  values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

impl ImageQuality {
  pub fn measure(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
      return ImageQuality::default();
    }

    let mut luma = Vec::with_capacity(w * h);
    let mut sat_sum = 0.0;
    for p in image.pixels() {
      let (r, g, b) = (p[0] as f64, p[1] as f64, p[2] as f64);
      let y = 0.299 * r + 0.587 * g + 0.114 * b;
      sat_sum += (r - y).abs() + (g - y).abs() + (b - y).abs();
      luma.push(y);
    }

    let n = luma.len() as f64;
    let mean = luma.iter().sum::<f64>() / n;
    let std = variance(&luma).sqrt();

    let gray = GrayImage::from_fn(width, height, |x, y| {
      Luma([luma[y as usize * w + x as usize].round().clamp(0.0, 255.0) as u8])
    });
    let response: Vec<f64> = laplacian_filter(&gray).pixels().map(|p| p[0] as f64).collect();

    ImageQuality {
      brightness: round_to(mean / 255.0, 6),
      contrast: round_to(std / 255.0, 6),
      blur: round_to(variance(&response), 6),
      saturation: round_to(sat_sum / (3.0 * n) / 255.0, 6),
    }
  }
}
