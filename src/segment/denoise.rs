// 该文件是 Huolong （火龙） 项目的一部分。
// src/segment/denoise.rs - 颜色掩码去噪
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

use super::SegmentationMask;

/// 结构元素半径（L∞ 范数下为 5x5 方窗）
#[cfg(feature = "morphology")]
const MORPH_RADIUS: u8 = 2;

/// 邻域投票阈值（含中心像素的 3x3 窗口）
const MAJORITY_MIN_VOTES: u32 = 4;
#[cfg(not(feature = "morphology"))]
const MAJORITY_PASSES: usize = 2;

/// 开运算去斑点，闭运算补空洞，最后只保留最大的 8 连通域
#[cfg(feature = "morphology")]
pub fn denoise(mask: &SegmentationMask) -> SegmentationMask {
  use imageproc::distance_transform::Norm;
  use imageproc::morphology::{close, open};
  use tracing::debug;

  let gray = mask.to_gray_image();
  let opened = open(&gray, Norm::LInf, MORPH_RADIUS);
  let closed = SegmentationMask::from_gray_image(&close(&opened, Norm::LInf, MORPH_RADIUS));
  let (labels, areas) = closed.label_components();

  // 面积相同时取编号最小的连通域
  let largest = areas
    .iter()
    .enumerate()
    .skip(1)
    .fold(None, |best: Option<(usize, usize)>, (label, &area)| match best {
      Some((_, best_area)) if best_area >= area => best,
      _ if area > 0 => Some((label, area)),
      _ => best,
    });

  match largest {
    Some((label, area)) => {
      debug!("去噪后保留最大连通域: 编号 {}, 面积 {}", label, area);
      let label = label as u32;
      SegmentationMask::from_fn(mask.width(), mask.height(), |x, y| {
        labels.get_pixel(x, y)[0] == label
      })
    }
    None => closed,
  }
}

/// 未启用形态学特性时退化为两轮邻域投票平滑
#[cfg(not(feature = "morphology"))]
pub fn denoise(mask: &SegmentationMask) -> SegmentationMask {
  majority_smooth(mask, MAJORITY_PASSES)
}

/// 3x3 邻域（边缘复制填充）中前景数不少于阈值则置为前景
pub fn majority_smooth(mask: &SegmentationMask, passes: usize) -> SegmentationMask {
  let (width, height) = mask.dimensions();
  if width == 0 || height == 0 {
    return mask.clone();
  }

  let mut current = mask.clone();
  for _ in 0..passes {
    let src = current;
    current = SegmentationMask::from_fn(width, height, |x, y| {
      let mut votes = 0u32;
      for dy in -1i64..=1 {
        for dx in -1i64..=1 {
          let nx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
          let ny = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
          if src.get(nx, ny) {
            votes += 1;
          }
        }
      }
      votes >= MAJORITY_MIN_VOTES
    });
  }
  current
}
