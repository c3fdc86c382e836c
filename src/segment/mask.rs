// 该文件是 Huolong （火龙） 项目的一部分。
// src/segment/mask.rs - 布尔分割掩码
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

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::detection::{BoundingBox, Detection};

/// 与原图同尺寸的布尔掩码，行优先存储
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
  width: u32,
  height: u32,
  data: Vec<bool>,
}

impl SegmentationMask {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      data: vec![false; width as usize * height as usize],
    }
  }

  pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
      for x in 0..width {
        data.push(f(x, y));
      }
    }
    Self {
      width,
      height,
      data,
    }
  }

  /// 矩形掩码，闭区间填充
  pub fn from_rect(bbox: &BoundingBox, width: u32, height: u32) -> Self {
    Self::from_fn(width, height, |x, y| {
      x >= bbox.x0 && x <= bbox.x1 && y >= bbox.y0 && y <= bbox.y1
    })
  }

  /// 所有检测框的并集；退化框跳过
  pub fn from_detections(detections: &[Detection], width: u32, height: u32) -> Self {
    let mut mask = Self::new(width, height);
    for bbox in detections
      .iter()
      .filter_map(|d| BoundingBox::from_detection(d, width, height))
    {
      for y in bbox.y0..=bbox.y1 {
        for x in bbox.x0..=bbox.x1 {
          mask.set(x, y, true);
        }
      }
    }
    mask
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  fn index(&self, x: u32, y: u32) -> usize {
    y as usize * self.width as usize + x as usize
  }

  #[inline]
  pub fn get(&self, x: u32, y: u32) -> bool {
    self.data[self.index(x, y)]
  }

  #[inline]
  pub fn set(&mut self, x: u32, y: u32, value: bool) {
    let idx = self.index(x, y);
    self.data[idx] = value;
  }

  pub fn count(&self) -> usize {
    self.data.iter().filter(|v| **v).count()
  }

  /// 没有任何前景像素
  pub fn is_empty(&self) -> bool {
    !self.data.iter().any(|v| *v)
  }

  pub fn as_slice(&self) -> &[bool] {
    &self.data
  }

  pub fn and(&self, other: &SegmentationMask) -> SegmentationMask {
    debug_assert_eq!(self.dimensions(), other.dimensions());
    SegmentationMask {
      width: self.width,
      height: self.height,
      data: self
        .data
        .iter()
        .zip(other.data.iter())
        .map(|(a, b)| *a && *b)
        .collect(),
    }
  }

  pub fn or(&self, other: &SegmentationMask) -> SegmentationMask {
    debug_assert_eq!(self.dimensions(), other.dimensions());
    SegmentationMask {
      width: self.width,
      height: self.height,
      data: self
        .data
        .iter()
        .zip(other.data.iter())
        .map(|(a, b)| *a || *b)
        .collect(),
    }
  }

  /// 前景像素坐标
  pub fn selected(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
    let width = self.width as usize;
    self
      .data
      .iter()
      .enumerate()
      .filter(|(_, v)| **v)
      .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
  }

  /// 前景包围框；空掩码返回 `None`
  pub fn bbox(&self) -> Option<BoundingBox> {
    let mut it = self.selected();
    let (x, y) = it.next()?;
    let mut bbox = BoundingBox {
      x0: x,
      y0: y,
      x1: x,
      y1: y,
    };
    for (x, y) in it {
      bbox.x0 = bbox.x0.min(x);
      bbox.x1 = bbox.x1.max(x);
      bbox.y0 = bbox.y0.min(y);
      bbox.y1 = bbox.y1.max(y);
    }
    Some(bbox)
  }

  /// 前景包围框；空掩码时为整幅图像
  pub fn bbox_or_full(&self) -> BoundingBox {
    self
      .bbox()
      .unwrap_or_else(|| BoundingBox::full(self.width, self.height))
  }

  /// 8 连通域标记图（0 为背景）与各编号的像素数，下标即编号
  pub fn label_components(&self) -> (ImageBuffer<Luma<u32>, Vec<u32>>, Vec<usize>) {
    let labels = connected_components(&self.to_gray_image(), Connectivity::Eight, Luma([0u8]));
    let mut areas = vec![0usize];
    for pixel in labels.pixels() {
      let label = pixel[0] as usize;
      if label == 0 {
        continue;
      }
      if areas.len() <= label {
        areas.resize(label + 1, 0);
      }
      areas[label] += 1;
    }
    (labels, areas)
  }

  /// 各 8 连通域的像素数
  pub fn component_sizes(&self) -> Vec<usize> {
    let (_, areas) = self.label_components();
    areas.into_iter().skip(1).filter(|area| *area > 0).collect()
  }

  pub fn to_gray_image(&self) -> GrayImage {
    GrayImage::from_fn(self.width, self.height, |x, y| {
      Luma([if self.get(x, y) { 255u8 } else { 0u8 }])
    })
  }

  pub fn from_gray_image(image: &GrayImage) -> Self {
    Self::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y)[0] > 0)
  }
}
