// 该文件是 Huolong （火龙） 项目的一部分。
// src/output/draw.rs - 分割预览与检测框绘制
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

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detection::{BoundingBox, Detection};
use crate::segment::SegmentationMask;

const MASK_COLOR: [u8; 3] = [230, 0, 92];
const MASK_ALPHA: u16 = 90;
const BBOX_COLOR: [u8; 3] = [255, 255, 255];
const FRUIT_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const DISEASE_COLOR: [u8; 3] = [255, 140, 0]; // 橙色
const BORDER_THICKNESS: u32 = 2;

const PREVIEW_MAX_WIDTH: u32 = 720;
const PREVIEW_JPEG_QUALITY: u8 = 82;

fn blend(base: u8, over: u8) -> u8 {
  ((base as u16 * (255 - MASK_ALPHA) + over as u16 * MASK_ALPHA) / 255) as u8
}

/// 在图像上绘制矩形边框（坐标为闭区间像素），向内逐像素加粗
pub fn draw_bbox(image: &mut RgbImage, bbox: &BoundingBox, color: [u8; 3]) {
  let (w, h) = image.dimensions();
  if w == 0 || h == 0 || bbox.x0 >= w || bbox.y0 >= h {
    return;
  }
  let width = bbox.x1.min(w - 1).saturating_sub(bbox.x0) + 1;
  let height = bbox.y1.min(h - 1).saturating_sub(bbox.y0) + 1;

  for t in 0..BORDER_THICKNESS {
    if width <= 2 * t || height <= 2 * t {
      break;
    }
    let rect = Rect::at((bbox.x0 + t) as i32, (bbox.y0 + t) as i32)
      .of_size(width - 2 * t, height - 2 * t);
    draw_hollow_rect_mut(image, rect, Rgb(color));
  }
}

/// 掩码区域半透明着色，并绘制白色包围框
pub fn overlay_mask(image: &RgbImage, mask: &SegmentationMask, bbox: &BoundingBox) -> RgbImage {
  let mut out = image.clone();
  if mask.dimensions() == image.dimensions() {
    for (x, y) in mask.selected() {
      let Rgb([r, g, b]) = *out.get_pixel(x, y);
      out.put_pixel(
        x,
        y,
        Rgb([
          blend(r, MASK_COLOR[0]),
          blend(g, MASK_COLOR[1]),
          blend(b, MASK_COLOR[2]),
        ]),
      );
    }
  }
  draw_bbox(&mut out, bbox, BBOX_COLOR);
  out
}

/// 叠加果实（蓝）与病害（橙）检测框
pub fn draw_detections(image: &mut RgbImage, fruit: &[Detection], disease: &[Detection]) {
  let (w, h) = image.dimensions();
  for (dets, color) in [(fruit, FRUIT_COLOR), (disease, DISEASE_COLOR)] {
    for bbox in dets.iter().filter_map(|d| BoundingBox::from_detection(d, w, h)) {
      draw_bbox(image, &bbox, color);
    }
  }
}

/// 宽度超过 720 时等比缩小
pub fn downscale_for_preview(image: &RgbImage) -> RgbImage {
  let (w, h) = image.dimensions();
  if w <= PREVIEW_MAX_WIDTH {
    return image.clone();
  }
  let new_h = ((h as u64 * PREVIEW_MAX_WIDTH as u64) / w as u64).max(1) as u32;
  imageops::resize(image, PREVIEW_MAX_WIDTH, new_h, FilterType::Triangle)
}

/// 分割预览：叠加、缩放、JPEG 编码后转 base64
pub fn preview_base64(
  image: &RgbImage,
  mask: &SegmentationMask,
  bbox: &BoundingBox,
) -> Result<String, image::ImageError> {
  let preview = downscale_for_preview(&overlay_mask(image, mask, bbox));
  let mut buffer = Vec::new();
  JpegEncoder::new_with_quality(&mut buffer, PREVIEW_JPEG_QUALITY).encode_image(&preview)?;
  Ok(STANDARD.encode(&buffer))
}

#[cfg(test)]
mod tests {
  use super::*;
  use base64::Engine as _;

  #[test]
  fn overlay_tints_only_masked_pixels() {
    let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
    let bbox = BoundingBox { x0: 2, y0: 2, x1: 7, y1: 7 };
    let mask = SegmentationMask::from_rect(&bbox, 10, 10);
    let out = overlay_mask(&image, &mask, &bbox);
    assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
    assert_eq!(*out.get_pixel(2, 2), Rgb(BBOX_COLOR));
    assert_eq!(*out.get_pixel(5, 5), Rgb([blend(0, 230), 0, blend(0, 92)]));
  }

  #[test]
  fn bbox_border_is_two_pixels_inside_the_box() {
    let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
    let bbox = BoundingBox { x0: 1, y0: 1, x1: 8, y1: 8 };
    draw_bbox(&mut image, &bbox, BBOX_COLOR);
    for (x, y) in [(1, 1), (2, 2), (8, 8), (7, 7), (1, 5), (2, 5), (8, 4)] {
      assert_eq!(*image.get_pixel(x, y), Rgb(BBOX_COLOR), "({x}, {y})");
    }
    for (x, y) in [(0, 0), (3, 3), (5, 5), (9, 9), (6, 4)] {
      assert_eq!(*image.get_pixel(x, y), Rgb([0, 0, 0]), "({x}, {y})");
    }
  }

  #[test]
  fn bbox_is_clipped_to_image_and_tiny_boxes_draw() {
    let mut image = RgbImage::from_pixel(6, 6, Rgb([0, 0, 0]));
    draw_bbox(&mut image, &BoundingBox { x0: 3, y0: 3, x1: 40, y1: 40 }, FRUIT_COLOR);
    assert_eq!(*image.get_pixel(5, 5), Rgb(FRUIT_COLOR));
    assert_eq!(*image.get_pixel(3, 5), Rgb(FRUIT_COLOR));

    // 单像素框与图外框不应越界
    draw_bbox(&mut image, &BoundingBox { x0: 0, y0: 0, x1: 0, y1: 0 }, DISEASE_COLOR);
    draw_bbox(&mut image, &BoundingBox { x0: 9, y0: 9, x1: 12, y1: 12 }, DISEASE_COLOR);
  }

  #[test]
  fn preview_is_bounded_jpeg() {
    let image = RgbImage::from_pixel(1000, 500, Rgb([200, 60, 120]));
    assert_eq!(downscale_for_preview(&image).dimensions(), (720, 360));

    let bbox = BoundingBox::full(1000, 500);
    let mask = SegmentationMask::from_rect(&bbox, 1000, 500);
    let encoded = preview_base64(&image, &mask, &bbox).unwrap();
    let bytes = STANDARD.decode(encoded).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
  }
}
