// 该文件是 Huolong （火龙） 项目的一部分。
// src/detection.rs - 检测结果与检测器接口
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

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 主检测框外扩比例
pub const PRIMARY_BOX_PAD: f64 = 0.10;

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("检测器不可用: {0}")]
  Unavailable(String),
  #[error("推理失败: {0}")]
  Inference(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测结果解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 外部检测器给出的单个检测结果，坐标为原图像素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub x0: f32,
  pub y0: f32,
  pub x1: f32,
  pub y1: f32,
  /// 置信度 [0, 1]
  #[serde(rename = "conf")]
  pub confidence: f32,
  #[serde(rename = "cls")]
  pub class_id: u32,
  #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
  pub class_name: Option<String>,
}

impl Detection {
  pub fn center(&self) -> (f32, f32) {
    ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
  }
}

/// 检测器能力接口，构造引擎时注入；缺省即为 `None`
pub trait Detector: Send + Sync {
  fn predict(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectorError>;
}

/// 像素级包围框，闭区间 `[x0, x1] × [y0, y1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x0: u32,
  pub y0: u32,
  pub x1: u32,
  pub y1: u32,
}

impl BoundingBox {
  pub fn full(width: u32, height: u32) -> Self {
    BoundingBox {
      x0: 0,
      y0: 0,
      x1: width.saturating_sub(1),
      y1: height.saturating_sub(1),
    }
  }

  /// 将检测框取整并限制在图像范围内；退化框返回 `None`
  pub fn from_detection(det: &Detection, width: u32, height: u32) -> Option<Self> {
    if width == 0 || height == 0 {
      return None;
    }
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x0 = det.x0.round().clamp(0.0, max_x) as u32;
    let y0 = det.y0.round().clamp(0.0, max_y) as u32;
    let x1 = det.x1.round().clamp(0.0, max_x) as u32;
    let y1 = det.y1.round().clamp(0.0, max_y) as u32;
    if x1 <= x0 || y1 <= y0 {
      return None;
    }
    Some(BoundingBox { x0, y0, x1, y1 })
  }

  pub fn width(&self) -> u32 {
    self.x1 - self.x0 + 1
  }

  pub fn height(&self) -> u32 {
    self.y1 - self.y0 + 1
  }

  pub fn area(&self) -> u64 {
    self.width() as u64 * self.height() as u64
  }

  pub fn contains(&self, x: f32, y: f32) -> bool {
    x >= self.x0 as f32 && x <= self.x1 as f32 && y >= self.y0 as f32 && y <= self.y1 as f32
  }

  /// 长边/短边
  pub fn aspect_ratio(&self) -> f64 {
    let w = self.width() as f64;
    let h = self.height() as f64;
    w.max(h) / w.min(h)
  }

  /// 按比例外扩并限制在图像内
  pub fn pad(&self, frac: f64, width: u32, height: u32) -> Self {
    let bw = (self.x1 - self.x0).max(1) as f64;
    let bh = (self.y1 - self.y0).max(1) as f64;
    let pad_x = (bw * frac).round() as u32;
    let pad_y = (bh * frac).round() as u32;
    BoundingBox {
      x0: self.x0.saturating_sub(pad_x),
      y0: self.y0.saturating_sub(pad_y),
      x1: (self.x1 + pad_x).min(width.saturating_sub(1)),
      y1: (self.y1 + pad_y).min(height.saturating_sub(1)),
    }
  }
}

/// 一组检测的摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
  pub count: usize,
  pub best_conf: f32,
  pub primary_bbox: Option<BoundingBox>,
}

impl DetectionSummary {
  pub fn of(detections: &[Detection], width: u32, height: u32) -> Self {
    DetectionSummary {
      count: detections.len(),
      best_conf: best_confidence(detections),
      primary_bbox: primary_box(detections, width, height),
    }
  }
}

pub fn best_confidence(detections: &[Detection]) -> f32 {
  detections
    .iter()
    .map(|d| d.confidence)
    .fold(0.0f32, f32::max)
}

/// 丢弃低于阈值的检测
pub fn filter_confident(detections: Vec<Detection>, min_confidence: f32) -> Vec<Detection> {
  detections
    .into_iter()
    .filter(|d| d.confidence.is_finite() && d.confidence >= min_confidence)
    .collect()
}

/// 置信度最高的检测作为主目标区域，外扩 10%
pub fn primary_box(detections: &[Detection], width: u32, height: u32) -> Option<BoundingBox> {
  let best = detections
    .iter()
    .max_by(|a, b| a.confidence.total_cmp(&b.confidence))?;
  BoundingBox::from_detection(best, width, height).map(|b| b.pad(PRIMARY_BOX_PAD, width, height))
}

/// 中心点落在框内的检测数量
pub fn count_inside(detections: &[Detection], bbox: &BoundingBox) -> usize {
  detections
    .iter()
    .filter(|d| {
      let (cx, cy) = d.center();
      bbox.contains(cx, cy)
    })
    .count()
}

/// 读取旁路检测文件（JSON 数组）
pub fn load_detections(path: &Path) -> Result<Vec<Detection>, DetectorError> {
  let data = std::fs::read_to_string(path)?;
  Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(x0: f32, y0: f32, x1: f32, y1: f32, confidence: f32) -> Detection {
    Detection {
      x0,
      y0,
      x1,
      y1,
      confidence,
      class_id: 0,
      class_name: None,
    }
  }

  #[test]
  fn primary_box_is_padded_and_clamped() {
    let dets = vec![det(10.0, 10.0, 50.0, 30.0, 0.4), det(0.0, 0.0, 90.0, 60.0, 0.9)];
    let bbox = primary_box(&dets, 100, 64).unwrap();
    assert_eq!(bbox, BoundingBox { x0: 0, y0: 0, x1: 99, y1: 63 });

    let dets = vec![det(40.0, 40.0, 60.0, 60.0, 0.8)];
    let bbox = primary_box(&dets, 100, 100).unwrap();
    assert_eq!(bbox, BoundingBox { x0: 38, y0: 38, x1: 62, y1: 62 });
  }

  #[test]
  fn degenerate_detection_has_no_box() {
    let dets = vec![det(50.0, 50.0, 50.0, 80.0, 0.9)];
    assert!(primary_box(&dets, 100, 100).is_none());
    assert!(primary_box(&[], 100, 100).is_none());
  }

  #[test]
  fn counts_detections_by_center() {
    let bbox = BoundingBox { x0: 10, y0: 10, x1: 40, y1: 40 };
    let dets = vec![
      det(12.0, 12.0, 20.0, 20.0, 0.9),
      det(30.0, 30.0, 60.0, 60.0, 0.9),
      det(60.0, 60.0, 70.0, 70.0, 0.9),
    ];
    assert_eq!(count_inside(&dets, &bbox), 1);
  }

  #[test]
  fn sidecar_json_uses_short_keys() {
    let json = r#"[{"x0": 1, "y0": 2, "x1": 30, "y1": 40, "conf": 0.75, "cls": 1, "name": "rot"}]"#;
    let dets: Vec<Detection> = serde_json::from_str(json).unwrap();
    assert_eq!(dets[0].confidence, 0.75);
    assert_eq!(dets[0].class_name.as_deref(), Some("rot"));
    let filtered = filter_confident(dets, 0.8);
    assert!(filtered.is_empty());
  }
}
