// 该文件是 Huolong （火龙） 项目的一部分。
// src/selftrain.rs - 主动学习样本收集
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

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::SelftrainConfig;
use crate::detection::{Detection, best_confidence};
use crate::features::ImageQuality;
use crate::store::{JsonlLog, Prediction, StoreError};

#[derive(Error, Debug)]
pub enum SelftrainError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像保存错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("队列写入错误: {0}")]
  StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectReason {
  /// 有检测但置信度落在不确定区间
  DetectorUncertain,
  /// 无检测但颜色占比像果实
  NoDetectionButColorRelevant,
  TooBlurry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectDecision {
  pub collect: bool,
  pub reasons: Vec<CollectReason>,
}

/// 至少一个正向理由且不因模糊被拒时收集
pub fn should_collect(
  policy: &SelftrainConfig,
  fruit_detections: &[Detection],
  relevance_ratio: f64,
  quality: &ImageQuality,
) -> CollectDecision {
  let mut reasons = Vec::new();
  if fruit_detections.is_empty() {
    if relevance_ratio >= policy.min_relevance {
      reasons.push(CollectReason::NoDetectionButColorRelevant);
    }
  } else {
    let best = best_confidence(fruit_detections) as f64;
    if (policy.conf_low..=policy.conf_high).contains(&best) {
      reasons.push(CollectReason::DetectorUncertain);
    }
  }
  if quality.blur < policy.min_blur {
    reasons.push(CollectReason::TooBlurry);
  }

  let positive = reasons.iter().any(|r| *r != CollectReason::TooBlurry);
  let rejected = reasons.contains(&CollectReason::TooBlurry);
  CollectDecision {
    collect: positive && !rejected,
    reasons,
  }
}

/// 待标注队列的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
  pub id: Uuid,
  pub timestamp: DateTime<Utc>,
  pub image_path: PathBuf,
  pub analysis_id: Uuid,
  pub reasons: Vec<CollectReason>,
  pub relevance_ratio: f64,
  pub image_quality: ImageQuality,
  pub detections: Vec<Detection>,
  pub prediction: Prediction,
}

/// 收集样本的附带信息
pub struct SampleMeta<'a> {
  pub analysis_id: Uuid,
  pub reasons: &'a [CollectReason],
  pub relevance_ratio: f64,
  pub image_quality: ImageQuality,
  pub detections: &'a [Detection],
  pub prediction: &'a Prediction,
}

/// 图像存到 `<root>/auto/<YYYY-MM-DD>/<uuid>.png`，元数据追加到队列
pub struct SampleCollector {
  out_root: PathBuf,
  queue: JsonlLog<QueueEntry>,
}

impl SampleCollector {
  pub fn new(out_root: impl Into<PathBuf>, queue_path: impl Into<PathBuf>) -> Self {
    SampleCollector {
      out_root: out_root.into(),
      queue: JsonlLog::new(queue_path),
    }
  }

  pub fn queue(&self) -> &JsonlLog<QueueEntry> {
    &self.queue
  }

  pub fn save(&self, image: &RgbImage, meta: SampleMeta<'_>) -> Result<QueueEntry, SelftrainError> {
    let now = Utc::now();
    let directory = self
      .out_root
      .join("auto")
      .join(now.format("%Y-%m-%d").to_string());
    std::fs::create_dir_all(&directory)?;

    let id = Uuid::new_v4();
    let image_path = directory.join(format!("{id}.png"));
    image.save(&image_path)?;

    let entry = QueueEntry {
      id,
      timestamp: now,
      image_path,
      analysis_id: meta.analysis_id,
      reasons: meta.reasons.to_vec(),
      relevance_ratio: meta.relevance_ratio,
      image_quality: meta.image_quality,
      detections: meta.detections.to_vec(),
      prediction: meta.prediction.clone(),
    };
    self.queue.append(&entry)?;
    info!("收集自训练样本 {} ({:?})", entry.image_path.display(), entry.reasons);
    Ok(entry)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grading::MarketLabel;
  use image::Rgb;

  fn det(conf: f32) -> Detection {
    Detection {
      x0: 0.0,
      y0: 0.0,
      x1: 10.0,
      y1: 10.0,
      confidence: conf,
      class_id: 0,
      class_name: None,
    }
  }

  fn sharp() -> ImageQuality {
    ImageQuality {
      blur: 100.0,
      ..Default::default()
    }
  }

  #[test]
  fn uncertain_detector_is_collected() {
    let policy = SelftrainConfig::default();
    let d = should_collect(&policy, &[det(0.5)], 0.0, &sharp());
    assert!(d.collect);
    assert_eq!(d.reasons, vec![CollectReason::DetectorUncertain]);
    assert!(!should_collect(&policy, &[det(0.9)], 0.5, &sharp()).collect);
  }

  #[test]
  fn color_only_fruit_is_collected_unless_blurry() {
    let policy = SelftrainConfig::default();
    assert!(should_collect(&policy, &[], 0.10, &sharp()).collect);
    assert!(!should_collect(&policy, &[], 0.05, &sharp()).collect);
    let blurry = should_collect(&policy, &[], 0.10, &ImageQuality::default());
    assert!(!blurry.collect);
    assert!(blurry.reasons.contains(&CollectReason::TooBlurry));
  }

  #[test]
  fn save_writes_image_and_queue_line() {
    let dir = tempfile::tempdir().unwrap();
    let collector = SampleCollector::new(dir.path().join("uploads"), dir.path().join("queue.jsonl"));
    let image = RgbImage::from_pixel(8, 8, Rgb([200, 40, 90]));
    let prediction = Prediction {
      grade: None,
      price_per_kg: 0.0,
      currency: "PHP".to_string(),
      weight_grams: 0,
      size_category: None,
      market_value_label: MarketLabel::Rejected,
      defect_level: None,
      batch_id: None,
    };
    let entry = collector
      .save(
        &image,
        SampleMeta {
          analysis_id: Uuid::new_v4(),
          reasons: &[CollectReason::NoDetectionButColorRelevant],
          relevance_ratio: 0.1,
          image_quality: sharp(),
          detections: &[],
          prediction: &prediction,
        },
      )
      .unwrap();
    assert!(entry.image_path.exists());
    assert!(entry.image_path.starts_with(dir.path().join("uploads").join("auto")));
    assert_eq!(collector.queue().read_all().unwrap(), vec![entry]);
  }
}
