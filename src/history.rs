// 该文件是 Huolong （火龙） 项目的一部分。
// src/history.rs - 最近扫描历史与汇总报表
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

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::features::RiskLevel;
use crate::grading::Grade;
use crate::store::ScanRecord;

const RIPENESS_UNDER: f64 = 80.0;
const RIPENESS_OVER: f64 = 95.0;

/// 报表所需的扫描字段，内存结果与日志记录都能提供
pub trait ScanView {
  fn timestamp(&self) -> DateTime<Utc>;
  fn grade(&self) -> Option<Grade>;
  fn quality_score(&self) -> f64;
  fn ripeness_score(&self) -> f64;
  fn defect_level(&self) -> Option<RiskLevel>;
  fn batch_id(&self) -> Option<&str>;
}

impl ScanView for ScanRecord {
  fn timestamp(&self) -> DateTime<Utc> {
    self.timestamp
  }

  fn grade(&self) -> Option<Grade> {
    self.prediction.grade
  }

  fn quality_score(&self) -> f64 {
    self.features.quality_score
  }

  fn ripeness_score(&self) -> f64 {
    self.features.ripeness_score
  }

  fn defect_level(&self) -> Option<RiskLevel> {
    self.prediction.defect_level
  }

  fn batch_id(&self) -> Option<&str> {
    self.prediction.batch_id.as_deref()
  }
}

/// 最近优先、定长的扫描历史，超出容量丢弃最旧的
#[derive(Debug, Clone)]
pub struct History<T> {
  items: VecDeque<T>,
  capacity: usize,
}

impl<T> History<T> {
  pub fn with_capacity(capacity: usize) -> Self {
    History {
      items: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  pub fn push(&mut self, item: T) {
    if self.capacity == 0 {
      return;
    }
    self.items.push_front(item);
    self.items.truncate(self.capacity);
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.items.iter()
  }

  pub fn find_mut(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<&mut T> {
    self.items.iter_mut().find(|item| pred(item))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RipenessDistribution {
  pub under: usize,
  pub ideal: usize,
  pub over: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
  pub total: usize,
  pub average_quality: Option<f64>,
  /// A/B 占比（百分数）
  pub pass_rate: Option<f64>,
  pub ripeness_distribution: RipenessDistribution,
  pub grade_distribution: BTreeMap<&'static str, usize>,
  pub defect_level_distribution: BTreeMap<&'static str, usize>,
}

impl HistorySummary {
  pub fn of<'a, T: ScanView + 'a>(items: impl IntoIterator<Item = &'a T>) -> Self {
    let mut grade_distribution = BTreeMap::from([("A", 0), ("B", 0), ("C", 0)]);
    let mut defect_level_distribution = BTreeMap::from([("low", 0), ("medium", 0), ("high", 0)]);
    let mut ripeness_distribution = RipenessDistribution::default();
    let (mut total, mut quality_sum, mut passes) = (0usize, 0.0, 0usize);

    for item in items {
      total += 1;
      quality_sum += item.quality_score();

      let ripeness = item.ripeness_score();
      if ripeness < RIPENESS_UNDER {
        ripeness_distribution.under += 1;
      } else if ripeness <= RIPENESS_OVER {
        ripeness_distribution.ideal += 1;
      } else {
        ripeness_distribution.over += 1;
      }

      if let Some(grade) = item.grade() {
        if let Some(n) = grade_distribution.get_mut(grade.as_str()) {
          *n += 1;
        }
        if matches!(grade, Grade::A | Grade::B) {
          passes += 1;
        }
      }
      if let Some(level) = item.defect_level() {
        *defect_level_distribution.entry(level.as_str()).or_default() += 1;
      }
    }

    let (average_quality, pass_rate) = if total == 0 {
      (None, None)
    } else {
      (
        Some(quality_sum / total as f64),
        Some(passes as f64 / total as f64 * 100.0),
      )
    };

    HistorySummary {
      total,
      average_quality,
      pass_rate,
      ripeness_distribution,
      grade_distribution,
      defect_level_distribution,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
  pub batch_id: String,
  #[serde(flatten)]
  pub summary: HistorySummary,
}

impl BatchReport {
  pub fn of<'a, T: ScanView + 'a>(batch_id: &str, items: impl IntoIterator<Item = &'a T>) -> Self {
    BatchReport {
      batch_id: batch_id.to_string(),
      summary: HistorySummary::of(items.into_iter().filter(|i| i.batch_id() == Some(batch_id))),
    }
  }
}

/// 按 UTC 日期闭区间筛选的报表；两端均可省略
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRangeReport {
  pub from: Option<NaiveDate>,
  pub to: Option<NaiveDate>,
  #[serde(flatten)]
  pub summary: HistorySummary,
}

impl DateRangeReport {
  pub fn of<'a, T: ScanView + 'a>(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    items: impl IntoIterator<Item = &'a T>,
  ) -> Self {
    let in_range = |item: &&T| {
      let day = item.timestamp().date_naive();
      from.is_none_or(|f| day >= f) && to.is_none_or(|t| day <= t)
    };
    DateRangeReport {
      from,
      to,
      summary: HistorySummary::of(items.into_iter().filter(in_range)),
    }
  }
}
