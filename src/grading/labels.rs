// 该文件是 Huolong （火龙） 项目的一部分。
// src/grading/labels.rs - 货架期、市场标签与处理建议
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

use super::Grade;
use crate::features::{RiskLevel, SizeCategory};

const INSECT_HIGH_MARKET_PENALTY: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShelfLife {
  pub days: u32,
  pub label: &'static str,
}

impl ShelfLife {
  /// `grade` 为 `None` 表示无效结果
  pub fn of(grade: Option<Grade>, defect: RiskLevel, insect: RiskLevel) -> Self {
    let (days, label) = match grade {
      None => (0, "Not applicable"),
      Some(_) if defect == RiskLevel::High || insect == RiskLevel::High => (1, "Consume immediately"),
      Some(_) if defect == RiskLevel::Medium || insect == RiskLevel::Medium => (3, "2–3 days"),
      Some(Grade::A | Grade::B) => (5, "4–5 days"),
      Some(_) => (4, "3–4 days"),
    };
    ShelfLife { days, label }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketLabel {
  Premium,
  Standard,
  Processing,
  Rejected,
}

impl MarketLabel {
  pub fn as_str(&self) -> &'static str {
    match self {
      MarketLabel::Premium => "Premium",
      MarketLabel::Standard => "Standard",
      MarketLabel::Processing => "Processing",
      MarketLabel::Rejected => "Rejected",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketValue {
  pub label: MarketLabel,
  pub score: u32,
  pub lane: &'static str,
}

impl MarketValue {
  pub fn of(grade: Option<Grade>, defect: RiskLevel, insect: RiskLevel) -> Self {
    let high_defect = defect == RiskLevel::High;
    let (label, score, lane): (MarketLabel, u32, &'static str) = match grade {
      None => return MarketValue {
        label: MarketLabel::Rejected,
        score: 0,
        lane: "Rejected",
      },
      Some(Grade::A) => (
        MarketLabel::Premium,
        if defect == RiskLevel::Low { 92 } else { 85 },
        "Export / Premium",
      ),
      Some(Grade::B) => (
        MarketLabel::Standard,
        if high_defect { 62 } else { 75 },
        "Local Market",
      ),
      Some(_) => (
        MarketLabel::Processing,
        if high_defect { 35 } else { 55 },
        "Processing / Reject check",
      ),
    };
    let score = if insect == RiskLevel::High {
      score.saturating_sub(INSECT_HIGH_MARKET_PENALTY)
    } else {
      score
    };
    MarketValue { label, score, lane }
  }
}

/// 面向分拣人员的处理建议
pub fn recommendations(
  ripeness_score: f64,
  defect: RiskLevel,
  insect: RiskLevel,
  size: SizeCategory,
  market: MarketLabel,
) -> Vec<String> {
  let mut tips: Vec<&str> = Vec::new();
  if market == MarketLabel::Rejected {
    tips.push("Rescan with the fruit centered and well-lit.");
    tips.push("Remove background clutter and avoid glare.");
    return tips.into_iter().map(String::from).collect();
  }

  match defect {
    RiskLevel::High => {
      tips.push("Separate this fruit from the rest of the batch to prevent spread.");
      tips.push("Inspect for soft spots and odor; discard if leaking or moldy.");
      tips.push("Sanitize crates and sorting surface after handling.");
    }
    RiskLevel::Medium => {
      tips.push("Prioritize selling or processing sooner; monitor for fast spoilage.");
      tips.push("Handle gently to avoid bruising and worsening spots.");
    }
    RiskLevel::Low => tips.push("Store in a cool, dry place with airflow to maintain quality."),
  }

  match insect {
    RiskLevel::High => {
      tips.push("Check for insect entry holes and isolate this fruit.");
      tips.push("Inspect neighboring fruit in the batch for insect marks.");
    }
    RiskLevel::Medium => tips.push("Look closely for small insect marks before packing."),
    RiskLevel::Low => {}
  }

  if ripeness_score >= 95.0 {
    tips.push("Sell/consume within 24 hours for best quality.");
  } else if ripeness_score >= 85.0 {
    tips.push("Sell/consume within 2–3 days; avoid stacking pressure.");
  } else {
    tips.push("Allow ripening at room temperature; check daily for color change.");
  }

  if size == SizeCategory::Large {
    tips.push("Use premium packaging to reduce handling damage during transport.");
  }

  tips.push(match market {
    MarketLabel::Premium => "Allocate to premium/export lane and keep a consistent temperature chain.",
    MarketLabel::Standard => "Allocate to local market lane; maintain clean sorting and ventilation.",
    _ => "Allocate to processing lane; remove defects before slicing.",
  });

  tips.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shelf_life_table() {
    assert_eq!(ShelfLife::of(None, RiskLevel::Low, RiskLevel::Low).days, 0);
    assert_eq!(ShelfLife::of(Some(Grade::A), RiskLevel::High, RiskLevel::Low).days, 1);
    assert_eq!(ShelfLife::of(Some(Grade::A), RiskLevel::Low, RiskLevel::High).days, 1);
    assert_eq!(ShelfLife::of(Some(Grade::B), RiskLevel::Medium, RiskLevel::Low).days, 3);
    assert_eq!(ShelfLife::of(Some(Grade::B), RiskLevel::Low, RiskLevel::Low).days, 5);
    assert_eq!(ShelfLife::of(Some(Grade::C), RiskLevel::Low, RiskLevel::Low).label, "3–4 days");
  }

  #[test]
  fn market_value_by_grade() {
    let a = MarketValue::of(Some(Grade::A), RiskLevel::Low, RiskLevel::Low);
    assert_eq!((a.label, a.score, a.lane), (MarketLabel::Premium, 92, "Export / Premium"));
    let b = MarketValue::of(Some(Grade::B), RiskLevel::High, RiskLevel::High);
    assert_eq!((b.label, b.score), (MarketLabel::Standard, 54));
    let rejected = MarketValue::of(None, RiskLevel::High, RiskLevel::High);
    assert_eq!((rejected.label, rejected.score), (MarketLabel::Rejected, 0));
  }

  #[test]
  fn rejected_gets_rescan_tips_only() {
    let tips = recommendations(90.0, RiskLevel::High, RiskLevel::High, SizeCategory::Large, MarketLabel::Rejected);
    assert_eq!(tips.len(), 2);
    assert!(tips[0].starts_with("Rescan"));
  }

  #[test]
  fn premium_large_ripe_fruit_tips() {
    let tips = recommendations(90.0, RiskLevel::Low, RiskLevel::Medium, SizeCategory::Large, MarketLabel::Premium);
    assert_eq!(tips.len(), 5);
    assert!(tips.iter().any(|t| t.contains("insect")));
    assert!(tips.last().is_some_and(|t| t.contains("premium/export")));
  }
}
