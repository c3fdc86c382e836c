// 该文件是 Huolong （火龙） 项目的一部分。
// src/grading.rs - 分级与判定
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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod decision;
mod grade;
mod labels;

pub use self::decision::{
  Decision, DecisionEngine, DiseaseEvidence, Validity, check_validity, disease_description,
};
pub use self::grade::{GradeContext, GradeResolution, GradeStage};
pub use self::labels::{MarketLabel, MarketValue, ShelfLife, recommendations};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
  #[error("数值异常: {stage} = {value}")]
  NonFinite { stage: &'static str, value: f64 },
  #[error("未知等级: {0}")]
  UnknownGrade(String),
}

/// 内部五级等级；对外有效结果最终落在 A-C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
  A,
  B,
  C,
  D,
  E,
}

impl Grade {
  const LADDER: [Grade; 5] = [Grade::E, Grade::D, Grade::C, Grade::B, Grade::A];

  /// E=0 … A=4，越大越好
  pub fn rank(self) -> u8 {
    match self {
      Grade::E => 0,
      Grade::D => 1,
      Grade::C => 2,
      Grade::B => 3,
      Grade::A => 4,
    }
  }

  fn from_rank(rank: u8) -> Self {
    Self::LADDER[rank.min(4) as usize]
  }

  pub fn from_quality_index(index: f64) -> Self {
    if index >= 85.0 {
      Grade::A
    } else if index >= 72.0 {
      Grade::B
    } else if index >= 58.0 {
      Grade::C
    } else if index >= 45.0 {
      Grade::D
    } else {
      Grade::E
    }
  }

  /// 降一级，E 不再下降
  pub fn step_down(self) -> Self {
    Self::from_rank(self.rank().saturating_sub(1))
  }

  /// 只升不降
  pub fn at_least(self, floor: Grade) -> Self {
    if self.rank() >= floor.rank() { self } else { floor }
  }

  /// 价格模型使用的序数：A=3, B=2, C=1, 其它（含无效）0
  pub fn ordinal_of(grade: Option<Grade>) -> f64 {
    match grade {
      Some(Grade::A) => 3.0,
      Some(Grade::B) => 2.0,
      Some(Grade::C) => 1.0,
      _ => 0.0,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Grade::A => "A",
      Grade::B => "B",
      Grade::C => "C",
      Grade::D => "D",
      Grade::E => "E",
    }
  }
}

impl fmt::Display for Grade {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Grade {
  type Err = DecisionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "A" => Ok(Grade::A),
      "B" => Ok(Grade::B),
      "C" => Ok(Grade::C),
      "D" => Ok(Grade::D),
      "E" => Ok(Grade::E),
      _ => Err(DecisionError::UnknownGrade(s.to_string())),
    }
  }
}

/// `Option<Grade>` 的序列化形式，无效结果记为 "N/A"
pub mod grade_label {
  use super::Grade;
  use serde::{Deserialize, Deserializer, Serializer};

  pub const NOT_APPLICABLE: &str = "N/A";

  pub fn serialize<S: Serializer>(grade: &Option<Grade>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(grade.map(|g| g.as_str()).unwrap_or(NOT_APPLICABLE))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Grade>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| s.parse().ok()))
  }
}
