// 该文件是 Huolong （火龙） 项目的一部分。
// src/grading/grade.rs - 等级流水线
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

use serde::Serialize;

use super::Grade;
use crate::features::RiskLevel;

/// 病害检测置信度高于此值时降一级
const DISEASE_DOWNGRADE_CONF: f64 = 0.85;

/// 流水线各阶段共享的只读输入
#[derive(Debug, Clone, Copy)]
pub struct GradeContext {
  pub quality_index: f64,
  pub quality_score: f64,
  pub defect_level: RiskLevel,
  pub insect_level: RiskLevel,
  pub disease_status: RiskLevel,
  pub disease_best_conf: f64,
  pub fresh_candidate: bool,
  pub floor_c_quality: f64,
  pub floor_b_quality: f64,
}

impl GradeContext {
  fn healthy_low_defect(&self) -> bool {
    self.disease_status == RiskLevel::Low && self.defect_level == RiskLevel::Low
  }
}

/// 基础等级之后依次执行的纯变换，顺序敏感
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStage {
  /// 缺陷等级为高：降一级
  DowngradeDefect,
  /// 虫害等级为高：降一级
  DowngradeInsect,
  /// 病害检测置信度 ≥ 0.85：降一级
  DowngradeDisease,
  /// 健康、低缺陷且品质达到 C 档下限：至少 C
  PromoteHealthyC,
  /// 新鲜候选：至少 B
  PromoteFresh,
  /// 健康、低缺陷且品质达到 B 档下限：至少 B
  PromoteHealthyB,
  /// 有效果实最终不低于 C
  FinalFloor,
}

impl GradeStage {
  pub const PIPELINE: [GradeStage; 7] = [
    GradeStage::DowngradeDefect,
    GradeStage::DowngradeInsect,
    GradeStage::DowngradeDisease,
    GradeStage::PromoteHealthyC,
    GradeStage::PromoteFresh,
    GradeStage::PromoteHealthyB,
    GradeStage::FinalFloor,
  ];

  pub fn apply(self, grade: Grade, ctx: &GradeContext) -> Grade {
    match self {
      GradeStage::DowngradeDefect if ctx.defect_level == RiskLevel::High => grade.step_down(),
      GradeStage::DowngradeInsect if ctx.insect_level == RiskLevel::High => grade.step_down(),
      GradeStage::DowngradeDisease if ctx.disease_best_conf >= DISEASE_DOWNGRADE_CONF => {
        grade.step_down()
      }
      GradeStage::PromoteHealthyC
        if ctx.healthy_low_defect() && ctx.quality_score >= ctx.floor_c_quality =>
      {
        grade.at_least(Grade::C)
      }
      GradeStage::PromoteFresh if ctx.fresh_candidate => grade.at_least(Grade::B),
      GradeStage::PromoteHealthyB
        if ctx.healthy_low_defect() && ctx.quality_score >= ctx.floor_b_quality =>
      {
        grade.at_least(Grade::B)
      }
      GradeStage::FinalFloor => grade.at_least(Grade::C),
      _ => grade,
    }
  }
}

/// 基础等级、最终等级与每个改变了等级的阶段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeResolution {
  pub base: Grade,
  pub grade: Grade,
  pub trace: Vec<(GradeStage, Grade)>,
}

impl GradeResolution {
  pub fn resolve(ctx: &GradeContext) -> Self {
    let base = Grade::from_quality_index(ctx.quality_index);
    let mut trace = Vec::new();
    let grade = GradeStage::PIPELINE.iter().fold(base, |grade, stage| {
      let next = stage.apply(grade, ctx);
      if next != grade {
        trace.push((*stage, next));
      }
      next
    });
    GradeResolution { base, grade, trace }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ctx(quality_index: f64) -> GradeContext {
    GradeContext {
      quality_index,
      quality_score: 70.0,
      defect_level: RiskLevel::Low,
      insect_level: RiskLevel::Low,
      disease_status: RiskLevel::Medium,
      disease_best_conf: 0.0,
      fresh_candidate: false,
      floor_c_quality: 60.0,
      floor_b_quality: 78.0,
    }
  }

  #[test]
  fn downgrades_are_independent() {
    let c = GradeContext {
      defect_level: RiskLevel::High,
      insect_level: RiskLevel::High,
      disease_best_conf: 0.9,
      ..ctx(90.0)
    };
    let mut grade = Grade::A;
    for stage in &GradeStage::PIPELINE[..3] {
      grade = stage.apply(grade, &c);
    }
    assert_eq!(grade, Grade::D);
    // 最终下限把 D 拉回 C
    assert_eq!(GradeResolution::resolve(&c).grade, Grade::C);
  }

  #[test]
  fn final_floor_keeps_valid_fruit_at_c_or_better() {
    for qi in [0.0, 20.0, 44.9, 50.0] {
      let r = GradeResolution::resolve(&ctx(qi));
      assert_eq!(r.grade, Grade::C);
      assert!(r.base.rank() < Grade::C.rank());
      assert_eq!(r.trace.last().map(|t| t.0), Some(GradeStage::FinalFloor));
    }
  }

  #[test]
  fn fresh_candidate_promotes_to_b() {
    let c = GradeContext { fresh_candidate: true, ..ctx(60.0) };
    let r = GradeResolution::resolve(&c);
    assert_eq!(r.base, Grade::C);
    assert_eq!(r.grade, Grade::B);
    assert_eq!(r.trace, vec![(GradeStage::PromoteFresh, Grade::B)]);
  }

  #[test]
  fn healthy_promotions_need_quality_floors() {
    let healthy = GradeContext {
      disease_status: RiskLevel::Low,
      quality_score: 80.0,
      ..ctx(50.0)
    };
    let r = GradeResolution::resolve(&healthy);
    assert_eq!(r.grade, Grade::B);
    assert_eq!(r.trace[0], (GradeStage::PromoteHealthyC, Grade::C));

    let below_b = GradeContext { quality_score: 65.0, ..healthy };
    assert_eq!(GradeResolution::resolve(&below_b).grade, Grade::C);
  }

  #[test]
  fn promotions_never_lower() {
    let c = GradeContext {
      disease_status: RiskLevel::Low,
      quality_score: 95.0,
      fresh_candidate: true,
      ..ctx(95.0)
    };
    let r = GradeResolution::resolve(&c);
    assert_eq!(r.grade, Grade::A);
    assert!(r.trace.is_empty());
  }
}
