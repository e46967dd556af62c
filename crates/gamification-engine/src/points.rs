//! 积分计算器
//!
//! 动作 + 上下文 -> 非负整数积分。未知动作得 0 分，不会让调用方的事务失败。

use crate::catalog::RuleCatalog;
use crate::models::{PointsRule, RuleCategory};
use crate::predicate::ActionContext;
use gamification_shared::observability::metrics::record_points_awarded;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// 单个动作的积分明细
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionAward {
    pub action: String,
    /// 匹配的规则，未知动作为 None
    pub rule_id: Option<String>,
    pub category: Option<RuleCategory>,
    pub points: u32,
    pub multiplier_applied: bool,
}

/// 多个动作的积分汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointsBreakdown {
    pub awards: Vec<ActionAward>,
    pub total: u64,
}

/// 积分计算器
#[derive(Debug, Clone)]
pub struct PointsCalculator {
    catalog: Arc<RuleCatalog>,
}

impl PointsCalculator {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    /// 计算一次动作的积分
    pub fn compute_points(&self, action: &str, context: &ActionContext) -> u32 {
        self.award(action, context).points
    }

    /// 逐个动作计算并汇总
    ///
    /// 同一事件满足多个动作 token 时（如提前提交且成绩 90 分以上），
    /// 每个 token 单独计算一次再求和。
    pub fn compute_breakdown<S: AsRef<str>>(
        &self,
        actions: &[S],
        context: &ActionContext,
    ) -> PointsBreakdown {
        let awards: Vec<ActionAward> = actions
            .iter()
            .map(|action| self.award(action.as_ref(), context))
            .collect();
        let total = awards.iter().map(|a| u64::from(a.points)).sum();

        PointsBreakdown { awards, total }
    }

    fn award(&self, action: &str, context: &ActionContext) -> ActionAward {
        let mut award = ActionAward {
            action: action.to_string(),
            rule_id: None,
            category: None,
            points: 0,
            multiplier_applied: false,
        };

        if action.is_empty() {
            debug!("空动作 token，积分为 0");
            record_points_awarded(None, "none", 0);
            return award;
        }

        let Some(rule) = self.catalog.find_rule(action) else {
            debug!(action, "未知动作，积分为 0");
            record_points_awarded(None, "none", 0);
            return award;
        };

        let (points, multiplier_applied) = Self::apply_rule(rule, context);

        debug!(
            action,
            rule_id = %rule.id,
            base_points = rule.points,
            points,
            multiplier_applied,
            "积分计算完成"
        );
        record_points_awarded(Some(&rule.id), rule.category.as_str(), points);

        award.rule_id = Some(rule.id.clone());
        award.category = Some(rule.category);
        award.points = points;
        award.multiplier_applied = multiplier_applied;
        award
    }

    fn apply_rule(rule: &PointsRule, context: &ActionContext) -> (u32, bool) {
        match &rule.multiplier {
            Some(multiplier) if multiplier.eligible_when.is_satisfied(context) => {
                (round_half_away_from_zero(rule.points, multiplier.factor), true)
            }
            _ => (rule.points, false),
        }
    }
}

/// `points * factor` 四舍五入（.5 远离零），结果截断到 u32 范围
fn round_half_away_from_zero(points: u32, factor: f64) -> u32 {
    // f64::round 即 half-away-from-zero
    let scaled = (f64::from(points) * factor).round();
    scaled.clamp(0.0, f64::from(u32::MAX)) as u32
}
