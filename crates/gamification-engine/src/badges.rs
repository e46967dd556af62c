//! 徽章评估器
//!
//! 按目录声明顺序逐个评估徽章解锁谓词。谓词看到的输入为
//! `{ user: <统计视图>, action, context }`。已持有的徽章不会再次出现，
//! 徽章一旦获得即为终态，本引擎从不回收。

use crate::catalog::RuleCatalog;
use crate::models::{EarnedBadge, LeaderboardEntry};
use crate::predicate::ActionContext;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// 谓词可见的用户统计视图
#[derive(Debug, Clone, Serialize)]
pub struct UserStatsView<'a> {
    pub total_points: i64,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub experience: i64,
    pub completed_assignments: u32,
    pub total_assignments: u32,
    /// 作业完成百分比（取整）
    pub completion_rate: u32,
    pub current_phase: u32,
    pub badge_count: usize,
    pub cohort: &'a str,
    pub level: u32,
}

impl<'a> UserStatsView<'a> {
    pub fn new(user: &'a LeaderboardEntry, catalog: &RuleCatalog) -> Self {
        Self {
            total_points: user.total_points,
            weekly_points: user.weekly_points,
            monthly_points: user.monthly_points,
            experience: user.experience,
            completed_assignments: user.completed_assignments,
            total_assignments: user.total_assignments,
            completion_rate: user.completion_rate(),
            current_phase: user.current_phase,
            badge_count: user.badges.len(),
            cohort: &user.cohort,
            level: catalog.level_for_experience(user.experience).level,
        }
    }
}

/// 徽章评估器
#[derive(Debug, Clone)]
pub struct BadgeEvaluator {
    catalog: Arc<RuleCatalog>,
}

impl BadgeEvaluator {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    /// 用户当前可新获得的徽章，获得时间为调用时刻
    ///
    /// 只做资格查询，不计入授予指标；授予指标由
    /// [`GamificationEngine::process_event`](crate::GamificationEngine::process_event) 记录。
    pub fn eligible_badges(
        &self,
        user: &LeaderboardEntry,
        action: &str,
        context: &ActionContext,
    ) -> Vec<EarnedBadge> {
        self.eligible_badges_at(user, action, context, Utc::now())
    }

    /// 同 [`eligible_badges`](Self::eligible_badges)，显式指定获得时间
    pub fn eligible_badges_at(
        &self,
        user: &LeaderboardEntry,
        action: &str,
        context: &ActionContext,
        earned_at: DateTime<Utc>,
    ) -> Vec<EarnedBadge> {
        let input = self.predicate_input(user, action, context);

        let eligible: Vec<EarnedBadge> = self
            .catalog
            .badge_definitions()
            .iter()
            .filter(|definition| !user.has_badge(&definition.badge.id))
            .filter(|definition| match &definition.unlock {
                Some(unlock) => unlock.is_satisfied(&input),
                None => false,
            })
            .map(|definition| EarnedBadge {
                badge: definition.badge.clone(),
                earned_at,
            })
            .collect();

        debug!(
            user_id = %user.id,
            action,
            eligible = eligible.len(),
            "徽章评估完成"
        );

        eligible
    }

    fn predicate_input(
        &self,
        user: &LeaderboardEntry,
        action: &str,
        context: &ActionContext,
    ) -> ActionContext {
        ActionContext::new(json!({
            "user": UserStatsView::new(user, &self.catalog),
            "action": action,
            "context": context.data(),
        }))
    }
}
