//! 引擎门面
//!
//! 把积分、徽章、等级三个组件绑定到同一个目录上，按事件处理流程依次调用。
//! 只返回计算结果，累计值的持久化和并发控制由调用方负责。

use crate::badges::BadgeEvaluator;
use crate::catalog::RuleCatalog;
use crate::leaderboard::LeaderboardRanker;
use crate::models::{EarnedBadge, LeaderboardEntry};
use crate::points::PointsCalculator;
use crate::predicate::ActionContext;
use gamification_shared::observability::metrics::record_badge_awarded;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// 单个事件的处理结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventOutcome {
    pub user_id: String,
    pub action: String,
    pub points: u32,
    /// 加上本次积分后的总积分
    pub total_points: i64,
    /// 加上本次积分后的经验
    pub experience: i64,
    pub new_badges: Vec<EarnedBadge>,
    pub level_before: u32,
    pub level_after: u32,
    pub leveled_up: bool,
}

/// 游戏化引擎
#[derive(Debug, Clone)]
pub struct GamificationEngine {
    catalog: Arc<RuleCatalog>,
    points: PointsCalculator,
    badges: BadgeEvaluator,
    ranker: LeaderboardRanker,
}

impl GamificationEngine {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self {
            points: PointsCalculator::new(catalog.clone()),
            badges: BadgeEvaluator::new(catalog.clone()),
            ranker: LeaderboardRanker::new(catalog.clone()),
            catalog,
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn points(&self) -> &PointsCalculator {
        &self.points
    }

    pub fn badges(&self) -> &BadgeEvaluator {
        &self.badges
    }

    pub fn ranker(&self) -> &LeaderboardRanker {
        &self.ranker
    }

    /// 处理一个事件：计算积分 -> 刷新用户视图 -> 评估徽章 -> 比较等级
    #[instrument(skip(self, user, context), fields(user_id = %user.id))]
    pub fn process_event(
        &self,
        user: &LeaderboardEntry,
        action: &str,
        context: &ActionContext,
    ) -> EventOutcome {
        let points = self.points.compute_points(action, context);
        let refreshed = Self::apply_points(user, points);

        let new_badges = self.badges.eligible_badges(&refreshed, action, context);
        for badge in &new_badges {
            record_badge_awarded(badge.id());
        }

        let level_before = self.catalog.level_for_experience(user.experience).level;
        let level_after = self.catalog.level_for_experience(refreshed.experience).level;
        let leveled_up = level_after > level_before;

        if leveled_up || !new_badges.is_empty() {
            info!(
                points,
                level_before,
                level_after,
                new_badges = new_badges.len(),
                "用户进度变化"
            );
        }

        EventOutcome {
            user_id: user.id.clone(),
            action: action.to_string(),
            points,
            total_points: refreshed.total_points,
            experience: refreshed.experience,
            new_badges,
            level_before,
            level_after,
            leveled_up,
        }
    }

    /// 本项目中经验与积分同步增长
    fn apply_points(user: &LeaderboardEntry, points: u32) -> LeaderboardEntry {
        let delta = i64::from(points);
        let mut refreshed = user.clone();
        refreshed.total_points = refreshed.total_points.saturating_add(delta);
        refreshed.weekly_points = refreshed.weekly_points.saturating_add(delta);
        refreshed.monthly_points = refreshed.monthly_points.saturating_add(delta);
        refreshed.experience = refreshed.experience.saturating_add(delta);
        refreshed
    }
}
