//! 游戏化领域模型

use crate::predicate::Predicate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 积分规则分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Assignment,
    Bonus,
    Social,
    Milestone,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Bonus => "bonus",
            Self::Social => "social",
            Self::Milestone => "milestone",
        }
    }
}

/// 积分倍率
///
/// 仅当 `eligible_when` 对事件上下文成立时，基础积分乘以 `factor`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiplier {
    pub factor: f64,
    pub eligible_when: Predicate,
}

/// 积分规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsRule {
    pub id: String,
    pub points: u32,
    pub category: RuleCategory,
    /// 触发本规则的动作 token，匹配任意一个即触发
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<Multiplier>,
}

impl PointsRule {
    pub fn new(
        id: impl Into<String>,
        points: u32,
        category: RuleCategory,
        conditions: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            points,
            category,
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            multiplier: None,
        }
    }

    pub fn with_multiplier(mut self, factor: f64, eligible_when: Predicate) -> Self {
        self.multiplier = Some(Multiplier {
            factor,
            eligible_when,
        });
        self
    }

    pub fn matches(&self, action: &str) -> bool {
        self.conditions.iter().any(|c| c == action)
    }
}

/// 徽章分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Achievement,
    Milestone,
    Special,
    Social,
}

/// 徽章元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub category: BadgeCategory,
}

/// 目录中的徽章定义：元数据 + 解锁谓词
///
/// 没有谓词的徽章处于休眠状态，永远不会被授予。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    #[serde(flatten)]
    pub badge: Badge,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock: Option<Predicate>,
}

impl BadgeDefinition {
    pub fn is_dormant(&self) -> bool {
        self.unlock.is_none()
    }
}

/// 授予用户的徽章实例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    #[serde(flatten)]
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}

impl EarnedBadge {
    pub fn id(&self) -> &str {
        &self.badge.id
    }
}

/// 经验等级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub level: u32,
    pub required_exp: i64,
    #[serde(default)]
    pub benefits: Vec<String>,
}

impl Level {
    pub fn new(level: u32, required_exp: i64, benefits: &[&str]) -> Self {
        Self {
            level,
            required_exp,
            benefits: benefits.iter().map(|b| b.to_string()).collect(),
        }
    }
}

/// 排行榜条目
///
/// 由外部进度存储加载，引擎只读取并派生 `rank`、`previous_rank`、`level`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub cohort: String,
    pub total_points: i64,
    pub weekly_points: i64,
    pub monthly_points: i64,
    pub completed_assignments: u32,
    pub total_assignments: u32,
    pub experience: i64,
    pub current_phase: u32,
    pub rank: Option<u32>,
    pub previous_rank: Option<u32>,
    pub level: Option<u32>,
    /// 已获得的徽章 ID
    pub badges: Vec<String>,
}

impl LeaderboardEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total_points: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_points,
            ..Default::default()
        }
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.badges.iter().any(|b| b == badge_id)
    }

    /// 作业完成百分比（取整），没有作业时为 0
    pub fn completion_rate(&self) -> u32 {
        if self.total_assignments == 0 {
            return 0;
        }
        let rate = u64::from(self.completed_assignments) * 100 / u64::from(self.total_assignments);
        rate.min(100) as u32
    }

    /// 名次变化：正数表示上升
    pub fn rank_change(&self) -> Option<i64> {
        match (self.previous_rank, self.rank) {
            (Some(previous), Some(current)) => Some(i64::from(previous) - i64::from(current)),
            _ => None,
        }
    }
}
