//! 游戏化引擎
//!
//! 学习项目的积分、徽章、等级与排行榜计算：
//! - 只读规则目录（内置或 JSON 文件），构建时校验
//! - 积分计算（含倍率与四舍五入）
//! - 徽章解锁谓词评估
//! - 等级推导与稳定排序的排行榜
//!
//! 所有计算都是纯函数，不做 I/O，可在任意多个请求间共享同一个目录。

pub mod badges;
mod builtin;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod leaderboard;
pub mod models;
pub mod operators;
pub mod points;
pub mod predicate;

pub use badges::{BadgeEvaluator, UserStatsView};
pub use catalog::{CatalogDefinition, RuleCatalog};
pub use engine::{EventOutcome, GamificationEngine};
pub use error::{GamificationError, Result};
pub use leaderboard::{
    LeaderboardPeriod, LeaderboardRanker, LeaderboardStats, LevelProgress, NOT_AVAILABLE,
};
pub use models::{
    Badge, BadgeCategory, BadgeDefinition, EarnedBadge, LeaderboardEntry, Level, Multiplier,
    PointsRule, RuleCategory,
};
pub use operators::{LogicalOperator, Operator};
pub use points::{ActionAward, PointsBreakdown, PointsCalculator};
pub use predicate::{ActionContext, Condition, LogicalGroup, Predicate};
