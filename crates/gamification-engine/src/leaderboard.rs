//! 等级与排行榜
//!
//! 所有操作都返回新集合，不修改调用方传入的条目。排名按积分降序，
//! 积分相同的条目保持输入中的相对顺序（稳定排序）。

use crate::catalog::RuleCatalog;
use crate::models::{LeaderboardEntry, Level};
use gamification_shared::observability::metrics::record_leaderboard_ranking;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// 空排行榜统计的占位值
pub const NOT_AVAILABLE: &str = "N/A";

/// 排行榜统计周期
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    #[default]
    AllTime,
    Weekly,
    Monthly,
}

impl LeaderboardPeriod {
    /// 该周期用于排序的积分
    pub fn points(&self, entry: &LeaderboardEntry) -> i64 {
        match self {
            Self::AllTime => entry.total_points,
            Self::Weekly => entry.weekly_points,
            Self::Monthly => entry.monthly_points,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllTime => "all_time",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "all_time" | "all" | "total" => Ok(Self::AllTime),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(format!("未知的排行榜周期: {}", other)),
        }
    }
}

/// 排行榜聚合统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardStats {
    pub total_students: usize,
    pub average_points: i64,
    pub top_performer: String,
    pub most_active_cohort: String,
    pub total_points_awarded: i64,
}

impl LeaderboardStats {
    fn empty() -> Self {
        Self {
            total_students: 0,
            average_points: 0,
            top_performer: NOT_AVAILABLE.to_string(),
            most_active_cohort: NOT_AVAILABLE.to_string(),
            total_points_awarded: 0,
        }
    }
}

/// 等级进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: Level,
    pub next_level: Option<Level>,
    pub experience: i64,
    pub experience_to_next: i64,
    /// 当前等级区间已完成的百分比，最高级为 100
    pub progress_percent: u32,
}

/// 等级与排行榜计算
#[derive(Debug, Clone)]
pub struct LeaderboardRanker {
    catalog: Arc<RuleCatalog>,
}

impl LeaderboardRanker {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    // ==================== 等级 ====================

    pub fn level_for_experience(&self, exp: i64) -> &Level {
        self.catalog.level_for_experience(exp)
    }

    /// 距下一级还差的经验，最高级或已超过时为 0；负经验按 0 处理
    pub fn experience_to_next_level(&self, current_exp: i64, current_level: u32) -> i64 {
        let current_exp = current_exp.max(0);
        self.catalog
            .next_level(current_level)
            .map(|next| next.required_exp.saturating_sub(current_exp).max(0))
            .unwrap_or(0)
    }

    pub fn level_progress(&self, exp: i64) -> LevelProgress {
        let experience = exp.max(0);
        let level = self.catalog.level_for_experience(experience);
        let next_level = self.catalog.next_level(level.level);

        let progress_percent = match next_level {
            Some(next) => {
                let span = next.required_exp - level.required_exp;
                let done = experience - level.required_exp;
                (done.saturating_mul(100) / span).clamp(0, 100) as u32
            }
            None => 100,
        };

        LevelProgress {
            level: level.clone(),
            next_level: next_level.cloned(),
            experience,
            experience_to_next: self.experience_to_next_level(experience, level.level),
            progress_percent,
        }
    }

    // ==================== 排名 ====================

    /// 按总积分排名
    pub fn rank(&self, entries: &[LeaderboardEntry]) -> Vec<LeaderboardEntry> {
        self.rank_by(entries, LeaderboardPeriod::AllTime)
    }

    /// 按指定周期积分排名
    ///
    /// `previous_rank` 取条目原有的 `rank`，没有则取其在输入中的位置（从 1 开始）。
    /// 输入的 `rank` 应来自同一周期的上一次排名，否则 `rank_change` 比较的是两张不同的榜。
    pub fn rank_by(
        &self,
        entries: &[LeaderboardEntry],
        period: LeaderboardPeriod,
    ) -> Vec<LeaderboardEntry> {
        let start = Instant::now();

        let mut order: Vec<usize> = (0..entries.len()).collect();
        // sort_by 是稳定排序，同分条目保持输入顺序
        order.sort_by(|&a, &b| period.points(&entries[b]).cmp(&period.points(&entries[a])));

        let ranked: Vec<LeaderboardEntry> = order
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let mut entry = entries[index].clone();
                entry.previous_rank = Some(entry.rank.unwrap_or(index as u32 + 1));
                entry.rank = Some(position as u32 + 1);
                entry.level = Some(self.catalog.level_for_experience(entry.experience).level);
                entry
            })
            .collect();

        let elapsed = start.elapsed().as_secs_f64();
        record_leaderboard_ranking(period.as_str(), ranked.len(), elapsed);
        debug!(period = %period, entries = ranked.len(), "排行榜排名完成");

        ranked
    }

    /// 只对指定班级排名
    ///
    /// 输入中的 `rank` 属于全体榜单，与班级榜不可比，因此 `previous_rank`
    /// 取成员在过滤后列表中的位置。
    pub fn rank_cohort(
        &self,
        entries: &[LeaderboardEntry],
        cohort: &str,
        period: LeaderboardPeriod,
    ) -> Vec<LeaderboardEntry> {
        let members: Vec<LeaderboardEntry> = entries
            .iter()
            .filter(|e| e.cohort == cohort)
            .map(|e| LeaderboardEntry {
                rank: None,
                ..e.clone()
            })
            .collect();
        self.rank_by(&members, period)
    }

    // ==================== 统计 ====================

    pub fn leaderboard_stats(&self, entries: &[LeaderboardEntry]) -> LeaderboardStats {
        if entries.is_empty() {
            return LeaderboardStats::empty();
        }

        // i128 累加不会溢出，总数再截断回 i64
        let exact_sum: i128 = entries.iter().map(|e| i128::from(e.total_points)).sum();
        let total_points_awarded = exact_sum.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
        let average_points = (exact_sum as f64 / entries.len() as f64).round() as i64;

        let top = Self::top_performer(entries);

        LeaderboardStats {
            total_students: entries.len(),
            average_points,
            top_performer: top.name.clone(),
            most_active_cohort: Self::most_active_cohort(entries),
            total_points_awarded,
        }
    }

    /// 排名第一的条目
    ///
    /// 已排名的列表（含周榜、月榜）取 `rank == 1` 的条目；未排名时取最高总积分中
    /// 输入最靠前的条目，与 [`rank`](Self::rank) 的结果一致。
    fn top_performer(entries: &[LeaderboardEntry]) -> &LeaderboardEntry {
        if let Some(ranked_first) = entries.iter().find(|e| e.rank == Some(1)) {
            return ranked_first;
        }

        let mut top = &entries[0];
        for entry in &entries[1..] {
            if entry.total_points > top.total_points {
                top = entry;
            }
        }
        top
    }

    /// 人数最多的班级，并列时取输入中先出现的；忽略空班级名
    fn most_active_cohort(entries: &[LeaderboardEntry]) -> String {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();

        for entry in entries.iter().filter(|e| !e.cohort.is_empty()) {
            let count = counts.entry(entry.cohort.as_str()).or_insert(0);
            if *count == 0 {
                first_seen.push(entry.cohort.as_str());
            }
            *count += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for cohort in first_seen {
            let count = counts[cohort];
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((cohort, count));
            }
        }

        best.map(|(cohort, _)| cohort.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}
