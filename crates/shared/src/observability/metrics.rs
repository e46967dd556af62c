//! Prometheus 指标模块
//!
//! 基于 metrics crate 记录引擎的业务指标。recorder 只在启用时安装；
//! 未安装时所有记录函数都是空操作。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Metrics 资源守卫，持有 recorder 的渲染句柄
pub struct MetricsHandle {
    handle: PrometheusHandle,
}

impl MetricsHandle {
    /// 渲染 Prometheus 文本格式快照
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// 安装全局 Prometheus recorder
pub fn init(service_name: &str) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    Ok(MetricsHandle { handle })
}

/// 注册指标描述（出现在渲染结果的 HELP 注释中）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "points_awarded_total",
        "Total points awarded by the points calculator"
    );
    metrics::describe_counter!(
        "point_events_total",
        "Number of point computations, by rule match outcome"
    );
    metrics::describe_counter!(
        "badges_awarded_total",
        "Badges awarded by processed events"
    );
    metrics::describe_counter!(
        "leaderboard_rankings_total",
        "Number of leaderboard ranking computations"
    );
    metrics::describe_histogram!(
        "leaderboard_ranking_duration_seconds",
        "Leaderboard ranking duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次积分计算；`rule_id` 为 None 表示动作未匹配任何规则
#[inline]
pub fn record_points_awarded(rule_id: Option<&str>, category: &str, points: u32) {
    let matched = rule_id.is_some();
    metrics::counter!(
        "point_events_total",
        "matched" => matched.to_string()
    )
    .increment(1);

    if let Some(rule_id) = rule_id {
        metrics::counter!(
            "points_awarded_total",
            "rule_id" => rule_id.to_string(),
            "category" => category.to_string()
        )
        .increment(u64::from(points));
    }
}

/// 记录徽章授予
#[inline]
pub fn record_badge_awarded(badge_id: &str) {
    metrics::counter!(
        "badges_awarded_total",
        "badge_id" => badge_id.to_string()
    )
    .increment(1);
}

/// 记录排行榜排名计算
#[inline]
pub fn record_leaderboard_ranking(period: &str, entries: usize, duration_secs: f64) {
    metrics::counter!(
        "leaderboard_rankings_total",
        "period" => period.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "leaderboard_ranking_duration_seconds",
        "period" => period.to_string()
    )
    .record(duration_secs);

    metrics::gauge!("leaderboard_entries", "period" => period.to_string()).set(entries as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 即使没有初始化 recorder，这些函数也不应该 panic
        record_points_awarded(Some("assignment_submitted"), "assignment", 10);
        record_points_awarded(None, "none", 0);
        record_badge_awarded("century_club");
        record_leaderboard_ranking("all_time", 3, 0.001);
    }
}
