//! 引擎端到端集成测试
//!
//! 使用内置目录，按学员的真实事件流验证积分、徽章、等级和排行榜的协作。

use gamification_engine::{
    ActionContext, GamificationEngine, LeaderboardEntry, LeaderboardPeriod, RuleCatalog,
};
use serde_json::json;
use std::sync::Arc;

fn engine() -> GamificationEngine {
    GamificationEngine::new(Arc::new(RuleCatalog::builtin().unwrap()))
}

fn student(id: &str, name: &str, cohort: &str, points: i64) -> LeaderboardEntry {
    LeaderboardEntry {
        id: id.to_string(),
        name: name.to_string(),
        cohort: cohort.to_string(),
        total_points: points,
        experience: points,
        ..Default::default()
    }
}

/// 把事件结果写回学员记录，模拟调用方的持久化
fn apply(user: &mut LeaderboardEntry, outcome: &gamification_engine::EventOutcome) {
    let delta = i64::from(outcome.points);
    user.total_points = outcome.total_points;
    user.experience = outcome.experience;
    user.weekly_points += delta;
    user.monthly_points += delta;
    user.badges
        .extend(outcome.new_badges.iter().map(|b| b.id().to_string()));
}

// ============================================================================
// 积分
// ============================================================================

mod points_tests {
    use super::*;

    #[test]
    fn test_submission_is_worth_ten_points() {
        let engine = engine();
        assert_eq!(
            engine
                .points()
                .compute_points("assignment_submitted", &ActionContext::empty()),
            10
        );
    }

    #[test]
    fn test_early_submission_multiplier_rounds_half_up() {
        let engine = engine();
        let eligible = ActionContext::new(json!({ "days_early": 3 }));
        let ineligible = ActionContext::new(json!({ "days_early": 1 }));

        // 5 * 1.5 = 7.5 -> 8
        assert_eq!(
            engine
                .points()
                .compute_points("assignment_submitted_early", &eligible),
            8
        );
        assert_eq!(
            engine
                .points()
                .compute_points("assignment_submitted_early", &ineligible),
            5
        );
    }

    #[test]
    fn test_unknown_and_empty_actions_earn_nothing() {
        let engine = engine();
        let ctx = ActionContext::empty();
        assert_eq!(engine.points().compute_points("course_bookmarked", &ctx), 0);
        assert_eq!(engine.points().compute_points("", &ctx), 0);
    }

    #[test]
    fn test_breakdown_sums_actions() {
        let engine = engine();
        let ctx = ActionContext::new(json!({ "days_early": 2 }));

        let breakdown = engine.points().compute_breakdown(
            &["assignment_submitted", "assignment_submitted_early", "unknown"],
            &ctx,
        );

        assert_eq!(breakdown.awards.len(), 3);
        assert_eq!(breakdown.total, 18);
        assert!(breakdown.awards[1].multiplier_applied);
        assert_eq!(breakdown.awards[2].points, 0);
        assert!(breakdown.awards[2].rule_id.is_none());
    }
}

// ============================================================================
// 事件流
// ============================================================================

mod journey_tests {
    use super::*;

    #[test]
    fn test_student_journey_across_a_phase() {
        let engine = engine();
        let mut user = student("stu-42", "Margaret", "spring-2026", 0);
        user.total_assignments = 4;

        // 第一次提交作业
        user.completed_assignments = 1;
        let outcome = engine.process_event(&user, "assignment_submitted", &ActionContext::empty());
        assert_eq!(outcome.points, 10);
        let ids: Vec<&str> = outcome.new_badges.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["first_submission"]);
        apply(&mut user, &outcome);

        // 满分
        let outcome = engine.process_event(&user, "assignment_grade_100", &ActionContext::empty());
        assert_eq!(outcome.points, 25);
        let ids: Vec<&str> = outcome.new_badges.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["perfect_score"]);
        apply(&mut user, &outcome);

        // 完成一半作业并完成阶段
        user.completed_assignments = 2;
        user.current_phase = 6;
        let outcome = engine.process_event(&user, "phase_completed", &ActionContext::empty());
        assert_eq!(outcome.points, 100);
        assert_eq!(outcome.total_points, 135);
        assert!(outcome.leveled_up);
        assert_eq!(outcome.level_after, 2);
        let ids: Vec<&str> = outcome.new_badges.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["century_club", "halfway_there", "phase_6_complete"]);
        apply(&mut user, &outcome);

        // 已获得的徽章不会重复授予
        let outcome = engine.process_event(&user, "daily_login", &ActionContext::empty());
        assert_eq!(outcome.points, 1);
        assert!(outcome.new_badges.is_empty());
        assert!(!outcome.leveled_up);

        assert_eq!(user.badges.len(), 5);
    }

    #[test]
    fn test_streak_bonus_and_badge() {
        let engine = engine();
        let user = student("stu-7", "Edsger", "fall-2026", 0);
        let ctx = ActionContext::new(json!({ "streak_days": 7 }));

        let outcome = engine.process_event(&user, "streak_maintained", &ctx);

        assert_eq!(outcome.points, 10);
        let ids: Vec<&str> = outcome.new_badges.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["week_streak"]);
    }
}

// ============================================================================
// 排行榜
// ============================================================================

mod leaderboard_tests {
    use super::*;

    #[test]
    fn test_rank_then_stats() {
        let engine = engine();
        let entries = vec![
            student("a", "Ada", "spring", 50),
            student("b", "Barbara", "fall", 50),
            student("c", "Claude", "spring", 30),
        ];

        let ranked = engine.ranker().rank(&entries);
        let ids: Vec<&str> = ranked.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let stats = engine.ranker().leaderboard_stats(&ranked);
        assert_eq!(stats.total_students, 3);
        assert_eq!(stats.total_points_awarded, 130);
        assert_eq!(stats.average_points, 43);
        assert_eq!(stats.top_performer, "Ada");
        assert_eq!(stats.most_active_cohort, "spring");
    }

    #[test]
    fn test_weekly_board_uses_weekly_points() {
        let engine = engine();
        let mut veteran = student("v", "Veteran", "x", 5_000);
        veteran.weekly_points = 3;
        let mut newcomer = student("n", "Newcomer", "x", 40);
        newcomer.weekly_points = 40;

        let ranked = engine
            .ranker()
            .rank_by(&[veteran, newcomer], LeaderboardPeriod::Weekly);

        assert_eq!(ranked[0].id, "n");
        assert_eq!(ranked[0].rank, Some(1));
        assert_eq!(ranked[0].rank_change(), Some(1));
        // 等级始终按经验计算
        assert_eq!(ranked[1].level, Some(7));

        let stats = engine.ranker().leaderboard_stats(&ranked);
        assert_eq!(stats.top_performer, "Newcomer");
    }

    #[test]
    fn test_empty_leaderboard() {
        let engine = engine();
        assert!(engine.ranker().rank(&[]).is_empty());

        let stats = engine.ranker().leaderboard_stats(&[]);
        assert_eq!(stats.total_students, 0);
        assert_eq!(stats.top_performer, "N/A");
        assert_eq!(stats.most_active_cohort, "N/A");
    }
}
