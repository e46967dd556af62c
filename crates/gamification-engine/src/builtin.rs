//! 内置规则目录
//!
//! 学习项目默认的积分规则、徽章和等级。部署方可以通过 `catalog.path`
//! 配置指向 JSON 文件替换整套定义（`gamification catalog` 可导出当前定义作为起点）。

use crate::catalog::RuleCatalog;
use crate::error::Result;
use crate::models::{Badge, BadgeCategory, BadgeDefinition, Level, PointsRule, RuleCategory};
use crate::operators::Operator;
use crate::predicate::Predicate;

impl RuleCatalog {
    /// 构建内置目录
    pub fn builtin() -> Result<Self> {
        Self::new(builtin_rules(), builtin_badges(), builtin_levels())
    }
}

fn builtin_rules() -> Vec<PointsRule> {
    use RuleCategory::*;

    vec![
        PointsRule::new("assignment_submitted", 10, Assignment, &["assignment_submitted"]),
        PointsRule::new("assignment_grade_90", 15, Assignment, &["assignment_grade_90_plus"]),
        PointsRule::new("assignment_perfect", 25, Assignment, &["assignment_grade_100"]),
        // 提前两天及以上提交才享受倍率
        PointsRule::new("assignment_early", 5, Bonus, &["assignment_submitted_early"])
            .with_multiplier(1.5, Predicate::condition("days_early", Operator::Gte, 2)),
        PointsRule::new("video_watched", 2, Bonus, &["video_watched", "lesson_replayed"]),
        PointsRule::new("daily_login", 1, Bonus, &["daily_login"]),
        PointsRule::new("streak_maintained", 5, Bonus, &["streak_maintained"])
            .with_multiplier(2.0, Predicate::condition("streak_days", Operator::Gte, 7)),
        PointsRule::new("peer_review", 8, Social, &["peer_review_submitted"]),
        PointsRule::new(
            "helpful_answer",
            5,
            Social,
            &["forum_answer_accepted", "helpful_answer"],
        ),
        PointsRule::new("module_complete", 50, Milestone, &["module_completed"]),
        PointsRule::new("phase_complete", 100, Milestone, &["phase_completed"]),
        PointsRule::new("program_complete", 500, Milestone, &["program_completed"]),
    ]
}

fn badge(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    color: &str,
    category: BadgeCategory,
    unlock: Option<Predicate>,
) -> BadgeDefinition {
    BadgeDefinition {
        badge: Badge {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            category,
        },
        unlock,
    }
}

fn action_is(action: &str) -> Predicate {
    Predicate::condition("action", Operator::Eq, action)
}

fn builtin_badges() -> Vec<BadgeDefinition> {
    use BadgeCategory::*;

    vec![
        badge(
            "first_submission",
            "First Steps",
            "Submitted your first assignment",
            "🚀",
            "blue",
            Achievement,
            Some(Predicate::all(vec![
                action_is("assignment_submitted"),
                Predicate::condition("user.completed_assignments", Operator::Gte, 1),
            ])),
        ),
        badge(
            "perfect_score",
            "Perfectionist",
            "Scored 100% on an assignment",
            "💯",
            "gold",
            Achievement,
            Some(Predicate::any(vec![
                action_is("assignment_grade_100"),
                Predicate::condition("context.grade", Operator::Eq, 100),
            ])),
        ),
        badge(
            "early_bird",
            "Early Bird",
            "Submitted an assignment at least two days early",
            "🐦",
            "green",
            Achievement,
            Some(Predicate::all(vec![
                action_is("assignment_submitted_early"),
                Predicate::condition("context.days_early", Operator::Gte, 2),
            ])),
        ),
        badge(
            "week_streak",
            "On Fire",
            "Kept a seven-day learning streak",
            "🔥",
            "orange",
            Achievement,
            Some(Predicate::all(vec![
                action_is("streak_maintained"),
                Predicate::condition("context.streak_days", Operator::Gte, 7),
            ])),
        ),
        badge(
            "peer_reviewer",
            "Helpful Peer",
            "Submitted five peer reviews",
            "🤝",
            "purple",
            Social,
            Some(Predicate::all(vec![
                action_is("peer_review_submitted"),
                Predicate::condition("context.reviews_given", Operator::Gte, 5),
            ])),
        ),
        badge(
            "century_club",
            "Century Club",
            "Earned 100 points",
            "🏅",
            "silver",
            Milestone,
            Some(Predicate::condition("user.total_points", Operator::Gte, 100)),
        ),
        badge(
            "point_master",
            "Point Master",
            "Earned 1,000 points",
            "🏆",
            "gold",
            Milestone,
            Some(Predicate::condition("user.total_points", Operator::Gte, 1000)),
        ),
        badge(
            "halfway_there",
            "Halfway There",
            "Completed half of the program's assignments",
            "⛰️",
            "teal",
            Milestone,
            Some(Predicate::all(vec![
                Predicate::condition("user.total_assignments", Operator::Gt, 0),
                Predicate::condition("user.completion_rate", Operator::Gte, 50),
            ])),
        ),
        badge(
            "phase_6_complete",
            "Midway Scholar",
            "Reached phase 6 of the program",
            "📘",
            "indigo",
            Milestone,
            Some(Predicate::condition("user.current_phase", Operator::Gte, 6)),
        ),
        badge(
            "phase_12_complete",
            "Program Graduate",
            "Completed all twelve phases",
            "🎓",
            "crimson",
            Milestone,
            Some(Predicate::condition("user.current_phase", Operator::Gte, 12)),
        ),
        // 由导师团队人工授予
        badge(
            "mentor",
            "Mentor",
            "Recognised by staff for mentoring fellow students",
            "🧭",
            "teal",
            Special,
            None,
        ),
    ]
}

fn builtin_levels() -> Vec<Level> {
    vec![
        Level::new(1, 0, &["course_access", "community_forum"]),
        Level::new(2, 100, &["profile_badge_showcase"]),
        Level::new(3, 250, &["study_group_creation"]),
        Level::new(4, 500, &["priority_qa"]),
        Level::new(5, 1000, &["mentor_office_hours"]),
        Level::new(6, 2000, &["project_showcase"]),
        Level::new(7, 3500, &["peer_mentor_eligibility"]),
        Level::new(8, 5500, &["career_coaching_session"]),
        Level::new(9, 8000, &["alumni_network_preview"]),
        Level::new(10, 12000, &["certificate_of_distinction", "alumni_network"]),
    ]
}
