//! 规则目录
//!
//! 持有积分规则、徽章和等级的只读定义。构建时完成全部校验并预建
//! 动作索引，之后不可变，可通过 `Arc` 在任意多个请求间共享。

use crate::error::{GamificationError, Result};
use crate::models::{Badge, BadgeDefinition, Level, PointsRule};
use gamification_shared::config::CatalogConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use tracing::{info, instrument, warn};

/// 目录的可序列化定义（JSON 文件格式）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub rules: Vec<PointsRule>,
    #[serde(default)]
    pub badges: Vec<BadgeDefinition>,
    pub levels: Vec<Level>,
}

/// 规则目录
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<PointsRule>,
    badges: Vec<BadgeDefinition>,
    levels: Vec<Level>,
    /// 动作 token -> 第一条声明该 token 的规则下标
    action_index: HashMap<String, usize>,
    badge_index: HashMap<String, usize>,
}

impl RuleCatalog {
    /// 校验并构建目录
    pub fn new(
        rules: Vec<PointsRule>,
        badges: Vec<BadgeDefinition>,
        levels: Vec<Level>,
    ) -> Result<Self> {
        Self::validate_levels(&levels)?;
        let action_index = Self::index_rules(&rules)?;
        let badge_index = Self::index_badges(&badges)?;

        info!(
            rule_count = rules.len(),
            badge_count = badges.len(),
            level_count = levels.len(),
            action_count = action_index.len(),
            "规则目录已构建"
        );

        Ok(Self {
            rules,
            badges,
            levels,
            action_index,
            badge_index,
        })
    }

    pub fn from_definition(definition: CatalogDefinition) -> Result<Self> {
        Self::new(definition.rules, definition.badges, definition.levels)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let definition: CatalogDefinition = serde_json::from_str(json)?;
        Self::from_definition(definition)
    }

    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// 按配置加载：配置了文件路径则读文件，否则使用内置目录
    pub fn load(config: &CatalogConfig) -> Result<Self> {
        match &config.path {
            Some(path) => {
                info!(path = %path.display(), "从文件加载规则目录");
                Self::from_path(path)
            }
            None => {
                info!("使用内置规则目录");
                Self::builtin()
            }
        }
    }

    /// 导出为可序列化定义
    pub fn to_definition(&self) -> CatalogDefinition {
        CatalogDefinition {
            rules: self.rules.clone(),
            badges: self.badges.clone(),
            levels: self.levels.clone(),
        }
    }

    // ==================== 查询 ====================

    /// 第一条（按声明顺序）条件包含 `action` 的规则
    pub fn find_rule(&self, action: &str) -> Option<&PointsRule> {
        self.action_index.get(action).map(|&i| &self.rules[i])
    }

    pub fn find_badge(&self, id: &str) -> Option<&Badge> {
        self.badge_index.get(id).map(|&i| &self.badges[i].badge)
    }

    /// 按声明顺序返回所有徽章
    pub fn all_badges(&self) -> impl Iterator<Item = &Badge> {
        self.badges.iter().map(|d| &d.badge)
    }

    pub fn badge_definitions(&self) -> &[BadgeDefinition] {
        &self.badges
    }

    pub fn rules(&self) -> &[PointsRule] {
        &self.rules
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// 经验值对应的最高等级；负值按 0 处理，最低为 1 级
    pub fn level_for_experience(&self, exp: i64) -> &Level {
        let exp = exp.max(0);
        // levels 按 required_exp 严格升序且 1 级为 0，下标至少为 1
        let idx = self.levels.partition_point(|l| l.required_exp <= exp);
        &self.levels[idx.saturating_sub(1)]
    }

    /// 下一等级，已是最高级时返回 None
    pub fn next_level(&self, current_level: u32) -> Option<&Level> {
        // 等级号为 1..=n 连续，下标 current_level 即 current_level + 1 级
        self.levels.get(current_level as usize)
    }

    pub fn max_level(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    // ==================== 校验 ====================

    fn validate_levels(levels: &[Level]) -> Result<()> {
        let first = levels
            .first()
            .ok_or_else(|| GamificationError::invalid_catalog("等级列表不能为空"))?;

        if first.required_exp != 0 {
            return Err(GamificationError::invalid_catalog(format!(
                "1 级所需经验必须为 0，实际为 {}",
                first.required_exp
            )));
        }

        for (i, level) in levels.iter().enumerate() {
            let expected = i as u32 + 1;
            if level.level != expected {
                return Err(GamificationError::invalid_catalog(format!(
                    "等级编号必须从 1 开始连续递增：第 {} 项为 {} 级",
                    expected, level.level
                )));
            }
        }

        for pair in levels.windows(2) {
            if pair[1].required_exp <= pair[0].required_exp {
                return Err(GamificationError::invalid_catalog(format!(
                    "{} 级所需经验 {} 必须大于 {} 级的 {}",
                    pair[1].level, pair[1].required_exp, pair[0].level, pair[0].required_exp
                )));
            }
        }

        Ok(())
    }

    fn index_rules(rules: &[PointsRule]) -> Result<HashMap<String, usize>> {
        let mut rule_ids = HashMap::with_capacity(rules.len());
        let mut action_index = HashMap::new();

        for (i, rule) in rules.iter().enumerate() {
            if rule.id.is_empty() {
                return Err(GamificationError::invalid_catalog(format!(
                    "第 {} 条积分规则的 ID 不能为空",
                    i + 1
                )));
            }
            if rule_ids.insert(rule.id.as_str(), i).is_some() {
                return Err(GamificationError::invalid_catalog(format!(
                    "积分规则 ID 重复: {}",
                    rule.id
                )));
            }
            if rule.points == 0 {
                return Err(GamificationError::invalid_catalog(format!(
                    "积分规则 {} 的基础积分必须为正数",
                    rule.id
                )));
            }
            if rule.conditions.is_empty() {
                return Err(GamificationError::invalid_catalog(format!(
                    "积分规则 {} 至少需要一个动作 token",
                    rule.id
                )));
            }
            if let Some(multiplier) = &rule.multiplier {
                if !multiplier.factor.is_finite() || multiplier.factor <= 0.0 {
                    return Err(GamificationError::invalid_catalog(format!(
                        "积分规则 {} 的倍率必须为正有限数，实际为 {}",
                        rule.id, multiplier.factor
                    )));
                }
                multiplier
                    .eligible_when
                    .validate(&format!("rules.{}.multiplier", rule.id))?;
            }

            for token in &rule.conditions {
                if token.is_empty() {
                    return Err(GamificationError::invalid_catalog(format!(
                        "积分规则 {} 含有空的动作 token",
                        rule.id
                    )));
                }
                match action_index.entry(token.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(i);
                    }
                    Entry::Occupied(slot) => {
                        let owner: &PointsRule = &rules[*slot.get()];
                        if owner.id != rule.id {
                            warn!(
                                action = %token,
                                owner = %owner.id,
                                shadowed = %rule.id,
                                "动作 token 被多条规则声明，按声明顺序取第一条"
                            );
                        }
                    }
                }
            }
        }

        Ok(action_index)
    }

    fn index_badges(badges: &[BadgeDefinition]) -> Result<HashMap<String, usize>> {
        let mut badge_index = HashMap::with_capacity(badges.len());

        for (i, definition) in badges.iter().enumerate() {
            let id = &definition.badge.id;
            if id.is_empty() {
                return Err(GamificationError::invalid_catalog(format!(
                    "第 {} 个徽章的 ID 不能为空",
                    i + 1
                )));
            }
            if badge_index.insert(id.clone(), i).is_some() {
                return Err(GamificationError::invalid_catalog(format!(
                    "徽章 ID 重复: {}",
                    id
                )));
            }
            if let Some(unlock) = &definition.unlock {
                unlock.validate(&format!("badges.{}.unlock", id))?;
            }
        }

        Ok(badge_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BadgeCategory, RuleCategory};
    use crate::operators::Operator;
    use crate::predicate::Predicate;

    fn levels() -> Vec<Level> {
        vec![
            Level::new(1, 0, &["forum_access"]),
            Level::new(2, 100, &["profile_flair"]),
            Level::new(3, 300, &["mentor_chat"]),
        ]
    }

    fn badge(id: &str, unlock: Option<Predicate>) -> BadgeDefinition {
        BadgeDefinition {
            badge: Badge {
                id: id.to_string(),
                name: id.to_string(),
                description: String::new(),
                icon: "⭐".to_string(),
                color: "gold".to_string(),
                category: BadgeCategory::Achievement,
            },
            unlock,
        }
    }

    fn catalog() -> RuleCatalog {
        RuleCatalog::new(
            vec![
                PointsRule::new("submit", 10, RuleCategory::Assignment, &["assignment_submitted"]),
                PointsRule::new("login", 2, RuleCategory::Bonus, &["daily_login", "app_opened"]),
                PointsRule::new("login_v2", 4, RuleCategory::Bonus, &["daily_login"]),
            ],
            vec![
                badge("starter", Some(Predicate::condition("user.total_points", Operator::Gte, 10))),
                badge("mentor", None),
            ],
            levels(),
        )
        .unwrap()
    }

    #[test]
    fn test_find_rule_first_declared_wins() {
        let catalog = catalog();
        assert_eq!(catalog.find_rule("daily_login").unwrap().id, "login");
        assert_eq!(catalog.find_rule("app_opened").unwrap().id, "login");
        assert_eq!(catalog.find_rule("assignment_submitted").unwrap().id, "submit");
        assert!(catalog.find_rule("unknown_action").is_none());
        assert!(catalog.find_rule("").is_none());
    }

    #[test]
    fn test_badge_lookup_in_declaration_order() {
        let catalog = catalog();
        assert_eq!(catalog.find_badge("mentor").unwrap().id, "mentor");
        assert!(catalog.find_badge("nope").is_none());

        let ids: Vec<&str> = catalog.all_badges().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["starter", "mentor"]);
    }

    #[test]
    fn test_level_for_experience() {
        let catalog = catalog();
        assert_eq!(catalog.level_for_experience(-50).level, 1);
        assert_eq!(catalog.level_for_experience(0).level, 1);
        assert_eq!(catalog.level_for_experience(99).level, 1);
        assert_eq!(catalog.level_for_experience(100).level, 2);
        assert_eq!(catalog.level_for_experience(299).level, 2);
        assert_eq!(catalog.level_for_experience(300).level, 3);
        assert_eq!(catalog.level_for_experience(i64::MAX).level, 3);
    }

    #[test]
    fn test_next_level() {
        let catalog = catalog();
        assert_eq!(catalog.next_level(1).unwrap().level, 2);
        assert_eq!(catalog.next_level(2).unwrap().level, 3);
        assert!(catalog.next_level(3).is_none());
        assert_eq!(catalog.max_level().level, 3);
    }

    #[test]
    fn test_rejects_invalid_levels() {
        let err = RuleCatalog::new(vec![], vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("等级列表不能为空"));

        let not_zero = vec![Level::new(1, 10, &[])];
        assert!(RuleCatalog::new(vec![], vec![], not_zero).is_err());

        let duplicate_exp = vec![Level::new(1, 0, &[]), Level::new(2, 0, &[])];
        assert!(RuleCatalog::new(vec![], vec![], duplicate_exp).is_err());

        let gap = vec![Level::new(1, 0, &[]), Level::new(3, 100, &[])];
        assert!(RuleCatalog::new(vec![], vec![], gap).is_err());
    }

    #[test]
    fn test_rejects_invalid_rules() {
        let zero = vec![PointsRule::new("zero", 0, RuleCategory::Bonus, &["x"])];
        assert!(RuleCatalog::new(zero, vec![], levels()).is_err());

        let no_tokens = vec![PointsRule::new("empty", 5, RuleCategory::Bonus, &[])];
        assert!(RuleCatalog::new(no_tokens, vec![], levels()).is_err());

        let duplicate = vec![
            PointsRule::new("a", 5, RuleCategory::Bonus, &["x"]),
            PointsRule::new("a", 5, RuleCategory::Bonus, &["y"]),
        ];
        assert!(RuleCatalog::new(duplicate, vec![], levels()).is_err());

        let negative = vec![
            PointsRule::new("neg", 5, RuleCategory::Bonus, &["x"])
                .with_multiplier(-1.0, Predicate::condition("a", Operator::Eq, 1)),
        ];
        assert!(RuleCatalog::new(negative, vec![], levels()).is_err());

        let nan = vec![
            PointsRule::new("nan", 5, RuleCategory::Bonus, &["x"])
                .with_multiplier(f64::NAN, Predicate::condition("a", Operator::Eq, 1)),
        ];
        assert!(RuleCatalog::new(nan, vec![], levels()).is_err());
    }

    #[test]
    fn test_rejects_duplicate_badges() {
        let badges = vec![badge("starter", None), badge("starter", None)];
        let err = RuleCatalog::new(vec![], badges, levels()).unwrap_err();
        assert_eq!(err.code(), "INVALID_CATALOG");
    }

    #[test]
    fn test_definition_json_round_trip_keeps_lookup() {
        let json = serde_json::to_string(&catalog().to_definition()).unwrap();
        let reloaded = RuleCatalog::from_json(&json).unwrap();

        assert_eq!(reloaded.find_rule("daily_login").unwrap().id, "login");
        assert_eq!(reloaded.levels().len(), 3);
        assert_eq!(reloaded.badge_definitions().len(), 2);
    }

    #[test]
    fn test_load_without_path_uses_builtin() {
        let catalog = RuleCatalog::load(&CatalogConfig::default()).unwrap();
        assert!(catalog.find_rule("assignment_submitted_early").is_some());
    }
}
