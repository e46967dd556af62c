//! 谓词树与求值
//!
//! 倍率资格和徽章解锁条件都用同一种可序列化的条件树表达，
//! 与徽章元数据一起存放在目录中。求值为短路求值，
//! 任何内部错误（类型不匹配等）都折叠为 `false`。

use crate::error::{GamificationError, Result};
use crate::evaluator::ConditionEvaluator;
use crate::operators::{LogicalOperator, Operator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// 谓词节点（条件或逻辑组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    Condition(Condition),
    Group(LogicalGroup),
}

/// 条件节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalGroup {
    pub operator: LogicalOperator,
    pub children: Vec<Predicate>,
}

impl LogicalGroup {
    pub fn new(operator: LogicalOperator, children: Vec<Predicate>) -> Self {
        Self { operator, children }
    }
}

impl Predicate {
    /// 单条件谓词
    pub fn condition(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Condition(Condition::new(field, operator, value))
    }

    /// 所有子谓词都满足
    pub fn all(children: Vec<Predicate>) -> Self {
        Self::Group(LogicalGroup::new(LogicalOperator::And, children))
    }

    /// 任一子谓词满足
    pub fn any(children: Vec<Predicate>) -> Self {
        Self::Group(LogicalGroup::new(LogicalOperator::Or, children))
    }

    /// 求值；错误视为不满足
    pub fn is_satisfied(&self, context: &ActionContext) -> bool {
        match self.evaluate(context) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(error = %e, "谓词求值失败，按不满足处理");
                false
            }
        }
    }

    /// 求值，保留内部错误
    pub fn evaluate(&self, context: &ActionContext) -> Result<bool> {
        match self {
            Self::Condition(cond) => {
                let field_value = context.get_field(&cond.field);
                ConditionEvaluator::evaluate(field_value, cond.operator, &cond.value)
            }
            Self::Group(group) => match group.operator {
                // AND: 遇到 false 立即返回
                LogicalOperator::And => {
                    for child in &group.children {
                        if !child.evaluate(context)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                // OR: 遇到 true 立即返回
                LogicalOperator::Or => {
                    for child in &group.children {
                        if child.evaluate(context)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            },
        }
    }

    /// 结构校验，在目录构建时调用
    pub fn validate(&self, path: &str) -> Result<()> {
        match self {
            Self::Condition(cond) => {
                if cond.field.is_empty() {
                    return Err(GamificationError::invalid_catalog(format!(
                        "条件 '{}' 的字段不能为空",
                        path
                    )));
                }
                if cond.operator.is_unary() {
                    if !cond.value.is_null() {
                        return Err(GamificationError::invalid_catalog(format!(
                            "条件 '{}' 的 {} 操作符不接受期望值",
                            path, cond.operator
                        )));
                    }
                } else if cond.operator == Operator::Between {
                    let ok = cond.value.as_array().is_some_and(|arr| arr.len() == 2);
                    if !ok {
                        return Err(GamificationError::invalid_catalog(format!(
                            "条件 '{}' 的 between 操作符需要 [min, max] 数组",
                            path
                        )));
                    }
                } else if cond.operator.expects_array() && !cond.value.is_array() {
                    return Err(GamificationError::invalid_catalog(format!(
                        "条件 '{}' 的 {} 操作符需要数组值",
                        path, cond.operator
                    )));
                }
                Ok(())
            }
            Self::Group(group) => {
                if group.children.is_empty() {
                    return Err(GamificationError::invalid_catalog(format!(
                        "逻辑组 '{}' 不能为空",
                        path
                    )));
                }
                for (i, child) in group.children.iter().enumerate() {
                    child.validate(&format!("{}.children[{}]", path, i))?;
                }
                Ok(())
            }
        }
    }
}

/// 事件上下文：调用方随动作一起传入的任意键值数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionContext {
    data: Value,
}

impl ActionContext {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 空上下文
    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 按点号路径取值，如 "user.current_phase"，数组支持数字下标
    pub fn get_field(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;

        for part in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl From<Value> for ActionContext {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graded_context() -> ActionContext {
        ActionContext::new(json!({
            "assignment": {
                "id": "asg-42",
                "grade": 94,
                "attempts": [ {"score": 71}, {"score": 94} ]
            },
            "days_early": 3,
            "cohort": "spring-2026"
        }))
    }

    #[test]
    fn test_get_field_paths() {
        let ctx = graded_context();
        assert_eq!(ctx.get_field("assignment.grade"), Some(&json!(94)));
        assert_eq!(ctx.get_field("assignment.attempts.1.score"), Some(&json!(94)));
        assert_eq!(ctx.get_field("days_early"), Some(&json!(3)));
        assert_eq!(ctx.get_field("assignment.missing"), None);
        assert_eq!(ctx.get_field("days_early.value"), None);
    }

    #[test]
    fn test_group_short_circuit() {
        let ctx = graded_context();

        let all = Predicate::all(vec![
            Predicate::condition("assignment.grade", Operator::Gte, 90),
            Predicate::condition("days_early", Operator::Gte, 2),
        ]);
        assert!(all.is_satisfied(&ctx));

        let any = Predicate::any(vec![
            Predicate::condition("assignment.grade", Operator::Eq, 100),
            Predicate::condition("cohort", Operator::StartsWith, "spring"),
        ]);
        assert!(any.is_satisfied(&ctx));
    }

    #[test]
    fn test_or_stops_before_failing_branch() {
        // 第二个分支会类型不匹配，但 OR 在第一个分支已经返回
        let ctx = graded_context();
        let predicate = Predicate::any(vec![
            Predicate::condition("assignment.grade", Operator::Gte, 90),
            Predicate::condition("cohort", Operator::Gte, 10),
        ]);
        assert!(predicate.evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_errors_collapse_to_false() {
        let ctx = ActionContext::new(json!({ "assignment": { "grade": "A+" } }));
        let predicate = Predicate::condition("assignment.grade", Operator::Gte, 90);

        assert!(predicate.evaluate(&ctx).is_err());
        assert!(!predicate.is_satisfied(&ctx));
    }

    #[test]
    fn test_predicate_json_shape() {
        let json = r#"
        {
            "type": "group",
            "operator": "AND",
            "children": [
                { "type": "condition", "field": "action", "operator": "eq", "value": "assignment_graded" },
                { "type": "condition", "field": "context.grade", "operator": "eq", "value": 100 }
            ]
        }
        "#;

        let predicate: Predicate = serde_json::from_str(json).unwrap();
        let expected = Predicate::all(vec![
            Predicate::condition("action", Operator::Eq, "assignment_graded"),
            Predicate::condition("context.grade", Operator::Eq, 100),
        ]);
        assert_eq!(predicate, expected);
    }

    #[test]
    fn test_validate_rejects_malformed_nodes() {
        assert!(Predicate::all(vec![]).validate("root").is_err());
        assert!(
            Predicate::condition("", Operator::Eq, 1)
                .validate("root")
                .is_err()
        );
        assert!(
            Predicate::condition("grade", Operator::Between, json!([90]))
                .validate("root")
                .is_err()
        );
        assert!(
            Predicate::condition("cohort", Operator::In, "spring")
                .validate("root")
                .is_err()
        );
        assert!(
            Predicate::condition("grade", Operator::Between, json!([90, 100]))
                .validate("root")
                .is_ok()
        );
    }

    #[test]
    fn test_validate_unary_operators() {
        let bare: Predicate = serde_json::from_value(json!({
            "type": "condition",
            "field": "context.mentor_note",
            "operator": "is_not_empty"
        }))
        .unwrap();
        assert!(bare.validate("root").is_ok());

        let err = Predicate::condition("context.mentor_note", Operator::IsEmpty, "x")
            .validate("badges.mentor.unlock")
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CATALOG");
        assert!(err.to_string().contains("badges.mentor.unlock"));
    }
}
