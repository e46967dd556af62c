//! 条件评估器
//!
//! 对单个条件求值：从上下文取出的字段值与目录中声明的期望值比较。
//! 类型不兼容时返回错误，由谓词层统一折叠为"不满足"。

use crate::error::{GamificationError, Result};
use crate::operators::Operator;
use serde_json::Value;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `field_value` - 从上下文中获取的字段值
    /// * `operator` - 操作符
    /// * `expected_value` - 目录中声明的期望值
    pub fn evaluate(
        field_value: Option<&Value>,
        operator: Operator,
        expected_value: &Value,
    ) -> Result<bool> {
        // 空值检查的语义就是检查字段是否存在
        match operator {
            Operator::IsEmpty => return Ok(Self::is_empty(field_value)),
            Operator::IsNotEmpty => return Ok(!Self::is_empty(field_value)),
            _ => {}
        }

        // 字段缺失：条件不满足
        let field_value = match field_value {
            Some(v) => v,
            None => return Ok(false),
        };

        match operator {
            Operator::Eq => Ok(Self::eq(field_value, expected_value)),
            Operator::Neq => Ok(!Self::eq(field_value, expected_value)),
            Operator::Gt => Self::compare(field_value, expected_value, |a, b| a > b),
            Operator::Gte => Self::compare(field_value, expected_value, |a, b| a >= b),
            Operator::Lt => Self::compare(field_value, expected_value, |a, b| a < b),
            Operator::Lte => Self::compare(field_value, expected_value, |a, b| a <= b),
            Operator::Between => Self::between(field_value, expected_value),
            Operator::In => Self::in_list(field_value, expected_value),
            Operator::NotIn => Self::in_list(field_value, expected_value).map(|r| !r),
            Operator::Contains => Self::contains(field_value, expected_value),
            Operator::StartsWith => {
                Self::string_op(field_value, expected_value, operator, |s, p| s.starts_with(p))
            }
            Operator::EndsWith => {
                Self::string_op(field_value, expected_value, operator, |s, p| s.ends_with(p))
            }
            Operator::IsEmpty | Operator::IsNotEmpty => unreachable!(),
        }
    }

    fn is_empty(value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(arr)) => arr.is_empty(),
            Some(Value::Object(obj)) => obj.is_empty(),
            _ => false,
        }
    }

    /// 相等比较
    fn eq(field: &Value, expected: &Value) -> bool {
        // 数值统一转为浮点数，避免 90 与 90.0 比较失败
        if let (Some(f1), Some(f2)) = (Self::as_f64(field), Self::as_f64(expected)) {
            return (f1 - f2).abs() < f64::EPSILON;
        }

        field == expected
    }

    fn compare<F>(field: &Value, expected: &Value, cmp: F) -> Result<bool>
    where
        F: Fn(f64, f64) -> bool,
    {
        let field_num = Self::require_f64(field)?;
        let expected_num = Self::require_f64(expected)?;
        Ok(cmp(field_num, expected_num))
    }

    /// 闭区间比较，expected 为 [min, max]
    fn between(field: &Value, expected: &Value) -> Result<bool> {
        let bounds = match expected.as_array() {
            Some(arr) if arr.len() == 2 => arr,
            _ => {
                return Err(GamificationError::TypeMismatch {
                    expected: "array [min, max]".to_string(),
                    actual: Self::type_name(expected).to_string(),
                });
            }
        };

        let value = Self::require_f64(field)?;
        let min = Self::require_f64(&bounds[0])?;
        let max = Self::require_f64(&bounds[1])?;

        Ok(value >= min && value <= max)
    }

    fn in_list(field: &Value, expected: &Value) -> Result<bool> {
        let arr = expected
            .as_array()
            .ok_or_else(|| GamificationError::TypeMismatch {
                expected: "array".to_string(),
                actual: Self::type_name(expected).to_string(),
            })?;

        Ok(arr.iter().any(|item| Self::eq(field, item)))
    }

    /// 字符串子串或数组元素包含
    fn contains(field: &Value, expected: &Value) -> Result<bool> {
        match field {
            Value::String(s) => {
                let substr = expected
                    .as_str()
                    .ok_or_else(|| GamificationError::TypeMismatch {
                        expected: "string".to_string(),
                        actual: Self::type_name(expected).to_string(),
                    })?;
                Ok(s.contains(substr))
            }
            Value::Array(arr) => Ok(arr.iter().any(|item| Self::eq(item, expected))),
            _ => Err(GamificationError::InvalidOperator {
                operator: Operator::Contains.to_string(),
                value_type: Self::type_name(field).to_string(),
            }),
        }
    }

    fn string_op<F>(field: &Value, expected: &Value, operator: Operator, op: F) -> Result<bool>
    where
        F: Fn(&str, &str) -> bool,
    {
        let s = field
            .as_str()
            .ok_or_else(|| GamificationError::InvalidOperator {
                operator: operator.to_string(),
                value_type: Self::type_name(field).to_string(),
            })?;

        let pattern = expected
            .as_str()
            .ok_or_else(|| GamificationError::TypeMismatch {
                expected: "string".to_string(),
                actual: Self::type_name(expected).to_string(),
            })?;

        Ok(op(s, pattern))
    }

    fn require_f64(value: &Value) -> Result<f64> {
        Self::as_f64(value).ok_or_else(|| GamificationError::TypeMismatch {
            expected: "number".to_string(),
            actual: Self::type_name(value).to_string(),
        })
    }

    /// 上游表单数据常以字符串形式携带数字，如 "92"
    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}
