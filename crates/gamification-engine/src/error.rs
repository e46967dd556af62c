//! 游戏化引擎错误类型
//!
//! 计算路径本身是全函数（未知动作得 0 分、谓词失败视为不满足），
//! 只有目录构建与谓词内部求值会产生错误。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GamificationError {
    #[error("规则目录无效: {0}")]
    InvalidCatalog(String),

    #[error("无效的操作符: {operator} 不支持类型 {value_type}")]
    InvalidOperator {
        operator: String,
        value_type: String,
    },

    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("读取目录文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl GamificationError {
    pub(crate) fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog(message.into())
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCatalog(_) => "INVALID_CATALOG",
            Self::InvalidOperator { .. } => "INVALID_OPERATOR",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GamificationError>;
