//! 配置管理模块
//!
//! 支持多层 TOML 配置文件加载、环境变量覆盖，以及类型安全的配置访问。

use crate::observability::ObservabilityConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 环境变量前缀（GAMIFICATION_CATALOG__PATH -> catalog.path）
const ENV_PREFIX: &str = "GAMIFICATION";

/// 规则目录配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON 目录文件路径，None 表示使用内置目录
    pub path: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub catalog: CatalogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "gamification".to_string(),
            environment: "development".to_string(),
            observability: ObservabilityConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（GAMIFICATION_ 前缀，嵌套字段用双下划线分隔）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("GAMIFICATION_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), &env, service_name)
    }

    /// 从指定目录加载配置
    pub fn load_from(config_dir: &Path, env: &str, service_name: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        // 日志中的服务名与配置保持一致
        config.observability = config.observability.with_service_name(&config.service_name);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_config_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gamification-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.service_name, "gamification");
        assert!(config.catalog.path.is_none());
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4()));
        let config = AppConfig::load_from(&dir, "test", "gamification-cli").unwrap();

        assert_eq!(config.service_name, "gamification-cli");
        assert_eq!(config.environment, "test");
        assert_eq!(config.observability.service_name, "gamification-cli");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_layered_files_override_in_order() {
        let dir = temp_config_dir();
        fs::write(
            dir.join("default.toml"),
            "[observability]\nlog_level = \"warn\"\njson_logs = false\n",
        )
        .unwrap();
        fs::write(
            dir.join("production.toml"),
            "[observability]\njson_logs = true\n\n[catalog]\npath = \"/etc/gamification/catalog.json\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&dir, "production", "gamification").unwrap();

        assert_eq!(config.environment, "production");
        assert_eq!(config.observability.log_level, "warn");
        assert!(config.observability.json_logs);
        assert_eq!(
            config.catalog.path,
            Some(PathBuf::from("/etc/gamification/catalog.json"))
        );

        fs::remove_dir_all(dir).unwrap();
    }
}
