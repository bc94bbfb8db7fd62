//! 引导配置
//!
//! 只描述发现引擎与日志本身需要的设置，不管理应用配置值。

use crate::errors::ConfigError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// 默认的服务声明目录
pub const DEFAULT_SERVICES_PREFIX: &str = "META-INF/services";

/// 环境变量前缀，例如 `INJECT__SERVICES_PREFIX`
pub const ENV_PREFIX: &str = "INJECT";

/// 日志设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 日志级别：trace / debug / info / warn / error
    pub level: String,
    /// 是否输出 JSON
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// 引导配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// 服务声明文件所在的目录前缀
    pub services_prefix: String,
    /// 根作用域的资源根目录，按顺序扫描
    pub resource_roots: Vec<PathBuf>,
    /// 日志设置
    pub logging: LoggingSettings,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            services_prefix: DEFAULT_SERVICES_PREFIX.to_string(),
            resource_roots: Vec::new(),
            logging: LoggingSettings::default(),
        }
    }
}

impl BootstrapConfig {
    /// 加载引导配置
    ///
    /// 先读取可选的配置文件，再以 `INJECT__` 前缀的环境变量覆盖。
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("加载引导配置: {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.services_prefix.trim_matches('/');
        if prefix.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "services_prefix 不能为空".to_string(),
            });
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationError {
                message: format!("services_prefix 不能包含空白字符: {}", self.services_prefix),
            });
        }
        Ok(())
    }

    /// 指定能力名称对应的资源路径
    pub fn resource_path(&self, capability_name: &str) -> String {
        format!("{}/{}", self.services_prefix.trim_end_matches('/'), capability_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BootstrapConfig::default();
        assert_eq!(config.services_prefix, DEFAULT_SERVICES_PREFIX);
        assert!(config.resource_roots.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.resource_path("inject.Module"),
            "META-INF/services/inject.Module"
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
services_prefix = "services/"
resource_roots = ["plugins/a", "plugins/b"]

[logging]
level = "debug"
json = true
"#
        )
        .unwrap();

        let config = BootstrapConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.resource_path("x.Y"), "services/x.Y");
        assert_eq!(
            config.resource_roots,
            vec![PathBuf::from("plugins/a"), PathBuf::from("plugins/b")]
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = BootstrapConfig::load(Some(Path::new("does/not/exist.toml"))).unwrap();
        assert_eq!(config.services_prefix, DEFAULT_SERVICES_PREFIX);
    }

    #[test]
    fn test_blank_prefix_is_rejected() {
        let config = BootstrapConfig {
            services_prefix: "/".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
