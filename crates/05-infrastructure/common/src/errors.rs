//! 错误类型定义

use std::fmt;
use thiserror::Error;

/// 引导配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("引导配置加载失败: {source}")]
    LoadError {
        #[from]
        source: config::ConfigError,
    },

    #[error("引导配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 类型解析失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// 作用域内没有声明该名称的类型
    NotFound,
    /// 类型存在但不能赋值给请求的能力类型
    NotSubtype,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::NotSubtype => f.write_str("not a subtype"),
        }
    }
}

/// 服务发现错误类型
///
/// 任何一个错误都会中止当前的发现扫描
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service}: {resource}:{line}: {reason}: {text}")]
    ConfigurationFormat {
        service: String,
        resource: String,
        line: usize,
        text: String,
        reason: String,
    },

    #[error("{service}: Provider {provider} {reason}")]
    Resolution {
        service: String,
        provider: String,
        reason: ResolutionFailure,
    },

    #[error("{service}: Provider {provider} could not be instantiated: {source}")]
    Instantiation {
        service: String,
        provider: String,
        source: Box<InjectionError>,
    },

    #[error("{service}: 读取配置文件失败 {resource}: {source}")]
    ResourceIo {
        service: String,
        resource: String,
        source: std::io::Error,
    },

    #[error("{service}: 未指定注入器且未设置全局注入器")]
    MissingInjector { service: String },

    #[error("{service}: 发现扫描已因先前的错误中止")]
    SweepAborted { service: String },
}

impl ServiceError {
    /// 是否为配置类错误（格式错误或缺少注入器）
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationFormat { .. } | Self::MissingInjector { .. }
        )
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum InjectionError {
    #[error("绑定不存在: {type_name}")]
    BindingNotFound { type_name: String },

    #[error("重复绑定: {type_name}")]
    DuplicateBinding { type_name: String },

    #[error("绑定类型不匹配: {type_name}")]
    TypeMismatch { type_name: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("注入器状态冲突: {message}")]
    StateViolation { message: String },

    #[error("模块发现失败: {source}")]
    Discovery {
        #[from]
        source: ServiceError,
    },
}

impl InjectionError {
    /// 创建绑定不存在错误
    pub fn binding_not_found(type_name: impl Into<String>) -> Self {
        Self::BindingNotFound {
            type_name: type_name.into(),
        }
    }
}

/// 组合根错误类型
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("组合根状态冲突: {message}")]
    StateViolation { message: String },

    #[error("组合根服务发现失败: {source}")]
    Discovery {
        #[from]
        source: ServiceError,
    },

    #[error("组合根注入失败: {source}")]
    Injection {
        #[from]
        source: InjectionError,
    },

    #[error("组合根配置失败: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("日志初始化失败: {message}")]
    Logging { message: String },
}

impl CompositionError {
    /// 创建状态冲突错误
    pub fn state_violation(message: impl Into<String>) -> Self {
        Self::StateViolation {
            message: message.into(),
        }
    }

    /// 是否为状态冲突
    pub fn is_state_violation(&self) -> bool {
        matches!(
            self,
            Self::StateViolation { .. }
                | Self::Injection {
                    source: InjectionError::StateViolation { .. }
                }
        )
    }
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("服务 {service} 在 {phase} 阶段失败: {source}")]
    HookFailed {
        service: String,
        phase: crate::lifecycle::LifecyclePhase,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("生命周期阶段顺序错误: 当前状态 {state:?}, 无法执行 {phase}")]
    PhaseOrder {
        state: crate::lifecycle::LifecycleState,
        phase: crate::lifecycle::LifecyclePhase,
    },

    #[error("服务发现失败: {source}")]
    Discovery {
        #[from]
        source: ServiceError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_format_message_names_resource_and_line() {
        let error = ServiceError::ConfigurationFormat {
            service: "inject.Module".to_string(),
            resource: "memory:a/META-INF/services/inject.Module".to_string(),
            line: 3,
            text: "com bad name".to_string(),
            reason: "Illegal configuration-file syntax".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("memory:a/META-INF/services/inject.Module:3"));
        assert!(message.contains("com bad name"));
        assert!(error.is_configuration_error());
    }

    #[test]
    fn test_resolution_failure_display() {
        assert_eq!(ResolutionFailure::NotFound.to_string(), "not found");
        assert_eq!(ResolutionFailure::NotSubtype.to_string(), "not a subtype");
    }

    #[test]
    fn test_composition_state_violation_detection() {
        assert!(CompositionError::state_violation("already booted").is_state_violation());

        let nested = CompositionError::from(InjectionError::StateViolation {
            message: "slot already set".to_string(),
        });
        assert!(nested.is_state_violation());

        let other = CompositionError::from(InjectionError::binding_not_found("Foo"));
        assert!(!other.is_state_violation());
    }
}
