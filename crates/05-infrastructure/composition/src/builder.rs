//! 组合构建器

use crate::app_injector::AppInjector;
use di_abstractions::Module;
use di_impl::{ClassLoaderScope, ScopeBuilder};
use infrastructure_common::{BootstrapConfig, CompositionError, LoggingSettings};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// 组合构建器
///
/// 使用建造者模式把引导配置、日志、作用域和根模块装配到一个 [`AppInjector`] 中
pub struct AppInjectorBuilder {
    /// 引导配置
    config: BootstrapConfig,
    /// 作用域列表
    scopes: Vec<Arc<ClassLoaderScope>>,
    /// 根模块列表
    modules: Vec<Arc<dyn Module>>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl AppInjectorBuilder {
    /// 使用默认引导配置创建构建器
    pub fn new() -> Self {
        Self::from_config(BootstrapConfig::default())
    }

    /// 使用给定的引导配置创建构建器
    pub fn from_config(config: BootstrapConfig) -> Self {
        Self {
            config,
            scopes: Vec::new(),
            modules: Vec::new(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 从可选的配置文件和环境变量加载引导配置
    pub fn load_config(path: Option<&Path>) -> Result<Self, CompositionError> {
        let config = BootstrapConfig::load(path)?;
        let logging = LoggingConfig::from_settings(&config.logging)?;
        Ok(Self::from_config(config).with_logging(logging))
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// 根据配置中的资源根目录创建作用域构建器
    pub fn scope_builder(&self, name: impl Into<String>) -> ScopeBuilder {
        self.config
            .resource_roots
            .iter()
            .fold(ClassLoaderScope::builder(name), |builder, root| {
                builder.resource_root(root)
            })
    }

    /// 添加作用域
    pub fn with_scope(mut self, scope: Arc<ClassLoaderScope>) -> Self {
        self.scopes.push(scope);
        self
    }

    /// 添加根模块
    pub fn with_module(mut self, module: Arc<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// 设置日志配置
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 构建组合
    pub fn build(self) -> Result<AppInjector, CompositionError> {
        let app = AppInjector::new();
        self.apply(&app)?;
        Ok(app)
    }

    /// 把配置应用到进程级组合
    pub fn build_global(self) -> Result<&'static AppInjector, CompositionError> {
        let app = AppInjector::global();
        self.apply(app)?;
        Ok(app)
    }

    fn apply(self, app: &AppInjector) -> Result<(), CompositionError> {
        // 只有在明确配置了日志时才初始化日志
        if self.logging_enabled {
            self.logging_config.init()?;
        }

        app.set_services_prefix(self.config.services_prefix.clone())?;
        for scope in self.scopes {
            app.register_scope(scope)?;
        }
        for module in self.modules {
            app.register_root_module(module)?;
        }
        info!("组合构建完成, 服务声明目录: {}", self.config.services_prefix);
        Ok(())
    }
}

impl Default for AppInjectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 人类可读的文本
    #[default]
    Text,
    /// 每行一个 JSON 对象
    Json,
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 输出格式
    pub format: LogFormat,
    /// 是否附带源码位置和线程ID
    pub source_locations: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            format: LogFormat::Text,
            source_locations: false,
        }
    }
}

impl LoggingConfig {
    /// 排查发现扫描时使用：逐行调试输出并附带源码位置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            format: LogFormat::Text,
            source_locations: true,
        }
    }

    /// 交给日志收集系统时使用
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            format: LogFormat::Json,
            source_locations: false,
        }
    }

    /// 由引导配置中的日志设置创建
    ///
    /// `json` 选择生产预设；否则 `debug` 与 `trace` 选择开发预设。
    pub fn from_settings(settings: &LoggingSettings) -> Result<Self, CompositionError> {
        let level = tracing::Level::from_str(&settings.level).map_err(|e| {
            CompositionError::Logging {
                message: format!("无效的日志级别 {}: {}", settings.level, e),
            }
        })?;
        let base = if settings.json {
            Self::production()
        } else if matches!(level, tracing::Level::DEBUG | tracing::Level::TRACE) {
            Self::development()
        } else {
            Self::default()
        };
        Ok(Self { level, ..base })
    }

    /// 初始化全局日志订阅者，只能成功一次
    pub fn init(&self) -> Result<(), CompositionError> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(self.level)
            .with_target(true)
            .with_thread_ids(self.source_locations)
            .with_file(self.source_locations)
            .with_line_number(self.source_locations);

        let installed = match self.format {
            LogFormat::Json => subscriber.json().try_init(),
            LogFormat::Text => subscriber.try_init(),
        };
        installed.map_err(|e| CompositionError::Logging {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成: {:?}", self.format);
        Ok(())
    }
}
