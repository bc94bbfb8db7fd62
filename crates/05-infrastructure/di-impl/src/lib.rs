//! # 依赖注入具体实现
//!
//! 提供组合注入器、类加载作用域和惰性服务加载器。
//!
//! ## 核心组件
//!
//! - [`Injector`] - 由绑定模块构建的组合注入器
//! - [`DefaultInjector`] - 一次性设置的默认注入器槽位
//! - [`ClassLoaderScope`] - 资源查找与实现类型解析的作用域
//! - [`ServiceLoader`] - 按配置文件发现并创建能力类型的实现

pub mod config_file;
pub mod default_injector;
pub mod injector;
pub mod resources;
pub mod scope;
pub mod service_loader;

pub use config_file::{parse_line, LineFault};
pub use default_injector::DefaultInjector;
pub use injector::Injector;
pub use resources::{DirectoryLocator, MemoryLocator};
pub use scope::{
    ClassLoaderScope, ErasedInstance, ProviderDeclaration, ProviderType, ScopeBuilder,
    TypeRegistry,
};
pub use service_loader::{IntoProviders, Providers, ServiceLoader};
