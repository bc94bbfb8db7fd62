//! # Infrastructure Common
//!
//! 这个 crate 提供注入引导层共享的错误类型、服务生命周期契约和引导配置。
//!
//! ## 核心组件
//!
//! - [`Service`] - 可由宿主驱动的三段式生命周期
//! - [`ServiceError`] / [`InjectionError`] / [`CompositionError`] - 错误分类
//! - [`BootstrapConfig`] - 发现引擎与日志的引导配置
//!
//! ## 设计原则
//!
//! - 任何错误都在检测到的地方立即向调用方传播
//! - 声明优先于约定：实现通过文本资源声明，而不是扫描源码

pub mod configuration;
pub mod errors;
pub mod lifecycle;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
