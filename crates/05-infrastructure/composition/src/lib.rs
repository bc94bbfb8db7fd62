//! # 基础设施组合层
//!
//! 这个 crate 是依赖注入引导的组合层，负责把宿主注册的注入根、作用域和模块
//! 组合成唯一的注入器，并驱动发现到的服务的生命周期。
//!
//! ## 主要功能
//!
//! - **注入根注册与启动**: [`AppInjector`] 收集注册并一次性构建组合注入器
//! - **组合模块**: [`InjectionModule`] 安装根作用域中声明的模块并提供基础绑定
//! - **生命周期驱动**: [`LifecycleDriver`] 按 load → enable → disable 顺序驱动服务
//! - **组合构建器**: [`AppInjectorBuilder`] 装配引导配置与日志
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{AppInjectorBuilder, InjectionModule, LifecycleDriver};
//! use infrastructure_common::Service;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = AppInjectorBuilder::load_config(None)?;
//!     let scope = builder.scope_builder("host").build();
//!     let app = builder.with_scope(Arc::clone(&scope)).build()?;
//!     app.register_root_module(Arc::new(InjectionModule::new(scope).attach(&app)))?;
//!
//!     // 启动组合
//!     app.boot()?;
//!
//!     // 驱动服务生命周期
//!     let mut services = LifecycleDriver::<dyn Service>::collect(&app)?;
//!     services.load().await?;
//!     services.enable().await?;
//!     services.disable().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod app_injector;
pub mod builder;
pub mod codec;
pub mod injection_module;
pub mod lifecycle;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use app_injector::{AppInjector, CompositionState, RegisteredScopes, Services};
pub use builder::{AppInjectorBuilder, LogFormat, LoggingConfig};
pub use codec::JsonCodec;
pub use injection_module::InjectionModule;
pub use lifecycle::LifecycleDriver;

// 重新导出错误类型
pub use infrastructure_common::{CompositionError, LifecycleError};
