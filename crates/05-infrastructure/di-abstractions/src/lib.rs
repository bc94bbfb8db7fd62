//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义绑定声明、依赖解析和服务发现所需的核心接口。
//!
//! ## 核心接口
//!
//! - [`Resolver`] - 依赖解析器接口
//! - [`Binder`] / [`Module`] - 绑定声明与绑定模块
//! - [`Injectable`] / [`InjectionRoot`] - 构造函数注入与成员注入
//! - [`Capability`] - 发现使用的能力类型
//! - [`ResourceLocator`] - 配置资源定位器接口

pub mod binder;
pub mod capability;
pub mod factory;
pub mod module;
pub mod resolver;
pub mod resource;

pub use binder::*;
pub use capability::*;
pub use factory::*;
pub use module::*;
pub use resolver::*;
pub use resource::*;
