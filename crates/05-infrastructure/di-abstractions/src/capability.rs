//! 能力类型
//!
//! 能力类型是发现的键：通常是一个 trait object 类型，
//! 其完整名称决定服务声明文件的路径。

use crate::module::Module;
use infrastructure_common::Service;

/// 能力类型 trait
pub trait Capability: Send + Sync + 'static {
    /// 完整名称，例如 `di.abstractions.Module`
    const NAME: &'static str;
}

/// 为 trait object 类型声明能力名称
///
/// ```rust
/// use di_abstractions::declare_capability;
///
/// pub trait Command: Send + Sync {
///     fn run(&self);
/// }
///
/// declare_capability!(dyn Command, "com.example.Command");
/// ```
#[macro_export]
macro_rules! declare_capability {
    ($ty:ty, $name:expr) => {
        impl $crate::Capability for $ty {
            const NAME: &'static str = $name;
        }
    };
}

declare_capability!(dyn Module, "di.abstractions.Module");
declare_capability!(dyn Service, "infrastructure.common.Service");
