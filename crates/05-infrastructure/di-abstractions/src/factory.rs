//! 可注入类型与注入根
//!
//! 实现类型通过构造函数注入获得依赖，注入根则在组合完成后接收成员注入。

use crate::resolver::Resolver;
use infrastructure_common::InjectionError;

/// 可注入组件 trait
///
/// 注入器为没有显式绑定的实现类型调用 [`Injectable::inject`] 创建实例。
pub trait Injectable: Send + Sync + 'static {
    /// 使用解析器构建组件实例
    fn inject(resolver: &dyn Resolver) -> Result<Self, InjectionError>
    where
        Self: Sized;
}

/// 注入根 trait
///
/// 宿主在自身加载阶段注册注入根，组合完成后注入器对其执行一次成员注入。
/// 成员通常保存在 `OnceCell` 之类的内部可变字段中。
pub trait InjectionRoot: Send + Sync {
    /// 接收成员注入
    fn inject_members(&self, resolver: &dyn Resolver) -> Result<(), InjectionError>;
}
