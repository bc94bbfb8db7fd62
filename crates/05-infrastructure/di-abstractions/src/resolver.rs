//! 依赖解析器抽象接口
//!
//! 提供按类型键解析已绑定实例的能力

use infrastructure_common::InjectionError;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 类型擦除后的共享实例，实际类型总是 `Arc<T>`
pub type SharedAny = Arc<dyn Any + Send + Sync>;

/// 绑定键
///
/// 只按 `TypeId` 比较，类型名称仅用于诊断信息。
#[derive(Clone, Copy)]
pub struct BindingKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl BindingKey {
    /// 获取类型 `T` 的绑定键，`T` 可以是 trait object
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for BindingKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for BindingKey {}

impl Hash for BindingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// 依赖解析器 trait
///
/// 对象安全的最小接口，类型化的访问由 [`ResolverExt`] 提供。
pub trait Resolver: Send + Sync {
    /// 解析绑定键对应的实例
    fn resolve_any(&self, key: &BindingKey) -> Result<SharedAny, InjectionError>;

    /// 检查是否存在绑定
    fn has_binding(&self, key: &BindingKey) -> bool;
}

/// 类型化解析扩展
pub trait ResolverExt: Resolver {
    /// 解析类型 `T` 的实例
    fn get<T>(&self) -> Result<Arc<T>, InjectionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = BindingKey::of::<T>();
        let shared = self.resolve_any(&key)?;
        shared
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| InjectionError::TypeMismatch {
                type_name: key.type_name().to_string(),
            })
    }

    /// 解析类型 `T` 的实例，未绑定时返回 `None`
    fn get_optional<T>(&self) -> Result<Option<Arc<T>>, InjectionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.has_binding(&BindingKey::of::<T>()) {
            self.get::<T>().map(Some)
        } else {
            Ok(None)
        }
    }

    /// 检查类型 `T` 是否已绑定
    fn is_bound<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.has_binding(&BindingKey::of::<T>())
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}
