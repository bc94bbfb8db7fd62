//! 绑定声明
//!
//! 模块通过 [`Binder`] 声明绑定，注入器在构建时一次性消费全部声明。

use crate::module::Module;
use crate::resolver::{BindingKey, Resolver, SharedAny};
use infrastructure_common::InjectionError;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 绑定生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// 单例模式 - 首次解析时创建，之后复用
    Singleton,
    /// 瞬时模式 - 每次解析都创建新实例
    #[default]
    Transient,
}

/// 类型擦除后的工厂函数，返回值的实际类型总是 `Arc<T>`
pub type FactoryFn =
    Arc<dyn Fn(&dyn Resolver) -> Result<SharedAny, InjectionError> + Send + Sync>;

/// 单个绑定
#[derive(Clone)]
pub enum Binding {
    /// 预先创建好的实例
    Instance(SharedAny),
    /// 由工厂按生命周期创建
    Factory { factory: FactoryFn, lifetime: Lifetime },
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance"),
            Self::Factory { lifetime, .. } => f
                .debug_struct("Factory")
                .field("lifetime", lifetime)
                .field("factory", &"<function>")
                .finish(),
        }
    }
}

/// 绑定收集器
///
/// 同一类型只能绑定一次；同一模块键只安装一次。
#[derive(Debug, Default)]
pub struct Binder {
    bindings: Vec<(BindingKey, Binding)>,
    bound: HashSet<BindingKey>,
    installed: Vec<String>,
}

impl Binder {
    /// 创建空的绑定收集器
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定实例
    pub fn bind_instance<T>(&mut self, instance: Arc<T>) -> Result<&mut Self, InjectionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.push(BindingKey::of::<T>(), Binding::Instance(Arc::new(instance)))
    }

    /// 绑定工厂
    pub fn bind_factory<T, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, InjectionError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn Resolver) -> Result<Arc<T>, InjectionError> + Send + Sync + 'static,
    {
        let factory: FactoryFn =
            Arc::new(move |resolver| factory(resolver).map(|instance| Arc::new(instance) as SharedAny));
        self.push(BindingKey::of::<T>(), Binding::Factory { factory, lifetime })
    }

    /// 绑定单例工厂
    pub fn bind_singleton<T, F>(&mut self, factory: F) -> Result<&mut Self, InjectionError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn Resolver) -> Result<Arc<T>, InjectionError> + Send + Sync + 'static,
    {
        self.bind_factory(Lifetime::Singleton, factory)
    }

    /// 绑定瞬时工厂
    pub fn bind_transient<T, F>(&mut self, factory: F) -> Result<&mut Self, InjectionError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn Resolver) -> Result<Arc<T>, InjectionError> + Send + Sync + 'static,
    {
        self.bind_factory(Lifetime::Transient, factory)
    }

    /// 安装模块
    ///
    /// 已安装过相同键的模块时直接返回 `false`。
    pub fn install(&mut self, module: &dyn Module) -> Result<bool, InjectionError> {
        let key = module.key();
        if self.installed.iter().any(|installed| *installed == key) {
            debug!("模块已安装，跳过: {}", key);
            return Ok(false);
        }

        debug!("安装模块: {}", key);
        // 先登记再配置，模块递归安装自身时不会无限展开
        self.installed.push(key);
        module.configure(self)?;
        Ok(true)
    }

    /// 检查类型是否已绑定
    pub fn is_bound(&self, key: &BindingKey) -> bool {
        self.bound.contains(key)
    }

    /// 已安装模块的键，按安装顺序
    pub fn installed_modules(&self) -> &[String] {
        &self.installed
    }

    /// 绑定数量
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// 消费收集器，取出全部绑定和模块键
    pub fn into_parts(self) -> (Vec<(BindingKey, Binding)>, Vec<String>) {
        (self.bindings, self.installed)
    }

    fn push(&mut self, key: BindingKey, binding: Binding) -> Result<&mut Self, InjectionError> {
        if !self.bound.insert(key) {
            return Err(InjectionError::DuplicateBinding {
                type_name: key.type_name().to_string(),
            });
        }
        debug!("声明绑定: {} ({:?})", key, binding);
        self.bindings.push((key, binding));
        Ok(self)
    }
}
