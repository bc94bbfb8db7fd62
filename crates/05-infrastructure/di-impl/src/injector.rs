//! 组合注入器
//!
//! 由全部绑定模块一次性构建，构建之后不可再添加绑定。

use crate::scope::{ErasedInstance, ProviderType};
use di_abstractions::{
    Binder, Binding, BindingKey, InjectionRoot, Lifetime, Module, Resolver, SharedAny,
};
use infrastructure_common::InjectionError;
use once_cell::sync::OnceCell;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

thread_local! {
    /// 当前线程上正在解析的 (注入器, 类型) 链，用于检测循环依赖
    static RESOLUTION_CHAIN: RefCell<Vec<(Uuid, TypeId, &'static str)>> = RefCell::new(Vec::new());
}

/// 解析链守卫，离开作用域时弹出
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(injector: Uuid, key: &BindingKey) -> Result<Self, InjectionError> {
        RESOLUTION_CHAIN.with(|chain| {
            let mut chain = chain.borrow_mut();
            if chain
                .iter()
                .any(|(id, type_id, _)| *id == injector && *type_id == key.type_id())
            {
                let dependency_chain = chain
                    .iter()
                    .filter(|(id, _, _)| *id == injector)
                    .map(|(_, _, name)| *name)
                    .chain(std::iter::once(key.type_name()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(InjectionError::CircularDependency { dependency_chain });
            }
            chain.push((injector, key.type_id(), key.type_name()));
            Ok(Self)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_CHAIN.with(|chain| {
            chain.borrow_mut().pop();
        });
    }
}

struct BindingSlot {
    binding: Binding,
    singleton: OnceCell<SharedAny>,
}

/// 组合注入器
pub struct Injector {
    id: Uuid,
    bindings: HashMap<BindingKey, BindingSlot>,
    modules: Vec<String>,
}

impl Injector {
    /// 由模块集合构建注入器
    ///
    /// 模块按迭代顺序安装，相同键的模块只安装第一次出现的那个。
    pub fn create<I>(modules: I) -> Result<Arc<Self>, InjectionError>
    where
        I: IntoIterator<Item = Arc<dyn Module>>,
    {
        let mut binder = Binder::new();
        for module in modules {
            binder.install(module.as_ref())?;
        }
        Ok(Self::from_binder(binder))
    }

    /// 由已收集的绑定构建注入器，收集器在此被消费
    pub fn from_binder(binder: Binder) -> Arc<Self> {
        let (bindings, modules) = binder.into_parts();
        let injector = Self {
            id: Uuid::new_v4(),
            bindings: bindings
                .into_iter()
                .map(|(key, binding)| {
                    (
                        key,
                        BindingSlot {
                            binding,
                            singleton: OnceCell::new(),
                        },
                    )
                })
                .collect(),
            modules,
        };
        info!(
            "注入器构建完成: {} 个模块, {} 个绑定",
            injector.modules.len(),
            injector.bindings.len()
        );
        Arc::new(injector)
    }

    /// 没有任何绑定的引导注入器，只能通过构造函数注入创建无依赖的类型
    pub fn bootstrap() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            bindings: HashMap::new(),
            modules: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 已安装模块的键，按安装顺序
    pub fn installed_modules(&self) -> &[String] {
        &self.modules
    }

    /// 绑定数量
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// 对注入根执行成员注入
    pub fn inject_members(&self, root: &dyn InjectionRoot) -> Result<(), InjectionError> {
        root.inject_members(self)
    }

    /// 通过注入器获取实现类型的实例
    ///
    /// 存在该具体类型的显式绑定时使用绑定，否则调用声明的构造函数。
    pub fn get_instance(&self, provider: &ProviderType) -> Result<ErasedInstance, InjectionError> {
        let key = provider.key();
        if self.bindings.contains_key(&key) {
            let shared = self.resolve_any(&key)?;
            return provider
                .erase_bound(&shared)
                .ok_or_else(|| InjectionError::TypeMismatch {
                    type_name: key.type_name().to_string(),
                });
        }

        let _guard = ResolutionGuard::enter(self.id, &key)?;
        debug!("构造实现类型: {} ({})", provider.name(), key);
        provider.construct(self)
    }

    fn resolve_slot(&self, key: &BindingKey, slot: &BindingSlot) -> Result<SharedAny, InjectionError> {
        match &slot.binding {
            Binding::Instance(instance) => Ok(Arc::clone(instance)),
            Binding::Factory {
                factory,
                lifetime: Lifetime::Singleton,
            } => {
                if let Some(instance) = slot.singleton.get() {
                    return Ok(Arc::clone(instance));
                }
                // 必须在进入 OnceCell 初始化之前检测循环，重入初始化会死锁
                let _guard = ResolutionGuard::enter(self.id, key)?;
                slot.singleton
                    .get_or_try_init(|| factory(self))
                    .map(Arc::clone)
            }
            Binding::Factory {
                factory,
                lifetime: Lifetime::Transient,
            } => {
                let _guard = ResolutionGuard::enter(self.id, key)?;
                factory(self)
            }
        }
    }
}

impl Resolver for Injector {
    fn resolve_any(&self, key: &BindingKey) -> Result<SharedAny, InjectionError> {
        match self.bindings.get(key) {
            Some(slot) => self.resolve_slot(key, slot),
            None => Err(InjectionError::binding_not_found(key.type_name())),
        }
    }

    fn has_binding(&self, key: &BindingKey) -> bool {
        self.bindings.contains_key(key)
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("id", &self.id)
            .field("modules", &self.modules)
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{Injectable, ResolverExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    struct ClockModule;

    impl Module for ClockModule {
        fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError> {
            binder.bind_instance::<dyn Clock>(Arc::new(FixedClock(42)))?;
            Ok(())
        }
    }

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Counter;

    struct CounterModule;

    impl Module for CounterModule {
        fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError> {
            binder.bind_singleton(|_| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Counter))
            })?;
            binder.bind_transient(|resolver| {
                let clock = resolver.get::<dyn Clock>()?;
                Ok(Arc::new(format!("t={}", clock.now())))
            })?;
            Ok(())
        }
    }

    struct Ping;
    struct Pong;

    struct CycleModule;

    impl Module for CycleModule {
        fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError> {
            binder.bind_singleton(|resolver| {
                resolver.get::<Pong>()?;
                Ok(Arc::new(Ping))
            })?;
            binder.bind_transient(|resolver| {
                resolver.get::<Ping>()?;
                Ok(Arc::new(Pong))
            })?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Root {
        clock: OnceCell<Arc<dyn Clock>>,
    }

    impl InjectionRoot for Root {
        fn inject_members(&self, resolver: &dyn Resolver) -> Result<(), InjectionError> {
            let clock = resolver.get::<dyn Clock>()?;
            self.clock
                .set(clock)
                .map_err(|_| InjectionError::StateViolation {
                    message: "root injected twice".to_string(),
                })
        }
    }

    struct Reporter {
        clock: Arc<dyn Clock>,
    }

    impl Injectable for Reporter {
        fn inject(resolver: &dyn Resolver) -> Result<Self, InjectionError> {
            Ok(Self {
                clock: resolver.get()?,
            })
        }
    }

    #[test]
    fn test_create_resolves_bindings() {
        let modules: Vec<Arc<dyn Module>> = vec![Arc::new(ClockModule), Arc::new(CounterModule)];
        let injector = Injector::create(modules).unwrap();

        assert_eq!(injector.get::<dyn Clock>().unwrap().now(), 42);
        assert_eq!(*injector.get::<String>().unwrap(), "t=42");
        assert_eq!(injector.installed_modules().len(), 2);
        assert_eq!(injector.binding_count(), 3);
    }

    #[test]
    fn test_singleton_factory_runs_once() {
        let modules: Vec<Arc<dyn Module>> = vec![Arc::new(ClockModule), Arc::new(CounterModule)];
        let injector = Injector::create(modules).unwrap();

        let before = BUILT.load(Ordering::SeqCst);
        let first = injector.get::<Counter>().unwrap();
        let second = injector.get::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(BUILT.load(Ordering::SeqCst), before + 1);

        let a = injector.get::<String>().unwrap();
        let b = injector.get::<String>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_module_key_installs_once() {
        let modules: Vec<Arc<dyn Module>> = vec![Arc::new(ClockModule), Arc::new(ClockModule)];
        let injector = Injector::create(modules).unwrap();
        assert_eq!(injector.installed_modules().len(), 1);
    }

    #[test]
    fn test_circular_dependency_is_detected() {
        let modules: Vec<Arc<dyn Module>> = vec![Arc::new(CycleModule)];
        let injector = Injector::create(modules).unwrap();

        match injector.get::<Ping>() {
            Err(InjectionError::CircularDependency { dependency_chain }) => {
                assert!(dependency_chain.contains("Ping"));
                assert!(dependency_chain.contains("Pong"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_member_injection() {
        let modules: Vec<Arc<dyn Module>> = vec![Arc::new(ClockModule)];
        let injector = Injector::create(modules).unwrap();

        let root = Root::default();
        injector.inject_members(&root).unwrap();
        assert_eq!(root.clock.get().unwrap().now(), 42);
        assert!(injector.inject_members(&root).is_err());
    }

    #[test]
    fn test_bootstrap_injector_has_no_bindings() {
        let injector = Injector::bootstrap();
        assert_eq!(injector.binding_count(), 0);
        assert!(matches!(
            injector.get::<dyn Clock>(),
            Err(InjectionError::BindingNotFound { .. })
        ));
        assert!(Reporter::inject(injector.as_ref()).is_err());

        let modules: Vec<Arc<dyn Module>> = vec![Arc::new(ClockModule)];
        let injector = Injector::create(modules).unwrap();
        assert_eq!(Reporter::inject(injector.as_ref()).unwrap().clock.now(), 42);
    }
}
