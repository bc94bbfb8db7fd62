//! 注入根注册与组合启动
//!
//! 宿主在自身加载阶段注册注入根、作用域和根模块，随后调用一次 [`AppInjector::boot`]：
//! 收集各作用域中声明的模块，构建唯一的组合注入器，对全部注入根执行成员注入，
//! 最后发布到默认注入器槽位。启动开始之后不再接受任何注册。
//!
//! 启动期间不持有注册表锁，模块、构造函数和注入根可以回调查询接口；
//! 此时注册与再次启动都会返回状态冲突。

use di_abstractions::{Capability, InjectionRoot, Module};
use di_impl::{ClassLoaderScope, DefaultInjector, Injector, IntoProviders, ServiceLoader};
use infrastructure_common::{CompositionError, ServiceError, DEFAULT_SERVICES_PREFIX};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, error, info};

static GLOBAL: Lazy<AppInjector> = Lazy::new(|| AppInjector::with_slot(Slot::Process));

/// 组合状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionState {
    /// 接受注册
    Pending,
    /// 正在启动，拒绝注册
    Booting,
    /// 组合注入器已构建
    Booted,
    /// 启动失败，不再接受任何操作
    Failed,
}

impl fmt::Display for CompositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Booting => f.write_str("Booting"),
            Self::Booted => f.write_str("Booted"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

enum Slot {
    Owned(DefaultInjector),
    Process,
}

impl Slot {
    fn get(&self) -> &DefaultInjector {
        match self {
            Self::Owned(slot) => slot,
            Self::Process => DefaultInjector::global(),
        }
    }
}

struct Registry {
    state: CompositionState,
    services_prefix: String,
    roots: Vec<Arc<dyn InjectionRoot>>,
    scopes: Vec<Arc<ClassLoaderScope>>,
    modules: Vec<Arc<dyn Module>>,
    injector: Option<Arc<Injector>>,
}

impl Registry {
    fn ensure_pending(&self, action: &str) -> Result<(), CompositionError> {
        match self.state {
            CompositionState::Pending => Ok(()),
            state => Err(CompositionError::state_violation(format!(
                "AppInjector 状态为 {}，无法{}",
                state, action
            ))),
        }
    }

    fn add_scope(&mut self, scope: Arc<ClassLoaderScope>) {
        if !self.scopes.iter().any(|known| Arc::ptr_eq(known, &scope)) {
            debug!("注册作用域: {}", scope);
            self.scopes.push(scope);
        }
    }
}

/// 启动所需的注册表快照
struct BootPlan {
    services_prefix: String,
    roots: Vec<Arc<dyn InjectionRoot>>,
    scopes: Vec<Arc<ClassLoaderScope>>,
    modules: Vec<Arc<dyn Module>>,
}

fn same_root(a: &Arc<dyn InjectionRoot>, b: &Arc<dyn InjectionRoot>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// 注入根注册表与组合启动器
pub struct AppInjector {
    registry: Arc<Mutex<Registry>>,
    slot: Slot,
}

impl AppInjector {
    /// 创建独立的组合，使用私有的默认注入器槽位
    pub fn new() -> Self {
        Self::with_slot(Slot::Owned(DefaultInjector::new()))
    }

    /// 进程级组合，使用进程级默认注入器槽位
    pub fn global() -> &'static AppInjector {
        &GLOBAL
    }

    fn with_slot(slot: Slot) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                state: CompositionState::Pending,
                services_prefix: DEFAULT_SERVICES_PREFIX.to_string(),
                roots: Vec::new(),
                scopes: Vec::new(),
                modules: Vec::new(),
                injector: None,
            })),
            slot,
        }
    }

    /// 修改服务声明目录前缀
    pub fn set_services_prefix(&self, prefix: impl Into<String>) -> Result<(), CompositionError> {
        let mut registry = self.registry.lock();
        registry.ensure_pending("修改服务声明目录")?;
        registry.services_prefix = prefix.into();
        Ok(())
    }

    /// 注册注入根及其作用域
    pub fn register_injection_root(
        &self,
        root: Arc<dyn InjectionRoot>,
        scope: Arc<ClassLoaderScope>,
    ) -> Result<(), CompositionError> {
        let mut registry = self.registry.lock();
        registry.ensure_pending("注册注入根")?;

        if !registry.roots.iter().any(|known| same_root(known, &root)) {
            registry.roots.push(root);
        }
        registry.add_scope(scope);
        Ok(())
    }

    /// 注册不带注入根的作用域
    pub fn register_scope(&self, scope: Arc<ClassLoaderScope>) -> Result<(), CompositionError> {
        let mut registry = self.registry.lock();
        registry.ensure_pending("注册作用域")?;
        registry.add_scope(scope);
        Ok(())
    }

    /// 注册根模块
    pub fn register_root_module(&self, module: Arc<dyn Module>) -> Result<(), CompositionError> {
        let mut registry = self.registry.lock();
        registry.ensure_pending("注册根模块")?;
        debug!("注册根模块: {}", module.key());
        registry.modules.push(module);
        Ok(())
    }

    /// 启动组合
    ///
    /// 已启动时直接返回现有注入器。任何一步失败都会使组合进入 [`CompositionState::Failed`]。
    pub fn boot(&self) -> Result<Arc<Injector>, CompositionError> {
        let plan = {
            let mut registry = self.registry.lock();
            if let (CompositionState::Booted, Some(injector)) = (registry.state, &registry.injector) {
                return Ok(Arc::clone(injector));
            }
            registry.ensure_pending("启动")?;
            registry.state = CompositionState::Booting;

            info!(
                "开始启动组合: {} 个注入根, {} 个作用域, {} 个根模块",
                registry.roots.len(),
                registry.scopes.len(),
                registry.modules.len()
            );
            BootPlan {
                services_prefix: registry.services_prefix.clone(),
                roots: registry.roots.clone(),
                scopes: registry.scopes.clone(),
                modules: registry.modules.clone(),
            }
        };

        let outcome = self.compose(&plan);
        let mut registry = self.registry.lock();
        match outcome {
            Ok(injector) => {
                registry.state = CompositionState::Booted;
                registry.injector = Some(Arc::clone(&injector));
                info!("组合启动完成: 注入器 {}", injector.id());
                Ok(injector)
            }
            Err(e) => {
                registry.state = CompositionState::Failed;
                error!("组合启动失败: {}", e);
                Err(e)
            }
        }
    }

    fn compose(&self, plan: &BootPlan) -> Result<Arc<Injector>, CompositionError> {
        let bootstrap = Injector::bootstrap();
        let mut modules = plan.modules.clone();
        for scope in &plan.scopes {
            let loader =
                ServiceLoader::<dyn Module>::with_injector(Arc::clone(&bootstrap), Arc::clone(scope))
                    .with_prefix(&plan.services_prefix);
            for module in loader {
                modules.push(module?);
            }
        }

        let injector = Injector::create(modules)?;
        for root in &plan.roots {
            injector.inject_members(root.as_ref())?;
        }
        // 注入根全部完成之后才发布
        self.slot.get().set(Arc::clone(&injector))?;
        Ok(injector)
    }

    /// 查询能力类型 `S` 的全部实现
    ///
    /// 每次调用都在当前已注册的作用域上重新扫描，不跨调用缓存。
    /// 启动之前使用只能构造无依赖类型的引导注入器。
    pub fn get_services<S: ?Sized + Capability>(&self) -> Services<S> {
        let registry = self.registry.lock();
        let injector = registry
            .injector
            .as_ref()
            .map_or_else(Injector::bootstrap, Arc::clone);
        Services {
            scopes: registry.scopes.iter().cloned().collect(),
            injector,
            services_prefix: registry.services_prefix.clone(),
            current: None,
            done: false,
        }
    }

    /// 组合注入器，启动之前为 `None`
    pub fn injector(&self) -> Option<Arc<Injector>> {
        self.registry.lock().injector.clone()
    }

    /// 本组合使用的默认注入器槽位
    pub fn default_injector(&self) -> &DefaultInjector {
        self.slot.get()
    }

    pub fn state(&self) -> CompositionState {
        self.registry.lock().state
    }

    pub fn is_booted(&self) -> bool {
        self.state() == CompositionState::Booted
    }

    /// 已注册作用域的快照，按注册顺序
    pub fn scopes(&self) -> Vec<Arc<ClassLoaderScope>> {
        self.registry.lock().scopes.clone()
    }

    /// 注册表作用域的共享视图，读取时才取快照
    pub fn registered_scopes(&self) -> RegisteredScopes {
        RegisteredScopes {
            registry: Arc::clone(&self.registry),
        }
    }
}

/// 注册表中作用域列表的只读视图
///
/// 组合模块在配置阶段通过它按注册顺序扫描全部作用域。
#[derive(Clone)]
pub struct RegisteredScopes {
    registry: Arc<Mutex<Registry>>,
}

impl RegisteredScopes {
    /// 当前已注册的作用域，按注册顺序
    pub fn scopes(&self) -> Vec<Arc<ClassLoaderScope>> {
        self.registry.lock().scopes.clone()
    }

    /// 当前的服务声明目录前缀
    pub fn services_prefix(&self) -> String {
        self.registry.lock().services_prefix.clone()
    }
}

impl fmt::Debug for RegisteredScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_list()
            .entries(registry.scopes.iter().map(|s| s.name()))
            .finish()
    }
}

impl Default for AppInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AppInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("AppInjector")
            .field("state", &registry.state)
            .field("roots", &registry.roots.len())
            .field("scopes", &registry.scopes.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("modules", &registry.modules.len())
            .finish()
    }
}

/// 跨作用域的惰性实现迭代器
///
/// 按作用域注册顺序依次扫描；产出一个错误之后结束。
pub struct Services<S: ?Sized + Capability> {
    scopes: VecDeque<Arc<ClassLoaderScope>>,
    injector: Arc<Injector>,
    services_prefix: String,
    current: Option<IntoProviders<S>>,
    done: bool,
}

impl<S: ?Sized + Capability> Iterator for Services<S> {
    type Item = Result<Arc<S>, ServiceError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(Ok(service)) => return Some(Ok(service)),
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }

            match self.scopes.pop_front() {
                Some(scope) => {
                    let loader = ServiceLoader::<S>::with_injector(Arc::clone(&self.injector), scope)
                        .with_prefix(&self.services_prefix);
                    self.current = Some(loader.into_iter());
                }
                None => self.done = true,
            }
        }
        None
    }
}

impl<S: ?Sized + Capability> FusedIterator for Services<S> {}
