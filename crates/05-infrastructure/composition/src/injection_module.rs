//! 组合模块
//!
//! 按作用域顺序安装声明的全部模块，并提供基础绑定。

use crate::app_injector::{AppInjector, RegisteredScopes};
use crate::codec::JsonCodec;
use di_abstractions::{Binder, Module};
use di_impl::{ClassLoaderScope, Injector, ServiceLoader};
use infrastructure_common::{InjectionError, DEFAULT_SERVICES_PREFIX};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type HostBinding = Box<dyn Fn(&mut Binder) -> Result<(), InjectionError> + Send + Sync>;

/// 配置阶段扫描模块的作用域来源
enum SweepScopes {
    /// 只扫描根作用域
    Root,
    /// 固定的作用域列表
    Fixed(Vec<Arc<ClassLoaderScope>>),
    /// 配置时读取注册表
    Registered(RegisteredScopes),
}

/// 组合模块
///
/// 默认只扫描根作用域；[`InjectionModule::attach`] 之后在配置时按注册顺序扫描
/// [`AppInjector`] 的全部作用域，根作用域若未注册则排在最后。
///
/// 基础绑定包括根作用域 `Arc<ClassLoaderScope>`、共享的 `Arc<JsonCodec>`
/// 以及通过 [`InjectionModule::with_host_handle`] 添加的宿主句柄。
pub struct InjectionModule {
    scope: Arc<ClassLoaderScope>,
    sweep: SweepScopes,
    services_prefix: String,
    codec: Arc<JsonCodec>,
    host_bindings: Vec<HostBinding>,
}

impl InjectionModule {
    pub fn new(scope: Arc<ClassLoaderScope>) -> Self {
        Self {
            scope,
            sweep: SweepScopes::Root,
            services_prefix: DEFAULT_SERVICES_PREFIX.to_string(),
            codec: Arc::new(JsonCodec::new()),
            host_bindings: Vec::new(),
        }
    }

    /// 按给定顺序扫描多个作用域
    pub fn for_scopes(scope: Arc<ClassLoaderScope>, scopes: Vec<Arc<ClassLoaderScope>>) -> Self {
        Self {
            sweep: SweepScopes::Fixed(scopes),
            ..Self::new(scope)
        }
    }

    /// 扫描组合注册表中的全部作用域，并沿用其服务声明目录前缀
    pub fn attach(mut self, app: &AppInjector) -> Self {
        self.sweep = SweepScopes::Registered(app.registered_scopes());
        self
    }

    /// 修改服务声明目录前缀
    pub fn with_services_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.services_prefix = prefix.into();
        self
    }

    /// 替换共享的编解码器
    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// 以类型 `T` 绑定宿主句柄
    pub fn with_host_handle<T>(mut self, handle: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.host_bindings.push(Box::new(move |binder| {
            binder.bind_instance(Arc::clone(&handle))?;
            Ok(())
        }));
        self
    }

    pub fn scope(&self) -> &Arc<ClassLoaderScope> {
        &self.scope
    }

    fn sweep_plan(&self) -> (Vec<Arc<ClassLoaderScope>>, String) {
        let (mut scopes, prefix) = match &self.sweep {
            SweepScopes::Root => (Vec::new(), self.services_prefix.clone()),
            SweepScopes::Fixed(scopes) => (scopes.clone(), self.services_prefix.clone()),
            SweepScopes::Registered(registry) => (registry.scopes(), registry.services_prefix()),
        };
        if !scopes.iter().any(|known| Arc::ptr_eq(known, &self.scope)) {
            scopes.push(Arc::clone(&self.scope));
        }
        (scopes, prefix)
    }
}

impl Module for InjectionModule {
    fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError> {
        let (scopes, prefix) = self.sweep_plan();
        let bootstrap = Injector::bootstrap();
        for scope in scopes {
            let loader = ServiceLoader::<dyn Module>::with_injector(Arc::clone(&bootstrap), scope)
                .with_prefix(&prefix);
            for module in loader {
                let module = module?;
                if binder.install(module.as_ref())? {
                    debug!("组合模块安装了发现的模块: {}", module.key());
                }
            }
        }

        binder.bind_instance(Arc::clone(&self.scope))?;
        binder.bind_instance(Arc::clone(&self.codec))?;
        for bind in &self.host_bindings {
            bind(binder)?;
        }
        Ok(())
    }

    fn key(&self) -> String {
        format!("{}#{}", std::any::type_name::<Self>(), self.scope.id())
    }
}

impl fmt::Debug for InjectionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionModule")
            .field("scope", &self.scope.name())
            .field("attached", &matches!(self.sweep, SweepScopes::Registered(_)))
            .field("services_prefix", &self.services_prefix)
            .field("host_handles", &self.host_bindings.len())
            .finish()
    }
}
