//! 服务加载器
//!
//! 在作用域中查找能力类型的全部声明实现，并通过注入器按需创建实例。
//!
//! 加载器是惰性的：构造时不读取任何资源，每次消费只推进到产出下一个实例为止。
//! 已创建的实例按发现顺序缓存，[`ServiceLoader::reload`] 清空缓存并重新开始扫描。

use crate::config_file::parse_resource;
use crate::default_injector::DefaultInjector;
use crate::injector::Injector;
use crate::scope::ClassLoaderScope;
use di_abstractions::{Capability, ConfigResource};
use infrastructure_common::{ResolutionFailure, ServiceError, DEFAULT_SERVICES_PREFIX};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::debug;

/// 扫描状态
#[derive(Debug, Default)]
struct LazyLookup {
    /// `None` 表示尚未枚举资源
    resources: Option<VecDeque<ConfigResource>>,
    pending: VecDeque<String>,
    seen: HashSet<String>,
    aborted: bool,
}

/// 能力类型 `S` 的服务加载器
pub struct ServiceLoader<S: ?Sized + Capability> {
    service: &'static str,
    resource_path: String,
    scope: Arc<ClassLoaderScope>,
    injector: Arc<Injector>,
    providers: Vec<(String, Arc<S>)>,
    lookup: LazyLookup,
}

impl<S: ?Sized + Capability> ServiceLoader<S> {
    /// 使用进程级默认注入器
    pub fn load(scope: Arc<ClassLoaderScope>) -> Result<Self, ServiceError> {
        Self::load_from(DefaultInjector::global(), scope)
    }

    /// 使用指定槽位中的注入器，槽位未设置时快速失败
    pub fn load_from(slot: &DefaultInjector, scope: Arc<ClassLoaderScope>) -> Result<Self, ServiceError> {
        let injector = slot.require(S::NAME)?;
        Ok(Self::with_injector(injector, scope))
    }

    /// 使用显式注入器
    pub fn with_injector(injector: Arc<Injector>, scope: Arc<ClassLoaderScope>) -> Self {
        Self {
            service: S::NAME,
            resource_path: format!("{}/{}", DEFAULT_SERVICES_PREFIX, S::NAME),
            scope,
            injector,
            providers: Vec::new(),
            lookup: LazyLookup::default(),
        }
    }

    /// 修改配置文件目录前缀
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.resource_path = format!("{}/{}", prefix.trim_end_matches('/'), self.service);
        self.reload();
        self
    }

    pub fn service_name(&self) -> &'static str {
        self.service
    }

    /// 配置文件的逻辑路径
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn scope(&self) -> &Arc<ClassLoaderScope> {
        &self.scope
    }

    /// 已缓存的实例，按发现顺序
    pub fn cached(&self) -> impl Iterator<Item = (&str, &Arc<S>)> {
        self.providers
            .iter()
            .map(|(name, provider)| (name.as_str(), provider))
    }

    /// 清空缓存并重新开始扫描，之后的实例都会重新创建
    pub fn reload(&mut self) {
        debug!("{}: 重新加载", self);
        self.providers.clear();
        self.lookup = LazyLookup::default();
    }

    /// 遍历实现：先产出缓存，再继续惰性扫描
    pub fn iter(&mut self) -> Providers<'_, S> {
        Providers {
            loader: self,
            index: 0,
            done: false,
        }
    }

    fn provider_at(&mut self, index: usize) -> Option<Result<Arc<S>, ServiceError>> {
        if let Some((_, provider)) = self.providers.get(index) {
            return Some(Ok(Arc::clone(provider)));
        }
        if self.lookup.aborted {
            return Some(Err(ServiceError::SweepAborted {
                service: self.service.to_string(),
            }));
        }
        match self.advance() {
            Ok(Some(provider)) => Some(Ok(provider)),
            Ok(None) => None,
            Err(e) => {
                self.lookup.aborted = true;
                Some(Err(e))
            }
        }
    }

    fn advance(&mut self) -> Result<Option<Arc<S>>, ServiceError> {
        let Some(name) = self.next_name()? else {
            debug!("{}: 扫描结束, 共 {} 个实现", self, self.providers.len());
            return Ok(None);
        };
        let provider = self.instantiate(&name)?;
        self.providers.push((name, Arc::clone(&provider)));
        Ok(Some(provider))
    }

    fn next_name(&mut self) -> Result<Option<String>, ServiceError> {
        loop {
            if let Some(name) = self.lookup.pending.pop_front() {
                return Ok(Some(name));
            }

            if self.lookup.resources.is_none() {
                let found = self
                    .scope
                    .find_resources(&self.resource_path)
                    .map_err(|source| ServiceError::ResourceIo {
                        service: self.service.to_string(),
                        resource: self.resource_path.clone(),
                        source,
                    })?;
                debug!(
                    "{}: 在作用域 {} 中找到 {} 个配置文件",
                    self,
                    self.scope.name(),
                    found.len()
                );
                self.lookup.resources = Some(found.into());
            }

            let Some(resource) = self.lookup.resources.as_mut().and_then(VecDeque::pop_front) else {
                return Ok(None);
            };
            let names = parse_resource(self.service, &resource, &mut self.lookup.seen)?;
            self.lookup.pending.extend(names);
        }
    }

    fn instantiate(&self, name: &str) -> Result<Arc<S>, ServiceError> {
        let resolution = |reason: ResolutionFailure| ServiceError::Resolution {
            service: self.service.to_string(),
            provider: name.to_string(),
            reason,
        };

        let provider = self
            .scope
            .resolve_type(name)
            .ok_or_else(|| resolution(ResolutionFailure::NotFound))?;
        if !provider.is_assignable_to::<S>() {
            return Err(resolution(ResolutionFailure::NotSubtype));
        }

        debug!("{}: 创建实现 {}", self, name);
        let instance = self
            .injector
            .get_instance(provider)
            .map_err(|source| ServiceError::Instantiation {
                service: self.service.to_string(),
                provider: name.to_string(),
                source: Box::new(source),
            })?;
        provider
            .cast::<S>(instance)
            .ok_or_else(|| resolution(ResolutionFailure::NotSubtype))
    }
}

impl<S: ?Sized + Capability> fmt::Display for ServiceLoader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceLoader[{}]", self.service)
    }
}

impl<S: ?Sized + Capability> fmt::Debug for ServiceLoader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLoader")
            .field("service", &self.service)
            .field("resource_path", &self.resource_path)
            .field("scope", &self.scope.name())
            .field("cached", &self.providers.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("aborted", &self.lookup.aborted)
            .finish()
    }
}

/// 借用加载器的实现迭代器
///
/// 产出一个错误之后不再产出任何元素。
pub struct Providers<'a, S: ?Sized + Capability> {
    loader: &'a mut ServiceLoader<S>,
    index: usize,
    done: bool,
}

impl<S: ?Sized + Capability> Iterator for Providers<'_, S> {
    type Item = Result<Arc<S>, ServiceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.loader.provider_at(self.index);
        match &item {
            Some(Ok(_)) => self.index += 1,
            _ => self.done = true,
        }
        item
    }
}

impl<S: ?Sized + Capability> FusedIterator for Providers<'_, S> {}

/// 持有加载器的实现迭代器
pub struct IntoProviders<S: ?Sized + Capability> {
    loader: ServiceLoader<S>,
    index: usize,
    done: bool,
}

impl<S: ?Sized + Capability> IntoProviders<S> {
    /// 取回加载器，已创建的实例仍在缓存中
    pub fn into_loader(self) -> ServiceLoader<S> {
        self.loader
    }
}

impl<S: ?Sized + Capability> Iterator for IntoProviders<S> {
    type Item = Result<Arc<S>, ServiceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.loader.provider_at(self.index);
        match &item {
            Some(Ok(_)) => self.index += 1,
            _ => self.done = true,
        }
        item
    }
}

impl<S: ?Sized + Capability> FusedIterator for IntoProviders<S> {}

impl<S: ?Sized + Capability> IntoIterator for ServiceLoader<S> {
    type Item = Result<Arc<S>, ServiceError>;
    type IntoIter = IntoProviders<S>;

    fn into_iter(self) -> Self::IntoIter {
        IntoProviders {
            loader: self,
            index: 0,
            done: false,
        }
    }
}

impl<'a, S: ?Sized + Capability> IntoIterator for &'a mut ServiceLoader<S> {
    type Item = Result<Arc<S>, ServiceError>;
    type IntoIter = Providers<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
