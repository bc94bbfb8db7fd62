//! 类加载作用域
//!
//! 作用域是独立的资源查找上下文，同时持有按稳定名称登记的实现类型表。
//! 资源与类型都先委托父作用域，再查找自身。

use crate::resources::{DirectoryLocator, MemoryLocator};
use di_abstractions::{
    BindingKey, ConfigResource, Injectable, ResourceLocator, Resolver, SharedAny,
};
use infrastructure_common::InjectionError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 类型擦除后的独占实例，实际类型总是 `Arc<T>`
pub type ErasedInstance = Box<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn(&dyn Resolver) -> Result<ErasedInstance, InjectionError> + Send + Sync>;
type Caster = Arc<dyn Fn(ErasedInstance) -> Option<ErasedInstance> + Send + Sync>;

fn erase_bound<T: Send + Sync + 'static>(shared: &SharedAny) -> Option<ErasedInstance> {
    shared
        .downcast_ref::<Arc<T>>()
        .map(|instance| Box::new(Arc::clone(instance)) as ErasedInstance)
}

/// 已登记的实现类型
///
/// 记录构造方式以及它可以赋值给哪些能力类型。
#[derive(Clone)]
pub struct ProviderType {
    name: String,
    key: BindingKey,
    constructor: Constructor,
    erase_bound: fn(&SharedAny) -> Option<ErasedInstance>,
    casts: HashMap<TypeId, Caster>,
}

impl ProviderType {
    /// 实现名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 具体类型的绑定键
    pub fn key(&self) -> BindingKey {
        self.key
    }

    /// 能否赋值给能力类型 `S`
    pub fn is_assignable_to<S: ?Sized + 'static>(&self) -> bool {
        self.casts.contains_key(&TypeId::of::<S>())
    }

    /// 调用声明的构造函数
    pub fn construct(&self, resolver: &dyn Resolver) -> Result<ErasedInstance, InjectionError> {
        (self.constructor)(resolver)
    }

    /// 把注入器中该具体类型的绑定实例转为独占形式
    pub fn erase_bound(&self, shared: &SharedAny) -> Option<ErasedInstance> {
        (self.erase_bound)(shared)
    }

    /// 把实例转换为能力类型 `S`
    pub fn cast<S: ?Sized + Send + Sync + 'static>(&self, instance: ErasedInstance) -> Option<Arc<S>> {
        let caster = self.casts.get(&TypeId::of::<S>())?;
        caster(instance)?
            .downcast::<Arc<S>>()
            .ok()
            .map(|boxed| *boxed)
    }
}

impl fmt::Debug for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderType")
            .field("name", &self.name)
            .field("type", &self.key)
            .field("capabilities", &self.casts.len())
            .finish()
    }
}

/// 实现类型声明
///
/// ```rust
/// use di_abstractions::{Binder, Module};
/// use di_impl::ProviderDeclaration;
/// use infrastructure_common::InjectionError;
///
/// #[derive(Default)]
/// struct AlphaModule;
///
/// impl Module for AlphaModule {
///     fn configure(&self, _binder: &mut Binder) -> Result<(), InjectionError> {
///         Ok(())
///     }
/// }
///
/// let declaration = ProviderDeclaration::<AlphaModule>::with_factory("com.example.AlphaModule", |_| {
///     Ok(AlphaModule)
/// })
/// .implements::<dyn Module>(|module| module);
/// ```
pub struct ProviderDeclaration<T> {
    inner: ProviderType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ProviderDeclaration<T> {
    /// 通过 [`Injectable`] 构造
    pub fn new(name: impl Into<String>) -> Self
    where
        T: Injectable,
    {
        Self::with_factory(name, T::inject)
    }

    /// 通过自定义工厂构造
    pub fn with_factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<T, InjectionError> + Send + Sync + 'static,
    {
        let constructor: Constructor = Arc::new(move |resolver| {
            factory(resolver).map(|instance| Box::new(Arc::new(instance)) as ErasedInstance)
        });
        let identity: Caster = Arc::new(|instance| Some(instance));

        let mut casts = HashMap::new();
        casts.insert(TypeId::of::<T>(), identity);

        Self {
            inner: ProviderType {
                name: name.into(),
                key: BindingKey::of::<T>(),
                constructor,
                erase_bound: erase_bound::<T>,
                casts,
            },
            _marker: PhantomData,
        }
    }

    /// 声明可以赋值给能力类型 `C`
    pub fn implements<C>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |instance| {
            instance
                .downcast::<Arc<T>>()
                .ok()
                .map(|concrete| Box::new(cast(*concrete)) as ErasedInstance)
        });
        self.inner.casts.insert(TypeId::of::<C>(), caster);
        self
    }
}

impl<T> From<ProviderDeclaration<T>> for ProviderType {
    fn from(declaration: ProviderDeclaration<T>) -> Self {
        declaration.inner
    }
}

/// 实现类型表：稳定名称 → 实现类型
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, ProviderType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记实现类型，同名登记时保留先登记的
    pub fn declare(&mut self, provider: impl Into<ProviderType>) -> bool {
        let provider = provider.into();
        if self.types.contains_key(provider.name()) {
            warn!("实现类型重复登记，保留先登记的: {}", provider.name());
            return false;
        }
        debug!("登记实现类型: {}", provider.name());
        self.types.insert(provider.name().to_string(), provider);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ProviderType> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// 类加载作用域
pub struct ClassLoaderScope {
    id: Uuid,
    name: String,
    parent: Option<Arc<ClassLoaderScope>>,
    locators: Vec<Box<dyn ResourceLocator>>,
    types: TypeRegistry,
}

impl ClassLoaderScope {
    /// 创建作用域构建器
    pub fn builder(name: impl Into<String>) -> ScopeBuilder {
        ScopeBuilder::new(name)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ClassLoaderScope>> {
        self.parent.as_ref()
    }

    /// 本作用域自身登记的实现类型
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// 按顺序列出逻辑路径下的全部资源：父作用域在前，之后按定位器顺序
    pub fn find_resources(&self, path: &str) -> io::Result<Vec<ConfigResource>> {
        let mut resources = match &self.parent {
            Some(parent) => parent.find_resources(path)?,
            None => Vec::new(),
        };
        for locator in &self.locators {
            resources.extend(locator.find_resources(path)?);
        }
        Ok(resources)
    }

    /// 按名称解析实现类型，父作用域优先
    pub fn resolve_type(&self, name: &str) -> Option<&ProviderType> {
        self.parent
            .as_ref()
            .and_then(|parent| parent.resolve_type(name))
            .or_else(|| self.types.get(name))
    }
}

impl fmt::Debug for ClassLoaderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLoaderScope")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .field("locators", &self.locators)
            .field("types", &self.types.len())
            .finish()
    }
}

impl fmt::Display for ClassLoaderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// 作用域构建器
///
/// 资源查找顺序：资源根目录，内嵌资源，然后是自定义定位器。
pub struct ScopeBuilder {
    name: String,
    parent: Option<Arc<ClassLoaderScope>>,
    roots: Vec<PathBuf>,
    embedded: MemoryLocator,
    locators: Vec<Box<dyn ResourceLocator>>,
    types: TypeRegistry,
}

impl ScopeBuilder {
    /// 创建新的作用域构建器
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            embedded: MemoryLocator::new(name.clone()),
            name,
            parent: None,
            roots: Vec::new(),
            locators: Vec::new(),
            types: TypeRegistry::new(),
        }
    }

    /// 设置父作用域
    pub fn parent(mut self, parent: Arc<ClassLoaderScope>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// 添加资源根目录
    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// 添加内嵌资源
    pub fn resource(mut self, path: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        self.embedded.add(path, content);
        self
    }

    /// 添加自定义资源定位器
    pub fn locator(mut self, locator: impl ResourceLocator + 'static) -> Self {
        self.locators.push(Box::new(locator));
        self
    }

    /// 登记实现类型
    pub fn declare(mut self, provider: impl Into<ProviderType>) -> Self {
        self.types.declare(provider);
        self
    }

    /// 构建作用域
    pub fn build(self) -> Arc<ClassLoaderScope> {
        let mut locators: Vec<Box<dyn ResourceLocator>> = Vec::new();
        if !self.roots.is_empty() {
            locators.push(Box::new(DirectoryLocator::new(self.roots)));
        }
        if !self.embedded.is_empty() {
            locators.push(Box::new(self.embedded));
        }
        locators.extend(self.locators);

        let scope = ClassLoaderScope {
            id: Uuid::new_v4(),
            name: self.name,
            parent: self.parent,
            locators,
            types: self.types,
        };
        debug!("创建作用域: {} ({} 个实现类型)", scope, scope.types.len());
        Arc::new(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::Resolver;

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    trait Named: Send + Sync {
        fn label(&self) -> &'static str;
    }

    #[derive(Debug)]
    struct Square;

    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    impl Injectable for Square {
        fn inject(_resolver: &dyn Resolver) -> Result<Self, InjectionError> {
            Ok(Square)
        }
    }

    fn square_type(name: &str) -> ProviderType {
        ProviderDeclaration::<Square>::new(name)
            .implements::<dyn Shape>(|square| square)
            .into()
    }

    #[test]
    fn test_provider_type_casts_to_declared_capabilities_only() {
        let provider = square_type("shapes.Square");
        assert!(provider.is_assignable_to::<dyn Shape>());
        assert!(provider.is_assignable_to::<Square>());
        assert!(!provider.is_assignable_to::<dyn Named>());

        let injector = crate::Injector::bootstrap();
        let instance = provider.construct(injector.as_ref()).unwrap();
        let shape = provider.cast::<dyn Shape>(instance).unwrap();
        assert_eq!(shape.sides(), 4);

        let instance = provider.construct(injector.as_ref()).unwrap();
        assert!(provider.cast::<dyn Named>(instance).is_none());
    }

    #[test]
    fn test_type_resolution_is_parent_first() {
        let parent = ClassLoaderScope::builder("parent")
            .declare(square_type("shapes.Square"))
            .build();
        let child = ClassLoaderScope::builder("child")
            .parent(Arc::clone(&parent))
            .declare(ProviderDeclaration::<Square>::new("shapes.Square"))
            .declare(square_type("shapes.Other"))
            .build();

        let resolved = child.resolve_type("shapes.Square").unwrap();
        assert!(resolved.is_assignable_to::<dyn Shape>());
        assert!(child.resolve_type("shapes.Other").is_some());
        assert!(parent.resolve_type("shapes.Other").is_none());
        assert_eq!(child.parent().unwrap().name(), "parent");
    }

    #[test]
    fn test_resources_are_parent_first_then_locator_order() {
        let parent = ClassLoaderScope::builder("parent")
            .resource("services/x", "p.One\n")
            .build();
        let child = ClassLoaderScope::builder("child")
            .parent(parent)
            .resource("services/x", "c.One\n")
            .locator(MemoryLocator::new("extra").with_resource("services/x", "e.One\n"))
            .build();

        let identities: Vec<String> = child
            .find_resources("services/x")
            .unwrap()
            .iter()
            .map(|resource| resource.identity().to_string())
            .collect();
        assert_eq!(
            identities,
            vec![
                "memory:parent/services/x",
                "memory:child/services/x",
                "memory:extra/services/x",
            ]
        );
        assert!(child.find_resources("services/none").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_declaration_keeps_first() {
        let mut registry = TypeRegistry::new();
        assert!(registry.declare(square_type("shapes.Square")));
        assert!(!registry.declare(ProviderDeclaration::<Square>::new("shapes.Square")));
        assert!(registry
            .get("shapes.Square")
            .unwrap()
            .is_assignable_to::<dyn Shape>());
    }
}
