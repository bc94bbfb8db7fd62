//! di-impl 集成测试：服务发现、缓存与组合注入器

use di_abstractions::{declare_capability, Binder, Injectable, Module, Resolver, ResolverExt};
use di_impl::{ClassLoaderScope, DefaultInjector, Injector, MemoryLocator, ProviderDeclaration, ServiceLoader};
use infrastructure_common::{InjectionError, ServiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MODULES: &str = "META-INF/services/di.abstractions.Module";
const PLUGINS: &str = "META-INF/services/integration.Plugin";

trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
}

declare_capability!(dyn Plugin, "integration.Plugin");

/// 由 AlphaModule 绑定
struct Greeting(&'static str);

/// 由 BetaModule 绑定
struct Port(u16);

struct AlphaModule;

impl Injectable for AlphaModule {
    fn inject(_resolver: &dyn Resolver) -> Result<Self, InjectionError> {
        Ok(AlphaModule)
    }
}

impl Module for AlphaModule {
    fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError> {
        binder.bind_instance(Arc::new(Greeting("hi")))?;
        Ok(())
    }
}

struct BetaModule;

impl Injectable for BetaModule {
    fn inject(_resolver: &dyn Resolver) -> Result<Self, InjectionError> {
        Ok(BetaModule)
    }
}

impl Module for BetaModule {
    fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError> {
        binder.bind_instance(Arc::new(Port(25565)))?;
        Ok(())
    }
}

struct First;
struct Second;
struct Third;

macro_rules! plugin {
    ($ty:ident, $id:literal) => {
        impl Injectable for $ty {
            fn inject(_resolver: &dyn Resolver) -> Result<Self, InjectionError> {
                Ok($ty)
            }
        }

        impl Plugin for $ty {
            fn id(&self) -> &'static str {
                $id
            }
        }
    };
}

plugin!(First, "first");
plugin!(Second, "second");
plugin!(Third, "third");

fn with_plugins(builder: di_impl::ScopeBuilder) -> di_impl::ScopeBuilder {
    builder
        .declare(ProviderDeclaration::<First>::new("it.First").implements::<dyn Plugin>(|p| p))
        .declare(ProviderDeclaration::<Second>::new("it.Second").implements::<dyn Plugin>(|p| p))
        .declare(ProviderDeclaration::<Third>::new("it.Third").implements::<dyn Plugin>(|p| p))
}

fn with_modules(builder: di_impl::ScopeBuilder) -> di_impl::ScopeBuilder {
    builder
        .declare(ProviderDeclaration::<AlphaModule>::new("com.example.AlphaModule").implements::<dyn Module>(|m| m))
        .declare(ProviderDeclaration::<BetaModule>::new("com.example.BetaModule").implements::<dyn Module>(|m| m))
}

fn plugin_ids(loader: &mut ServiceLoader<dyn Plugin>) -> Vec<&'static str> {
    loader.iter().map(|plugin| plugin.unwrap().id()).collect()
}

#[test]
fn test_duplicate_module_declaration_is_instantiated_once() {
    let alpha_built = Arc::new(AtomicUsize::new(0));
    let beta_built = Arc::new(AtomicUsize::new(0));
    let (alpha, beta) = (Arc::clone(&alpha_built), Arc::clone(&beta_built));

    let scope = ClassLoaderScope::builder("modules")
        .resource(
            MODULES,
            "com.example.AlphaModule\n# comment\ncom.example.BetaModule\ncom.example.AlphaModule\n",
        )
        .declare(
            ProviderDeclaration::<AlphaModule>::with_factory("com.example.AlphaModule", move |_| {
                alpha.fetch_add(1, Ordering::SeqCst);
                Ok(AlphaModule)
            })
            .implements::<dyn Module>(|m| m),
        )
        .declare(
            ProviderDeclaration::<BetaModule>::with_factory("com.example.BetaModule", move |_| {
                beta.fetch_add(1, Ordering::SeqCst);
                Ok(BetaModule)
            })
            .implements::<dyn Module>(|m| m),
        )
        .build();
    let mut loader = ServiceLoader::<dyn Module>::with_injector(Injector::bootstrap(), scope);

    let modules: Vec<Arc<dyn Module>> = loader.iter().collect::<Result<_, _>>().unwrap();

    assert_eq!(modules.len(), 2);
    assert!(modules[0].key().ends_with("AlphaModule"));
    assert!(modules[1].key().ends_with("BetaModule"));
    assert_eq!(alpha_built.load(Ordering::SeqCst), 1);
    assert_eq!(beta_built.load(Ordering::SeqCst), 1);

    let injector = Injector::create(modules).unwrap();
    assert_eq!(injector.get::<Greeting>().unwrap().0, "hi");
    assert_eq!(injector.get::<Port>().unwrap().0, 25565);
}

#[test]
fn test_names_across_resource_roots_are_yielded_once_in_first_seen_order() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    for (root, content) in [
        (&first, "it.Second\nit.First\n"),
        (&second, "it.First\nit.Third\nit.Second\n"),
    ] {
        let path = root.path().join(PLUGINS);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    let scope = with_plugins(ClassLoaderScope::builder("disk"))
        .resource_root(first.path())
        .resource_root(second.path())
        .build();
    let mut loader = ServiceLoader::<dyn Plugin>::with_injector(Injector::bootstrap(), scope);

    assert_eq!(plugin_ids(&mut loader), vec!["second", "first", "third"]);
    assert_eq!(plugin_ids(&mut loader), vec!["second", "first", "third"]);
}

#[test]
fn test_parent_scope_resources_come_first() {
    let parent = with_plugins(ClassLoaderScope::builder("parent"))
        .resource(PLUGINS, "it.Third\n")
        .build();
    let child = ClassLoaderScope::builder("child")
        .parent(parent)
        .resource(PLUGINS, "it.First\n")
        .locator(MemoryLocator::new("extra").with_resource(PLUGINS, "it.Third\nit.Second\n"))
        .build();
    let mut loader = ServiceLoader::<dyn Plugin>::with_injector(Injector::bootstrap(), child);

    assert_eq!(plugin_ids(&mut loader), vec!["third", "first", "second"]);
}

#[test]
fn test_reload_reinstantiates_providers() {
    let scope = with_plugins(ClassLoaderScope::builder("reload"))
        .resource(PLUGINS, "it.First\nit.Second\n")
        .build();
    let mut loader = ServiceLoader::<dyn Plugin>::with_injector(Injector::bootstrap(), scope);

    let before: Vec<_> = loader.iter().map(Result::unwrap).collect();
    let cached: Vec<_> = loader.iter().map(Result::unwrap).collect();
    assert!(before.iter().zip(&cached).all(|(a, b)| Arc::ptr_eq(a, b)));

    loader.reload();
    let after: Vec<_> = loader.iter().map(Result::unwrap).collect();
    assert_eq!(after.len(), 2);
    assert!(before.iter().zip(&after).all(|(a, b)| !Arc::ptr_eq(a, b)));
    assert_eq!(after[0].id(), "first");
}

#[test]
fn test_malformed_lines_report_resource_and_line() {
    for (content, expected_line) in [("it.First\ncom bad name\n", 2), ("\n\n1Bad.Name\n", 3)] {
        let scope = with_plugins(ClassLoaderScope::builder("malformed"))
            .resource(PLUGINS, content)
            .build();
        let loader = ServiceLoader::<dyn Plugin>::with_injector(Injector::bootstrap(), scope);

        let error = loader
            .into_iter()
            .find_map(Result::err)
            .expect("malformed line must fail the sweep");
        match &error {
            ServiceError::ConfigurationFormat { resource, line, .. } => {
                assert_eq!(resource, &format!("memory:malformed/{}", PLUGINS));
                assert_eq!(*line, expected_line);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(error.is_configuration_error());
        assert!(error
            .to_string()
            .contains(&format!("{}:{}", PLUGINS, expected_line)));
    }
}

#[test]
fn test_modules_from_two_scopes_install_in_scope_order() {
    let first = with_modules(ClassLoaderScope::builder("first"))
        .resource(MODULES, "com.example.BetaModule\n")
        .build();
    let second = with_modules(ClassLoaderScope::builder("second"))
        .resource(MODULES, "com.example.AlphaModule\n")
        .build();

    let bootstrap = Injector::bootstrap();
    let mut modules: Vec<Arc<dyn Module>> = Vec::new();
    for scope in [first, second] {
        let loader = ServiceLoader::<dyn Module>::with_injector(Arc::clone(&bootstrap), scope);
        for module in loader {
            modules.push(module.unwrap());
        }
    }

    let injector = Injector::create(modules).unwrap();
    let installed = injector.installed_modules();
    assert!(installed[0].ends_with("BetaModule"));
    assert!(installed[1].ends_with("AlphaModule"));
    assert!(injector.is_bound::<Greeting>());
    assert!(injector.is_bound::<Port>());
}

#[test]
fn test_query_without_injector_is_configuration_error() {
    let scope = with_plugins(ClassLoaderScope::builder("no-injector"))
        .resource(PLUGINS, "it.First\n")
        .build();

    let error = match ServiceLoader::<dyn Plugin>::load_from(&DefaultInjector::new(), scope) {
        Err(error) => error,
        Ok(_) => panic!("loader must not be created without an injector"),
    };
    assert!(matches!(error, ServiceError::MissingInjector { ref service } if service == "integration.Plugin"));
    assert!(error.is_configuration_error());
}

#[test]
fn test_loader_uses_slot_injector_once_set() {
    let scope = with_plugins(ClassLoaderScope::builder("slot"))
        .resource(PLUGINS, "it.Third\n")
        .build();
    let slot = DefaultInjector::new();
    slot.set(Injector::bootstrap()).unwrap();

    let mut loader = ServiceLoader::<dyn Plugin>::load_from(&slot, scope).unwrap();
    assert_eq!(plugin_ids(&mut loader), vec!["third"]);
    assert_eq!(loader.to_string(), "ServiceLoader[integration.Plugin]");
}
