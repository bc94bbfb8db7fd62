//! 示例宿主的实现类型
//!
//! 模块与服务都只在资源文件中按名称声明，由作用域中的登记表解析。

use async_trait::async_trait;
use di_abstractions::{Binder, Injectable, InjectionRoot, Module, Resolver, ResolverExt};
use di_impl::{ProviderDeclaration, ScopeBuilder};
use infrastructure_common::{HookError, InjectionError, Service};
use infrastructure_composition::JsonCodec;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// 头像纹理
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadTexture {
    pub name: String,
    pub texture: String,
}

/// 头像缓存
#[derive(Debug, Default)]
pub struct HeadCache {
    heads: RwLock<BTreeMap<String, HeadTexture>>,
}

impl HeadCache {
    pub fn insert(&self, head: HeadTexture) {
        self.heads.write().insert(head.name.clone(), head);
    }

    pub fn get(&self, name: &str) -> Option<HeadTexture> {
        self.heads.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.heads.read().len()
    }

    pub fn clear(&self) {
        self.heads.write().clear();
    }
}

/// 命令表
#[derive(Debug, Default)]
pub struct CommandTable {
    commands: RwLock<Vec<String>>,
}

impl CommandTable {
    pub fn register(&self, command: impl Into<String>) {
        self.commands.write().push(command.into());
    }

    pub fn unregister_all(&self) {
        self.commands.write().clear();
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.read().clone()
    }
}

pub struct HeadsModule;

impl Injectable for HeadsModule {
    fn inject(_resolver: &dyn Resolver) -> Result<Self, InjectionError> {
        Ok(HeadsModule)
    }
}

impl Module for HeadsModule {
    fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError> {
        binder.bind_singleton(|_| Ok(Arc::new(HeadCache::default())))?;
        binder.bind_singleton(|_| Ok(Arc::new(CommandTable::default())))?;
        Ok(())
    }
}

/// 加载阶段预热缓存，停用时清空
pub struct CacheWarmupService {
    cache: Arc<HeadCache>,
    codec: Arc<JsonCodec>,
}

impl Injectable for CacheWarmupService {
    fn inject(resolver: &dyn Resolver) -> Result<Self, InjectionError> {
        Ok(Self {
            cache: resolver.get()?,
            codec: resolver.get()?,
        })
    }
}

const BUILTIN_HEADS: &str = r#"[
    {"name": "steve", "texture": "c06f89064c8a49119c29ea1dbd1aab82"},
    {"name": "alex", "texture": "6ab4317889fd490597f60f67d9d76fd9"}
]"#;

#[async_trait]
impl Service for CacheWarmupService {
    async fn on_load(&self) -> Result<(), HookError> {
        let heads: Vec<HeadTexture> = self.codec.decode(BUILTIN_HEADS)?;
        for head in heads {
            self.cache.insert(head);
        }
        info!("头像缓存已预热: {} 项", self.cache.len());
        Ok(())
    }

    async fn on_disable(&self) -> Result<(), HookError> {
        self.cache.clear();
        Ok(())
    }
}

/// 启用阶段注册命令
pub struct CommandService {
    commands: Arc<CommandTable>,
}

impl Injectable for CommandService {
    fn inject(resolver: &dyn Resolver) -> Result<Self, InjectionError> {
        Ok(Self {
            commands: resolver.get()?,
        })
    }
}

#[async_trait]
impl Service for CommandService {
    async fn on_enable(&self) -> Result<(), HookError> {
        self.commands.register("heads reload");
        self.commands.register("heads show");
        info!("命令已注册: {:?}", self.commands.commands());
        Ok(())
    }

    async fn on_disable(&self) -> Result<(), HookError> {
        self.commands.unregister_all();
        Ok(())
    }
}

/// 示例宿主，同时是注入根
#[derive(Default)]
pub struct HeadsPlugin {
    cache: OnceCell<Arc<HeadCache>>,
    codec: OnceCell<Arc<JsonCodec>>,
}

impl HeadsPlugin {
    /// 以 JSON 形式输出缓存中的头像
    pub fn describe(&self, name: &str) -> anyhow::Result<String> {
        let cache = self
            .cache
            .get()
            .ok_or_else(|| anyhow::anyhow!("宿主尚未完成成员注入"))?;
        let codec = self
            .codec
            .get()
            .ok_or_else(|| anyhow::anyhow!("宿主尚未完成成员注入"))?;
        match cache.get(name) {
            Some(head) => Ok(codec.encode(&head)?),
            None => Ok(format!("未找到头像: {}", name)),
        }
    }
}

impl InjectionRoot for HeadsPlugin {
    fn inject_members(&self, resolver: &dyn Resolver) -> Result<(), InjectionError> {
        let already = || InjectionError::StateViolation {
            message: "宿主已经注入过".to_string(),
        };
        self.cache.set(resolver.get()?).map_err(|_| already())?;
        self.codec.set(resolver.get()?).map_err(|_| already())?;
        Ok(())
    }
}

/// 登记示例宿主的全部实现类型
pub fn declare(builder: ScopeBuilder) -> ScopeBuilder {
    builder
        .declare(ProviderDeclaration::<HeadsModule>::new("example.heads.HeadsModule").implements::<dyn Module>(|m| m))
        .declare(
            ProviderDeclaration::<CacheWarmupService>::new("example.heads.CacheWarmupService")
                .implements::<dyn Service>(|s| s),
        )
        .declare(
            ProviderDeclaration::<CommandService>::new("example.heads.CommandService")
                .implements::<dyn Service>(|s| s),
        )
}
