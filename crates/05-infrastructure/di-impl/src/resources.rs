//! 资源定位器实现

use di_abstractions::{ConfigResource, ResourceLocator};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// 文件系统资源定位器
///
/// 逻辑路径依次拼接到每个资源根目录下，按根目录顺序返回存在的文件。
#[derive(Debug, Clone, Default)]
pub struct DirectoryLocator {
    roots: Vec<PathBuf>,
}

impl DirectoryLocator {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ResourceLocator for DirectoryLocator {
    fn find_resources(&self, path: &str) -> io::Result<Vec<ConfigResource>> {
        let mut resources = Vec::new();
        for root in &self.roots {
            let candidate = root.join(path);
            match std::fs::metadata(&candidate) {
                Ok(metadata) if metadata.is_file() => {
                    debug!("找到配置文件: {}", candidate.display());
                    resources.push(ConfigResource::file(candidate));
                }
                Ok(_) => {
                    warn!("配置路径不是文件，已忽略: {}", candidate.display());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(resources)
    }
}

/// 内存资源定位器，用于内嵌的静态资源
///
/// 同一路径可以登记多个资源，按登记顺序返回。
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
    label: String,
    entries: HashMap<String, Vec<Arc<[u8]>>>,
}

impl MemoryLocator {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: HashMap::new(),
        }
    }

    /// 登记资源
    pub fn add(&mut self, path: impl Into<String>, content: impl AsRef<[u8]>) {
        self.entries
            .entry(path.into())
            .or_default()
            .push(Arc::from(content.as_ref()));
    }

    /// 登记资源（链式）
    pub fn with_resource(mut self, path: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        self.add(path, content);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceLocator for MemoryLocator {
    fn find_resources(&self, path: &str) -> io::Result<Vec<ConfigResource>> {
        let Some(entries) = self.entries.get(path) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .enumerate()
            .map(|(index, content)| {
                let identity = if index == 0 {
                    format!("memory:{}/{}", self.label, path)
                } else {
                    format!("memory:{}/{}#{}", self.label, path, index)
                };
                ConfigResource::memory(identity, content)
            })
            .collect())
    }
}
