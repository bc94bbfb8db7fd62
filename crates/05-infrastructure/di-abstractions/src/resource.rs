//! 配置资源抽象接口
//!
//! 资源定位器把逻辑路径映射为有序的资源列表；同一路径在不同作用域中可以对应不同内容。

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 资源定位器 trait
pub trait ResourceLocator: Send + Sync + fmt::Debug {
    /// 按顺序返回逻辑路径下的全部资源，不打开任何资源
    fn find_resources(&self, path: &str) -> io::Result<Vec<ConfigResource>>;
}

#[derive(Clone)]
enum ResourceSource {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// 单个配置资源
///
/// 只记录身份和位置，调用 [`ConfigResource::open`] 时才真正打开。
#[derive(Clone)]
pub struct ConfigResource {
    identity: String,
    source: ResourceSource,
}

impl ConfigResource {
    /// 文件资源
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            identity: format!("file:{}", path.display()),
            source: ResourceSource::File(path),
        }
    }

    /// 内存资源
    pub fn memory(identity: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        Self {
            identity: identity.into(),
            source: ResourceSource::Memory(Arc::from(content.as_ref())),
        }
    }

    /// 资源身份，用于错误信息
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// 打开资源
    pub fn open(&self) -> io::Result<Box<dyn BufRead + Send>> {
        match &self.source {
            ResourceSource::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            ResourceSource::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }
}

impl fmt::Debug for ConfigResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConfigResource").field(&self.identity).finish()
    }
}

impl fmt::Display for ConfigResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}
