//! 默认注入器槽位
//!
//! 未显式指定注入器的发现扫描从这里取得注入器。槽位只能设置一次。

use crate::injector::Injector;
use infrastructure_common::{InjectionError, ServiceError};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

static GLOBAL: DefaultInjector = DefaultInjector::new();

/// 一次性设置的注入器槽位
#[derive(Debug, Default)]
pub struct DefaultInjector {
    cell: OnceCell<Arc<Injector>>,
}

impl DefaultInjector {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// 进程级槽位
    pub fn global() -> &'static DefaultInjector {
        &GLOBAL
    }

    /// 设置注入器；重复设置同一个注入器视为成功
    pub fn set(&self, injector: Arc<Injector>) -> Result<(), InjectionError> {
        let current = self.cell.get_or_init(|| Arc::clone(&injector));
        if Arc::ptr_eq(current, &injector) {
            info!("默认注入器已设置: {}", injector.id());
            Ok(())
        } else {
            Err(InjectionError::StateViolation {
                message: format!("默认注入器已设置为 {}", current.id()),
            })
        }
    }

    pub fn get(&self) -> Option<Arc<Injector>> {
        self.cell.get().cloned()
    }

    /// 取得注入器，未设置时返回配置错误
    pub fn require(&self, service: &str) -> Result<Arc<Injector>, ServiceError> {
        self.get().ok_or_else(|| ServiceError::MissingInjector {
            service: service.to_string(),
        })
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}
