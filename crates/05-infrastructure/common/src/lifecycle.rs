//! 服务生命周期契约
//!
//! 宿主对同一能力类型的全部服务依次执行 `on_load`、`on_enable`，
//! 关闭时执行 `on_disable`。所有服务的 `on_load` 完成之后才会开始任何 `on_enable`。

use async_trait::async_trait;
use std::fmt;

/// 生命周期钩子返回的错误类型
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// 可由宿主驱动生命周期的服务
///
/// 三个钩子均为可选，默认实现不做任何事情。
#[async_trait]
pub trait Service: Send + Sync {
    /// 服务已加载、尚未启用时调用
    async fn on_load(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// 服务加载之后启用时调用
    async fn on_enable(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// 服务停用时调用
    async fn on_disable(&self) -> Result<(), HookError> {
        Ok(())
    }
}

/// 生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Load,
    Enable,
    Disable,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("onLoad"),
            Self::Enable => f.write_str("onEnable"),
            Self::Disable => f.write_str("onDisable"),
        }
    }
}

/// 服务集合的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// 尚未执行任何阶段
    #[default]
    Uninitialized,
    /// 全部服务已完成 `on_load`
    Loaded,
    /// 全部服务已完成 `on_enable`
    Enabled,
    /// 全部服务已完成 `on_disable`
    Disabled,
    /// 某个阶段失败
    Error,
}

impl LifecycleState {
    /// 判断在当前状态下能否执行指定阶段
    pub fn can_enter(self, phase: LifecyclePhase) -> bool {
        matches!(
            (self, phase),
            (Self::Uninitialized, LifecyclePhase::Load)
                | (Self::Loaded, LifecyclePhase::Enable)
                | (Self::Loaded, LifecyclePhase::Disable)
                | (Self::Enabled, LifecyclePhase::Disable)
        )
    }

    /// 阶段成功完成后的状态
    pub fn after(phase: LifecyclePhase) -> Self {
        match phase {
            LifecyclePhase::Load => Self::Loaded,
            LifecyclePhase::Enable => Self::Enabled,
            LifecyclePhase::Disable => Self::Disabled,
        }
    }
}
