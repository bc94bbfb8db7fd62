//! 服务生命周期驱动

use crate::app_injector::AppInjector;
use di_abstractions::Capability;
use infrastructure_common::{LifecycleError, LifecyclePhase, LifecycleState, Service};
use std::sync::Arc;
use tracing::{debug, info};

/// 按阶段驱动同一能力类型的全部服务
///
/// 实例只收集一次，三个阶段作用于同一批实例。每个阶段中服务按发现顺序依次执行，
/// 任一钩子失败时立即返回，状态变为 [`LifecycleState::Error`]。
pub struct LifecycleDriver<S: ?Sized> {
    services: Vec<Arc<S>>,
    state: LifecycleState,
}

impl<S> LifecycleDriver<S>
where
    S: ?Sized + Service + Capability,
{
    /// 从组合中收集全部实现
    pub fn collect(app: &AppInjector) -> Result<Self, LifecycleError> {
        let services = app
            .get_services::<S>()
            .collect::<Result<Vec<_>, _>>()?;
        info!("{}: 收集到 {} 个服务", S::NAME, services.len());
        Ok(Self::from_services(services))
    }

    pub fn from_services(services: Vec<Arc<S>>) -> Self {
        Self {
            services,
            state: LifecycleState::default(),
        }
    }

    pub fn services(&self) -> &[Arc<S>] {
        &self.services
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// 对全部服务执行 `on_load`
    pub async fn load(&mut self) -> Result<(), LifecycleError> {
        self.run(LifecyclePhase::Load).await
    }

    /// 对全部服务执行 `on_enable`
    pub async fn enable(&mut self) -> Result<(), LifecycleError> {
        self.run(LifecyclePhase::Enable).await
    }

    /// 对全部服务执行 `on_disable`
    pub async fn disable(&mut self) -> Result<(), LifecycleError> {
        self.run(LifecyclePhase::Disable).await
    }

    async fn run(&mut self, phase: LifecyclePhase) -> Result<(), LifecycleError> {
        if !self.state.can_enter(phase) {
            return Err(LifecycleError::PhaseOrder {
                state: self.state,
                phase,
            });
        }

        for (index, service) in self.services.iter().enumerate() {
            debug!("{}#{}: {}", S::NAME, index, phase);
            let result = match phase {
                LifecyclePhase::Load => service.on_load().await,
                LifecyclePhase::Enable => service.on_enable().await,
                LifecyclePhase::Disable => service.on_disable().await,
            };
            if let Err(source) = result {
                self.state = LifecycleState::Error;
                return Err(LifecycleError::HookFailed {
                    service: format!("{}#{}", S::NAME, index),
                    phase,
                    source,
                });
            }
        }

        self.state = LifecycleState::after(phase);
        info!("{}: {} 完成 ({} 个服务)", S::NAME, phase, self.services.len());
        Ok(())
    }
}
