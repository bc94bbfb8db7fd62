//! 绑定模块抽象接口

use crate::binder::Binder;
use infrastructure_common::InjectionError;

/// 绑定模块 trait
///
/// 模块在注入器构建之前向 [`Binder`] 贡献绑定，构建完成后不再参与任何操作。
pub trait Module: Send + Sync {
    /// 声明绑定
    fn configure(&self, binder: &mut Binder) -> Result<(), InjectionError>;

    /// 模块键，同一键在一个注入器中只安装一次
    fn key(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
