//! 特性扩展接口
//!
//! 特性是可选的子系统（消息、缓存、定时任务等），在扫描阶段提供额外的组件注册，
//! 并在所有组件实例化、路由注册完成之后收到一次 `on_ready` 回调

use crate::registry::ComponentLookup;
use crate::scanner::RegistrationAction;
use async_trait::async_trait;
use infrastructure_common::FeatureError;

/// 特性 trait
#[async_trait]
pub trait Feature: Send + Sync {
    /// 特性ID
    fn id(&self) -> &str;

    /// 提供的组件注册
    fn provide_registrations(&self) -> Vec<RegistrationAction> {
        Vec::new()
    }

    /// 注册表就绪后调用，失败会中止引导
    async fn on_ready(&self, _registry: &dyn ComponentLookup) -> Result<(), FeatureError> {
        Ok(())
    }
}
