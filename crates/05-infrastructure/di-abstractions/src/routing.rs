//! 路由协作者接口

use infrastructure_common::{ComponentInstance, ComponentKey};

/// 路由绑定错误
pub type BindError = Box<dyn std::error::Error + Send + Sync>;

/// 路由绑定 trait
///
/// Web 框架适配层实现此接口，在路由注册阶段接收每个已实例化的
/// HttpHandler 和 RouteModule 组件
pub trait RouteBinder: Send + Sync {
    /// 绑定一个 Web 组件
    fn bind(&mut self, key: &ComponentKey, component: &ComponentInstance) -> Result<(), BindError>;
}
