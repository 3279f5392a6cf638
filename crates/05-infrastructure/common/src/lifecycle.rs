//! 组件生命周期钩子

use async_trait::async_trait;

/// 释放失败的错误类型
pub type DisposeError = Box<dyn std::error::Error + Send + Sync>;

/// 可释放组件 trait
///
/// 持有外部资源（连接、定时器）的组件实现此 trait，
/// 应用关闭时按构造顺序的逆序调用
#[async_trait]
pub trait Disposable: Send + Sync {
    /// 释放组件持有的外部资源
    async fn dispose(&self) -> Result<(), DisposeError>;
}
