//! 数据源协作者接口
//!
//! 连接池和持久化驱动不属于本层，这里只定义引导引擎和事务协调器使用的最小能力

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// 数据源错误类型
pub type DataSourceError = Box<dyn std::error::Error + Send + Sync>;

/// 数据源 trait
///
/// 由持久化驱动实现；`begin` 在连接池耗尽时应当以协作方式等待，而不是阻塞线程
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 数据源名称
    fn name(&self) -> &str;

    /// 从连接池获取连接并开启物理事务
    async fn begin(&self) -> Result<Arc<dyn PhysicalTransaction>, DataSourceError>;
}

/// 物理事务 trait
#[async_trait]
pub trait PhysicalTransaction: Send + Sync {
    /// 提交事务
    async fn commit(&self) -> Result<(), DataSourceError>;

    /// 回滚事务
    async fn rollback(&self) -> Result<(), DataSourceError>;

    /// 供驱动向下转型到具体的事务类型
    fn as_any(&self) -> &dyn Any;
}
