//! # Data Abstractions
//!
//! 数据访问抽象层：数据源协作者接口以及事务协调器。
//!
//! ## 核心接口
//!
//! - [`DataSource`] / [`PhysicalTransaction`] - 由持久化驱动实现的外部协作者
//! - [`TransactionCoordinator`] - 为每个逻辑工作单元创建 [`UnitOfWork`]
//! - [`UnitOfWork`] - 可重入的事务作用域，支持提交后执行的延迟副作用
//! - [`InMemoryDataSource`] - 记录事务事件的内存数据源，供测试和演示使用
//!
//! ## 事务语义
//!
//! - 只有最外层作用域真正开启和结束物理事务，嵌套作用域共享同一个物理事务
//! - 延迟副作用只在最外层作用域提交成功后按登记顺序执行一次
//! - 任意层级发生回滚，所有已登记的延迟副作用全部丢弃

pub mod context;
pub mod coordinator;
pub mod memory;
pub mod source;

pub use context::*;
pub use coordinator::*;
pub use memory::{InMemoryDataSource, InMemoryTransaction, TransactionEvent};
pub use source::*;
