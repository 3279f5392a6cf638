//! 内存数据源
//!
//! 进程内的数据源实现，记录每个物理事务的开启、提交和回滚，
//! 用有限的许可数模拟连接池。用于测试和演示。

use crate::source::{DataSource, DataSourceError, PhysicalTransaction};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 物理事务事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    /// 开启事务
    Begin(u64),
    /// 提交事务
    Commit(u64),
    /// 回滚事务
    Rollback(u64),
}

#[derive(Debug)]
struct Shared {
    events: Mutex<Vec<TransactionEvent>>,
    fail_next_commit: AtomicBool,
}

/// 内存数据源
#[derive(Debug, Clone)]
pub struct InMemoryDataSource {
    name: String,
    pool: Arc<Semaphore>,
    next_id: Arc<AtomicU64>,
    shared: Arc<Shared>,
}

impl InMemoryDataSource {
    /// 创建指定连接池容量的数据源
    pub fn new(name: impl Into<String>, pool_size: usize) -> Self {
        Self {
            name: name.into(),
            pool: Arc::new(Semaphore::new(pool_size)),
            next_id: Arc::new(AtomicU64::new(1)),
            shared: Arc::new(Shared {
                events: Mutex::new(Vec::new()),
                fail_next_commit: AtomicBool::new(false),
            }),
        }
    }

    /// 已记录的事件
    pub fn events(&self) -> Vec<TransactionEvent> {
        self.shared.events.lock().clone()
    }

    /// 已开启的物理事务数量
    pub fn begin_count(&self) -> usize {
        self.count(|event| matches!(event, TransactionEvent::Begin(_)))
    }

    /// 已提交的物理事务数量
    pub fn commit_count(&self) -> usize {
        self.count(|event| matches!(event, TransactionEvent::Commit(_)))
    }

    /// 已回滚的物理事务数量
    pub fn rollback_count(&self) -> usize {
        self.count(|event| matches!(event, TransactionEvent::Rollback(_)))
    }

    /// 当前空闲的连接数
    pub fn available_connections(&self) -> usize {
        self.pool.available_permits()
    }

    /// 让下一次提交失败
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn count(&self, predicate: impl Fn(&TransactionEvent) -> bool) -> usize {
        self.shared
            .events
            .lock()
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn begin(&self) -> Result<Arc<dyn PhysicalTransaction>, DataSourceError> {
        let permit = self.pool.clone().acquire_owned().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.events.lock().push(TransactionEvent::Begin(id));

        Ok(Arc::new(InMemoryTransaction {
            id,
            shared: self.shared.clone(),
            permit: Mutex::new(Some(permit)),
        }))
    }
}

/// 内存物理事务
#[derive(Debug)]
pub struct InMemoryTransaction {
    id: u64,
    shared: Arc<Shared>,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
}

impl InMemoryTransaction {
    /// 事务ID
    pub fn id(&self) -> u64 {
        self.id
    }

    fn release(&self) {
        self.permit.lock().take();
    }
}

#[async_trait]
impl PhysicalTransaction for InMemoryTransaction {
    async fn commit(&self) -> Result<(), DataSourceError> {
        self.release();
        if self.shared.fail_next_commit.swap(false, Ordering::SeqCst) {
            self.shared.events.lock().push(TransactionEvent::Rollback(self.id));
            return Err(format!("事务 {} 提交失败", self.id).into());
        }
        self.shared.events.lock().push(TransactionEvent::Commit(self.id));
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DataSourceError> {
        self.release();
        self.shared.events.lock().push(TransactionEvent::Rollback(self.id));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
