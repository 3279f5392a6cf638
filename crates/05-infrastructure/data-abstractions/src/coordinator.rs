//! 事务协调器
//!
//! 每个逻辑工作单元（一次入站请求、一次定时任务执行）持有自己的 [`UnitOfWork`]，
//! 事务上下文随工作单元显式传递，不使用线程局部或全局状态。

use crate::context::{EffectError, TransactionContext};
use crate::source::{DataSource, PhysicalTransaction};
use futures::FutureExt;
use infrastructure_common::TransactionError;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// 事务协调器
///
/// 并发的工作单元各自从连接池获取独立的物理事务，协调器本身不做任何全局加锁
#[derive(Clone)]
pub struct TransactionCoordinator {
    data_source: Arc<dyn DataSource>,
    acquire_timeout: Option<Duration>,
}

impl TransactionCoordinator {
    /// 创建新的事务协调器
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self {
            data_source,
            acquire_timeout: None,
        }
    }

    /// 设置等待物理事务的超时时间
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// 底层数据源
    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// 为一个新的逻辑工作单元创建句柄
    pub fn unit_of_work(&self) -> UnitOfWork {
        UnitOfWork {
            inner: Arc::new(UnitOfWorkInner {
                id: Uuid::new_v4(),
                data_source: self.data_source.clone(),
                acquire_timeout: self.acquire_timeout,
                context: Mutex::new(None),
                cancellation: CancellationToken::new(),
            }),
        }
    }

    /// 在新的工作单元中执行事务
    pub async fn with_transaction<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(UnitOfWork) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionError>,
    {
        self.unit_of_work().with_transaction(work).await
    }
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("data_source", &self.data_source.name())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

struct UnitOfWorkInner {
    id: Uuid,
    data_source: Arc<dyn DataSource>,
    acquire_timeout: Option<Duration>,
    context: Mutex<Option<TransactionContext>>,
    cancellation: CancellationToken,
}

/// 逻辑工作单元
///
/// 克隆得到的句柄共享同一个事务上下文，只能在同一个工作单元内传递，
/// 不允许在并发的工作单元之间共享
#[derive(Clone)]
pub struct UnitOfWork {
    inner: Arc<UnitOfWorkInner>,
}

impl UnitOfWork {
    /// 工作单元ID
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// 是否处于事务作用域内
    pub fn is_active(&self) -> bool {
        self.inner.context.lock().is_some()
    }

    /// 当前嵌套深度，不在事务中时为 `None`
    pub fn depth(&self) -> Option<usize> {
        self.inner.context.lock().as_ref().map(TransactionContext::depth)
    }

    /// 当前事务是否已被标记为回滚
    pub fn is_rolled_back(&self) -> bool {
        self.inner
            .context
            .lock()
            .as_ref()
            .is_some_and(TransactionContext::is_rolled_back)
    }

    /// 当前作用域共享的物理事务
    pub fn transaction(&self) -> Result<Arc<dyn PhysicalTransaction>, TransactionError> {
        self.inner
            .context
            .lock()
            .as_ref()
            .map(TransactionContext::physical)
            .ok_or(TransactionError::NoActiveTransaction)
    }

    /// 取消工作单元；正在执行的作用域会回滚并返回 [`TransactionError::Cancelled`]
    pub fn cancel(&self) {
        self.inner.cancellation.cancel();
    }

    /// 取消令牌，可与请求的生命周期关联
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancellation.clone()
    }

    /// 登记一个延迟副作用，只在最外层作用域提交成功后执行
    pub fn defer_on_commit<F, Fut, Er>(&self, effect: F) -> Result<(), TransactionError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), Er>> + Send + 'static,
        Er: Into<EffectError>,
    {
        let mut guard = self.inner.context.lock();
        let context = guard.as_mut().ok_or(TransactionError::NoActiveTransaction)?;
        context.defer(Box::new(move || {
            async move { effect().await.map_err(Into::into) }.boxed()
        }));
        debug!(
            unit_of_work = %self.inner.id,
            pending = context.deferred_count(),
            "登记延迟副作用"
        );
        Ok(())
    }

    /// 在事务作用域内执行 `work`
    ///
    /// 没有活动事务时开启物理事务并成为最外层作用域；否则复用现有事务并增加嵌套深度。
    /// `work` 返回的错误原样向上传播。
    pub async fn with_transaction<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(UnitOfWork) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionError>,
    {
        if self.inner.cancellation.is_cancelled() {
            return Err(TransactionError::Cancelled.into());
        }

        let nested = {
            let mut guard = self.inner.context.lock();
            match guard.as_mut() {
                Some(context) => {
                    context.enter();
                    true
                }
                None => false,
            }
        };

        if nested {
            self.run_nested(work).await
        } else {
            self.run_outermost(work).await
        }
    }

    async fn run_nested<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(UnitOfWork) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionError>,
    {
        debug!(unit_of_work = %self.inner.id, depth = ?self.depth(), "进入嵌套事务作用域");

        let mut scope = NestedScope {
            unit: self,
            failed: true,
        };
        let result = match self.run_cancellable(work(self.clone())).await {
            Ok(_) if self.inner.cancellation.is_cancelled() => {
                Err(TransactionError::Cancelled.into())
            }
            result => result,
        };
        scope.failed = result.is_err();
        drop(scope);

        result
    }

    async fn run_outermost<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(UnitOfWork) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionError>,
    {
        let physical = self.acquire().await?;
        *self.inner.context.lock() = Some(TransactionContext::new(physical.clone()));
        debug!(unit_of_work = %self.inner.id, "开启物理事务");

        let mut scope = OutermostScope {
            unit: self,
            armed: true,
        };
        let result = self.run_cancellable(work(self.clone())).await;

        scope.armed = false;
        let context = self.inner.context.lock().take();
        let Some(mut context) = context else {
            return Err(TransactionError::NoActiveTransaction.into());
        };

        match result {
            Ok(_) if self.inner.cancellation.is_cancelled() => {
                context.mark_rolled_back();
                debug!(unit_of_work = %self.inner.id, "工作单元已取消，回滚事务");
                Self::rollback_quietly(self.inner.id, &physical).await;
                Err(TransactionError::Cancelled.into())
            }
            Ok(_) if context.is_rolled_back() => {
                warn!(unit_of_work = %self.inner.id, "内层作用域失败，回滚整个事务");
                Self::rollback_quietly(self.inner.id, &physical).await;
                Err(TransactionError::RollbackOnly.into())
            }
            Ok(value) => {
                let effects = context.take_effects();
                physical
                    .commit()
                    .await
                    .map_err(|source| TransactionError::Commit { source })?;
                debug!(unit_of_work = %self.inner.id, effects = effects.len(), "事务已提交");

                for (index, effect) in effects.into_iter().enumerate() {
                    if let Err(error) = effect().await {
                        warn!(
                            unit_of_work = %self.inner.id,
                            index,
                            error = %error,
                            "延迟副作用执行失败，已提交的事务不受影响"
                        );
                    }
                }
                Ok(value)
            }
            Err(error) => {
                let discarded = context.deferred_count();
                context.mark_rolled_back();
                debug!(unit_of_work = %self.inner.id, discarded, "作用域失败，回滚事务");
                Self::rollback_quietly(self.inner.id, &physical).await;
                Err(error)
            }
        }
    }

    async fn acquire(&self) -> Result<Arc<dyn PhysicalTransaction>, TransactionError> {
        let data_source = self.inner.data_source.clone();
        let timeout = self.inner.acquire_timeout;
        let begin = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, data_source.begin())
                    .await
                    .map_err(|_| TransactionError::AcquireTimeout {
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })?
                    .map_err(|source| TransactionError::Begin { source }),
                None => data_source
                    .begin()
                    .await
                    .map_err(|source| TransactionError::Begin { source }),
            }
        };

        tokio::select! {
            biased;
            _ = self.inner.cancellation.cancelled() => Err(TransactionError::Cancelled),
            acquired = begin => acquired,
        }
    }

    async fn run_cancellable<T, E, Fut>(&self, work: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionError>,
    {
        tokio::select! {
            biased;
            _ = self.inner.cancellation.cancelled() => Err(TransactionError::Cancelled.into()),
            result = work => result,
        }
    }

    async fn rollback_quietly(id: Uuid, physical: &Arc<dyn PhysicalTransaction>) {
        if let Err(error) = physical.rollback().await {
            warn!(unit_of_work = %id, error = %error, "回滚物理事务失败");
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.inner.id)
            .field("context", &*self.inner.context.lock())
            .finish()
    }
}

/// 嵌套作用域守卫：任何退出路径（包括取消和 panic）都会恢复深度
struct NestedScope<'a> {
    unit: &'a UnitOfWork,
    failed: bool,
}

impl Drop for NestedScope<'_> {
    fn drop(&mut self) {
        let mut guard = self.unit.inner.context.lock();
        if let Some(context) = guard.as_mut() {
            if self.failed {
                context.mark_rolled_back();
            }
            context.exit();
        }
    }
}

/// 最外层作用域守卫：未正常结束时（future 被丢弃或 panic）回滚物理事务
struct OutermostScope<'a> {
    unit: &'a UnitOfWork,
    armed: bool,
}

impl Drop for OutermostScope<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Some(context) = self.unit.inner.context.lock().take() else {
            return;
        };
        let id = self.unit.inner.id;
        let physical = context.physical();
        drop(context);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(unit_of_work = %id, "事务作用域被中断，异步回滚物理事务");
                handle.spawn(async move {
                    UnitOfWork::rollback_quietly(id, &physical).await;
                });
            }
            Err(_) => {
                warn!(unit_of_work = %id, "事务作用域被中断且没有可用的运行时，物理事务未能回滚");
            }
        }
    }
}
