//! 内存组件注册表

use data_abstractions::{DataSource, TransactionCoordinator};
use di_abstractions::ComponentLookup;
use infrastructure_common::{
    CapabilityKind, ComponentInstance, ComponentKey, DependencyError, DependencyResult,
    InfrastructureError, InfrastructureResult,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 内存组件注册表
///
/// 引导阶段通过 `&mut self` 写入，完成后包装在 `Arc` 中只读共享，查找不需要加锁
#[derive(Default)]
pub struct InMemoryComponentRegistry {
    entries: HashMap<ComponentKey, ComponentInstance>,
    order: Vec<ComponentKey>,
    data_source: Option<Arc<dyn DataSource>>,
    transactions: Option<Arc<TransactionCoordinator>>,
    closed: AtomicBool,
}

impl InMemoryComponentRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册数据源
    pub fn set_data_source(&mut self, data_source: Arc<dyn DataSource>) {
        self.data_source = Some(data_source);
    }

    /// 注册事务协调器
    pub fn set_transactions(&mut self, transactions: Arc<TransactionCoordinator>) {
        self.transactions = Some(transactions);
    }

    /// 发布一个已实例化的组件
    pub fn insert(&mut self, key: ComponentKey, instance: ComponentInstance) -> DependencyResult<()> {
        if self.entries.contains_key(&key) {
            return Err(DependencyError::DuplicateComponent {
                key: key.to_string(),
            });
        }

        debug!(component = %key, type_name = instance.type_name(), "组件已注册");
        self.entries.insert(key.clone(), instance);
        self.order.push(key);
        Ok(())
    }

    /// 组件数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 关闭注册表，按实例化的逆序释放持有外部资源的组件
    ///
    /// 单个组件释放失败或超时不会中断其余组件的释放，所有失败汇总到
    /// [`InfrastructureError::ShutdownFailed`]。重复调用直接返回。
    pub async fn shutdown(&self, dispose_timeout: Duration) -> InfrastructureResult<usize> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("注册表已关闭，忽略重复关闭");
            return Ok(0);
        }

        let mut disposed = 0;
        let mut failures = Vec::new();

        for key in self.order.iter().rev() {
            let Some(disposer) = self.entries.get(key).and_then(|instance| instance.disposer().cloned()) else {
                continue;
            };

            match tokio::time::timeout(dispose_timeout, disposer.dispose()).await {
                Ok(Ok(())) => {
                    disposed += 1;
                    debug!(component = %key, "组件资源已释放");
                }
                Ok(Err(error)) => {
                    warn!(component = %key, error = %error, "组件资源释放失败");
                    failures.push(format!("{key}: {error}"));
                }
                Err(_) => {
                    warn!(component = %key, timeout = ?dispose_timeout, "组件资源释放超时");
                    failures.push(format!("{key}: 释放超时 ({}ms)", dispose_timeout.as_millis()));
                }
            }
        }

        if failures.is_empty() {
            info!(disposed, "注册表已关闭");
            Ok(disposed)
        } else {
            Err(InfrastructureError::ShutdownFailed {
                message: failures.join("; "),
            })
        }
    }

    fn not_registered(key: String) -> DependencyError {
        DependencyError::ComponentNotRegistered { key }
    }
}

impl ComponentLookup for InMemoryComponentRegistry {
    fn get(&self, kind: CapabilityKind, qualifier: Option<&str>) -> DependencyResult<ComponentInstance> {
        if self.is_closed() {
            return Err(Self::not_registered(match qualifier {
                Some(name) => ComponentKey::new(kind, name).to_string(),
                None => format!("{kind}:*"),
            }));
        }

        match qualifier {
            Some(name) => {
                let key = ComponentKey::new(kind, name);
                self.entries
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| Self::not_registered(key.to_string()))
            }
            None => {
                let candidates: Vec<&ComponentKey> =
                    self.order.iter().filter(|key| key.kind == kind).collect();
                match candidates.as_slice() {
                    [] => Err(Self::not_registered(format!("{kind}:*"))),
                    [key] => self
                        .entries
                        .get(*key)
                        .cloned()
                        .ok_or_else(|| Self::not_registered(key.to_string())),
                    many => Err(DependencyError::AmbiguousComponent {
                        kind: kind.to_string(),
                        candidates: many.iter().map(|key| key.name.clone()).collect(),
                    }),
                }
            }
        }
    }

    fn contains(&self, key: &ComponentKey) -> bool {
        !self.is_closed() && self.entries.contains_key(key)
    }

    fn keys(&self) -> Vec<ComponentKey> {
        if self.is_closed() {
            return Vec::new();
        }
        self.order.clone()
    }

    fn data_source(&self) -> Option<Arc<dyn DataSource>> {
        self.data_source.clone()
    }

    fn transactions(&self) -> Option<Arc<TransactionCoordinator>> {
        self.transactions.clone()
    }
}

impl fmt::Debug for InMemoryComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryComponentRegistry")
            .field("components", &self.order)
            .field("data_source", &self.data_source.as_ref().map(|source| source.name().to_string()))
            .field("transactions", &self.transactions.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}
