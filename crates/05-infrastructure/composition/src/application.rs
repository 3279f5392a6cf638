//! 已引导的应用

use crate::builder::ApplicationBuilder;
use crate::report::BootstrapReport;
use crate::settings::BootstrapSettings;
use data_abstractions::TransactionCoordinator;
use di_abstractions::{ComponentLookup, ComponentLookupExt};
use di_impl::InMemoryComponentRegistry;
use infrastructure_common::{CapabilityKind, DependencyResult, InfrastructureResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// 已引导的应用
///
/// 持有只读注册表和事务协调器，可以在并发的工作单元之间共享
pub struct Application {
    registry: Arc<InMemoryComponentRegistry>,
    transactions: Arc<TransactionCoordinator>,
    settings: Arc<BootstrapSettings>,
    report: BootstrapReport,
    status: RwLock<ApplicationStatus>,
}

impl Application {
    /// 创建应用构建器
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub(crate) fn new(
        registry: Arc<InMemoryComponentRegistry>,
        transactions: Arc<TransactionCoordinator>,
        settings: Arc<BootstrapSettings>,
        report: BootstrapReport,
    ) -> Self {
        Self {
            registry,
            transactions,
            settings,
            report,
            status: RwLock::new(ApplicationStatus::Running),
        }
    }

    /// 组件注册表
    pub fn registry(&self) -> Arc<dyn ComponentLookup> {
        self.registry.clone()
    }

    /// 按能力类别和限定符查找组件
    pub fn get<T>(&self, kind: CapabilityKind, qualifier: Option<&str>) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.registry.get_typed(kind, qualifier)
    }

    /// 事务协调器
    pub fn transactions(&self) -> &Arc<TransactionCoordinator> {
        &self.transactions
    }

    /// 引导设置
    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// 引导报告
    pub fn report(&self) -> &BootstrapReport {
        &self.report
    }

    /// 运行状态
    pub fn status(&self) -> ApplicationStatus {
        *self.status.read()
    }

    /// 关闭应用，按实例化逆序释放组件资源；重复调用直接返回
    pub async fn shutdown(&self) -> InfrastructureResult<()> {
        {
            let mut status = self.status.write();
            if *status != ApplicationStatus::Running {
                return Ok(());
            }
            *status = ApplicationStatus::Stopping;
        }

        info!("开始关闭应用");
        let outcome = self.registry.shutdown(self.settings.dispose_timeout()).await;

        match outcome {
            Ok(disposed) => {
                *self.status.write() = ApplicationStatus::Stopped;
                info!(disposed, "应用已关闭");
                Ok(())
            }
            Err(shutdown_error) => {
                *self.status.write() = ApplicationStatus::Failed;
                error!(error = %shutdown_error, "应用关闭时部分组件释放失败");
                Err(shutdown_error)
            }
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("registry", &self.registry)
            .field("transactions", &self.transactions)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// 应用运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// 运行中
    Running,
    /// 关闭中
    Stopping,
    /// 已关闭
    Stopped,
    /// 关闭失败
    Failed,
}
