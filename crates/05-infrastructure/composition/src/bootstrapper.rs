//! 引导阶段执行器
//!
//! 按固定顺序执行七个阶段，任何阶段失败都会中止剩余阶段并立即返回错误，
//! 不重试也不部分继续。引导在单个任务内自上而下执行，阶段之间没有并发。

use crate::application::Application;
use crate::phase::{BootstrapPhase, PhaseListener};
use crate::report::{BootstrapReport, RegisteredComponent};
use crate::settings::BootstrapSettings;
use crate::validator::PostRegistrationValidator;
use data_abstractions::{DataSource, TransactionCoordinator};
use di_abstractions::{
    ComponentLookup, ComponentRegistration, ComponentScanner, DependencyResolver, Feature,
    InjectionContext, RouteBinder,
};
use di_impl::InMemoryComponentRegistry;
use infrastructure_common::{
    ComponentDescriptor, ConfigError, DescriptorOrigin, InfrastructureError, InfrastructureResult,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// 引导输入，由 [`ApplicationBuilder`](crate::ApplicationBuilder) 收集
pub(crate) struct BootstrapInputs {
    pub(crate) namespaces: Vec<String>,
    pub(crate) scanners: Vec<Box<dyn ComponentScanner>>,
    pub(crate) resolver: Box<dyn DependencyResolver>,
    pub(crate) features: Vec<Arc<dyn Feature>>,
    pub(crate) data_source: Option<Arc<dyn DataSource>>,
    pub(crate) config: Option<config::ConfigBuilder<config::builder::DefaultState>>,
    pub(crate) route_binder: Option<Box<dyn RouteBinder>>,
    pub(crate) listeners: Vec<Arc<dyn PhaseListener>>,
}

/// 单次引导过程中各阶段共享的状态
struct BootstrapState {
    inputs: BootstrapInputs,
    settings: Arc<BootstrapSettings>,
    registry: InMemoryComponentRegistry,
    transactions: Option<Arc<TransactionCoordinator>>,
    active_features: Vec<Arc<dyn Feature>>,
    pending: Vec<ComponentRegistration>,
    web: Vec<ComponentRegistration>,
    report: BootstrapReport,
}

/// 引导阶段执行器
///
/// 每个执行器只能引导一次；第二次调用返回 [`InfrastructureError::AlreadyBootstrapped`]，
/// 不会重复注册组件
pub struct PhaseExecutor {
    inputs: Mutex<Option<BootstrapInputs>>,
    completed: AtomicBool,
}

impl PhaseExecutor {
    pub(crate) fn new(inputs: BootstrapInputs) -> Self {
        Self {
            inputs: Mutex::new(Some(inputs)),
            completed: AtomicBool::new(false),
        }
    }

    /// 引导是否已成功完成
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// 执行全部阶段
    pub async fn execute(&self) -> InfrastructureResult<Application> {
        let inputs = self.inputs.lock().take();
        let Some(inputs) = inputs else {
            warn!("拒绝重复引导");
            return Err(InfrastructureError::AlreadyBootstrapped);
        };

        info!("开始引导应用");
        let mut state = BootstrapState {
            inputs,
            settings: Arc::new(BootstrapSettings::default()),
            registry: InMemoryComponentRegistry::new(),
            transactions: None,
            active_features: Vec::new(),
            pending: Vec::new(),
            web: Vec::new(),
            report: BootstrapReport::start(),
        };

        for phase in BootstrapPhase::ALL {
            for listener in &state.inputs.listeners {
                listener.on_phase_started(phase);
            }

            let started = Instant::now();
            let span = info_span!("bootstrap_phase", phase = phase.as_str(), number = phase.number());
            let outcome = Self::run_phase(phase, &mut state).instrument(span).await;

            if let Err(phase_error) = outcome {
                error!(phase = %phase, error = %phase_error, "引导阶段失败，中止引导");
                Self::release_partial(&state).await;
                return Err(phase_error);
            }

            let elapsed = started.elapsed();
            state.report.record_phase(phase, elapsed);
            for listener in &state.inputs.listeners {
                listener.on_phase_completed(phase, elapsed);
            }
            info!(
                phase = %phase,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "引导阶段完成"
            );
        }

        let Some(transactions) = state.transactions.take() else {
            return Err(InfrastructureError::PhaseFailed {
                phase: BootstrapPhase::CoreInfrastructure.to_string(),
                message: "事务协调器未注册".to_string(),
            });
        };

        state.report.finish();
        self.completed.store(true, Ordering::SeqCst);
        info!(
            components = state.registry.len(),
            elapsed_ms = u64::try_from(state.report.total_elapsed().as_millis()).unwrap_or(u64::MAX),
            "应用引导完成"
        );

        Ok(Application::new(
            Arc::new(state.registry),
            transactions,
            state.settings,
            state.report,
        ))
    }

    async fn run_phase(phase: BootstrapPhase, state: &mut BootstrapState) -> InfrastructureResult<()> {
        match phase {
            BootstrapPhase::Configuration => Self::materialize_configuration(state),
            BootstrapPhase::CoreInfrastructure => Self::register_core_infrastructure(state),
            BootstrapPhase::FeatureRegistration => Self::register_features(state),
            BootstrapPhase::ComponentRegistration => Self::register_components(state).await,
            BootstrapPhase::RouteRegistration => Self::register_routes(state).await,
            BootstrapPhase::FeatureReady => Self::notify_features(state).await,
            BootstrapPhase::Validation => Self::validate(state),
        }
    }

    /// 阶段 1：配置物化
    fn materialize_configuration(state: &mut BootstrapState) -> InfrastructureResult<()> {
        let builder = state.inputs.config.take().unwrap_or_else(config::Config::builder);
        let config = builder.build().map_err(|error| ConfigError::ParseError {
            message: error.to_string(),
        })?;
        let settings = BootstrapSettings::from_config(config)?;

        for namespace in &settings.scan.namespaces {
            if !state.inputs.namespaces.contains(namespace) {
                state.inputs.namespaces.push(namespace.clone());
            }
        }

        debug!(namespaces = ?state.inputs.namespaces, "扫描命名空间已确定");
        state.settings = Arc::new(settings);
        Ok(())
    }

    /// 阶段 2：核心基础设施注册
    fn register_core_infrastructure(state: &mut BootstrapState) -> InfrastructureResult<()> {
        let data_source = state
            .inputs
            .data_source
            .clone()
            .ok_or_else(|| InfrastructureError::PhaseFailed {
                phase: BootstrapPhase::CoreInfrastructure.to_string(),
                message: "未提供数据源".to_string(),
            })?;

        let mut coordinator = TransactionCoordinator::new(data_source.clone());
        if let Some(timeout) = state.settings.acquire_timeout() {
            coordinator = coordinator.with_acquire_timeout(timeout);
        }
        let coordinator = Arc::new(coordinator);

        info!(data_source = data_source.name(), "注册数据源和事务协调器");
        state.registry.set_data_source(data_source);
        state.registry.set_transactions(coordinator.clone());
        state.transactions = Some(coordinator);
        Ok(())
    }

    /// 阶段 3：特性注册
    fn register_features(state: &mut BootstrapState) -> InfrastructureResult<()> {
        let mut seen = HashSet::new();

        for feature in &state.inputs.features {
            let id = feature.id().to_string();
            if !seen.insert(id.clone()) {
                return Err(InfrastructureError::FeatureFailed {
                    feature: id,
                    message: "特性ID重复".to_string(),
                });
            }
            if state.settings.is_feature_disabled(&id) {
                info!(feature = %id, "特性已在配置中禁用，跳过");
                continue;
            }

            let actions = feature.provide_registrations();
            debug!(feature = %id, registrations = actions.len(), "注册特性");
            for action in actions {
                let registration = action.to_registration(DescriptorOrigin::Feature { id: id.clone() })?;
                state.pending.push(registration);
            }
            state.active_features.push(feature.clone());
        }

        info!(
            features = state.active_features.len(),
            registrations = state.pending.len(),
            "特性注册完成"
        );
        Ok(())
    }

    /// 阶段 4：扫描并按解析顺序实例化非 Web 组件
    ///
    /// Web 组件在这里一起参与解析，保证缺失依赖和循环在全局范围内被发现，
    /// 但留到阶段 5 再实例化
    async fn register_components(state: &mut BootstrapState) -> InfrastructureResult<()> {
        for scanner in &state.inputs.scanners {
            let found = scanner.scan(&state.inputs.namespaces)?;
            debug!(scanner = scanner.name(), count = found.len(), "扫描器返回组件");
            state.pending.extend(found);
        }

        let descriptors: Vec<ComponentDescriptor> = state
            .pending
            .iter()
            .map(|registration| registration.descriptor.clone())
            .collect();
        let plan = state.inputs.resolver.resolve(&descriptors)?;
        let count = descriptors.len();
        let ordered = plan.arrange(std::mem::take(&mut state.pending)).ok_or_else(|| {
            InfrastructureError::PhaseFailed {
                phase: BootstrapPhase::ComponentRegistration.to_string(),
                message: format!(
                    "解析顺序与组件不一致: 共 {count} 个组件，顺序包含 {} 项",
                    plan.len()
                ),
            }
        })?;

        for registration in ordered {
            if registration.descriptor.kind.is_web() {
                state.web.push(registration);
                continue;
            }
            Self::instantiate(state, &registration, BootstrapPhase::ComponentRegistration).await?;
        }
        Ok(())
    }

    /// 阶段 5：路由注册
    async fn register_routes(state: &mut BootstrapState) -> InfrastructureResult<()> {
        let web = std::mem::take(&mut state.web);
        if !web.is_empty() && state.inputs.route_binder.is_none() {
            debug!(count = web.len(), "未配置路由协作者，Web 组件只注册到注册表");
        }

        for registration in web {
            Self::instantiate(state, &registration, BootstrapPhase::RouteRegistration).await?;

            if let Some(binder) = state.inputs.route_binder.as_mut() {
                let key = registration.descriptor.key();
                let instance = state.registry.get(key.kind, Some(&key.name))?;
                binder
                    .bind(&key, &instance)
                    .map_err(|error| InfrastructureError::PhaseFailed {
                        phase: BootstrapPhase::RouteRegistration.to_string(),
                        message: format!("绑定路由 {key} 失败: {error}"),
                    })?;
                debug!(component = %key, "路由已绑定");
            }
        }
        Ok(())
    }

    /// 阶段 6：按注册顺序调用特性的 `on_ready`
    async fn notify_features(state: &mut BootstrapState) -> InfrastructureResult<()> {
        for feature in &state.active_features {
            debug!(feature = feature.id(), "调用特性就绪回调");
            feature
                .on_ready(&state.registry)
                .await
                .map_err(|error| InfrastructureError::FeatureFailed {
                    feature: feature.id().to_string(),
                    message: error.to_string(),
                })?;
            state.report.features_ready.push(feature.id().to_string());
        }
        Ok(())
    }

    /// 阶段 7：注册后校验
    fn validate(state: &mut BootstrapState) -> InfrastructureResult<()> {
        PostRegistrationValidator::new().validate(&state.registry, &state.report.components)?;
        Ok(())
    }

    async fn instantiate(
        state: &mut BootstrapState,
        registration: &ComponentRegistration,
        phase: BootstrapPhase,
    ) -> InfrastructureResult<()> {
        let descriptor = &registration.descriptor;
        let key = descriptor.key();

        let instance = {
            let config = state.settings.component(&key.name);
            let ctx = InjectionContext::new(descriptor, &state.registry, config);
            registration.factory.create(&ctx).await?
        };

        state.registry.insert(key.clone(), instance)?;
        debug!(component = %key, origin = %descriptor.origin, "组件已实例化");
        state.report.components.push(RegisteredComponent {
            key,
            type_name: descriptor.type_info.short_name().to_string(),
            phase,
        });
        Ok(())
    }

    /// 引导失败时释放已经构造出来的资源
    async fn release_partial(state: &BootstrapState) {
        if state.registry.is_empty() {
            return;
        }
        if let Err(release_error) = state.registry.shutdown(state.settings.dispose_timeout()).await {
            warn!(error = %release_error, "引导失败后释放组件资源时出错");
        }
    }
}

impl std::fmt::Debug for PhaseExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseExecutor")
            .field("pending", &self.inputs.lock().is_some())
            .field("completed", &self.is_completed())
            .finish()
    }
}
