//! 阶段执行器测试

use crate::{Application, ApplicationStatus, BootstrapPhase, InfrastructureError, PhaseListener};
use async_trait::async_trait;
use data_abstractions::InMemoryDataSource;
use di_abstractions::{
    BindError, ComponentDefinition, ComponentLookup, ComponentManifest, DependencyResolver, Feature,
    RegistrationAction, ResolutionPlan, RouteBinder,
};
use infrastructure_common::{
    CapabilityKind, ComponentDescriptor, ComponentError, ComponentInstance, ComponentKey,
    DependencyResult, Disposable, DisposeError, FeatureError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

struct OrderRepository;
struct OrderService;
struct OrderHandler;
struct CacheWarmer;

struct PooledClient {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Disposable for PooledClient {
    async fn dispose(&self) -> Result<(), DisposeError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingListener {
    log: Log,
}

impl PhaseListener for RecordingListener {
    fn on_phase_started(&self, phase: BootstrapPhase) {
        self.log.lock().push(format!("start:{phase}"));
    }

    fn on_phase_completed(&self, phase: BootstrapPhase, _elapsed: Duration) {
        self.log.lock().push(format!("done:{phase}"));
    }
}

struct RecordingBinder {
    log: Log,
}

impl RouteBinder for RecordingBinder {
    fn bind(&mut self, key: &ComponentKey, _component: &ComponentInstance) -> Result<(), BindError> {
        self.log.lock().push(format!("bind:{key}"));
        Ok(())
    }
}

struct CachingFeature {
    log: Log,
    fail: bool,
}

#[async_trait]
impl Feature for CachingFeature {
    fn id(&self) -> &str {
        "caching"
    }

    fn provide_registrations(&self) -> Vec<RegistrationAction> {
        vec![ComponentDefinition::<CacheWarmer>::initializer()
            .factory(|_| Ok(CacheWarmer))
            .into()]
    }

    async fn on_ready(&self, registry: &dyn ComponentLookup) -> Result<(), FeatureError> {
        if self.fail {
            return Err(FeatureError::new("缓存预热失败"));
        }
        let warmer = ComponentKey::new(CapabilityKind::Initializer, "CacheWarmer");
        assert!(registry.contains(&warmer));
        self.log.lock().push("ready:caching".to_string());
        Ok(())
    }
}

struct MessagingFeature {
    log: Log,
}

#[async_trait]
impl Feature for MessagingFeature {
    fn id(&self) -> &str {
        "messaging"
    }

    async fn on_ready(&self, _registry: &dyn ComponentLookup) -> Result<(), FeatureError> {
        self.log.lock().push("ready:messaging".to_string());
        Ok(())
    }
}

fn orders_manifest() -> ComponentManifest {
    ComponentManifest::new("app.services")
        .register(
            ComponentDefinition::<OrderService>::service()
                .depends_on(CapabilityKind::Repository, "OrderRepository")
                .factory(|ctx| {
                    let _: Arc<OrderRepository> =
                        ctx.resolve(CapabilityKind::Repository, "OrderRepository")?;
                    Ok(OrderService)
                }),
        )
        .register(ComponentDefinition::<OrderRepository>::repository().factory(|_| Ok(OrderRepository)))
        .register(
            ComponentDefinition::<OrderHandler>::http_handler()
                .depends_on(CapabilityKind::Service, "OrderService")
                .factory(|ctx| {
                    let _: Arc<OrderService> = ctx.resolve(CapabilityKind::Service, "OrderService")?;
                    Ok(OrderHandler)
                }),
        )
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|line| line == entry)
        .unwrap_or_else(|| panic!("missing log entry {entry}: {log:?}"))
}

#[tokio::test]
async fn test_phases_run_in_order_and_features_ready_after_routes() {
    let log: Log = Arc::default();

    let app = Application::builder()
        .scan_namespace("app")
        .add_manifest(orders_manifest())
        .with_data_source(InMemoryDataSource::new("primary", 2))
        .add_feature(CachingFeature {
            log: log.clone(),
            fail: false,
        })
        .add_feature(MessagingFeature { log: log.clone() })
        .with_route_binder(RecordingBinder { log: log.clone() })
        .add_phase_listener(Arc::new(RecordingListener { log: log.clone() }))
        .bootstrap()
        .await
        .unwrap();

    let log = log.lock().clone();
    let starts: Vec<&String> = log.iter().filter(|line| line.starts_with("start:")).collect();
    assert_eq!(starts.len(), 7);
    for pair in BootstrapPhase::ALL.windows(2) {
        assert!(position(&log, &format!("done:{}", pair[0])) < position(&log, &format!("start:{}", pair[1])));
    }

    let bind = position(&log, "bind:HttpHandler:OrderHandler");
    let routes_done = position(&log, "done:5.RouteRegistration");
    let caching = position(&log, "ready:caching");
    let messaging = position(&log, "ready:messaging");
    let validation = position(&log, "start:7.Validation");
    assert!(bind < routes_done);
    assert!(routes_done < caching);
    assert!(caching < messaging);
    assert!(messaging < validation);

    let report = app.report();
    assert_eq!(report.phases.len(), 7);
    assert_eq!(report.features_ready, vec!["caching", "messaging"]);
    let order: Vec<String> = report.components.iter().map(|c| c.key.to_string()).collect();
    assert_eq!(
        order,
        vec![
            "Initializer:CacheWarmer",
            "Repository:OrderRepository",
            "Service:OrderService",
            "HttpHandler:OrderHandler",
        ]
    );
    assert_eq!(report.components_in(BootstrapPhase::RouteRegistration).count(), 1);
    assert!(report.completed_at.is_some());
    assert_eq!(app.status(), ApplicationStatus::Running);
}

#[tokio::test]
async fn test_bootstrap_twice_is_rejected() {
    let executor = Application::builder()
        .scan_namespace("app")
        .add_manifest(orders_manifest())
        .with_data_source(InMemoryDataSource::new("primary", 1))
        .into_executor()
        .unwrap();

    let app = executor.execute().await.unwrap();
    assert!(executor.is_completed());
    assert_eq!(app.report().components.len(), 3);

    let second = executor.execute().await.unwrap_err();
    assert!(matches!(second, InfrastructureError::AlreadyBootstrapped));
    assert_eq!(app.registry().keys().len(), 3);
}

#[tokio::test]
async fn test_missing_data_source_fails_core_infrastructure() {
    let log: Log = Arc::default();

    let error = Application::builder()
        .scan_namespace("app")
        .add_manifest(orders_manifest())
        .add_phase_listener(Arc::new(RecordingListener { log: log.clone() }))
        .bootstrap()
        .await
        .unwrap_err();

    match error {
        InfrastructureError::PhaseFailed { phase, .. } => assert_eq!(phase, "2.CoreInfrastructure"),
        other => panic!("unexpected error: {other}"),
    }
    let log = log.lock();
    assert!(log.contains(&"start:2.CoreInfrastructure".to_string()));
    assert!(!log.iter().any(|line| line.contains("3.FeatureRegistration")));
}

#[tokio::test]
async fn test_duplicate_feature_id_is_rejected() {
    let log: Log = Arc::default();

    let error = Application::builder()
        .with_data_source(InMemoryDataSource::new("primary", 1))
        .add_feature(MessagingFeature { log: log.clone() })
        .add_feature(MessagingFeature { log: log.clone() })
        .bootstrap()
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        InfrastructureError::FeatureFailed { ref feature, .. } if feature == "messaging"
    ));
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn test_failed_on_ready_aborts_and_releases_components() {
    let log: Log = Arc::default();
    let closed = Arc::new(AtomicBool::new(false));
    let flag = closed.clone();

    let manifest = ComponentManifest::new("app.clients").register(
        ComponentDefinition::<PooledClient>::repository().disposable_factory(move |_| {
            Ok(PooledClient {
                closed: flag.clone(),
            })
        }),
    );

    let error = Application::builder()
        .scan_namespace("app")
        .add_manifest(manifest)
        .with_data_source(InMemoryDataSource::new("primary", 1))
        .add_feature(CachingFeature {
            log: log.clone(),
            fail: true,
        })
        .add_feature(MessagingFeature { log: log.clone() })
        .bootstrap()
        .await
        .unwrap_err();

    match error {
        InfrastructureError::FeatureFailed { feature, message } => {
            assert_eq!(feature, "caching");
            assert!(message.contains("缓存预热失败"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!log.lock().contains(&"ready:messaging".to_string()));
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_shutdown_disposes_once() {
    let closed = Arc::new(AtomicBool::new(false));
    let flag = closed.clone();

    let app = Application::builder()
        .scan_namespace("app")
        .add_manifest(ComponentManifest::new("app.clients").register(
            ComponentDefinition::<PooledClient>::repository().disposable_factory(move |_| {
                Ok(PooledClient {
                    closed: flag.clone(),
                })
            }),
        ))
        .with_data_source(InMemoryDataSource::new("primary", 1))
        .bootstrap()
        .await
        .unwrap();

    assert!(!closed.load(Ordering::SeqCst));
    app.shutdown().await.unwrap();
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(app.status(), ApplicationStatus::Stopped);

    app.shutdown().await.unwrap();
    assert_eq!(app.status(), ApplicationStatus::Stopped);
}

#[tokio::test]
async fn test_components_share_registered_transactions() {
    let data_source = InMemoryDataSource::new("primary", 1);

    let app = Application::builder()
        .with_data_source(data_source.clone())
        .bootstrap()
        .await
        .unwrap();

    let registry = app.registry();
    let transactions = registry.transactions().unwrap();
    assert!(Arc::ptr_eq(&transactions, app.transactions()));
    assert_eq!(registry.data_source().unwrap().name(), "primary");

    let value: Result<u32, infrastructure_common::TransactionError> = app
        .transactions()
        .with_transaction(|_uow| async { Ok(7) })
        .await;
    assert_eq!(value.unwrap(), 7);
    assert_eq!(data_source.commit_count(), 1);
}

struct Outbox;

/// 只声明组件类别、没有提供工厂的特性
struct OutboxFeature;

#[async_trait]
impl Feature for OutboxFeature {
    fn id(&self) -> &str {
        "outbox"
    }

    fn provide_registrations(&self) -> Vec<RegistrationAction> {
        vec![ComponentDefinition::<Outbox>::event_handler().into()]
    }

    async fn on_ready(&self, _registry: &dyn ComponentLookup) -> Result<(), FeatureError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_feature_definition_without_factory_fails_feature_registration() {
    let log: Log = Arc::default();

    let error = Application::builder()
        .with_data_source(InMemoryDataSource::new("primary", 1))
        .add_feature(OutboxFeature)
        .add_phase_listener(Arc::new(RecordingListener { log: log.clone() }))
        .bootstrap()
        .await
        .unwrap_err();

    match error {
        InfrastructureError::ComponentError {
            source: ComponentError::DiscoveryError { type_name, .. },
        } => assert_eq!(type_name, "Outbox"),
        other => panic!("unexpected error: {other}"),
    }
    let log = log.lock();
    assert!(log.contains(&"start:3.FeatureRegistration".to_string()));
    assert!(!log.contains(&"done:3.FeatureRegistration".to_string()));
}

/// 丢掉最后一个组件的解析器
struct TruncatingResolver;

impl DependencyResolver for TruncatingResolver {
    fn resolve(&self, descriptors: &[ComponentDescriptor]) -> DependencyResult<ResolutionPlan> {
        Ok(ResolutionPlan::new((0..descriptors.len().saturating_sub(1)).collect()))
    }
}

#[tokio::test]
async fn test_incomplete_resolution_plan_fails_component_registration() {
    let error = Application::builder()
        .scan_namespace("app")
        .add_manifest(orders_manifest())
        .with_data_source(InMemoryDataSource::new("primary", 1))
        .with_resolver(TruncatingResolver)
        .bootstrap()
        .await
        .unwrap_err();

    match error {
        InfrastructureError::PhaseFailed { phase, message } => {
            assert_eq!(phase, "4.ComponentRegistration");
            assert!(message.contains("共 3 个组件"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
