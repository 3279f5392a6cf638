//! 应用引导端到端测试

use async_trait::async_trait;
use data_abstractions::InMemoryDataSource;
use di_abstractions::{
    ComponentDefinition, ComponentLookup, ComponentLookupExt, ComponentManifest, Feature,
    RegistrationAction,
};
use infrastructure_common::{
    CapabilityKind, ComponentKey, DependencyError, FeatureError, InfrastructureError,
};
use infrastructure_composition::{Application, BootstrapPhase, PhaseListener};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct OrderRepository {
    orders: Mutex<Vec<String>>,
}

impl OrderRepository {
    fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
        }
    }
}

struct OrderService {
    repository: Arc<OrderRepository>,
}

impl OrderService {
    fn place(&self, order: &str) -> usize {
        let mut orders = self.repository.orders.lock();
        orders.push(order.to_string());
        orders.len()
    }
}

fn order_service() -> ComponentDefinition<OrderService> {
    ComponentDefinition::<OrderService>::service()
        .depends_on(CapabilityKind::Repository, "OrderRepository")
        .factory(|ctx| {
            let repository = ctx.resolve(CapabilityKind::Repository, "OrderRepository")?;
            Ok(OrderService { repository })
        })
}

fn order_repository() -> ComponentDefinition<OrderRepository> {
    ComponentDefinition::<OrderRepository>::repository().factory(|_| Ok(OrderRepository::new()))
}

#[tokio::test]
async fn test_order_service_scenario() {
    let app = Application::builder()
        .scan_namespace("app.services")
        .add_manifest(
            ComponentManifest::new("app.services")
                .register(order_service())
                .register(order_repository()),
        )
        .with_data_source(InMemoryDataSource::new("orders-db", 4))
        .bootstrap()
        .await
        .unwrap();

    let registry = app.registry();
    assert!(registry.contains(&ComponentKey::new(CapabilityKind::Service, "OrderService")));
    assert!(registry.contains(&ComponentKey::new(CapabilityKind::Repository, "OrderRepository")));

    let service = app
        .get::<OrderService>(CapabilityKind::Service, Some("OrderService"))
        .unwrap();
    assert_eq!(service.place("A-1"), 1);
    assert_eq!(service.place("A-2"), 2);

    let repository = registry
        .get_typed::<OrderRepository>(CapabilityKind::Repository, None)
        .unwrap();
    assert_eq!(repository.orders.lock().len(), 2);
}

#[tokio::test]
async fn test_missing_repository_is_unresolved() {
    let error = Application::builder()
        .scan_namespace("app.services")
        .add_manifest(ComponentManifest::new("app.services").register(order_service()))
        .with_data_source(InMemoryDataSource::new("orders-db", 4))
        .bootstrap()
        .await
        .unwrap_err();

    match error {
        InfrastructureError::DependencyError {
            source: DependencyError::UnresolvedDependency { requester, missing },
        } => {
            assert!(requester.contains("OrderService"));
            assert!(missing.contains("OrderRepository"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct Invoices;
struct Payments;

#[tokio::test]
async fn test_cycle_aborts_bootstrap_before_instantiation() {
    let error = Application::builder()
        .scan_namespace("app")
        .add_manifest(
            ComponentManifest::new("app.billing")
                .register(
                    ComponentDefinition::<Invoices>::service()
                        .depends_on(CapabilityKind::Service, "Payments")
                        .factory(|_| -> Result<Invoices, DependencyError> {
                            panic!("factory must not run when the graph has a cycle")
                        }),
                )
                .register(
                    ComponentDefinition::<Payments>::service()
                        .depends_on(CapabilityKind::Service, "Invoices")
                        .factory(|_| -> Result<Payments, DependencyError> {
                            panic!("factory must not run when the graph has a cycle")
                        }),
                ),
        )
        .with_data_source(InMemoryDataSource::new("orders-db", 1))
        .bootstrap()
        .await
        .unwrap_err();

    match error {
        InfrastructureError::DependencyError {
            source: DependencyError::CyclicDependency { members },
        } => {
            assert!(members.iter().any(|member| member == "Service:Invoices"));
            assert!(members.iter().any(|member| member == "Service:Payments"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct SearchIndex;
struct MailOutbox;

struct PhaseRecorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl PhaseListener for PhaseRecorder {
    fn on_phase_started(&self, phase: BootstrapPhase) {
        self.log.lock().push(format!("start:{}", phase.number()));
    }

    fn on_phase_completed(&self, phase: BootstrapPhase, _elapsed: Duration) {
        self.log.lock().push(format!("done:{}", phase.number()));
    }
}

struct SearchFeature {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Feature for SearchFeature {
    fn id(&self) -> &str {
        "search"
    }

    fn provide_registrations(&self) -> Vec<RegistrationAction> {
        vec![ComponentDefinition::<SearchIndex>::service()
            .factory(|_| Ok(SearchIndex))
            .into()]
    }

    async fn on_ready(&self, registry: &dyn ComponentLookup) -> Result<(), FeatureError> {
        registry
            .get(CapabilityKind::Service, Some("SearchIndex"))
            .map_err(|error| FeatureError::new(error.to_string()))?;
        self.log.lock().push("ready:search".to_string());
        Ok(())
    }
}

struct MailFeature {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Feature for MailFeature {
    fn id(&self) -> &str {
        "mail"
    }

    fn provide_registrations(&self) -> Vec<RegistrationAction> {
        vec![ComponentDefinition::<MailOutbox>::event_handler()
            .factory(|_| Ok(MailOutbox))
            .into()]
    }

    async fn on_ready(&self, registry: &dyn ComponentLookup) -> Result<(), FeatureError> {
        registry
            .get(CapabilityKind::EventHandler, Some("MailOutbox"))
            .map_err(|error| FeatureError::new(error.to_string()))?;
        self.log.lock().push("ready:mail".to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_feature_hooks_fire_between_routes_and_validation() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let app = Application::builder()
        .add_feature(SearchFeature { log: log.clone() })
        .add_feature(MailFeature { log: log.clone() })
        .with_data_source(InMemoryDataSource::new("orders-db", 1))
        .add_phase_listener(Arc::new(PhaseRecorder { log: log.clone() }))
        .bootstrap()
        .await
        .unwrap();

    let log = log.lock().clone();
    let index_of = |entry: &str| log.iter().position(|line| line == entry).unwrap();
    assert!(index_of("done:5") < index_of("ready:search"));
    assert!(index_of("ready:search") < index_of("ready:mail"));
    assert!(index_of("ready:mail") < index_of("start:7"));
    assert_eq!(app.report().features_ready, vec!["search", "mail"]);
}

#[tokio::test]
async fn test_second_bootstrap_does_not_duplicate_registry() {
    let executor = Application::builder()
        .scan_namespace("app.services")
        .add_manifest(
            ComponentManifest::new("app.services")
                .register(order_service())
                .register(order_repository()),
        )
        .with_data_source(InMemoryDataSource::new("orders-db", 1))
        .into_executor()
        .unwrap();

    let app = executor.execute().await.unwrap();
    let again = executor.execute().await;

    assert!(matches!(again, Err(InfrastructureError::AlreadyBootstrapped)));
    assert_eq!(app.registry().keys().len(), 2);
}

#[tokio::test]
async fn test_registry_is_shared_across_concurrent_units_of_work() {
    let app = Arc::new(
        Application::builder()
            .scan_namespace("app.services")
            .add_manifest(
                ComponentManifest::new("app.services")
                    .register(order_service())
                    .register(order_repository()),
            )
            .with_data_source(InMemoryDataSource::new("orders-db", 4))
            .bootstrap()
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for worker in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let service = app
                .get::<OrderService>(CapabilityKind::Service, None)
                .unwrap();
            service.place(&format!("order-{worker}"));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let repository = app
        .get::<OrderRepository>(CapabilityKind::Repository, None)
        .unwrap();
    assert_eq!(repository.orders.lock().len(), 8);
}
