//! 引导后的服务在事务中登记延迟副作用

use data_abstractions::{InMemoryDataSource, TransactionCoordinator};
use di_abstractions::{ComponentDefinition, ComponentManifest};
use infrastructure_common::{CapabilityKind, TransactionError};
use infrastructure_composition::Application;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
enum OrderError {
    #[error("库存不足: {0}")]
    OutOfStock(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// 记录已发布事件的事件发布器
#[derive(Default)]
struct EventPublisher {
    published: Mutex<Vec<String>>,
}

impl EventPublisher {
    async fn publish(&self, event: String) -> Result<(), std::io::Error> {
        self.published.lock().push(event);
        Ok(())
    }

    fn published(&self) -> Vec<String> {
        self.published.lock().clone()
    }
}

struct OrderService {
    transactions: Arc<TransactionCoordinator>,
    publisher: Arc<EventPublisher>,
}

impl OrderService {
    async fn place(&self, sku: &str, in_stock: bool) -> Result<(), OrderError> {
        let publisher = self.publisher.clone();
        let event = format!("OrderPlaced({sku})");
        let sku = sku.to_string();

        self.transactions
            .with_transaction(|uow| async move {
                uow.defer_on_commit(move || async move { publisher.publish(event).await })?;
                if !in_stock {
                    return Err(OrderError::OutOfStock(sku));
                }
                Ok(())
            })
            .await
    }

    async fn place_batch(&self, skus: &[&str]) -> Result<(), OrderError> {
        let publisher = self.publisher.clone();
        let skus: Vec<String> = skus.iter().map(ToString::to_string).collect();

        self.transactions
            .with_transaction(|uow| async move {
                for sku in skus {
                    let publisher = publisher.clone();
                    uow.with_transaction(|inner| async move {
                        let event = format!("OrderPlaced({sku})");
                        inner.defer_on_commit(move || async move { publisher.publish(event).await })?;
                        Ok::<_, OrderError>(())
                    })
                    .await?;
                }
                Ok(())
            })
            .await
    }
}

async fn bootstrap(data_source: InMemoryDataSource) -> Application {
    let manifest = ComponentManifest::new("app.orders")
        .register(
            ComponentDefinition::<EventPublisher>::event_handler()
                .factory(|_| Ok(EventPublisher::default())),
        )
        .register(
            ComponentDefinition::<OrderService>::service()
                .depends_on(CapabilityKind::EventHandler, "EventPublisher")
                .factory(|ctx| {
                    Ok(OrderService {
                        transactions: ctx.transactions()?,
                        publisher: ctx.resolve(CapabilityKind::EventHandler, "EventPublisher")?,
                    })
                }),
        );

    Application::builder()
        .scan_namespace("app")
        .add_manifest(manifest)
        .with_data_source(data_source)
        .bootstrap()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_failed_order_never_publishes() {
    let data_source = InMemoryDataSource::new("orders-db", 2);
    let app = bootstrap(data_source.clone()).await;
    let service = app.get::<OrderService>(CapabilityKind::Service, None).unwrap();
    let publisher = app
        .get::<EventPublisher>(CapabilityKind::EventHandler, None)
        .unwrap();

    let error = service.place("SKU-9", false).await.unwrap_err();

    assert!(matches!(error, OrderError::OutOfStock(ref sku) if sku == "SKU-9"));
    assert!(publisher.published().is_empty());
    assert_eq!(data_source.rollback_count(), 1);
    assert_eq!(data_source.commit_count(), 0);
}

#[tokio::test]
async fn test_successful_order_publishes_after_commit() {
    let data_source = InMemoryDataSource::new("orders-db", 2);
    let app = bootstrap(data_source.clone()).await;
    let service = app.get::<OrderService>(CapabilityKind::Service, None).unwrap();
    let publisher = app
        .get::<EventPublisher>(CapabilityKind::EventHandler, None)
        .unwrap();

    service.place("SKU-1", true).await.unwrap();

    assert_eq!(publisher.published(), vec!["OrderPlaced(SKU-1)"]);
    assert_eq!(data_source.commit_count(), 1);
}

#[tokio::test]
async fn test_nested_scopes_share_one_physical_transaction() {
    let data_source = InMemoryDataSource::new("orders-db", 2);
    let app = bootstrap(data_source.clone()).await;
    let service = app.get::<OrderService>(CapabilityKind::Service, None).unwrap();
    let publisher = app
        .get::<EventPublisher>(CapabilityKind::EventHandler, None)
        .unwrap();

    service.place_batch(&["A", "B", "C"]).await.unwrap();

    assert_eq!(data_source.begin_count(), 1);
    assert_eq!(data_source.commit_count(), 1);
    assert_eq!(
        publisher.published(),
        vec!["OrderPlaced(A)", "OrderPlaced(B)", "OrderPlaced(C)"]
    );
}

#[tokio::test]
async fn test_defer_outside_scope_is_rejected() {
    let app = bootstrap(InMemoryDataSource::new("orders-db", 1)).await;

    let uow = app.transactions().unit_of_work();
    let error = uow
        .defer_on_commit(|| async { Ok::<_, std::io::Error>(()) })
        .unwrap_err();

    assert!(matches!(error, TransactionError::NoActiveTransaction));
}
