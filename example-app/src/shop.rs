//! 示例商店组件

use async_trait::async_trait;
use data_abstractions::TransactionCoordinator;
use di_abstractions::{
    ComponentDefinition, ComponentLookup, ComponentManifest, Feature, RegistrationAction,
};
use infrastructure_common::{
    CapabilityKind, Disposable, DisposeError, FeatureError, TransactionError,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

/// 下单错误
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("商品 {0} 库存不足")]
    OutOfStock(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// 订单
#[derive(Debug, Clone)]
pub struct Order {
    pub id: u64,
    pub sku: String,
    pub quantity: u32,
}

/// 订单仓储
#[derive(Debug, Default)]
pub struct OrderRepository {
    next_id: AtomicU64,
    orders: Mutex<Vec<Order>>,
}

impl OrderRepository {
    pub async fn insert(&self, sku: &str, quantity: u32) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders.lock().await.push(Order {
            id,
            sku: sku.to_string(),
            quantity,
        });
        id
    }

    pub async fn count(&self) -> usize {
        self.orders.lock().await.len()
    }
}

#[async_trait]
impl Disposable for OrderRepository {
    async fn dispose(&self) -> Result<(), DisposeError> {
        let orders = self.count().await;
        info!(orders, "订单仓储已关闭");
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct InventoryOptions {
    #[serde(default)]
    out_of_stock: Vec<String>,
}

/// 库存校验器
#[derive(Debug)]
pub struct InventoryValidator {
    out_of_stock: Vec<String>,
}

impl InventoryValidator {
    pub fn check(&self, sku: &str) -> Result<(), ShopError> {
        if self.out_of_stock.iter().any(|item| item == sku) {
            return Err(ShopError::OutOfStock(sku.to_string()));
        }
        Ok(())
    }
}

/// 订单通知
#[derive(Debug, Default)]
pub struct OrderNotifier {
    sent: AtomicUsize,
}

impl OrderNotifier {
    pub async fn order_placed(&self, id: u64, sku: String) -> Result<(), std::io::Error> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        info!(order_id = id, sku = %sku, "已发布 OrderPlaced 事件");
        Ok(())
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

/// 订单服务
pub struct OrderService {
    repository: Arc<OrderRepository>,
    validator: Arc<InventoryValidator>,
    notifier: Arc<OrderNotifier>,
    transactions: Arc<TransactionCoordinator>,
}

impl OrderService {
    /// 在事务中下单，提交成功后发布事件
    pub async fn place(&self, sku: &str, quantity: u32) -> Result<u64, ShopError> {
        let repository = self.repository.clone();
        let validator = self.validator.clone();
        let notifier = self.notifier.clone();
        let sku = sku.to_string();

        self.transactions
            .with_transaction(|uow| async move {
                validator.check(&sku)?;
                let id = repository.insert(&sku, quantity).await;
                uow.defer_on_commit(move || async move { notifier.order_placed(id, sku).await })?;
                Ok(id)
            })
            .await
    }
}

/// 订单 HTTP 处理器
pub struct OrderHandler {
    service: Arc<OrderService>,
}

impl OrderHandler {
    pub fn route(&self) -> &'static str {
        "POST /orders"
    }

    /// 处理一次下单请求
    pub async fn handle(&self, sku: &str) -> Result<u64, ShopError> {
        self.service.place(sku, 1).await
    }
}

/// 商店组件清单
pub fn manifest() -> ComponentManifest {
    ComponentManifest::new("shop.orders")
        .register(
            ComponentDefinition::<OrderService>::service()
                .depends_on(CapabilityKind::Repository, "OrderRepository")
                .depends_on_any(CapabilityKind::Validator)
                .depends_on(CapabilityKind::EventHandler, "OrderNotifier")
                .factory(|ctx| {
                    Ok(OrderService {
                        repository: ctx.resolve(CapabilityKind::Repository, "OrderRepository")?,
                        validator: ctx.resolve_any(CapabilityKind::Validator)?,
                        notifier: ctx.resolve(CapabilityKind::EventHandler, "OrderNotifier")?,
                        transactions: ctx.transactions()?,
                    })
                }),
        )
        .register(
            ComponentDefinition::<OrderRepository>::repository()
                .disposable_factory(|_| Ok(OrderRepository::default())),
        )
        .register(ComponentDefinition::<InventoryValidator>::validator().factory(|ctx| {
            let options = ctx.component_config::<InventoryOptions>()?.unwrap_or_default();
            Ok(InventoryValidator {
                out_of_stock: options.out_of_stock,
            })
        }))
        .register(
            ComponentDefinition::<OrderNotifier>::event_handler()
                .factory(|_| Ok(OrderNotifier::default())),
        )
        .register(
            ComponentDefinition::<OrderHandler>::http_handler()
                .depends_on(CapabilityKind::Service, "OrderService")
                .factory(|ctx| {
                    Ok(OrderHandler {
                        service: ctx.resolve(CapabilityKind::Service, "OrderService")?,
                    })
                }),
        )
}

/// 审计记录
#[derive(Debug, Default)]
pub struct AuditTrail;

/// 审计特性
pub struct AuditFeature;

#[async_trait]
impl Feature for AuditFeature {
    fn id(&self) -> &str {
        "audit"
    }

    fn provide_registrations(&self) -> Vec<RegistrationAction> {
        vec![ComponentDefinition::<AuditTrail>::initializer()
            .factory(|_| Ok(AuditTrail))
            .into()]
    }

    async fn on_ready(&self, registry: &dyn ComponentLookup) -> Result<(), FeatureError> {
        if registry.transactions().is_none() {
            return Err(FeatureError::new("事务协调器未注册"));
        }
        info!(components = registry.keys().len(), "审计特性已就绪");
        Ok(())
    }
}
