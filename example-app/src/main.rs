//! # 示例应用程序
//!
//! 演示如何使用 Lorn ADSP 引导引擎组装一个下单服务

mod shop;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use data_abstractions::InMemoryDataSource;
use di_abstractions::{BindError, ComponentLookupExt, RouteBinder};
use infrastructure_common::{CapabilityKind, ComponentInstance, ComponentKey};
use infrastructure_composition::{Application, LoggingConfig};
use shop::{AuditFeature, OrderHandler, OrderNotifier};
use std::path::PathBuf;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn ADSP 示例应用")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 环境变量前缀
    #[arg(long, default_value = "ADSP")]
    env_prefix: String,

    /// 日志格式
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// 输出详细日志
    #[arg(short, long)]
    verbose: bool,

    /// 数据源连接池容量
    #[arg(long, default_value_t = 4)]
    pool_size: usize,

    /// 打印引导报告
    #[arg(long)]
    report: bool,

    /// 要下单的商品
    #[arg(default_values_t = vec!["SKU-1".to_string(), "SKU-404".to_string()])]
    skus: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// 把 HTTP 处理器的路由打印到日志
#[derive(Debug, Default)]
struct ConsoleRouteBinder {
    bound: usize,
}

impl RouteBinder for ConsoleRouteBinder {
    fn bind(&mut self, key: &ComponentKey, component: &ComponentInstance) -> Result<(), BindError> {
        let handler = component
            .downcast::<OrderHandler>()
            .ok_or_else(|| format!("{key} 不是可识别的处理器"))?;
        self.bound += 1;
        info!(component = %key, route = handler.route(), bound = self.bound, "绑定路由");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = match (args.log_format, args.verbose) {
        (LogFormat::Json, _) => LoggingConfig::production(),
        (LogFormat::Text, true) => LoggingConfig::development(),
        (LogFormat::Text, false) => LoggingConfig::default(),
    };

    let mut builder = Application::builder()
        .with_logging(logging)
        .scan_namespace("shop")
        .add_manifest(shop::manifest())
        .add_feature(AuditFeature)
        .with_data_source(InMemoryDataSource::new("shop-db", args.pool_size))
        .with_route_binder(ConsoleRouteBinder::default());

    if let Some(path) = &args.config {
        builder = builder.add_config_toml(path)?;
    }
    builder = builder.add_config_env_vars(&args.env_prefix);

    let app = builder.bootstrap().await.context("应用引导失败")?;

    if args.report {
        println!("{}", serde_json::to_string_pretty(app.report())?);
    }

    let handler = app.get::<OrderHandler>(CapabilityKind::HttpHandler, None)?;
    for sku in &args.skus {
        match handler.handle(sku).await {
            Ok(order_id) => info!(order_id, sku = %sku, "下单成功"),
            Err(error) => warn!(sku = %sku, error = %error, "下单失败，事务已回滚"),
        }
    }

    let notifier = app
        .registry()
        .get_typed::<OrderNotifier>(CapabilityKind::EventHandler, None)?;
    info!(events = notifier.sent(), "已发布事件数");

    app.shutdown().await?;
    info!("应用已关闭");
    Ok(())
}
