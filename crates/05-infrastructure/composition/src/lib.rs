//! # 应用引导组合层
//!
//! 这个 crate 负责把扫描、依赖解析、特性、路由和事务协调组合成一次完整的
//! 应用引导，产出一个只读的、可在并发工作单元之间共享的 [`Application`]。
//!
//! ## 引导阶段
//!
//! 1. **配置物化**: 合并配置源，反序列化为 [`BootstrapSettings`]
//! 2. **核心基础设施**: 注册数据源和事务协调器
//! 3. **特性注册**: 收集每个特性提供的组件注册
//! 4. **组件注册**: 扫描、解析依赖顺序、实例化非 Web 组件
//! 5. **路由注册**: 实例化 Web 组件并交给路由协作者
//! 6. **特性就绪**: 按注册顺序调用每个特性的 `on_ready`
//! 7. **注册后校验**: 确认报告为已注册的组件都能在注册表中查到
//!
//! 任何阶段失败都会中止引导；同一个执行器只能引导一次。
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use data_abstractions::InMemoryDataSource;
//! use infrastructure_composition::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Application::builder()
//!         .scan_namespace("app")
//!         .with_data_source(InMemoryDataSource::new("primary", 4))
//!         .add_config_toml("config/app.toml")?
//!         .bootstrap()
//!         .await?;
//!
//!     println!("已注册组件: {}", app.report().components.len());
//!
//!     app.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod bootstrapper;
pub mod builder;
pub mod logging;
pub mod phase;
pub mod report;
pub mod settings;
pub mod validator;

// 重新导出主要类型
pub use application::{Application, ApplicationStatus};
pub use bootstrapper::PhaseExecutor;
pub use builder::ApplicationBuilder;
pub use logging::{LogOutput, LoggingConfig};
pub use phase::{BootstrapPhase, PhaseListener};
pub use report::{BootstrapReport, PhaseTiming, RegisteredComponent};
pub use settings::BootstrapSettings;
pub use validator::PostRegistrationValidator;

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;

#[cfg(test)]
mod tests;
