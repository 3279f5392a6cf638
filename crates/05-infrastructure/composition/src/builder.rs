//! 应用构建器

use crate::application::Application;
use crate::bootstrapper::{BootstrapInputs, PhaseExecutor};
use crate::logging::LoggingConfig;
use crate::phase::PhaseListener;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use data_abstractions::DataSource;
use di_abstractions::{ComponentManifest, ComponentScanner, DependencyResolver, Feature, RouteBinder};
use di_impl::{ManifestScanner, TopologicalResolver};
use infrastructure_common::{ConfigError, InfrastructureResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 应用构建器
///
/// 使用建造者模式收集引导输入，最后交给 [`PhaseExecutor`] 按阶段执行
pub struct ApplicationBuilder {
    /// 扫描命名空间
    namespaces: Vec<String>,
    /// 内置清单扫描器
    manifests: ManifestScanner,
    /// 额外的组件扫描器
    scanners: Vec<Box<dyn ComponentScanner>>,
    /// 特性（按添加顺序）
    features: Vec<Arc<dyn Feature>>,
    /// 数据源
    data_source: Option<Arc<dyn DataSource>>,
    /// 配置源
    config: ConfigBuilder<DefaultState>,
    /// 路由协作者
    route_binder: Option<Box<dyn RouteBinder>>,
    /// 依赖解析器
    resolver: Box<dyn DependencyResolver>,
    /// 阶段监听器
    listeners: Vec<Arc<dyn PhaseListener>>,
    /// 日志配置，`None` 表示不初始化日志
    logging: Option<LoggingConfig>,
}

impl ApplicationBuilder {
    /// 创建新的应用构建器
    pub fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            manifests: ManifestScanner::new(),
            scanners: Vec::new(),
            features: Vec::new(),
            data_source: None,
            config: config::Config::builder(),
            route_binder: None,
            resolver: Box::new(TopologicalResolver::new()),
            listeners: Vec::new(),
            logging: None,
        }
    }

    /// 添加扫描根命名空间
    pub fn scan_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        let namespace = namespace.into();
        info!("添加扫描命名空间: {}", namespace);
        if !self.namespaces.contains(&namespace) {
            self.namespaces.push(namespace);
        }
        self
    }

    /// 添加组件清单
    pub fn add_manifest(mut self, manifest: ComponentManifest) -> Self {
        debug!(
            namespace = manifest.namespace(),
            components = manifest.actions().len(),
            "添加组件清单"
        );
        self.manifests.add_manifest(manifest);
        self
    }

    /// 添加自定义组件扫描器
    pub fn add_component_scanner<T: ComponentScanner + 'static>(mut self, scanner: T) -> Self {
        debug!(scanner = scanner.name(), "添加组件扫描器");
        self.scanners.push(Box::new(scanner));
        self
    }

    /// 添加特性
    pub fn add_feature<F: Feature + 'static>(mut self, feature: F) -> Self {
        info!("添加特性: {}", feature.id());
        self.features.push(Arc::new(feature));
        self
    }

    /// 设置数据源
    pub fn with_data_source<D: DataSource + 'static>(self, data_source: D) -> Self {
        self.with_shared_data_source(Arc::new(data_source))
    }

    /// 设置共享的数据源
    pub fn with_shared_data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
        info!("设置数据源: {}", data_source.name());
        self.data_source = Some(data_source);
        self
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::ParseError {
                message: format!("配置文件不存在: {}", path.display()),
            }
            .into());
        }

        info!("添加 TOML 配置文件: {}", path.display());
        self.config = self
            .config
            .add_source(File::from(path).format(FileFormat::Toml).required(true));
        Ok(self)
    }

    /// 添加环境变量配置源
    ///
    /// 层级之间用双下划线分隔，例如 `APP_SHUTDOWN__DISPOSE_TIMEOUT_MS=1000`
    pub fn add_config_env_vars<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);

        self.config = self.config.add_source(
            Environment::with_prefix(&prefix)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scan.namespaces")
                .with_list_parse_key("features.disabled")
                .try_parsing(true),
        );
        self
    }

    /// 添加已构建的配置
    pub fn with_config(mut self, config: config::Config) -> Self {
        self.config = self.config.add_source(config);
        self
    }

    /// 设置路由协作者
    pub fn with_route_binder<B: RouteBinder + 'static>(mut self, binder: B) -> Self {
        self.route_binder = Some(Box::new(binder));
        self
    }

    /// 替换依赖解析器
    pub fn with_resolver<R: DependencyResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// 添加阶段监听器
    pub fn add_phase_listener(mut self, listener: Arc<dyn PhaseListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 生成阶段执行器，不立即执行
    pub fn into_executor(self) -> InfrastructureResult<PhaseExecutor> {
        // 只有在明确配置了日志时才初始化日志，避免在测试中重复初始化
        if let Some(logging) = &self.logging {
            logging.init()?;
        }

        let mut scanners = self.scanners;
        if !self.manifests.manifests().is_empty() {
            scanners.insert(0, Box::new(self.manifests));
        }

        Ok(PhaseExecutor::new(BootstrapInputs {
            namespaces: self.namespaces,
            scanners,
            resolver: self.resolver,
            features: self.features,
            data_source: self.data_source,
            config: Some(self.config),
            route_binder: self.route_binder,
            listeners: self.listeners,
        }))
    }

    /// 构建并引导应用
    pub async fn bootstrap(self) -> InfrastructureResult<Application> {
        self.into_executor()?.execute().await
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("namespaces", &self.namespaces)
            .field("manifests", &self.manifests.manifests().len())
            .field("scanners", &self.scanners.len())
            .field("features", &self.features.len())
            .field("has_data_source", &self.data_source.is_some())
            .field("has_route_binder", &self.route_binder.is_some())
            .finish_non_exhaustive()
    }
}
