//! 组件扫描器抽象接口
//!
//! 组件通过启动期注册清单声明自己，扫描器只按命名空间筛选清单，不依赖运行时反射。
//!
//! ```ignore
//! let manifest = ComponentManifest::new("app.orders")
//!     .register(
//!         ComponentDefinition::<OrderService>::service()
//!             .depends_on(CapabilityKind::Repository, "OrderRepository")
//!             .factory(|ctx| {
//!                 let repository = ctx.resolve(CapabilityKind::Repository, "OrderRepository")?;
//!                 Ok(OrderService::new(repository))
//!             }),
//!     );
//! ```

use crate::factory::{ComponentFactory, FnFactory, InjectionContext};
use infrastructure_common::{
    CapabilityKind, ComponentDescriptor, ComponentError, ComponentResult, DependencyRef,
    DependencyResult, DescriptorOrigin, Disposable, TypeInfo,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 组件扫描器 trait
pub trait ComponentScanner: Send + Sync {
    /// 获取扫描器名称
    fn name(&self) -> &str;

    /// 扫描给定的命名空间，返回发现的组件注册（按发现顺序）
    fn scan(&self, namespaces: &[String]) -> ComponentResult<Vec<ComponentRegistration>>;
}

/// 一个组件的描述符加上构造它的工厂
#[derive(Clone)]
pub struct ComponentRegistration {
    /// 组件描述符
    pub descriptor: ComponentDescriptor,
    /// 组件工厂
    pub factory: Arc<dyn ComponentFactory>,
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// 类型化的组件定义
pub struct ComponentDefinition<T> {
    kind: CapabilityKind,
    qualifier: Option<String>,
    dependencies: Vec<DependencyRef>,
    factory: Option<Arc<dyn ComponentFactory>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ComponentDefinition<T> {
    /// 以指定能力类别定义组件
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            qualifier: None,
            dependencies: Vec::new(),
            factory: None,
            _marker: PhantomData,
        }
    }

    /// 业务服务
    pub fn service() -> Self {
        Self::new(CapabilityKind::Service)
    }

    /// 数据仓储
    pub fn repository() -> Self {
        Self::new(CapabilityKind::Repository)
    }

    /// 校验器
    pub fn validator() -> Self {
        Self::new(CapabilityKind::Validator)
    }

    /// 事件处理器
    pub fn event_handler() -> Self {
        Self::new(CapabilityKind::EventHandler)
    }

    /// HTTP 处理器
    pub fn http_handler() -> Self {
        Self::new(CapabilityKind::HttpHandler)
    }

    /// 路由模块
    pub fn route_module() -> Self {
        Self::new(CapabilityKind::RouteModule)
    }

    /// 初始化器，只能由特性提供
    pub fn initializer() -> Self {
        Self::new(CapabilityKind::Initializer)
    }

    /// 设置限定符
    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// 声明按名称引用的依赖
    pub fn depends_on(mut self, kind: CapabilityKind, name: impl Into<String>) -> Self {
        self.dependencies.push(DependencyRef::named(kind, name));
        self
    }

    /// 声明对某一类别唯一实现的依赖
    pub fn depends_on_any(mut self, kind: CapabilityKind) -> Self {
        self.dependencies.push(DependencyRef::any(kind));
        self
    }

    /// 使用自定义工厂
    pub fn with_factory(mut self, factory: impl ComponentFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }
}

impl<T: Send + Sync + 'static> ComponentDefinition<T> {
    /// 使用闭包构造组件
    pub fn factory<F>(self, build: F) -> Self
    where
        F: Fn(&InjectionContext<'_>) -> DependencyResult<T> + Send + Sync + 'static,
    {
        self.with_factory(FnFactory::new(build))
    }
}

impl<T: Disposable + 'static> ComponentDefinition<T> {
    /// 使用闭包构造持有外部资源的组件
    pub fn disposable_factory<F>(self, build: F) -> Self
    where
        F: Fn(&InjectionContext<'_>) -> DependencyResult<T> + Send + Sync + 'static,
    {
        self.with_factory(FnFactory::disposable(build))
    }
}

/// 类型擦除后的注册动作
#[derive(Clone)]
pub struct RegistrationAction {
    kind: CapabilityKind,
    type_info: TypeInfo,
    qualifier: Option<String>,
    dependencies: Vec<DependencyRef>,
    factory: Option<Arc<dyn ComponentFactory>>,
}

impl RegistrationAction {
    /// 能力类别
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// 实现类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 是否提供了工厂
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// 生成组件注册
    ///
    /// 没有工厂或直接依赖自身的定义返回 [`ComponentError::DiscoveryError`]
    pub fn to_registration(&self, origin: DescriptorOrigin) -> ComponentResult<ComponentRegistration> {
        let factory = self.factory.clone().ok_or_else(|| {
            ComponentError::discovery_error(
                self.type_info.short_name(),
                format!("{} 没有提供工厂，无法实例化", origin),
            )
        })?;

        let mut descriptor = ComponentDescriptor::new(self.kind, self.type_info.clone(), origin);
        descriptor.qualifier = self.qualifier.clone();
        descriptor.dependencies = self.dependencies.clone();
        if descriptor.depends_on_itself() {
            return Err(ComponentError::discovery_error(
                self.type_info.short_name(),
                format!("{} 不能依赖自身", descriptor.key()),
            ));
        }

        Ok(ComponentRegistration {
            descriptor,
            factory,
        })
    }
}

impl<T: 'static> From<ComponentDefinition<T>> for RegistrationAction {
    fn from(definition: ComponentDefinition<T>) -> Self {
        Self {
            kind: definition.kind,
            type_info: TypeInfo::of::<T>(),
            qualifier: definition.qualifier,
            dependencies: definition.dependencies,
            factory: definition.factory,
        }
    }
}

impl fmt::Debug for RegistrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationAction")
            .field("kind", &self.kind)
            .field("type", &self.type_info.name)
            .field("qualifier", &self.qualifier)
            .field("dependencies", &self.dependencies)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// 组件注册清单
///
/// 一个命名空间下的组件集合，定义的顺序就是发现顺序
#[derive(Debug, Clone)]
pub struct ComponentManifest {
    namespace: String,
    actions: Vec<RegistrationAction>,
}

impl ComponentManifest {
    /// 创建命名空间的清单
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            actions: Vec::new(),
        }
    }

    /// 添加组件定义
    pub fn register<T: 'static>(mut self, definition: ComponentDefinition<T>) -> Self {
        self.actions.push(definition.into());
        self
    }

    /// 命名空间
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 清单中的注册动作
    pub fn actions(&self) -> &[RegistrationAction] {
        &self.actions
    }

    /// 命名空间是否位于 `root` 之下（按 `.` 分段匹配）
    pub fn is_within(&self, root: &str) -> bool {
        let root = root.trim_end_matches('.');
        root.is_empty()
            || self.namespace == root
            || self
                .namespace
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}
