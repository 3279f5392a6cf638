//! 组件基础模型
//!
//! 定义能力类别、组件键和已实例化组件的表示

use crate::lifecycle::Disposable;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 组件能力类别
///
/// 可被发现的组件角色是一个封闭集合，按变体分派
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// 业务服务
    Service,
    /// 数据仓储
    Repository,
    /// 校验器
    Validator,
    /// 事件处理器
    EventHandler,
    /// HTTP 处理器
    HttpHandler,
    /// 路由模块
    RouteModule,
    /// 初始化器（仅由特性或基础设施提供，不参与扫描）
    Initializer,
}

impl CapabilityKind {
    /// 所有能力类别
    pub const ALL: [CapabilityKind; 7] = [
        CapabilityKind::Service,
        CapabilityKind::Repository,
        CapabilityKind::Validator,
        CapabilityKind::EventHandler,
        CapabilityKind::HttpHandler,
        CapabilityKind::RouteModule,
        CapabilityKind::Initializer,
    ];

    /// 是否可以通过扫描发现
    pub fn is_scannable(self) -> bool {
        !matches!(self, CapabilityKind::Initializer)
    }

    /// 是否属于 Web 层（在路由注册阶段实例化）
    pub fn is_web(self) -> bool {
        matches!(self, CapabilityKind::HttpHandler | CapabilityKind::RouteModule)
    }

    /// 类别名称
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::Service => "Service",
            CapabilityKind::Repository => "Repository",
            CapabilityKind::Validator => "Validator",
            CapabilityKind::EventHandler => "EventHandler",
            CapabilityKind::HttpHandler => "HttpHandler",
            CapabilityKind::RouteModule => "RouteModule",
            CapabilityKind::Initializer => "Initializer",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 注册表中的组件键
///
/// 名称是限定符，未指定限定符时取实现类型的短名称
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKey {
    /// 能力类别
    pub kind: CapabilityKind,
    /// 名称或限定符
    pub name: String,
}

impl ComponentKey {
    /// 创建组件键
    pub fn new(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// 构造依赖引用
///
/// `name` 为空时表示"该类别下唯一的实现"，解析时必须无歧义
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRef {
    /// 依赖的能力类别
    pub kind: CapabilityKind,
    /// 依赖的名称或限定符
    pub name: Option<String>,
}

impl DependencyRef {
    /// 按名称引用
    pub fn named(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    /// 引用该类别下的唯一实现
    pub fn any(kind: CapabilityKind) -> Self {
        Self { kind, name: None }
    }

    /// 检查组件键是否满足此引用
    pub fn matches(&self, key: &ComponentKey) -> bool {
        self.kind == key.kind
            && self
                .name
                .as_deref()
                .map_or(true, |name| name == key.name)
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", self.kind, name),
            None => write!(f, "{}:*", self.kind),
        }
    }
}

/// 已实例化的组件
#[derive(Clone)]
pub struct ComponentInstance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    disposer: Option<Arc<dyn Disposable>>,
}

impl ComponentInstance {
    /// 包装一个组件实例
    pub fn new<T>(value: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
            disposer: None,
        }
    }

    /// 包装一个持有外部资源的组件实例，关闭时会调用其释放钩子
    pub fn disposable<T>(value: Arc<T>) -> Self
    where
        T: Disposable + 'static,
    {
        let disposer: Arc<dyn Disposable> = value.clone();
        Self {
            value,
            type_name: std::any::type_name::<T>(),
            disposer: Some(disposer),
        }
    }

    /// 实例的类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 无类型的实例句柄
    pub fn value(&self) -> Arc<dyn Any + Send + Sync> {
        self.value.clone()
    }

    /// 释放钩子
    pub fn disposer(&self) -> Option<&Arc<dyn Disposable>> {
        self.disposer.as_ref()
    }

    /// 向下转型为具体类型
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.value.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("type_name", &self.type_name)
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}
