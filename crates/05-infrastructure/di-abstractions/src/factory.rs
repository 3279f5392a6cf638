//! 组件工厂抽象接口
//!
//! 工厂只能通过 [`InjectionContext`] 获取自己声明过的依赖

use crate::registry::{ComponentLookup, ComponentLookupExt};
use async_trait::async_trait;
use data_abstractions::{DataSource, TransactionCoordinator};
use infrastructure_common::{
    CapabilityKind, ComponentDescriptor, ComponentInstance, ComponentKey, DependencyError,
    DependencyRef, DependencyResult, Disposable,
};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// 组件工厂 trait
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    /// 创建组件实例
    async fn create(&self, ctx: &InjectionContext<'_>) -> DependencyResult<ComponentInstance>;
}

/// 注入上下文
///
/// 在实例化单个组件时传给它的工厂
pub struct InjectionContext<'a> {
    descriptor: &'a ComponentDescriptor,
    lookup: &'a dyn ComponentLookup,
    config: Option<&'a serde_json::Value>,
}

impl<'a> InjectionContext<'a> {
    /// 创建注入上下文
    pub fn new(
        descriptor: &'a ComponentDescriptor,
        lookup: &'a dyn ComponentLookup,
        config: Option<&'a serde_json::Value>,
    ) -> Self {
        Self {
            descriptor,
            lookup,
            config,
        }
    }

    /// 正在构造的组件描述符
    pub fn descriptor(&self) -> &ComponentDescriptor {
        self.descriptor
    }

    /// 正在构造的组件键
    pub fn key(&self) -> ComponentKey {
        self.descriptor.key()
    }

    /// 按名称解析一个已声明的依赖
    pub fn resolve<T>(&self, kind: CapabilityKind, name: &str) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let requested = ComponentKey::new(kind, name);
        if !self
            .descriptor
            .dependencies
            .iter()
            .any(|dependency| dependency.matches(&requested))
        {
            return Err(self.undeclared(&DependencyRef::named(kind, name)));
        }
        self.lookup.get_typed(kind, Some(name))
    }

    /// 解析某一类别下已声明的依赖
    ///
    /// 声明时带名称则按名称查找，否则取该类别的唯一实现
    pub fn resolve_any<T>(&self, kind: CapabilityKind) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let declared = self
            .descriptor
            .dependencies
            .iter()
            .find(|dependency| dependency.kind == kind)
            .ok_or_else(|| self.undeclared(&DependencyRef::any(kind)))?;
        self.lookup.get_typed(kind, declared.name.as_deref())
    }

    /// 数据源
    pub fn data_source(&self) -> DependencyResult<Arc<dyn DataSource>> {
        self.lookup
            .data_source()
            .ok_or_else(|| DependencyError::InfrastructureUnavailable {
                name: "DataSource".to_string(),
            })
    }

    /// 事务协调器
    pub fn transactions(&self) -> DependencyResult<Arc<TransactionCoordinator>> {
        self.lookup
            .transactions()
            .ok_or_else(|| DependencyError::InfrastructureUnavailable {
                name: "TransactionCoordinator".to_string(),
            })
    }

    /// 反序列化该组件的配置节，未配置时返回 `None`
    pub fn component_config<T: DeserializeOwned>(&self) -> DependencyResult<Option<T>> {
        self.config
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|error| {
                    DependencyError::creation_failed(self.descriptor.type_info.short_name(), error)
                })
            })
            .transpose()
    }

    fn undeclared(&self, dependency: &DependencyRef) -> DependencyError {
        DependencyError::UndeclaredDependency {
            requester: self.descriptor.key().to_string(),
            dependency: dependency.to_string(),
        }
    }
}

/// 基于闭包的同步工厂
pub struct FnFactory<T, F> {
    build: F,
    wrap: fn(Arc<T>) -> ComponentInstance,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FnFactory<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&InjectionContext<'_>) -> DependencyResult<T> + Send + Sync + 'static,
{
    /// 普通组件工厂
    pub fn new(build: F) -> Self {
        Self {
            build,
            wrap: ComponentInstance::new::<T>,
            _marker: PhantomData,
        }
    }
}

impl<T, F> FnFactory<T, F>
where
    T: Disposable + 'static,
    F: Fn(&InjectionContext<'_>) -> DependencyResult<T> + Send + Sync + 'static,
{
    /// 持有外部资源的组件工厂，关闭时释放
    pub fn disposable(build: F) -> Self {
        Self {
            build,
            wrap: ComponentInstance::disposable::<T>,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> ComponentFactory for FnFactory<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&InjectionContext<'_>) -> DependencyResult<T> + Send + Sync + 'static,
{
    async fn create(&self, ctx: &InjectionContext<'_>) -> DependencyResult<ComponentInstance> {
        let value = (self.build)(ctx)?;
        Ok((self.wrap)(Arc::new(value)))
    }
}
