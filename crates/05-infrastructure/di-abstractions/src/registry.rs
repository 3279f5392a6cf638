//! 组件注册表抽象接口

use data_abstractions::{DataSource, TransactionCoordinator};
use infrastructure_common::{
    CapabilityKind, ComponentInstance, ComponentKey, DependencyError, DependencyResult,
};
use std::sync::Arc;

/// 组件查找 trait
///
/// 按 (能力类别, 限定符) 查找已实例化的组件。引导完成后注册表只读，
/// 实现必须支持并发读取。
pub trait ComponentLookup: Send + Sync {
    /// 查找组件
    ///
    /// `qualifier` 为 `None` 时返回该类别下的唯一实现；存在多个实现时返回
    /// [`DependencyError::AmbiguousComponent`]
    fn get(&self, kind: CapabilityKind, qualifier: Option<&str>) -> DependencyResult<ComponentInstance>;

    /// 检查组件是否已注册
    fn contains(&self, key: &ComponentKey) -> bool;

    /// 所有组件键（按实例化顺序）
    fn keys(&self) -> Vec<ComponentKey>;

    /// 已注册的数据源
    fn data_source(&self) -> Option<Arc<dyn DataSource>>;

    /// 已注册的事务协调器
    fn transactions(&self) -> Option<Arc<TransactionCoordinator>>;
}

/// 组件查找的类型化扩展
pub trait ComponentLookupExt: ComponentLookup {
    /// 查找组件并向下转型
    fn get_typed<T>(&self, kind: CapabilityKind, qualifier: Option<&str>) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let instance = self.get(kind, qualifier)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| DependencyError::TypeMismatch {
                key: match qualifier {
                    Some(name) => ComponentKey::new(kind, name).to_string(),
                    None => format!("{kind}:*"),
                },
                expected: std::any::type_name::<T>().to_string(),
                actual: instance.type_name().to_string(),
            })
    }

    /// 某一类别下的所有组件（按实例化顺序）
    fn get_all(&self, kind: CapabilityKind) -> Vec<(ComponentKey, ComponentInstance)> {
        self.keys()
            .into_iter()
            .filter(|key| key.kind == kind)
            .filter_map(|key| {
                let instance = self.get(kind, Some(&key.name)).ok()?;
                Some((key, instance))
            })
            .collect()
    }
}

impl<L: ComponentLookup + ?Sized> ComponentLookupExt for L {}
