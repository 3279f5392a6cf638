//! 元数据定义
//!
//! 提供组件描述符和类型信息

use crate::component::{CapabilityKind, ComponentKey, DependencyRef};
use std::any::TypeId;
use std::fmt;

/// 类型信息
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 类型名称（不包含模块路径）
    pub name: String,
    /// 类型ID
    pub id: TypeId,
    /// 完整类型路径
    pub module_path: String,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: 'static>() -> Self {
        let full_name = std::any::type_name::<T>();
        Self {
            name: short_type_name(full_name).to_string(),
            id: TypeId::of::<T>(),
            module_path: full_name.to_string(),
        }
    }

    /// 获取简短的类型名称
    pub fn short_name(&self) -> &str {
        &self.name
    }
}

/// 去掉模块路径，保留泛型参数
fn short_type_name(full_name: &str) -> &str {
    let head = full_name.split('<').next().unwrap_or(full_name);
    let start = head.rfind("::").map_or(0, |idx| idx + 2);
    &full_name[start..]
}

/// 描述符来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorOrigin {
    /// 扫描命名空间得到
    Scanned {
        /// 所在命名空间
        namespace: String,
    },
    /// 由特性提供
    Feature {
        /// 特性ID
        id: String,
    },
}

impl fmt::Display for DescriptorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorOrigin::Scanned { namespace } => write!(f, "namespace '{namespace}'"),
            DescriptorOrigin::Feature { id } => write!(f, "feature '{id}'"),
        }
    }
}

/// 组件描述符
///
/// 扫描阶段创建，由依赖解析器消费一次，引导完成后不再保留
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// 能力类别
    pub kind: CapabilityKind,
    /// 具体实现类型
    pub type_info: TypeInfo,
    /// 构造时需要的依赖（有序）
    pub dependencies: Vec<DependencyRef>,
    /// 消歧限定符
    pub qualifier: Option<String>,
    /// 来源
    pub origin: DescriptorOrigin,
}

impl ComponentDescriptor {
    /// 创建新的组件描述符
    pub fn new(kind: CapabilityKind, type_info: TypeInfo, origin: DescriptorOrigin) -> Self {
        Self {
            kind,
            type_info,
            dependencies: Vec::new(),
            qualifier: None,
            origin,
        }
    }

    /// 设置限定符
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// 添加依赖
    pub fn with_dependency(mut self, dependency: DependencyRef) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// 注册表中使用的名称：限定符优先，否则为类型短名称
    pub fn registered_name(&self) -> &str {
        self.qualifier
            .as_deref()
            .unwrap_or_else(|| self.type_info.short_name())
    }

    /// 注册表键
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(self.kind, self.registered_name())
    }

    /// 是否直接依赖自身
    pub fn depends_on_itself(&self) -> bool {
        let key = self.key();
        self.dependencies.iter().any(|dep| {
            dep.kind == key.kind && dep.name.as_deref() == Some(key.name.as_str())
        })
    }
}
