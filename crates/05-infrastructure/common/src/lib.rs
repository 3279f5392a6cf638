//! # Infrastructure Common
//!
//! 这个 crate 提供了引导引擎各层共享的组件模型和错误类型。
//!
//! ## 核心类型
//!
//! - [`CapabilityKind`] - 封闭的组件能力类别
//! - [`ComponentKey`] - 注册表中的组件键 (能力类别 + 名称)
//! - [`DependencyRef`] - 构造依赖引用
//! - [`ComponentDescriptor`] - 实例化之前的组件描述符
//! - [`ComponentInstance`] - 已实例化的组件
//! - [`Disposable`] - 持有外部资源的组件在关闭时的释放钩子
//!
//! ## 设计原则
//!
//! - 能力类别是封闭集合，按变体分派，不依赖继承
//! - 注册表句柄显式传递，不存在全局可变状态
//! - 错误类型按阶段划分，引导期错误一律致命

pub mod component;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use component::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
