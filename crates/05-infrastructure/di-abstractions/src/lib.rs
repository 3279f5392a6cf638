//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件注册清单、组件查找和引导扩展的核心接口。
//!
//! ## 核心接口
//!
//! - [`ComponentManifest`] - 启动期注册清单，代替运行时反射
//! - [`ComponentDefinition`] - 单个组件的类型化定义
//! - [`ComponentFactory`] / [`InjectionContext`] - 组件构造
//! - [`ComponentLookup`] - 注册表查找接口
//! - [`ComponentScanner`] - 组件扫描器接口
//! - [`DependencyResolver`] - 依赖解析器接口
//! - [`Feature`] - 可选子系统的扩展接口
//! - [`RouteBinder`] - 路由协作者接口

pub mod factory;
pub mod feature;
pub mod registry;
pub mod resolver;
pub mod routing;
pub mod scanner;

pub use factory::*;
pub use feature::*;
pub use registry::*;
pub use resolver::*;
pub use routing::*;
pub use scanner::*;
