//! # 依赖注入具体实现
//!
//! 提供基于注册清单的组件扫描器、拓扑排序依赖解析器和内存组件注册表

pub mod registry;
pub mod resolver;
pub mod scanner;

pub use registry::InMemoryComponentRegistry;
pub use resolver::TopologicalResolver;
pub use scanner::ManifestScanner;
