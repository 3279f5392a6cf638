//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置解析失败: {message}")]
    ParseError { message: String },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 组件发现错误类型（扫描阶段）
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("组件发现失败: {type_name}, 原因: {message}")]
    DiscoveryError { type_name: String, message: String },
}

impl ComponentError {
    /// 创建发现错误
    pub fn discovery_error(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DiscoveryError {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// 依赖注入错误类型（解析与注册阶段）
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("检测到循环依赖: {}", .members.join(" -> "))]
    CyclicDependency { members: Vec<String> },

    #[error("无法解析依赖: {requester} 需要 {missing}, 但没有组件或特性提供它")]
    UnresolvedDependency { requester: String, missing: String },

    #[error("组件未注册: {key}")]
    ComponentNotRegistered { key: String },

    #[error("组件查找存在歧义: {kind} 有多个实现 [{}]", .candidates.join(", "))]
    AmbiguousComponent {
        kind: String,
        candidates: Vec<String>,
    },

    #[error("组件重复注册: {key}")]
    DuplicateComponent { key: String },

    #[error("组件类型不匹配: {key}, 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("组件 {requester} 请求了未声明的依赖 {dependency}")]
    UndeclaredDependency {
        requester: String,
        dependency: String,
    },

    #[error("组件 {requester} 不能依赖 Web 层组件 {dependency}")]
    InvalidDependencyDirection {
        requester: String,
        dependency: String,
    },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("基础设施组件不可用: {name}")]
    InfrastructureUnavailable { name: String },
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(
        type_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }
}

/// 特性错误类型
#[derive(Error, Debug)]
#[error("{message}")]
pub struct FeatureError {
    pub message: String,
}

impl FeatureError {
    /// 创建特性错误
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 事务错误类型
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("当前工作单元没有活动的事务")]
    NoActiveTransaction,

    #[error("开启事务失败: {source}")]
    Begin {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("提交事务失败: {source}")]
    Commit {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("等待事务资源超时: {timeout_ms}ms")]
    AcquireTimeout { timeout_ms: u64 },

    #[error("工作单元已取消，事务已回滚")]
    Cancelled,

    #[error("内层作用域失败，事务已被标记为仅回滚")]
    RollbackOnly,
}

/// 基础设施错误类型（引导期错误一律致命）
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("组件发现错误: {source}")]
    ComponentError {
        #[from]
        source: ComponentError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("注册后校验失败: 组件 {component} 声称已注册, 但注册表中找不到 {key}")]
    PostRegistrationValidation { component: String, key: String },

    #[error("引导流程已执行过, 不允许重复引导")]
    AlreadyBootstrapped,

    #[error("引导阶段 {phase} 失败: {message}")]
    PhaseFailed { phase: String, message: String },

    #[error("特性 {feature} 失败: {message}")]
    FeatureFailed { feature: String, message: String },

    #[error("日志系统初始化失败: {message}")]
    LoggingInitFailed { message: String },

    #[error("基础设施关闭失败: {message}")]
    ShutdownFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ComponentResult<T> = Result<T, ComponentError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_members() {
        let error = DependencyError::CyclicDependency {
            members: vec!["Service:A".to_string(), "Service:B".to_string()],
        };
        assert_eq!(error.to_string(), "检测到循环依赖: Service:A -> Service:B");
    }

    #[test]
    fn test_bootstrap_error_wraps_dependency_error() {
        let error: InfrastructureError = DependencyError::UnresolvedDependency {
            requester: "Service:OrderService".to_string(),
            missing: "Repository:OrderRepository".to_string(),
        }
        .into();

        let message = error.to_string();
        assert!(message.contains("OrderService"));
        assert!(message.contains("OrderRepository"));
    }
}
