//! 引导阶段

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 引导阶段
///
/// 固定顺序，只能向前推进，每个阶段在一次引导中只执行一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BootstrapPhase {
    /// 配置物化
    Configuration,
    /// 核心基础设施注册（数据源、事务协调器）
    CoreInfrastructure,
    /// 特性注册
    FeatureRegistration,
    /// 扫描组件注册
    ComponentRegistration,
    /// 路由注册
    RouteRegistration,
    /// 特性就绪回调
    FeatureReady,
    /// 注册后校验
    Validation,
}

impl BootstrapPhase {
    /// 按执行顺序排列的所有阶段
    pub const ALL: [BootstrapPhase; 7] = [
        BootstrapPhase::Configuration,
        BootstrapPhase::CoreInfrastructure,
        BootstrapPhase::FeatureRegistration,
        BootstrapPhase::ComponentRegistration,
        BootstrapPhase::RouteRegistration,
        BootstrapPhase::FeatureReady,
        BootstrapPhase::Validation,
    ];

    /// 阶段序号（从 1 开始）
    pub fn number(self) -> u8 {
        match self {
            BootstrapPhase::Configuration => 1,
            BootstrapPhase::CoreInfrastructure => 2,
            BootstrapPhase::FeatureRegistration => 3,
            BootstrapPhase::ComponentRegistration => 4,
            BootstrapPhase::RouteRegistration => 5,
            BootstrapPhase::FeatureReady => 6,
            BootstrapPhase::Validation => 7,
        }
    }

    /// 阶段名称
    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapPhase::Configuration => "Configuration",
            BootstrapPhase::CoreInfrastructure => "CoreInfrastructure",
            BootstrapPhase::FeatureRegistration => "FeatureRegistration",
            BootstrapPhase::ComponentRegistration => "ComponentRegistration",
            BootstrapPhase::RouteRegistration => "RouteRegistration",
            BootstrapPhase::FeatureReady => "FeatureReady",
            BootstrapPhase::Validation => "Validation",
        }
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.number(), self.as_str())
    }
}

/// 阶段监听器
///
/// 在每个阶段开始和成功结束时收到通知，失败的阶段不会收到完成通知
pub trait PhaseListener: Send + Sync {
    /// 阶段开始
    fn on_phase_started(&self, _phase: BootstrapPhase) {}

    /// 阶段完成
    fn on_phase_completed(&self, _phase: BootstrapPhase, _elapsed: Duration) {}
}
