//! 引导报告

use crate::phase::BootstrapPhase;
use chrono::{DateTime, Utc};
use infrastructure_common::ComponentKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 已注册的组件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredComponent {
    /// 注册表键
    pub key: ComponentKey,
    /// 实现类型名称
    pub type_name: String,
    /// 注册所在阶段
    pub phase: BootstrapPhase,
}

/// 阶段耗时
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// 阶段
    pub phase: BootstrapPhase,
    /// 耗时
    pub elapsed: Duration,
}

/// 引导报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 完成时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 已完成的阶段
    pub phases: Vec<PhaseTiming>,
    /// 注册的组件（按实例化顺序）
    pub components: Vec<RegisteredComponent>,
    /// 已执行 `on_ready` 的特性（按注册顺序）
    pub features_ready: Vec<String>,
}

impl BootstrapReport {
    pub(crate) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            phases: Vec::new(),
            components: Vec::new(),
            features_ready: Vec::new(),
        }
    }

    pub(crate) fn record_phase(&mut self, phase: BootstrapPhase, elapsed: Duration) {
        self.phases.push(PhaseTiming { phase, elapsed });
    }

    pub(crate) fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// 引导总耗时
    pub fn total_elapsed(&self) -> Duration {
        self.phases.iter().map(|timing| timing.elapsed).sum()
    }

    /// 某一阶段注册的组件
    pub fn components_in(&self, phase: BootstrapPhase) -> impl Iterator<Item = &RegisteredComponent> {
        self.components
            .iter()
            .filter(move |component| component.phase == phase)
    }
}
