//! 引导配置
//!
//! 配置文件和环境变量的加载交给 `config` crate，这里只把已加载的值物化成类型化设置

use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// 引导设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSettings {
    /// 扫描设置
    pub scan: ScanSettings,
    /// 特性设置
    pub features: FeatureSettings,
    /// 事务设置
    pub transaction: TransactionSettings,
    /// 关闭设置
    pub shutdown: ShutdownSettings,
    /// 按组件名称划分的自由配置节
    pub components: HashMap<String, serde_json::Value>,
}

/// 扫描设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// 追加到构建器命名空间之后的扫描根
    pub namespaces: Vec<String>,
}

/// 特性设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// 跳过的特性ID
    pub disabled: Vec<String>,
}

/// 事务设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionSettings {
    /// 等待物理事务的超时（毫秒），不设置则一直等待
    pub acquire_timeout_ms: Option<u64>,
}

/// 关闭设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownSettings {
    /// 单个组件释放资源的超时（毫秒）
    pub dispose_timeout_ms: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            dispose_timeout_ms: 5_000,
        }
    }
}

impl BootstrapSettings {
    /// 从已加载的配置物化设置，缺失的项使用默认值
    pub fn from_config(config: config::Config) -> ConfigResult<Self> {
        let settings: Self = config
            .try_deserialize()
            .map_err(|error| ConfigError::ParseError {
                message: error.to_string(),
            })?;
        settings.validate()?;
        debug!(?settings, "引导设置已物化");
        Ok(settings)
    }

    /// 校验设置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.shutdown.dispose_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "shutdown.dispose_timeout_ms 必须大于 0".to_string(),
            });
        }
        if self.transaction.acquire_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "transaction.acquire_timeout_ms 必须大于 0".to_string(),
            });
        }
        if let Some(blank) = self.scan.namespaces.iter().find(|ns| ns.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                message: format!("scan.namespaces 包含空命名空间: '{blank}'"),
            });
        }
        Ok(())
    }

    /// 组件配置节，名称不区分大小写
    pub fn component(&self, name: &str) -> Option<&serde_json::Value> {
        self.components.get(name).or_else(|| {
            self.components
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// 特性是否被禁用
    pub fn is_feature_disabled(&self, id: &str) -> bool {
        self.features.disabled.iter().any(|disabled| disabled == id)
    }

    /// 等待物理事务的超时
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.transaction.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// 单个组件释放资源的超时
    pub fn dispose_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown.dispose_timeout_ms)
    }
}
