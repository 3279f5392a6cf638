//! 日志初始化

use infrastructure_common::{InfrastructureError, InfrastructureResult};
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Text,
    Json,
}

/// 日志配置
///
/// `filter` 使用 `EnvFilter` 指令语法，设置了 `RUST_LOG` 时以环境变量为准
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 过滤指令，例如 `info,infrastructure_composition=debug`
    pub filter: String,
    /// 输出格式
    pub output: LogOutput,
    /// `bootstrap_phase` span 关闭时输出阶段耗时
    pub phase_timings: bool,
    /// 输出文件名和行号
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            output: LogOutput::Text,
            phase_timings: false,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    /// 开发环境：调试级别，带阶段耗时和源码位置
    pub fn development() -> Self {
        Self {
            filter: "debug".to_string(),
            output: LogOutput::Text,
            phase_timings: true,
            source_location: true,
        }
    }

    /// 生产环境：JSON 输出，保留阶段耗时
    pub fn production() -> Self {
        Self {
            filter: "info".to_string(),
            output: LogOutput::Json,
            phase_timings: true,
            source_location: false,
        }
    }

    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = directives.into();
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    fn env_filter(&self) -> InfrastructureResult<EnvFilter> {
        let configured =
            EnvFilter::try_new(&self.filter).map_err(|error| InfrastructureError::LoggingInitFailed {
                message: format!("无效的日志过滤指令 `{}`: {error}", self.filter),
            })?;
        Ok(EnvFilter::try_from_default_env().unwrap_or(configured))
    }

    /// 安装全局日志订阅者，进程内只能成功一次
    pub fn init(&self) -> InfrastructureResult<()> {
        let span_events = if self.phase_timings {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_span_events(span_events)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match self.output {
            LogOutput::Json => subscriber.json().try_init(),
            LogOutput::Text => subscriber.try_init(),
        }
        .map_err(|error| InfrastructureError::LoggingInitFailed {
            message: error.to_string(),
        })?;

        debug!(filter = %self.filter, output = ?self.output, "日志系统初始化完成");
        Ok(())
    }
}
