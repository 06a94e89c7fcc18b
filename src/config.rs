//! 进程级配置，全部来自 `CALLCOACH_*` 环境变量。

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::assist::AssistConfig;
use crate::session::SessionConfig;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// 通话脚本路径；缺省时使用内置演示通话。
    pub script_path: Option<PathBuf>,
    pub tick_interval: Option<Duration>,
    pub objection_threshold: Option<f64>,
    /// 检测到异议时自动请求应对建议。
    pub auto_assist: bool,
    /// 通话结束后请求总结。
    pub summarize_on_end: bool,
    pub assist: AssistConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let threshold = env_string("CALLCOACH_OBJECTION_THRESHOLD")
            .map(|raw| {
                raw.parse::<f64>()
                    .with_context(|| format!("invalid CALLCOACH_OBJECTION_THRESHOLD: {raw}"))
            })
            .transpose()?;

        Ok(Self {
            script_path: env_string("CALLCOACH_SCRIPT").map(PathBuf::from),
            tick_interval: env_duration_ms("CALLCOACH_TICK_MS")?,
            objection_threshold: threshold,
            auto_assist: env_flag("CALLCOACH_AUTO_ASSIST").unwrap_or(false),
            summarize_on_end: env_flag("CALLCOACH_SUMMARY").unwrap_or(false),
            assist: AssistConfig::from_env()?,
        })
    }

    /// 用环境覆盖项调整脚本给出的会话配置。
    pub fn apply(&self, mut session: SessionConfig) -> SessionConfig {
        if let Some(interval) = self.tick_interval {
            session.tick_interval = interval;
        }
        if let Some(threshold) = self.objection_threshold {
            session.objection_threshold = threshold;
        }
        session
    }
}

pub(crate) fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn env_flag(name: &str) -> Option<bool> {
    env_string(name).map(|value| parse_flag(&value))
}

pub(crate) fn env_duration_ms(name: &str) -> Result<Option<Duration>> {
    env_string(name)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|err| anyhow!("invalid {name}: {raw} ({err})"))
        })
        .transpose()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
