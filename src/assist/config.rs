use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::config::{env_duration_ms, env_string};

pub(crate) const DEFAULT_ASSIST_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
pub(crate) const DEFAULT_ASSIST_TIMEOUT: Duration = Duration::from_secs(8);

/// 选择辅助服务的实现。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssistMode {
    #[default]
    Remote,
    Fake,
}

impl AssistMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(AssistMode::Remote),
            "fake" | "mock" => Ok(AssistMode::Fake),
            other => Err(anyhow!("unknown assist mode: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct AssistConfig {
    pub mode: AssistMode,
    pub endpoint: String,
    pub api_key: Option<String>,
    /// 单次请求的总时限。
    pub timeout: Duration,
}

impl std::fmt::Debug for AssistConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistConfig")
            .field("mode", &self.mode)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            mode: AssistMode::default(),
            endpoint: DEFAULT_ASSIST_ENDPOINT.to_string(),
            api_key: None,
            timeout: DEFAULT_ASSIST_TIMEOUT,
        }
    }
}

impl AssistConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(mode) = env_string("CALLCOACH_ASSIST_MODE") {
            config.mode = AssistMode::parse(&mode)?;
        }
        if let Some(endpoint) = env_string("CALLCOACH_ASSIST_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.api_key = env_string("CALLCOACH_ASSIST_API_KEY");
        if let Some(timeout) = env_duration_ms("CALLCOACH_ASSIST_TIMEOUT_MS")? {
            if timeout.is_zero() {
                return Err(anyhow!("CALLCOACH_ASSIST_TIMEOUT_MS must be positive"));
            }
            config.timeout = timeout;
        }

        Ok(config)
    }
}
