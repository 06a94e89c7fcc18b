use std::path::PathBuf;

use thiserror::Error;

use crate::assist::AssistError;
use crate::session::types::SessionStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session state ({}): {reason}", status.as_str())]
    InvalidState {
        status: SessionStatus,
        reason: &'static str,
    },
    #[error("invalid session config: {reason}")]
    InvalidConfig { reason: String },
    #[error("assist request failed: {0}")]
    Assist(#[from] AssistError),
}

impl SessionError {
    pub(crate) fn invalid_state(status: SessionStatus, reason: &'static str) -> Self {
        Self::InvalidState { status, reason }
    }

    pub(crate) fn invalid_config<S: Into<String>>(reason: S) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// 加载通话脚本时的错误。
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read session script {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse session script: {0}")]
    Parse(#[from] serde_json::Error),
}
