use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssistError {
    #[error("assist transport failed: {reason}")]
    Transport { reason: String },
    #[error("assist service returned an invalid response: {reason}")]
    InvalidResponse { reason: String },
    #[error("assist request timed out after {after:?}")]
    Timeout { after: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistErrorKind {
    Transport,
    InvalidResponse,
    Timeout,
}

impl AssistErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistErrorKind::Transport => "transport",
            AssistErrorKind::InvalidResponse => "invalid_response",
            AssistErrorKind::Timeout => "timeout",
        }
    }
}

impl AssistError {
    pub fn transport<S: Into<String>>(reason: S) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn invalid_response<S: Into<String>>(reason: S) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> AssistErrorKind {
        match self {
            AssistError::Transport { .. } => AssistErrorKind::Transport,
            AssistError::InvalidResponse { .. } => AssistErrorKind::InvalidResponse,
            AssistError::Timeout { .. } => AssistErrorKind::Timeout,
        }
    }
}
