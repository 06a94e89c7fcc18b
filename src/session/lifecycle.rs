//! 会话生命周期广播负载定义。

use std::time::SystemTime;

use crate::session::metrics::CallMetrics;
use crate::session::types::{EndReason, SessionStatus};

/// 生命周期事件的附加信息。
#[derive(Debug, Clone, Default)]
pub enum SessionLifecyclePayload {
    #[default]
    None,
    Ended(EndedPayload),
}

/// 结束阶段的原因与通话指标。
#[derive(Debug, Clone)]
pub struct EndedPayload {
    pub reason: EndReason,
    pub metrics: CallMetrics,
}

/// 生命周期事件。
#[derive(Debug, Clone)]
pub struct SessionLifecycleUpdate {
    pub session_id: String,
    pub phase: SessionStatus,
    pub issued_at: SystemTime,
    pub payload: SessionLifecyclePayload,
}

impl SessionLifecycleUpdate {
    /// 构造一个空载荷的事件。
    pub fn new<S: Into<String>>(session_id: S, phase: SessionStatus) -> Self {
        Self {
            session_id: session_id.into(),
            phase,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::None,
        }
    }

    pub fn active<S: Into<String>>(session_id: S) -> Self {
        Self::new(session_id, SessionStatus::Active)
    }

    /// 声明会话结束并携带指标。
    pub fn ended<S: Into<String>>(session_id: S, reason: EndReason, metrics: CallMetrics) -> Self {
        Self {
            session_id: session_id.into(),
            phase: SessionStatus::Ended,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::Ended(EndedPayload { reason, metrics }),
        }
    }
}
