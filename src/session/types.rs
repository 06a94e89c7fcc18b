use serde::{Deserialize, Serialize};

use crate::assist::{AssistErrorKind, AssistOutcome};

/// 通话中的发言方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Agent,
    Customer,
    System,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Agent => "Agent",
            Speaker::Customer => "Customer",
            Speaker::System => "System",
        }
    }
}

/// 一次发言及其情绪评分，产生后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub sequence_index: u64,
    pub speaker: Speaker,
    pub text: String,
    /// 取值范围 `[0, 10]`，越低越负面。
    pub sentiment_score: f64,
}

impl Utterance {
    pub fn new<S: Into<String>>(
        sequence_index: u64,
        speaker: Speaker,
        text: S,
        sentiment_score: f64,
    ) -> Self {
        Self {
            sequence_index,
            speaker,
            text: text.into(),
            sentiment_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }
}

/// 会话状态快照，仅由引擎修改。
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub transcript: Vec<Utterance>,
    pub sentiment_series: Vec<f64>,
    pub last_objection: Option<String>,
    pub pending_assist: bool,
    /// 异议提示是否已经抛出；直到一次辅助请求完成或会话结束才会复位。
    pub objection_offered: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            transcript: Vec::new(),
            sentiment_series: Vec::new(),
            last_objection: None,
            pending_assist: false,
            objection_offered: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
        }
    }
}

/// 按发言序号触发的辅导提醒。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingRule {
    pub trigger_index: u64,
    pub message: String,
    #[serde(default)]
    pub level: AlertLevel,
}

/// 按发言序号触发的话术建议。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSuggestionRule {
    pub trigger_index: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// 发言序列播放完毕。
    Exhausted,
    /// 外部调用 `end_session`。
    Cancelled,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Exhausted => "exhausted",
            EndReason::Cancelled => "cancelled",
        }
    }
}

/// 引擎向展示层发出的事件，严格按产生顺序投递。
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    UtteranceAppended(Utterance),
    CoachingAlert {
        trigger_index: u64,
        level: AlertLevel,
        message: String,
    },
    /// 序号 0 的建议会出现两次：开始时一次，第一次 tick 时再一次。
    /// 展示层可按 `trigger_index` 去重。
    ScriptSuggestion {
        trigger_index: u64,
        text: String,
    },
    ObjectionDetected {
        snippet: String,
    },
    AssistSucceeded(AssistOutcome),
    AssistFailed {
        kind: AssistErrorKind,
        error: String,
    },
    SessionEnded {
        reason: EndReason,
    },
}
