use serde::{Deserialize, Serialize};

/// 通话总结及后续行动项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSummary {
    pub summary: String,
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistKind {
    ObjectionTips,
    CallSummary,
}

impl AssistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistKind::ObjectionTips => "objection_tips",
            AssistKind::CallSummary => "call_summary",
        }
    }
}

/// 辅助请求成功后合并回会话的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutcome {
    ObjectionTips {
        snippet: String,
        suggestions: Vec<String>,
    },
    CallSummary(CallSummary),
}

impl AssistOutcome {
    pub fn kind(&self) -> AssistKind {
        match self {
            AssistOutcome::ObjectionTips { .. } => AssistKind::ObjectionTips,
            AssistOutcome::CallSummary(_) => AssistKind::CallSummary,
        }
    }
}
