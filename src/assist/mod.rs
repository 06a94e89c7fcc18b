//! 生成式辅助服务：异议应对建议与通话总结。

mod fake;
mod prompt;
mod remote;

pub mod config;
pub mod error;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::session::Utterance;

pub use config::{AssistConfig, AssistMode};
pub use error::{AssistError, AssistErrorKind};
pub use fake::FakeAssistRequester;
pub use remote::RemoteAssistRequester;
pub use types::{AssistKind, AssistOutcome, CallSummary};

/// 辅助服务能力。调用方负责避免同一会话的并发请求。
#[async_trait]
pub trait AssistRequester: Send + Sync {
    async fn request_objection_tips(&self, snippet: &str) -> Result<Vec<String>, AssistError>;

    async fn request_call_summary(
        &self,
        transcript: &[Utterance],
    ) -> Result<CallSummary, AssistError>;
}

/// 按配置选择实现。
pub fn build_requester(config: &AssistConfig) -> Arc<dyn AssistRequester> {
    info!(
        target: "assist_requester",
        mode = ?config.mode,
        "initialising assist requester"
    );
    match config.mode {
        AssistMode::Remote => Arc::new(RemoteAssistRequester::new(config.clone())),
        AssistMode::Fake => Arc::new(FakeAssistRequester::new()),
    }
}
