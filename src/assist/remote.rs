use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::assist::config::AssistConfig;
use crate::assist::error::AssistError;
use crate::assist::prompt::{
    objection_request, parse_call_summary, parse_objection_tips, summary_request,
    GenerateContentRequest,
};
use crate::assist::types::{AssistKind, CallSummary};
use crate::assist::AssistRequester;
use crate::session::Utterance;

const TARGET: &str = "assist_requester";
/// 阻塞线程的底层超时略长于整体时限，保证 Timeout 优先由上层报告。
/// 上层超时后阻塞调用只是被放弃而非中止，最迟在该时限内由 ureq 自行结束。
const AGENT_TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// 通过 HTTP 调用生成式文本服务，每次调用恰好一次请求，不重试。
pub struct RemoteAssistRequester {
    config: AssistConfig,
    agent: ureq::Agent,
}

impl std::fmt::Debug for RemoteAssistRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAssistRequester")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RemoteAssistRequester {
    pub fn new(config: AssistConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout + AGENT_TIMEOUT_GRACE)
            .build();
        Self { config, agent }
    }

    pub fn config(&self) -> &AssistConfig {
        &self.config
    }

    async fn post(
        &self,
        kind: AssistKind,
        request: GenerateContentRequest,
    ) -> Result<String, AssistError> {
        let body = serde_json::to_string(&request)
            .map_err(|err| AssistError::transport(format!("failed to encode request: {err}")))?;
        let agent = self.agent.clone();
        let endpoint = self.config.endpoint.clone();
        let api_key = self.config.api_key.clone();
        let started = Instant::now();

        info!(
            target: TARGET,
            kind = kind.as_str(),
            endpoint = %endpoint,
            "sending assist request"
        );

        let call = tokio::task::spawn_blocking(move || {
            send_blocking(&agent, &endpoint, api_key.as_deref(), &body)
        });

        let result = match timeout(self.config.timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(AssistError::transport(format!(
                "assist worker terminated: {err}"
            ))),
            Err(_) => Err(AssistError::Timeout {
                after: self.config.timeout,
            }),
        };

        if let Err(err) = &result {
            warn!(
                target: TARGET,
                kind = kind.as_str(),
                elapsed = ?started.elapsed(),
                %err,
                "assist request failed"
            );
        }

        result
    }
}

fn send_blocking(
    agent: &ureq::Agent,
    endpoint: &str,
    api_key: Option<&str>,
    body: &str,
) -> Result<String, AssistError> {
    let mut request = agent
        .post(endpoint)
        .set("Content-Type", "application/json");
    if let Some(key) = api_key {
        request = request.query("key", key);
    }

    match request.send_string(body) {
        Ok(response) => response
            .into_string()
            .map_err(|err| AssistError::transport(format!("failed to read response body: {err}"))),
        Err(ureq::Error::Status(code, response)) => {
            let detail = response.into_string().unwrap_or_default();
            Err(AssistError::transport(format!(
                "received HTTP status {code}: {}",
                detail.trim()
            )))
        }
        Err(ureq::Error::Transport(err)) => Err(AssistError::transport(err.to_string())),
    }
}

#[async_trait]
impl AssistRequester for RemoteAssistRequester {
    async fn request_objection_tips(&self, snippet: &str) -> Result<Vec<String>, AssistError> {
        let body = self
            .post(AssistKind::ObjectionTips, objection_request(snippet))
            .await?;
        parse_objection_tips(&body)
    }

    async fn request_call_summary(
        &self,
        transcript: &[Utterance],
    ) -> Result<CallSummary, AssistError> {
        let body = self
            .post(AssistKind::CallSummary, summary_request(transcript))
            .await?;
        parse_call_summary(&body)
    }
}
