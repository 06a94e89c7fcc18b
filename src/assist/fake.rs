use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::assist::error::AssistError;
use crate::assist::types::CallSummary;
use crate::assist::AssistRequester;
use crate::session::{Speaker, Utterance};

/// 本地脚本化的辅助服务；队列耗尽后返回基于输入生成的固定回复。
#[derive(Debug, Default)]
pub struct FakeAssistRequester {
    tips: Mutex<VecDeque<Result<Vec<String>, AssistError>>>,
    summaries: Mutex<VecDeque<Result<CallSummary, AssistError>>>,
    snippets: Mutex<Vec<String>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl FakeAssistRequester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_tips(self, outcomes: Vec<Result<Vec<String>, AssistError>>) -> Self {
        Self {
            tips: Mutex::new(outcomes.into()),
            ..self
        }
    }

    pub fn with_summaries(self, outcomes: Vec<Result<CallSummary, AssistError>>) -> Self {
        Self {
            summaries: Mutex::new(outcomes.into()),
            ..self
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn snippets(&self) -> Vec<String> {
        self.snippets.lock().await.clone()
    }

    async fn simulate_latency(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
    }
}

fn canned_tips(snippet: &str) -> Vec<String> {
    vec![
        format!("Acknowledge the concern directly: \"{snippet}\""),
        "Restate the value the customer is getting before discussing price or timing.".to_string(),
        "Offer a concrete next step and confirm it works for them.".to_string(),
    ]
}

fn canned_summary(transcript: &[Utterance]) -> CallSummary {
    let customer_turns = transcript
        .iter()
        .filter(|utterance| utterance.speaker == Speaker::Customer)
        .count();
    let opening = transcript
        .iter()
        .find(|utterance| utterance.speaker == Speaker::Customer)
        .map(|utterance| utterance.text.as_str())
        .unwrap_or("no customer statement");

    CallSummary {
        summary: format!(
            "Call with {} turns ({customer_turns} from the customer). Customer opened with: {opening}",
            transcript.len()
        ),
        action_items: vec!["Follow up with the customer within 24 hours.".to_string()],
    }
}

#[async_trait]
impl AssistRequester for FakeAssistRequester {
    async fn request_objection_tips(&self, snippet: &str) -> Result<Vec<String>, AssistError> {
        self.snippets.lock().await.push(snippet.to_string());
        self.simulate_latency().await;
        match self.tips.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => Ok(canned_tips(snippet)),
        }
    }

    async fn request_call_summary(
        &self,
        transcript: &[Utterance],
    ) -> Result<CallSummary, AssistError> {
        self.simulate_latency().await;
        match self.summaries.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => Ok(canned_summary(transcript)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_scripted_outcomes_then_falls_back() {
        let fake = FakeAssistRequester::new().with_tips(vec![
            Err(AssistError::transport("offline")),
            Ok(vec!["scripted".to_string()]),
        ]);

        assert!(fake.request_objection_tips("first").await.is_err());
        assert_eq!(
            fake.request_objection_tips("second").await.expect("scripted"),
            vec!["scripted".to_string()]
        );
        let fallback = fake.request_objection_tips("third").await.expect("canned");

        assert_eq!(fallback.len(), 3);
        assert!(fallback[0].contains("third"));
        assert_eq!(fake.calls(), 3);
        assert_eq!(fake.snippets().await, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn canned_summary_mentions_customer_opening() {
        let fake = FakeAssistRequester::new();
        let transcript = vec![
            Utterance::new(0, Speaker::Agent, "Hello", 5.0),
            Utterance::new(1, Speaker::Customer, "My invoice is high", 3.0),
        ];

        let summary = fake
            .request_call_summary(&transcript)
            .await
            .expect("canned summary");

        assert!(summary.summary.contains("My invoice is high"));
        assert_eq!(summary.action_items.len(), 1);
    }
}
