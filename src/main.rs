use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use callcoach_core::session::{SessionEvent, SessionScript};
use callcoach_core::telemetry::init_tracing;
use callcoach_core::{build_requester, AppConfig, LiveSessionEngine};
use tracing::{info, warn};

const TARGET: &str = "callcoach";

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing()?;
    let config = AppConfig::from_env()?;

    let script = match &config.script_path {
        Some(path) => SessionScript::load(path)
            .with_context(|| format!("failed to load call script {}", path.display()))?,
        None => SessionScript::demo(),
    };
    let session_config = config.apply(script.into_config());
    let requester = build_requester(&config.assist);

    let started_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let (engine, mut events) = LiveSessionEngine::new(format!("call-{started_ms}"));
    engine.start_session(session_config).await?;
    info!(
        target: TARGET,
        session_id = engine.session_id(),
        mode = ?config.assist.mode,
        "live session started"
    );

    while let Some(event) = events.recv().await {
        match &event {
            SessionEvent::UtteranceAppended(utterance) => info!(
                target: TARGET,
                index = utterance.sequence_index,
                speaker = utterance.speaker.as_str(),
                sentiment = utterance.sentiment_score,
                "{}",
                utterance.text
            ),
            SessionEvent::CoachingAlert { level, message, .. } => {
                info!(target: TARGET, level = level.as_str(), "coaching: {message}")
            }
            SessionEvent::ScriptSuggestion { text, .. } => {
                info!(target: TARGET, "suggested script: {text}")
            }
            SessionEvent::ObjectionDetected { snippet } => {
                info!(target: TARGET, %snippet, "objection detected");
                if config.auto_assist {
                    match engine.request_objection_tips(requester.as_ref()).await {
                        Ok(tips) => {
                            for tip in tips {
                                info!(target: TARGET, "tip: {tip}");
                            }
                        }
                        Err(err) => warn!(target: TARGET, %err, "objection tips unavailable"),
                    }
                }
            }
            SessionEvent::AssistSucceeded(_) | SessionEvent::AssistFailed { .. } => {}
            SessionEvent::SessionEnded { reason } => {
                info!(target: TARGET, reason = reason.as_str(), "live session ended");
                break;
            }
        }
    }

    info!(target: TARGET, metrics = ?engine.metrics().await, "call metrics");

    if config.summarize_on_end {
        match engine.request_call_summary(requester.as_ref()).await {
            Ok(summary) => {
                info!(target: TARGET, "summary: {}", summary.summary);
                for item in summary.action_items {
                    info!(target: TARGET, "action item: {item}");
                }
            }
            Err(err) => warn!(target: TARGET, %err, "call summary unavailable"),
        }
    }

    Ok(())
}
