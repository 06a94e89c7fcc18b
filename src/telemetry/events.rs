use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::session::CallMetrics;

pub(crate) const TARGET: &str = "telemetry::live_session";
pub(crate) const EVENT_SESSION_STARTED: &str = "session_started";
pub(crate) const EVENT_COACHING_ALERT: &str = "coaching_alert";
pub(crate) const EVENT_OBJECTION: &str = "objection_detected";
pub(crate) const EVENT_ASSIST: &str = "assist_outcome";
pub(crate) const EVENT_SESSION_ENDED: &str = "session_ended";

#[derive(Debug, Serialize)]
pub struct SessionStartedEvent<'a> {
    pub session_id: &'a str,
    pub utterances: usize,
    pub coaching_rules: usize,
    pub suggestion_rules: usize,
    pub objection_threshold: f64,
    pub tick_interval_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct CoachingAlertEvent<'a> {
    pub session_id: &'a str,
    pub trigger_index: u64,
    pub level: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ObjectionDetectedEvent<'a> {
    pub session_id: &'a str,
    pub sequence_index: u64,
    pub sentiment_score: f64,
}

#[derive(Debug, Serialize)]
pub struct AssistOutcomeEvent<'a> {
    pub session_id: &'a str,
    pub kind: &'static str,
    pub success: bool,
    pub error_kind: Option<&'static str>,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionEndedEvent<'a> {
    pub session_id: &'a str,
    pub reason: &'static str,
    pub metrics: &'a CallMetrics,
}

pub fn record_session_started(event: SessionStartedEvent<'_>) {
    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_SESSION_STARTED,
            session_id = event.session_id,
            utterances = event.utterances,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_SESSION_STARTED,
            %err,
            "failed to encode session started event"
        ),
    }
}

pub fn record_coaching_alert(session_id: &str, trigger_index: u64, level: &'static str) {
    let event = CoachingAlertEvent {
        session_id,
        trigger_index,
        level,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_COACHING_ALERT,
            session_id,
            trigger_index,
            level,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_COACHING_ALERT,
            %err,
            "failed to encode coaching alert event"
        ),
    }
}

pub fn record_objection_detected(session_id: &str, sequence_index: u64, sentiment_score: f64) {
    let event = ObjectionDetectedEvent {
        session_id,
        sequence_index,
        sentiment_score,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_OBJECTION,
            session_id,
            sequence_index,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_OBJECTION,
            %err,
            "failed to encode objection event"
        ),
    }
}

pub fn record_assist_outcome(
    session_id: &str,
    kind: &'static str,
    error_kind: Option<&'static str>,
    latency: Duration,
) {
    let event = AssistOutcomeEvent {
        session_id,
        kind,
        success: error_kind.is_none(),
        error_kind,
        latency_ms: duration_to_ms(latency),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_ASSIST,
            session_id,
            kind,
            success = event.success,
            latency_ms = event.latency_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_ASSIST,
            %err,
            "failed to encode assist outcome event"
        ),
    }
}

pub fn record_session_ended(session_id: &str, reason: &'static str, metrics: &CallMetrics) {
    let event = SessionEndedEvent {
        session_id,
        reason,
        metrics,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_SESSION_ENDED,
            session_id,
            reason,
            turns = metrics.turns,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_SESSION_ENDED,
            %err,
            "failed to encode session ended event"
        ),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
