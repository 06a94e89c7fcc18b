//! 实时通话辅导引擎：按固定节奏播放发言、评估规则并向展示层发出事件。

mod constants;
mod scheduler;
mod state;

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod source;
pub mod types;

pub use config::SessionConfig;
pub use error::{ScriptError, SessionError};
pub use lifecycle::{EndedPayload, SessionLifecyclePayload, SessionLifecycleUpdate};
pub use metrics::CallMetrics;
pub use source::{ScriptedFeed, ScriptedLine, SessionScript, UtteranceSource};
pub use types::{
    AlertLevel, CoachingRule, EndReason, ScriptSuggestionRule, SessionEvent, SessionState,
    SessionStatus, Speaker, Utterance,
};

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{info, warn};

use crate::assist::{AssistError, AssistKind, AssistOutcome, AssistRequester, CallSummary};
use crate::telemetry::events::{
    record_assist_outcome, record_coaching_alert, record_objection_detected,
    record_session_ended, record_session_started, SessionStartedEvent,
};

use self::scheduler::{spawn_ticker, TickerHandle};
use self::state::{SessionCore, StepOutcome};

const TARGET: &str = "live_session";

struct EngineShared {
    session_id: String,
    core: Mutex<SessionCore>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
}

impl EngineShared {
    /// 需在持有状态锁时调用，保证事件顺序与状态变更一致。
    fn emit(&self, state: &SessionState, events: Vec<SessionEvent>) {
        for event in events {
            match &event {
                SessionEvent::CoachingAlert {
                    trigger_index,
                    level,
                    ..
                } => record_coaching_alert(&self.session_id, *trigger_index, level.as_str()),
                SessionEvent::ObjectionDetected { .. } => {
                    if let Some(utterance) = state.transcript.last() {
                        record_objection_detected(
                            &self.session_id,
                            utterance.sequence_index,
                            utterance.sentiment_score,
                        );
                    }
                }
                SessionEvent::SessionEnded { reason } => {
                    let metrics = CallMetrics::from_transcript(&state.transcript);
                    record_session_ended(&self.session_id, reason.as_str(), &metrics);
                    self.emit_lifecycle(SessionLifecycleUpdate::ended(
                        &self.session_id,
                        *reason,
                        metrics,
                    ));
                }
                _ => {}
            }

            if self.events_tx.send(event).is_err() {
                warn!(
                    target: TARGET,
                    session_id = %self.session_id,
                    "session event receiver dropped"
                );
            }
        }
    }

    fn emit_lifecycle(&self, update: SessionLifecycleUpdate) {
        // 没有订阅者时 send 会失败，属于正常情况。
        let _ = self.lifecycle_tx.send(update);
    }

    /// 执行一次 tick；返回 false 表示调度应停止。
    async fn tick(&self, epoch: u64) -> bool {
        let mut core = self.core.lock().await;
        match core.step(epoch) {
            StepOutcome::Advanced(events) => {
                self.emit(core.state(), events);
                true
            }
            StepOutcome::Ended(events) => {
                info!(
                    target: TARGET,
                    session_id = %self.session_id,
                    "utterance feed exhausted"
                );
                self.emit(core.state(), events);
                false
            }
            StepOutcome::Halted => false,
        }
    }
}

/// 由调用方持有的会话引擎实例，每个实例同一时间只承载一通电话。
pub struct LiveSessionEngine {
    shared: Arc<EngineShared>,
    ticker: Mutex<Option<TickerHandle>>,
}

impl LiveSessionEngine {
    /// 创建引擎并返回事件接收端。事件通道无界，引擎不受消费速度影响。
    pub fn new<S: Into<String>>(session_id: S) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (lifecycle_tx, _) = broadcast::channel(16);
        let shared = Arc::new(EngineShared {
            session_id: session_id.into(),
            core: Mutex::new(SessionCore::new()),
            events_tx,
            lifecycle_tx,
        });

        (
            Self {
                shared,
                ticker: Mutex::new(None),
            },
            events_rx,
        )
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<SessionLifecycleUpdate> {
        self.shared.lifecycle_tx.subscribe()
    }

    pub async fn start_session(&self, config: SessionConfig) -> Result<(), SessionError> {
        let tick_interval = config.tick_interval;
        let started = SessionStartedEvent {
            session_id: &self.shared.session_id,
            utterances: config.utterances.len(),
            coaching_rules: config.coaching_rules.len(),
            suggestion_rules: config.suggestion_rules.len(),
            objection_threshold: config.objection_threshold,
            tick_interval_ms: tick_interval.as_millis().min(u64::MAX as u128) as u64,
        };

        // 调度槽只在持有状态锁时替换，并发的 end_session 不会误停新会话的 ticker。
        let mut core = self.shared.core.lock().await;
        let (epoch, events) = match core.begin(config) {
            Ok(begun) => begun,
            Err(err) => {
                warn!(
                    target: TARGET,
                    session_id = %self.shared.session_id,
                    %err,
                    "refused to start session"
                );
                return Err(err);
            }
        };
        record_session_started(started);
        self.shared
            .emit_lifecycle(SessionLifecycleUpdate::active(&self.shared.session_id));
        self.shared.emit(core.state(), events);

        let shared = Arc::clone(&self.shared);
        let ticker = spawn_ticker(tick_interval, move || {
            let shared = Arc::clone(&shared);
            async move { shared.tick(epoch).await }
        });

        if let Some(previous) = self.ticker.lock().await.replace(ticker) {
            previous.cancel();
        }

        Ok(())
    }

    /// 结束会话并停止调度；重复调用为空操作。
    pub async fn end_session(&self) {
        let mut core = self.shared.core.lock().await;
        if let Some(events) = core.end(EndReason::Cancelled) {
            info!(
                target: TARGET,
                session_id = %self.shared.session_id,
                "session ended by caller"
            );
            self.shared.emit(core.state(), events);
        }

        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel();
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.shared.core.lock().await.state().clone()
    }

    pub async fn metrics(&self) -> CallMetrics {
        let core = self.shared.core.lock().await;
        CallMetrics::from_transcript(&core.state().transcript)
    }

    /// 针对最近一次异议请求应对建议。请求期间不持有状态锁，tick 照常推进。
    pub async fn request_objection_tips(
        &self,
        requester: &dyn AssistRequester,
    ) -> Result<Vec<String>, SessionError> {
        let (epoch, snippet) = self.shared.core.lock().await.begin_objection_assist()?;
        let guard = AssistGuard::new(&self.shared, epoch, AssistKind::ObjectionTips);
        let started = Instant::now();
        let result = requester.request_objection_tips(&snippet).await;

        self.finish_assist(guard, started, &result, |tips| {
            AssistOutcome::ObjectionTips {
                snippet,
                suggestions: tips.clone(),
            }
        })
        .await;

        result.map_err(SessionError::from)
    }

    /// 基于当前转写的副本请求通话总结，进行中或已结束的会话均可。
    pub async fn request_call_summary(
        &self,
        requester: &dyn AssistRequester,
    ) -> Result<CallSummary, SessionError> {
        let (epoch, transcript) = self.shared.core.lock().await.begin_summary_assist()?;
        let guard = AssistGuard::new(&self.shared, epoch, AssistKind::CallSummary);
        let started = Instant::now();
        let result = requester.request_call_summary(&transcript).await;

        self.finish_assist(guard, started, &result, |summary| {
            AssistOutcome::CallSummary(summary.clone())
        })
        .await;

        result.map_err(SessionError::from)
    }

    async fn finish_assist<T, F>(
        &self,
        mut guard: AssistGuard,
        started: Instant,
        result: &Result<T, AssistError>,
        outcome: F,
    ) where
        F: FnOnce(&T) -> AssistOutcome,
    {
        let (epoch, kind) = (guard.epoch, guard.kind);
        let error_kind = result.as_ref().err().map(|err| err.kind().as_str());
        record_assist_outcome(
            &self.shared.session_id,
            kind.as_str(),
            error_kind,
            started.elapsed(),
        );

        let mut core = self.shared.core.lock().await;
        guard.disarm();
        if !core.complete_assist(epoch) {
            warn!(
                target: TARGET,
                session_id = %self.shared.session_id,
                kind = kind.as_str(),
                "assist completed after its session was replaced"
            );
        }

        let event = match result {
            Ok(value) => SessionEvent::AssistSucceeded(outcome(value)),
            Err(err) => SessionEvent::AssistFailed {
                kind: err.kind(),
                error: err.to_string(),
            },
        };
        self.shared.emit(core.state(), vec![event]);
    }
}

/// 请求 future 在完成前被丢弃（超时、select 或任务中止）时复位进行中标记，
/// 否则该会话后续的辅助请求与异议检测都会被永久挡住。
struct AssistGuard {
    shared: Option<Arc<EngineShared>>,
    epoch: u64,
    kind: AssistKind,
}

impl AssistGuard {
    fn new(shared: &Arc<EngineShared>, epoch: u64, kind: AssistKind) -> Self {
        Self {
            shared: Some(Arc::clone(shared)),
            epoch,
            kind,
        }
    }

    fn disarm(&mut self) {
        self.shared = None;
    }
}

impl Drop for AssistGuard {
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        warn!(
            target: TARGET,
            session_id = %shared.session_id,
            kind = self.kind.as_str(),
            "assist request dropped before completion"
        );

        let epoch = self.epoch;
        if let Ok(mut core) = shared.core.try_lock() {
            core.complete_assist(epoch);
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                shared.core.lock().await.complete_assist(epoch);
            });
        }
    }
}
