use crate::session::config::SessionConfig;
use crate::session::constants::{CALL_ENDED_TEXT, NEUTRAL_SENTIMENT};
use crate::session::error::SessionError;
use crate::session::types::{
    EndReason, SessionEvent, SessionState, SessionStatus, Speaker, Utterance,
};

pub(crate) enum StepOutcome {
    Advanced(Vec<SessionEvent>),
    Ended(Vec<SessionEvent>),
    /// 会话已结束或已被新会话替换，调度应停止。
    Halted,
}

/// 单次通话的同步状态机，所有修改都经由这里。
pub(crate) struct SessionCore {
    epoch: u64,
    cursor: usize,
    config: Option<SessionConfig>,
    state: SessionState,
}

impl SessionCore {
    pub(crate) fn new() -> Self {
        Self {
            epoch: 0,
            cursor: 0,
            config: None,
            state: SessionState::default(),
        }
    }

    pub(crate) fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// 启动新会话，返回调度所需的 epoch 和初始事件。
    pub(crate) fn begin(
        &mut self,
        config: SessionConfig,
    ) -> Result<(u64, Vec<SessionEvent>), SessionError> {
        if self.state.status == SessionStatus::Active {
            return Err(SessionError::invalid_state(
                self.state.status,
                "a session is already active",
            ));
        }
        config.validate()?;

        let events = config
            .suggestion_rules
            .iter()
            .filter(|rule| rule.trigger_index == 0)
            .map(|rule| SessionEvent::ScriptSuggestion {
                trigger_index: rule.trigger_index,
                text: rule.text.clone(),
            })
            .collect();

        self.epoch = self.epoch.wrapping_add(1);
        self.cursor = 0;
        self.config = Some(config);
        self.state = SessionState {
            status: SessionStatus::Active,
            ..SessionState::default()
        };

        Ok((self.epoch, events))
    }

    pub(crate) fn step(&mut self, epoch: u64) -> StepOutcome {
        if epoch != self.epoch || self.state.status != SessionStatus::Active {
            return StepOutcome::Halted;
        }

        let next = match self.config.as_ref() {
            Some(config) => config.utterances.get(self.cursor).cloned(),
            None => return StepOutcome::Halted,
        };

        let Some(utterance) = next else {
            return match self.end(EndReason::Exhausted) {
                Some(events) => StepOutcome::Ended(events),
                None => StepOutcome::Halted,
            };
        };

        let Some(config) = self.config.as_ref() else {
            return StepOutcome::Halted;
        };

        let index = self.cursor as u64;
        let mut events = Vec::new();

        self.state.transcript.push(utterance.clone());
        self.state.sentiment_series.push(utterance.sentiment_score);
        events.push(SessionEvent::UtteranceAppended(utterance.clone()));

        for rule in config
            .coaching_rules
            .iter()
            .filter(|rule| rule.trigger_index == index)
        {
            events.push(SessionEvent::CoachingAlert {
                trigger_index: index,
                level: rule.level,
                message: rule.message.clone(),
            });
        }

        for rule in config
            .suggestion_rules
            .iter()
            .filter(|rule| rule.trigger_index == index)
        {
            events.push(SessionEvent::ScriptSuggestion {
                trigger_index: index,
                text: rule.text.clone(),
            });
        }

        if utterance.speaker == Speaker::Customer
            && utterance.sentiment_score <= config.objection_threshold
            && !self.state.pending_assist
            && !self.state.objection_offered
        {
            self.state.objection_offered = true;
            self.state.last_objection = Some(utterance.text.clone());
            events.push(SessionEvent::ObjectionDetected {
                snippet: utterance.text,
            });
        }

        self.cursor += 1;
        StepOutcome::Advanced(events)
    }

    /// 结束会话；非 Active 状态下为空操作。
    pub(crate) fn end(&mut self, reason: EndReason) -> Option<Vec<SessionEvent>> {
        if self.state.status != SessionStatus::Active {
            return None;
        }

        let carried = self
            .state
            .sentiment_series
            .last()
            .copied()
            .unwrap_or(NEUTRAL_SENTIMENT);
        let closing = Utterance::new(
            self.state.transcript.len() as u64,
            Speaker::System,
            CALL_ENDED_TEXT,
            carried,
        );

        self.state.status = SessionStatus::Ended;
        self.state.objection_offered = false;
        self.state.transcript.push(closing.clone());
        self.state.sentiment_series.push(carried);

        Some(vec![
            SessionEvent::UtteranceAppended(closing),
            SessionEvent::SessionEnded { reason },
        ])
    }

    pub(crate) fn begin_objection_assist(&mut self) -> Result<(u64, String), SessionError> {
        self.ensure_no_pending_assist()?;
        let snippet = self.state.last_objection.clone().ok_or_else(|| {
            SessionError::invalid_state(self.state.status, "no objection has been detected")
        })?;
        self.state.pending_assist = true;
        Ok((self.epoch, snippet))
    }

    pub(crate) fn begin_summary_assist(&mut self) -> Result<(u64, Vec<Utterance>), SessionError> {
        self.ensure_no_pending_assist()?;
        if self.state.transcript.is_empty() {
            return Err(SessionError::invalid_state(
                self.state.status,
                "transcript is empty",
            ));
        }
        self.state.pending_assist = true;
        Ok((self.epoch, self.state.transcript.clone()))
    }

    /// 辅助请求结束（无论成败）后复位标记；会话已被替换时返回 false。
    pub(crate) fn complete_assist(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.state.pending_assist = false;
        self.state.objection_offered = false;
        true
    }

    fn ensure_no_pending_assist(&self) -> Result<(), SessionError> {
        if self.state.status == SessionStatus::Idle {
            return Err(SessionError::invalid_state(
                self.state.status,
                "no session has been started",
            ));
        }
        if self.state.pending_assist {
            return Err(SessionError::invalid_state(
                self.state.status,
                "an assist request is already in flight",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{AlertLevel, CoachingRule, ScriptSuggestionRule};

    fn feed(entries: &[(Speaker, &str, f64)]) -> Vec<Utterance> {
        entries
            .iter()
            .enumerate()
            .map(|(index, (speaker, text, score))| {
                Utterance::new(index as u64, *speaker, *text, *score)
            })
            .collect()
    }

    fn drain(core: &mut SessionCore, epoch: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match core.step(epoch) {
                StepOutcome::Advanced(batch) => events.extend(batch),
                StepOutcome::Ended(batch) => {
                    events.extend(batch);
                    break;
                }
                StepOutcome::Halted => break,
            }
            assert_eq!(
                core.state().transcript.len(),
                core.state().sentiment_series.len()
            );
        }
        events
    }

    fn objections(events: &[SessionEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::ObjectionDetected { snippet } => Some(snippet.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn no_objection_above_threshold() {
        let mut core = SessionCore::new();
        let config = SessionConfig::new(feed(&[(Speaker::Customer, "ok", 5.0)]))
            .with_objection_threshold(3.0);
        let (epoch, _) = core.begin(config).expect("session starts");

        let events = drain(&mut core, epoch);

        assert!(objections(&events).is_empty());
        assert_eq!(core.state().last_objection, None);
    }

    #[test]
    fn objection_fires_once_per_session() {
        let mut core = SessionCore::new();
        let config = SessionConfig::new(feed(&[
            (Speaker::Customer, "slow down", 2.0),
            (Speaker::Agent, "sorry", 5.0),
            (Speaker::Customer, "slow down", 2.0),
        ]))
        .with_objection_threshold(3.0);
        let (epoch, _) = core.begin(config).expect("session starts");

        let events = drain(&mut core, epoch);

        assert_eq!(objections(&events), vec!["slow down".to_string()]);
        assert_eq!(core.state().last_objection.as_deref(), Some("slow down"));
    }

    #[test]
    fn agent_low_sentiment_is_not_an_objection() {
        let mut core = SessionCore::new();
        let config = SessionConfig::new(feed(&[(Speaker::Agent, "ugh", 1.0)]));
        let (epoch, _) = core.begin(config).expect("session starts");

        assert!(objections(&drain(&mut core, epoch)).is_empty());
    }

    #[test]
    fn objection_rearms_after_assist_completes() {
        let mut core = SessionCore::new();
        let config = SessionConfig::new(feed(&[
            (Speaker::Customer, "too expensive", 2.0),
            (Speaker::Customer, "still too expensive", 1.0),
        ]));
        let (epoch, _) = core.begin(config).expect("session starts");

        let first = match core.step(epoch) {
            StepOutcome::Advanced(events) => events,
            _ => panic!("first step should advance"),
        };
        assert_eq!(objections(&first).len(), 1);

        let (assist_epoch, snippet) = core.begin_objection_assist().expect("assist allowed");
        assert_eq!(snippet, "too expensive");
        assert!(core.complete_assist(assist_epoch));

        let second = match core.step(epoch) {
            StepOutcome::Advanced(events) => events,
            _ => panic!("second step should advance"),
        };
        assert_eq!(objections(&second), vec!["still too expensive".to_string()]);
    }

    #[test]
    fn pending_assist_blocks_objection_and_second_request() {
        let mut core = SessionCore::new();
        let config = SessionConfig::new(feed(&[
            (Speaker::Customer, "no", 1.0),
            (Speaker::Customer, "no again", 1.0),
        ]));
        let (epoch, _) = core.begin(config).expect("session starts");
        let _ = core.step(epoch);

        core.begin_objection_assist().expect("first assist allowed");
        let err = core
            .begin_objection_assist()
            .expect_err("second assist must be refused");
        assert!(matches!(err, SessionError::InvalidState { .. }));

        // 请求进行中不会重新触发。
        let events = drain(&mut core, epoch);
        assert!(objections(&events).is_empty());
        assert!(core.state().pending_assist);
    }

    #[test]
    fn emits_rule_events_in_fixed_order() {
        let mut core = SessionCore::new();
        let config = SessionConfig::new(feed(&[
            (Speaker::Agent, "hello", 5.0),
            (Speaker::Customer, "Acme is cheaper", 3.0),
        ]))
        .with_coaching_rules(vec![CoachingRule {
            trigger_index: 1,
            message: "competitor mentioned".into(),
            level: AlertLevel::Warning,
        }])
        .with_suggestion_rules(vec![
            ScriptSuggestionRule {
                trigger_index: 0,
                text: "opening".into(),
            },
            ScriptSuggestionRule {
                trigger_index: 1,
                text: "rebuttal".into(),
            },
        ]);

        let (epoch, initial) = core.begin(config).expect("session starts");
        assert_eq!(
            initial,
            vec![SessionEvent::ScriptSuggestion {
                trigger_index: 0,
                text: "opening".into()
            }]
        );

        let _ = core.step(epoch);
        let events = match core.step(epoch) {
            StepOutcome::Advanced(events) => events,
            _ => panic!("second step should advance"),
        };

        assert!(matches!(events[0], SessionEvent::UtteranceAppended(_)));
        assert!(matches!(
            events[1],
            SessionEvent::CoachingAlert {
                level: AlertLevel::Warning,
                ..
            }
        ));
        assert!(matches!(events[2], SessionEvent::ScriptSuggestion { .. }));
        assert!(matches!(events[3], SessionEvent::ObjectionDetected { .. }));
    }

    #[test]
    fn exhaustion_appends_closing_utterance() {
        let mut core = SessionCore::new();
        let config = SessionConfig::new(feed(&[
            (Speaker::Agent, "hello", 6.0),
            (Speaker::Customer, "bye", 7.0),
        ]));
        let (epoch, _) = core.begin(config).expect("session starts");

        let events = drain(&mut core, epoch);
        let state = core.state();

        assert_eq!(state.status, SessionStatus::Ended);
        assert_eq!(state.transcript.len(), 3);
        assert_eq!(state.sentiment_series, vec![6.0, 7.0, 7.0]);
        let closing = state.transcript.last().expect("closing utterance");
        assert_eq!(closing.speaker, Speaker::System);
        assert_eq!(closing.text, CALL_ENDED_TEXT);
        assert_eq!(closing.sequence_index, 2);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::SessionEnded {
                reason: EndReason::Exhausted
            })
        );
        for (position, utterance) in state.transcript.iter().enumerate() {
            assert_eq!(utterance.sequence_index, position as u64);
        }
    }

    #[test]
    fn end_is_idempotent() {
        let mut core = SessionCore::new();
        let (_, _) = core
            .begin(SessionConfig::new(feed(&[(Speaker::Agent, "hi", 5.0)])))
            .expect("session starts");

        assert!(core.end(EndReason::Cancelled).is_some());
        let snapshot = core.state().clone();
        assert!(core.end(EndReason::Cancelled).is_none());
        assert_eq!(core.state(), &snapshot);
        assert_eq!(snapshot.sentiment_series, vec![NEUTRAL_SENTIMENT]);
    }

    #[test]
    fn double_begin_leaves_state_untouched() {
        let mut core = SessionCore::new();
        let (epoch, _) = core
            .begin(SessionConfig::new(feed(&[
                (Speaker::Agent, "hi", 5.0),
                (Speaker::Customer, "hey", 5.0),
            ])))
            .expect("session starts");
        let _ = core.step(epoch);
        let snapshot = core.state().clone();

        let err = core
            .begin(SessionConfig::new(feed(&[(Speaker::Agent, "other", 5.0)])))
            .expect_err("second start must fail");

        assert!(matches!(
            err,
            SessionError::InvalidState {
                status: SessionStatus::Active,
                ..
            }
        ));
        assert_eq!(core.state(), &snapshot);
        assert_eq!(core.epoch(), epoch);
    }

    #[test]
    fn stale_epoch_halts() {
        let mut core = SessionCore::new();
        let (epoch, _) = core
            .begin(SessionConfig::new(feed(&[(Speaker::Agent, "hi", 5.0)])))
            .expect("session starts");
        let _ = core.end(EndReason::Cancelled);
        let (next_epoch, _) = core
            .begin(SessionConfig::new(feed(&[(Speaker::Agent, "again", 5.0)])))
            .expect("restart after end");

        assert_ne!(epoch, next_epoch);
        assert!(matches!(core.step(epoch), StepOutcome::Halted));
        assert!(core.state().transcript.is_empty());
    }

    #[test]
    fn summary_assist_requires_transcript() {
        let mut core = SessionCore::new();
        let err = core
            .begin_summary_assist()
            .expect_err("idle session has nothing to summarise");
        assert!(matches!(err, SessionError::InvalidState { .. }));

        let (epoch, _) = core
            .begin(SessionConfig::new(feed(&[(Speaker::Agent, "hi", 5.0)])))
            .expect("session starts");
        assert!(core.begin_summary_assist().is_err());
        let _ = core.step(epoch);
        let (_, transcript) = core.begin_summary_assist().expect("summary allowed");
        assert_eq!(transcript.len(), 1);
    }
}
