use std::time::Duration;

use crate::session::constants::{
    DEFAULT_OBJECTION_THRESHOLD, DEFAULT_TICK_INTERVAL, SENTIMENT_MAX, SENTIMENT_MIN,
};
use crate::session::error::SessionError;
use crate::session::types::{CoachingRule, ScriptSuggestionRule, Utterance};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub utterances: Vec<Utterance>,
    pub coaching_rules: Vec<CoachingRule>,
    pub suggestion_rules: Vec<ScriptSuggestionRule>,
    pub objection_threshold: f64,
    pub tick_interval: Duration,
}

impl SessionConfig {
    pub fn new(utterances: Vec<Utterance>) -> Self {
        Self {
            utterances,
            coaching_rules: Vec::new(),
            suggestion_rules: Vec::new(),
            objection_threshold: DEFAULT_OBJECTION_THRESHOLD,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_coaching_rules(mut self, rules: Vec<CoachingRule>) -> Self {
        self.coaching_rules = rules;
        self
    }

    pub fn with_suggestion_rules(mut self, rules: Vec<ScriptSuggestionRule>) -> Self {
        self.suggestion_rules = rules;
        self
    }

    pub fn with_objection_threshold(mut self, threshold: f64) -> Self {
        self.objection_threshold = threshold;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// 启动前的参数校验。
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.utterances.is_empty() {
            return Err(SessionError::invalid_config("utterance sequence is empty"));
        }

        if !in_sentiment_range(self.objection_threshold) {
            return Err(SessionError::invalid_config(format!(
                "objection threshold {} outside [{SENTIMENT_MIN}, {SENTIMENT_MAX}]",
                self.objection_threshold
            )));
        }

        if self.tick_interval.is_zero() {
            return Err(SessionError::invalid_config("tick interval must be positive"));
        }

        for (position, utterance) in self.utterances.iter().enumerate() {
            if utterance.sequence_index != position as u64 {
                return Err(SessionError::invalid_config(format!(
                    "utterance at position {position} carries sequence index {}",
                    utterance.sequence_index
                )));
            }
            if !in_sentiment_range(utterance.sentiment_score) {
                return Err(SessionError::invalid_config(format!(
                    "utterance {position} sentiment {} outside [{SENTIMENT_MIN}, {SENTIMENT_MAX}]",
                    utterance.sentiment_score
                )));
            }
        }

        Ok(())
    }
}

fn in_sentiment_range(value: f64) -> bool {
    value.is_finite() && (SENTIMENT_MIN..=SENTIMENT_MAX).contains(&value)
}
