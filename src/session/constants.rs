use std::time::Duration;

pub(crate) const CALL_ENDED_TEXT: &str = "Call Ended.";
pub(crate) const SENTIMENT_MIN: f64 = 0.0;
pub(crate) const SENTIMENT_MAX: f64 = 10.0;
pub(crate) const NEUTRAL_SENTIMENT: f64 = 5.0;
pub(crate) const DEFAULT_OBJECTION_THRESHOLD: f64 = 3.0;
pub(crate) const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2_000);
