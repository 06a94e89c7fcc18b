//! 发言来源：脚本化的通话数据与内置演示通话。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::config::SessionConfig;
use crate::session::constants::{DEFAULT_OBJECTION_THRESHOLD, DEFAULT_TICK_INTERVAL};
use crate::session::error::ScriptError;
use crate::session::types::{AlertLevel, CoachingRule, ScriptSuggestionRule, Speaker, Utterance};

/// 按序产出带序号的发言，每个会话消费一次。
pub trait UtteranceSource: Send + Sync {
    fn utterances(&self) -> Vec<Utterance>;
}

/// 脚本中的一条发言，序号由位置决定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedLine {
    pub speaker: Speaker,
    pub text: String,
    pub sentiment_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedFeed {
    lines: Vec<ScriptedLine>,
}

impl ScriptedFeed {
    pub fn new(lines: Vec<ScriptedLine>) -> Self {
        Self { lines }
    }
}

impl UtteranceSource for ScriptedFeed {
    fn utterances(&self) -> Vec<Utterance> {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                Utterance::new(
                    index as u64,
                    line.speaker,
                    line.text.clone(),
                    line.sentiment_score,
                )
            })
            .collect()
    }
}

/// JSON 通话脚本：发言、规则表与节奏参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScript {
    pub utterances: Vec<ScriptedLine>,
    #[serde(default)]
    pub coaching_alerts: Vec<CoachingRule>,
    #[serde(default)]
    pub script_suggestions: Vec<ScriptSuggestionRule>,
    #[serde(default = "default_threshold")]
    pub objection_threshold: f64,
    #[serde(default = "default_tick_ms")]
    pub tick_interval_ms: u64,
}

fn default_threshold() -> f64 {
    DEFAULT_OBJECTION_THRESHOLD
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}

impl SessionScript {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn feed(&self) -> ScriptedFeed {
        ScriptedFeed::new(self.utterances.clone())
    }

    pub fn into_config(self) -> SessionConfig {
        let utterances = self.feed().utterances();
        SessionConfig::new(utterances)
            .with_coaching_rules(self.coaching_alerts)
            .with_suggestion_rules(self.script_suggestions)
            .with_objection_threshold(self.objection_threshold)
            .with_tick_interval(Duration::from_millis(self.tick_interval_ms))
    }

    /// 内置演示通话：客户因账单金额致电，中途情绪下滑。
    pub fn demo() -> Self {
        let line = |speaker: Speaker, text: &str, sentiment_score: f64| ScriptedLine {
            speaker,
            text: text.to_string(),
            sentiment_score,
        };

        Self {
            utterances: vec![
                line(
                    Speaker::Agent,
                    "Hello, this is Jane from SmartSolutions, how can I help you today?",
                    5.0,
                ),
                line(
                    Speaker::Customer,
                    "Hi Jane, I'm calling about my recent invoice. It seems higher than I expected.",
                    4.0,
                ),
                line(
                    Speaker::Agent,
                    "I can certainly look into that for you. Can I get your account number please?",
                    4.0,
                ),
                line(
                    Speaker::Customer,
                    "Sure, it's 555-2468. I also noticed you guys have a competitor, Acme Corp, offering lower rates.",
                    3.0,
                ),
                line(
                    Speaker::Agent,
                    "Thank you. I see your account. Let me review the invoice details...",
                    3.0,
                ),
                line(
                    Speaker::Customer,
                    "Okay, please hurry. I don't have all day.",
                    2.0,
                ),
                line(
                    Speaker::Agent,
                    "I understand. It looks like the extra charge is for the premium data package you added last month.",
                    5.0,
                ),
                line(
                    Speaker::Customer,
                    "Oh, I see. I had forgotten about that. That makes sense now.",
                    7.0,
                ),
                line(
                    Speaker::Agent,
                    "Great! Is there anything else I can help you with today?",
                    8.0,
                ),
                line(
                    Speaker::Customer,
                    "No, that's all. Thanks for your help.",
                    8.0,
                ),
            ],
            coaching_alerts: vec![
                CoachingRule {
                    trigger_index: 3,
                    message: "Competitor 'Acme Corp' mentioned. Be prepared to discuss value proposition.".into(),
                    level: AlertLevel::Info,
                },
                CoachingRule {
                    trigger_index: 5,
                    message: "Customer sentiment is dropping. Use empathy statements.".into(),
                    level: AlertLevel::Warning,
                },
            ],
            script_suggestions: vec![
                ScriptSuggestionRule {
                    trigger_index: 0,
                    text: "Opening: 'Thanks for calling SmartSolutions...'".into(),
                },
                ScriptSuggestionRule {
                    trigger_index: 3,
                    text: "Competitor Rebuttal: 'While their prices might seem lower, our platform offers 99.9% uptime and dedicated support...'".into(),
                },
                ScriptSuggestionRule {
                    trigger_index: 8,
                    text: "Closing: 'Glad I could help! Is there anything else...'".into(),
                },
            ],
            objection_threshold: DEFAULT_OBJECTION_THRESHOLD,
            tick_interval_ms: default_tick_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn feed_assigns_positional_indices() {
        let utterances = SessionScript::demo().feed().utterances();
        assert_eq!(utterances.len(), 10);
        for (position, utterance) in utterances.iter().enumerate() {
            assert_eq!(utterance.sequence_index, position as u64);
        }
    }

    #[test]
    fn demo_config_is_valid() {
        let config = SessionScript::demo().into_config();
        config.validate().expect("demo script must validate");
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
        assert_eq!(config.coaching_rules.len(), 2);
    }

    #[test]
    fn loads_script_with_defaults() {
        let mut file = NamedTempFile::new().expect("create temp script");
        write!(
            file,
            r#"{{
                "utterances": [
                    {{ "speaker": "Agent", "text": "hello", "sentimentScore": 6 }},
                    {{ "speaker": "Customer", "text": "too slow", "sentimentScore": 2.5 }}
                ],
                "coachingAlerts": [
                    {{ "triggerIndex": 1, "message": "calm down", "level": "warning" }}
                ]
            }}"#
        )
        .expect("write temp script");

        let script = SessionScript::load(file.path()).expect("script parses");

        assert_eq!(script.objection_threshold, DEFAULT_OBJECTION_THRESHOLD);
        assert_eq!(script.tick_interval_ms, 2_000);
        assert!(script.script_suggestions.is_empty());
        assert_eq!(script.coaching_alerts[0].level, AlertLevel::Warning);

        let config = script.into_config();
        assert_eq!(config.utterances[1].speaker, Speaker::Customer);
        assert_eq!(config.utterances[1].sentiment_score, 2.5);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SessionScript::load("/nonexistent/callcoach/script.json")
            .expect_err("missing file must fail");
        assert!(matches!(err, ScriptError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/callcoach/script.json"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = SessionScript::from_json("{ not json").expect_err("must fail");
        assert!(matches!(err, ScriptError::Parse(_)));
    }
}
