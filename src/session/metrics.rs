//! 通话指标统计，对应看板上的情绪均分与坐席说话占比。

use serde::Serialize;

use crate::session::types::{Speaker, Utterance};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallMetrics {
    pub turns: usize,
    pub agent_turns: usize,
    pub customer_turns: usize,
    pub average_sentiment: Option<f64>,
    pub lowest_sentiment: Option<f64>,
    /// 坐席词数占双方总词数的百分比。
    pub talk_ratio: Option<f64>,
}

impl CallMetrics {
    /// 统计时忽略 System 发言。
    pub fn from_transcript(transcript: &[Utterance]) -> Self {
        let mut metrics = CallMetrics::default();
        let mut sentiment_total = 0.0;
        let mut agent_words = 0_usize;
        let mut customer_words = 0_usize;

        for utterance in transcript {
            let words = utterance.text.split_whitespace().count();
            match utterance.speaker {
                Speaker::Agent => {
                    metrics.agent_turns += 1;
                    agent_words += words;
                }
                Speaker::Customer => {
                    metrics.customer_turns += 1;
                    customer_words += words;
                }
                Speaker::System => continue,
            }

            metrics.turns += 1;
            sentiment_total += utterance.sentiment_score;
            metrics.lowest_sentiment = Some(match metrics.lowest_sentiment {
                Some(lowest) => lowest.min(utterance.sentiment_score),
                None => utterance.sentiment_score,
            });
        }

        if metrics.turns > 0 {
            metrics.average_sentiment = Some(sentiment_total / metrics.turns as f64);
        }

        let spoken = agent_words + customer_words;
        if spoken > 0 {
            metrics.talk_ratio = Some(agent_words as f64 * 100.0 / spoken as f64);
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transcript_has_no_averages() {
        let metrics = CallMetrics::from_transcript(&[]);
        assert_eq!(metrics, CallMetrics::default());
    }

    #[test]
    fn ignores_system_turns() {
        let transcript = vec![
            Utterance::new(0, Speaker::Agent, "hello there", 6.0),
            Utterance::new(1, Speaker::Customer, "my invoice is too high", 2.0),
            Utterance::new(2, Speaker::System, "Call Ended.", 2.0),
        ];

        let metrics = CallMetrics::from_transcript(&transcript);

        assert_eq!(metrics.turns, 2);
        assert_eq!(metrics.agent_turns, 1);
        assert_eq!(metrics.customer_turns, 1);
        assert_eq!(metrics.average_sentiment, Some(4.0));
        assert_eq!(metrics.lowest_sentiment, Some(2.0));
        let ratio = metrics.talk_ratio.expect("ratio computed");
        assert!((ratio - 100.0 * 2.0 / 7.0).abs() < 1e-9);
    }
}
