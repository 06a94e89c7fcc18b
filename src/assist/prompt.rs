//! 提示词构造与响应解析，按 generateContent 的线格式组织。

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::assist::error::AssistError;
use crate::assist::types::CallSummary;
use crate::session::Utterance;

const RESPONSE_MIME_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub(crate) generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub(crate) role: &'static str,
    pub(crate) parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    pub(crate) response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    pub(crate) response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ObjectionTipsPayload {
    #[serde(rename = "suggestedResponses")]
    suggested_responses: Vec<String>,
}

impl GenerateContentRequest {
    fn new(prompt: String, response_schema: Value) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: RESPONSE_MIME_TYPE,
                response_schema,
            },
        }
    }
}

pub(crate) fn objection_request(snippet: &str) -> GenerateContentRequest {
    let prompt = format!(
        "A customer made the following statement(s) which might be an objection: \"{snippet}\". \
         Provide 2-3 concise and actionable suggestions for how a sales/support agent can respond to this. \
         Respond with a JSON object containing one key: \"suggestedResponses\" (an array of strings)."
    );
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "suggestedResponses": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["suggestedResponses"]
    });
    GenerateContentRequest::new(prompt, schema)
}

pub(crate) fn summary_request(transcript: &[Utterance]) -> GenerateContentRequest {
    let prompt = format!(
        "Given the following call transcript, provide a concise summary of the conversation \
         and a list of specific action items. Respond with a JSON object containing two keys: \
         \"summary\" (string) and \"actionItems\" (array of strings).\n\nTranscript:\n{}",
        format_transcript(transcript)
    );
    let schema = json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "actionItems": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["summary", "actionItems"]
    });
    GenerateContentRequest::new(prompt, schema)
}

pub(crate) fn format_transcript(transcript: &[Utterance]) -> String {
    transcript
        .iter()
        .map(|utterance| format!("{}: {}", utterance.speaker.as_str(), utterance.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn parse_objection_tips(body: &str) -> Result<Vec<String>, AssistError> {
    let payload: ObjectionTipsPayload = serde_json::from_value(extract_payload(body)?)
        .map_err(|err| AssistError::invalid_response(format!("suggestedResponses: {err}")))?;
    Ok(payload.suggested_responses)
}

pub(crate) fn parse_call_summary(body: &str) -> Result<CallSummary, AssistError> {
    serde_json::from_value(extract_payload(body)?)
        .map_err(|err| AssistError::invalid_response(format!("call summary: {err}")))
}

/// 响应可能是 candidates 包装，也可能直接是目标 JSON。
fn extract_payload(body: &str) -> Result<Value, AssistError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| AssistError::invalid_response(format!("body is not JSON: {err}")))?;

    if value.get("candidates").is_none() {
        return Ok(value);
    }

    let text = value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| AssistError::invalid_response("candidate text missing"))?;

    serde_json::from_str(text)
        .map_err(|err| AssistError::invalid_response(format!("candidate text is not JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Speaker;

    #[test]
    fn parses_bare_suggestions() {
        let tips = parse_objection_tips(r#"{"suggestedResponses":["a","b"]}"#).expect("parses");
        assert_eq!(tips, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parses_candidate_envelope() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"suggestedResponses\":[\"acknowledge the wait\"]}" }] }
            }]
        })
        .to_string();

        let tips = parse_objection_tips(&body).expect("parses envelope");
        assert_eq!(tips, vec!["acknowledge the wait".to_string()]);
    }

    #[test]
    fn missing_key_is_invalid_response() {
        let err = parse_objection_tips(r#"{"foo":1}"#).expect_err("must fail");
        assert!(matches!(err, AssistError::InvalidResponse { .. }));
    }

    #[test]
    fn envelope_without_text_is_invalid_response() {
        let err = parse_call_summary(r#"{"candidates":[]}"#).expect_err("must fail");
        assert!(matches!(err, AssistError::InvalidResponse { .. }));
    }

    #[test]
    fn parses_summary() {
        let summary = parse_call_summary(
            r#"{"summary":"Invoice explained.","actionItems":["Send breakdown"]}"#,
        )
        .expect("parses");
        assert_eq!(summary.summary, "Invoice explained.");
        assert_eq!(summary.action_items, vec!["Send breakdown".to_string()]);
    }

    #[test]
    fn summary_missing_action_items_is_invalid() {
        let err = parse_call_summary(r#"{"summary":"x"}"#).expect_err("must fail");
        assert!(matches!(err, AssistError::InvalidResponse { .. }));
    }

    #[test]
    fn summary_request_embeds_transcript() {
        let transcript = vec![
            Utterance::new(0, Speaker::Agent, "Hello", 5.0),
            Utterance::new(1, Speaker::Customer, "Hi", 5.0),
        ];
        let request = serde_json::to_value(summary_request(&transcript)).expect("serialises");

        let prompt = request
            .pointer("/contents/0/parts/0/text")
            .and_then(Value::as_str)
            .expect("prompt text");
        assert!(prompt.ends_with("Transcript:\nAgent: Hello\nCustomer: Hi"));
        assert_eq!(
            request.pointer("/generationConfig/responseMimeType"),
            Some(&json!("application/json"))
        );
        assert_eq!(
            request.pointer("/generationConfig/responseSchema/required"),
            Some(&json!(["summary", "actionItems"]))
        );
    }

    #[test]
    fn objection_request_quotes_snippet() {
        let request = serde_json::to_value(objection_request("please hurry")).expect("serialises");
        let prompt = request
            .pointer("/contents/0/parts/0/text")
            .and_then(Value::as_str)
            .expect("prompt text");
        assert!(prompt.contains("\"please hurry\""));
        assert!(prompt.contains("suggestedResponses"));
    }
}
