use std::time::Duration;

use thiserror::Error;

use crate::{card_response_schema, ContentPart};

pub(crate) const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub(crate) const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub(crate) const DEFAULT_TEMPERATURE: f64 = 0.1;
pub(crate) const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

const ERROR_BODY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Error)]
pub(crate) enum ModelError {
    #[error("rate limited by the model service: {0}")]
    RateLimited(String),

    #[error("model service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed model response: {0}")]
    Malformed(String),
}

impl ModelError {
    pub(crate) fn is_rate_limit(&self) -> bool {
        matches!(self, ModelError::RateLimited(_))
    }
}

/// A vision-language model that answers one multimodal prompt with text.
pub(crate) trait VisionModel {
    fn generate(&self, parts: &[ContentPart]) -> Result<String, ModelError>;
}

#[derive(Debug, Clone)]
pub(crate) struct GeminiSettings {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    pub(crate) temperature: f64,
    pub(crate) max_output_tokens: u32,
}

pub(crate) struct GeminiClient {
    settings: GeminiSettings,
    agent: ureq::Agent,
}

impl GeminiClient {
    pub(crate) fn new(settings: GeminiSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(settings.timeout)
            .timeout_read(settings.timeout)
            .timeout_write(settings.timeout)
            .build();
        GeminiClient { settings, agent }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

impl VisionModel for GeminiClient {
    fn generate(&self, parts: &[ContentPart]) -> Result<String, ModelError> {
        let payload = build_gemini_payload(
            parts,
            self.settings.temperature,
            self.settings.max_output_tokens,
        );
        tracing::debug!(
            model = %self.settings.model,
            parts = parts.len(),
            "sending generateContent request"
        );
        let response = self
            .agent
            .post(&self.endpoint())
            .set("content-type", "application/json")
            .set("x-goog-api-key", &self.settings.api_key)
            .send_json(payload);

        let body = match response {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| ModelError::Transport(format!("reading response body: {e}")))?,
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                let preview: String = text.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
                if code == 429 {
                    return Err(ModelError::RateLimited(preview));
                }
                return Err(ModelError::Status {
                    status: code,
                    body: preview,
                });
            }
            Err(ureq::Error::Transport(err)) => return Err(ModelError::Transport(err.to_string())),
        };

        let payload: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ModelError::Malformed(format!("response is not JSON: {e}")))?;
        parse_gemini_response(&payload)
    }
}

pub(crate) fn to_gemini_parts(parts: &[ContentPart]) -> Vec<serde_json::Value> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Image { media_type, data } => serde_json::json!({
                "inlineData": {"mimeType": media_type, "data": data}
            }),
            ContentPart::Text(text) => serde_json::json!({"text": text}),
        })
        .collect()
}

pub(crate) fn build_gemini_payload(
    parts: &[ContentPart],
    temperature: f64,
    max_output_tokens: u32,
) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": to_gemini_parts(parts),
        }],
        "generationConfig": {
            "temperature": temperature,
            "maxOutputTokens": max_output_tokens,
            "responseMimeType": "application/json",
            "responseSchema": card_response_schema(),
        }
    })
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn parse_gemini_response(payload: &serde_json::Value) -> Result<String, ModelError> {
    let Some(candidate) = payload
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|c| c.first())
    else {
        let reason = payload
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
            .unwrap_or("no candidates returned");
        return Err(ModelError::Malformed(format!("no candidates: {reason}")));
    };

    let text: Vec<&str> = candidate
        .pointer("/content/parts")
        .and_then(|v| v.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let finish = candidate
            .get("finishReason")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        return Err(ModelError::Malformed(format!(
            "candidate has no text (finishReason: {finish})"
        )));
    }
    Ok(text.concat())
}
