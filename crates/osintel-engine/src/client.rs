//! HTTP client for the inference endpoint.
//!
//! Wraps `reqwest` with the chat-completion request shape the endpoint
//! expects and extracts the single textual completion from the response.
//! Use [`InferenceClient::with_base_url`] to point at a mock server in tests.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;

/// One chat message in the inference request body.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

/// Client for the inference endpoint.
///
/// Holds only immutable configuration; safe to share across concurrent
/// callers.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl InferenceClient {
    /// Creates a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("osintel/0.1 (osint-analysis)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToOwned::to_owned),
        })
    }

    /// Sends one prompt and returns the completion text.
    ///
    /// The completion is read from the first choice's message content; an
    /// envelope missing that path yields an empty string, which the caller's
    /// parse step treats as raw (unparsed) output.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] on network failure, timeout, or a
    /// non-2xx status, and [`EngineError::Deserialize`] if the body is not
    /// valid JSON.
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, EngineError> {
        let url = format!("{}/inference", self.base_url);
        let body = InferenceRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let envelope: Value = serde_json::from_str(&response.text().await?)?;

        let text = envelope
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = InferenceClient::with_base_url("https://ai.example.com/v1/", None, 60)
            .expect("client construction should not fail");
        assert_eq!(client.base_url, "https://ai.example.com/v1");
    }

    #[test]
    fn request_body_matches_wire_shape() {
        let body = InferenceRequest {
            model: "test-model",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: 128,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["max_tokens"], 128);
    }
}
