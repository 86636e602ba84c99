//! The analysis engine: prompt dispatch, inference invocation, and tolerant
//! result parsing.

use std::time::Instant;

use chrono::{DateTime, Utc};
use osintel_core::{AnalysisType, AppConfig};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::client::InferenceClient;
use crate::error::EngineError;
use crate::prompt::build_prompt;

/// Immutable engine configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl EngineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.inference_endpoint.clone(),
            api_key: config.inference_api_key.clone(),
            model: config.ai_model.clone(),
            max_tokens: config.ai_max_tokens,
            temperature: config.ai_temperature,
            request_timeout_secs: config.ai_request_timeout_secs,
        }
    }
}

/// One item submitted to [`AnalysisEngine::batch_analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub content: String,
    pub metadata: Option<Value>,
}

/// The parse step's outcome: either a structured JSON object or the raw
/// completion text. Parsing never fails; unparseable output is a
/// recovered state, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Parsed(Map<String, Value>),
    Raw(String),
}

/// The result of one analysis invocation.
///
/// Always returned, never raised: transport failures surface as an
/// `"error"` key inside `payload`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub analysis_type: AnalysisType,
    pub payload: Value,
    pub confidence: Option<f64>,
    pub model: String,
    pub processing_time: f64,
}

impl AnalysisOutcome {
    /// True when the invocation failed at the transport level.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }
}

/// AI-powered analyzer over the inference endpoint.
///
/// Holds only immutable configuration; `analyze` is safely callable from
/// concurrent tasks.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    client: InferenceClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnalysisEngine {
    /// Builds an engine from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = InferenceClient::with_base_url(
            &config.endpoint,
            config.api_key.as_deref(),
            config.request_timeout_secs,
        )?;

        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Performs one AI analysis over `content`.
    ///
    /// Transport failure and unparseable model output are both folded into
    /// the returned outcome; this method never fails.
    pub async fn analyze(
        &self,
        content: &str,
        analysis_type: AnalysisType,
        metadata: Option<&Value>,
    ) -> AnalysisOutcome {
        let start = Instant::now();
        let prompt = build_prompt(analysis_type, content, metadata);

        match self
            .client
            .complete(&self.model, &prompt, self.max_tokens, self.temperature)
            .await
        {
            Ok(raw) => {
                let output = parse_model_output(&raw);
                if matches!(output, ModelOutput::Raw(_)) {
                    tracing::warn!(
                        analysis_type = %analysis_type,
                        "model response not in JSON format, keeping raw text"
                    );
                }
                let (payload, confidence) = structure_payload(output, analysis_type, Utc::now());
                AnalysisOutcome {
                    analysis_type,
                    payload,
                    confidence,
                    model: self.model.clone(),
                    processing_time: start.elapsed().as_secs_f64(),
                }
            }
            Err(e) => {
                tracing::error!(analysis_type = %analysis_type, error = %e, "analysis failed");
                AnalysisOutcome {
                    analysis_type,
                    payload: json!({ "error": e.to_string() }),
                    confidence: None,
                    model: self.model.clone(),
                    processing_time: start.elapsed().as_secs_f64(),
                }
            }
        }
    }

    /// Analyzes a batch of items sequentially, in input order.
    ///
    /// Each item's failure is isolated to its own entry; the batch never
    /// aborts early. The output has exactly one outcome per input.
    pub async fn batch_analyze(
        &self,
        items: &[AnalysisInput],
        analysis_type: AnalysisType,
    ) -> Vec<AnalysisOutcome> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let outcome = self
                .analyze(&item.content, analysis_type, item.metadata.as_ref())
                .await;
            results.push(outcome);
        }
        results
    }
}

/// Parse the raw completion text into a tagged variant.
///
/// Only a top-level JSON object counts as parsed; any other body (plain
/// text, a bare JSON scalar or array) is kept verbatim as `Raw`.
#[must_use]
pub fn parse_model_output(raw: &str) -> ModelOutput {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => ModelOutput::Parsed(map),
        _ => ModelOutput::Raw(raw.to_string()),
    }
}

/// Turn a [`ModelOutput`] into the stored payload plus lifted confidence.
///
/// Parsed payloads are tagged with `analysis_type` and `timestamp`; raw
/// payloads carry `raw_response` and `parsed: false` instead.
fn structure_payload(
    output: ModelOutput,
    analysis_type: AnalysisType,
    now: DateTime<Utc>,
) -> (Value, Option<f64>) {
    match output {
        ModelOutput::Parsed(mut map) => {
            let confidence = map.get("confidence").and_then(Value::as_f64);
            map.insert(
                "analysis_type".to_string(),
                Value::String(analysis_type.as_str().to_string()),
            );
            map.insert("timestamp".to_string(), Value::String(now.to_rfc3339()));
            (Value::Object(map), confidence)
        }
        ModelOutput::Raw(text) => (
            json!({
                "analysis_type": analysis_type.as_str(),
                "raw_response": text,
                "timestamp": now.to_rfc3339(),
                "parsed": false,
            }),
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_parses_to_parsed_variant() {
        let output = parse_model_output(r#"{"sentiment": "positive"}"#);
        match output {
            ModelOutput::Parsed(map) => assert_eq!(map["sentiment"], "positive"),
            ModelOutput::Raw(_) => panic!("expected Parsed variant"),
        }
    }

    #[test]
    fn plain_text_parses_to_raw_variant() {
        let output = parse_model_output("The sentiment is positive overall.");
        assert_eq!(
            output,
            ModelOutput::Raw("The sentiment is positive overall.".to_string())
        );
    }

    #[test]
    fn bare_json_array_is_kept_raw() {
        let output = parse_model_output(r#"["positive"]"#);
        assert!(matches!(output, ModelOutput::Raw(_)));
    }

    #[test]
    fn parsed_payload_is_tagged_with_type_and_timestamp() {
        let now = Utc::now();
        let output = parse_model_output(r#"{"sentiment": "negative", "confidence": 0.8}"#);
        let (payload, confidence) = structure_payload(output, AnalysisType::Sentiment, now);

        assert_eq!(payload["analysis_type"], "sentiment");
        assert_eq!(payload["timestamp"], now.to_rfc3339());
        assert_eq!(payload["sentiment"], "negative");
        assert_eq!(confidence, Some(0.8));
    }

    #[test]
    fn raw_payload_carries_parsed_false_and_raw_response() {
        let now = Utc::now();
        let (payload, confidence) = structure_payload(
            ModelOutput::Raw("not json".to_string()),
            AnalysisType::Trend,
            now,
        );

        assert_eq!(payload["parsed"], false);
        assert_eq!(payload["raw_response"], "not json");
        assert_eq!(payload["analysis_type"], "trend");
        assert!(payload.get("timestamp").is_some());
        assert!(confidence.is_none());
    }

    #[test]
    fn non_numeric_confidence_is_not_lifted() {
        let now = Utc::now();
        let output = parse_model_output(r#"{"confidence": "high"}"#);
        let (_, confidence) = structure_payload(output, AnalysisType::Sentiment, now);
        assert!(confidence.is_none());
    }
}
