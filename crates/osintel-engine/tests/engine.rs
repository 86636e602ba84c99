//! Integration tests for `AnalysisEngine` using wiremock HTTP mocks.

use osintel_core::AnalysisType;
use osintel_engine::{AnalysisEngine, AnalysisInput, EngineConfig};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_engine(base_url: &str) -> AnalysisEngine {
    let config = EngineConfig {
        endpoint: base_url.to_string(),
        api_key: Some("test-key".to_string()),
        model: "test-model".to_string(),
        max_tokens: 256,
        temperature: 0.7,
        request_timeout_secs: 5,
    };
    AnalysisEngine::new(&config).expect("engine construction should not fail")
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn analyze_parses_structured_response() {
    let server = MockServer::start().await;

    let content = r#"{"sentiment": "positive", "confidence": 0.92, "explanation": "upbeat"}"#;
    Mock::given(method("POST"))
        .and(path("/inference"))
        .and(body_partial_json(serde_json::json!({"model": "test-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(&server)
        .await;

    let engine = test_engine(&server.uri());
    let outcome = engine
        .analyze("great release, everyone is happy", AnalysisType::Sentiment, None)
        .await;

    assert!(!outcome.is_error());
    assert_eq!(outcome.analysis_type, AnalysisType::Sentiment);
    assert_eq!(outcome.payload["sentiment"], "positive");
    assert_eq!(outcome.payload["analysis_type"], "sentiment");
    assert!(outcome.payload.get("timestamp").is_some());
    assert_eq!(outcome.confidence, Some(0.92));
    assert_eq!(outcome.model, "test-model");
    assert!(outcome.processing_time >= 0.0);
}

#[tokio::test]
async fn analyze_keeps_non_json_response_as_raw() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/inference"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "Overall the discussion trends positive, with some concerns about latency.",
        )))
        .mount(&server)
        .await;

    let engine = test_engine(&server.uri());
    let outcome = engine.analyze("text", AnalysisType::Trend, None).await;

    assert!(!outcome.is_error(), "raw fallback is not an error");
    assert_eq!(outcome.payload["parsed"], false);
    assert_eq!(outcome.payload["analysis_type"], "trend");
    assert!(outcome.payload["raw_response"]
        .as_str()
        .expect("raw_response string")
        .contains("trends positive"));
}

#[tokio::test]
async fn analyze_recovers_from_transport_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/inference"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let engine = test_engine(&server.uri());
    let outcome = engine.analyze("text", AnalysisType::Comprehensive, None).await;

    assert!(outcome.is_error());
    assert!(outcome.payload["error"].as_str().is_some());
    assert_eq!(outcome.model, "test-model");
    assert!(outcome.processing_time >= 0.0);
}

#[tokio::test]
async fn analyze_recovers_when_endpoint_is_unreachable() {
    // Nothing listening on this port; connect fails outright.
    let engine = test_engine("http://127.0.0.1:9");
    let outcome = engine.analyze("text", AnalysisType::Summary, None).await;

    assert!(outcome.is_error());
    assert_eq!(outcome.analysis_type, AnalysisType::Summary);
}

#[tokio::test]
async fn batch_analyze_preserves_order_and_isolates_failures() {
    let server = MockServer::start().await;

    // First call fails, the remaining two succeed. Mocks are consumed in
    // mount order via up_to_n_times.
    Mock::given(method("POST"))
        .and(path("/inference"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inference"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body(r#"{"sentiment": "neutral"}"#)),
        )
        .mount(&server)
        .await;

    let engine = test_engine(&server.uri());
    let items = vec![
        AnalysisInput {
            content: "first".to_string(),
            metadata: None,
        },
        AnalysisInput {
            content: "second".to_string(),
            metadata: Some(serde_json::json!({"origin": "test"})),
        },
        AnalysisInput {
            content: "third".to_string(),
            metadata: None,
        },
    ];

    let outcomes = engine.batch_analyze(&items, AnalysisType::Sentiment).await;

    assert_eq!(outcomes.len(), 3, "one outcome per input");
    assert!(outcomes[0].is_error(), "first item failed in isolation");
    assert!(!outcomes[1].is_error());
    assert!(!outcomes[2].is_error());
    assert_eq!(outcomes[1].payload["sentiment"], "neutral");
}

#[tokio::test]
async fn empty_batch_returns_empty_results() {
    let server = MockServer::start().await;
    let engine = test_engine(&server.uri());

    let outcomes = engine.batch_analyze(&[], AnalysisType::Comprehensive).await;
    assert!(outcomes.is_empty());
}
