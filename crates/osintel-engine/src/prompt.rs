//! Prompt templates, one per analysis type.
//!
//! Each template embeds a strict JSON output-schema description so the
//! downstream parse step has a known shape to aim for. Caller-supplied
//! metadata is rendered as free-text context, never interpolated into the
//! schema itself.

use osintel_core::AnalysisType;
use serde_json::Value;

const BASE_CONTEXT: &str =
    "You are an expert OSINT analyst specializing in analyzing open-source intelligence data.";

const SENTIMENT_SCHEMA: &str = r#"{
    "sentiment": "positive/negative/neutral",
    "confidence": 0.0-1.0,
    "explanation": "detailed explanation",
    "key_phrases": ["phrase1", "phrase2"],
    "emotions": ["emotion1", "emotion2"]
}"#;

const TREND_SCHEMA: &str = r#"{
    "trends": [
        {
            "topic": "topic name",
            "mentions": number,
            "sentiment": "positive/negative/neutral",
            "confidence": 0.0-1.0
        }
    ],
    "emerging_topics": ["topic1", "topic2"],
    "key_themes": ["theme1", "theme2"]
}"#;

const SUMMARY_SCHEMA: &str = r#"{
    "summary": "concise summary (2-3 sentences)",
    "key_points": ["point1", "point2", "point3"],
    "entities": ["entity1", "entity2"],
    "action_items": ["action1", "action2"]
}"#;

const COMPREHENSIVE_SCHEMA: &str = r#"{
    "summary": "brief summary",
    "sentiment": {
        "overall": "positive/negative/neutral",
        "confidence": 0.0-1.0,
        "explanation": "explanation"
    },
    "trends": [
        {
            "topic": "topic name",
            "mentions": number,
            "sentiment": "positive/negative/neutral"
        }
    ],
    "key_insights": ["insight1", "insight2", "insight3"],
    "entities": ["entity1", "entity2"],
    "recommendations": ["recommendation1", "recommendation2"]
}"#;

/// Build the full prompt for one analysis invocation.
#[must_use]
pub fn build_prompt(analysis_type: AnalysisType, content: &str, metadata: Option<&Value>) -> String {
    let context_info = metadata.map_or_else(String::new, |m| format!("\n\nContext: {m}"));

    let (instruction, schema) = match analysis_type {
        AnalysisType::Sentiment => (
            "Analyze the sentiment of the following content and provide a detailed assessment.",
            SENTIMENT_SCHEMA,
        ),
        AnalysisType::Trend => (
            "Identify trends, patterns, and significant topics in the following content.",
            TREND_SCHEMA,
        ),
        AnalysisType::Summary => (
            "Provide a concise summary of the following content, highlighting the most important points.",
            SUMMARY_SCHEMA,
        ),
        AnalysisType::Comprehensive => (
            "Perform a comprehensive analysis of the following content including sentiment, trends, and key insights.",
            COMPREHENSIVE_SCHEMA,
        ),
    };

    format!(
        "{BASE_CONTEXT}\n\n{instruction}{context_info}\n\nContent:\n{content}\n\n\
         Provide your analysis in the following JSON format:\n{schema}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_prompt_embeds_sentiment_schema() {
        let prompt = build_prompt(AnalysisType::Sentiment, "some text", None);
        assert!(prompt.contains("\"sentiment\": \"positive/negative/neutral\""));
        assert!(prompt.contains("key_phrases"));
        assert!(prompt.contains("some text"));
    }

    #[test]
    fn trend_prompt_embeds_trends_schema() {
        let prompt = build_prompt(AnalysisType::Trend, "x", None);
        assert!(prompt.contains("\"trends\""));
        assert!(prompt.contains("emerging_topics"));
    }

    #[test]
    fn summary_prompt_embeds_key_points() {
        let prompt = build_prompt(AnalysisType::Summary, "x", None);
        assert!(prompt.contains("key_points"));
        assert!(prompt.contains("action_items"));
    }

    #[test]
    fn comprehensive_prompt_embeds_nested_sentiment() {
        let prompt = build_prompt(AnalysisType::Comprehensive, "x", None);
        assert!(prompt.contains("\"overall\""));
        assert!(prompt.contains("key_insights"));
        assert!(prompt.contains("recommendations"));
    }

    #[test]
    fn metadata_is_rendered_as_context() {
        let meta = serde_json::json!({"repo": "acme/widgets"});
        let prompt = build_prompt(AnalysisType::Sentiment, "x", Some(&meta));
        assert!(prompt.contains("Context:"));
        assert!(prompt.contains("acme/widgets"));
    }

    #[test]
    fn no_metadata_means_no_context_block() {
        let prompt = build_prompt(AnalysisType::Sentiment, "x", None);
        assert!(!prompt.contains("Context:"));
    }
}
