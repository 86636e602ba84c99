//! Multi-document aggregation over stored analysis results.
//!
//! The aggregation is a pure reduction: given the same ordered input and the
//! same generation timestamp it produces byte-identical output. Payload keys
//! are looked up tolerantly: missing or malformed fields are skipped, never
//! fatal.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use osintel_core::{AnalysisDoc, Period};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Merged trends are truncated to this many entries.
pub const TOP_TRENDS_LIMIT: usize = 10;

/// Deduplicated key insights are capped at this many entries.
pub const KEY_INSIGHTS_LIMIT: usize = 15;

/// Mean trend score above which a topic is considered positive overall;
/// below the negation, negative.
const TREND_SENTIMENT_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentPercentages {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub counts: SentimentCounts,
    pub percentages: SentimentPercentages,
}

/// A named topic merged across results: summed mentions plus the sentiment
/// derived from the mean per-mention score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub topic: String,
    pub total_mentions: u64,
    pub overall_sentiment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub by_type: BTreeMap<String, u64>,
    pub total: u64,
}

/// The aggregate computed over a set of analysis results.
///
/// Purely derived; recomputing over an unchanged result set with the same
/// `generated_at` yields a byte-identical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub total_analyses: u64,
    pub period: Option<Period>,
    pub sentiment_distribution: SentimentDistribution,
    pub top_trends: Vec<TrendSummary>,
    pub key_insights: Vec<String>,
    pub activity_summary: ActivitySummary,
    pub generated_at: DateTime<Utc>,
}

/// Aggregate insights over the given results, stamped with the current time.
#[must_use]
pub fn generate_insights(docs: &[AnalysisDoc]) -> Insights {
    generate_insights_at(docs, Utc::now())
}

/// Aggregate insights with an explicit generation timestamp.
///
/// Empty input yields a zero aggregate: total 0, no period, empty trend and
/// insight lists, all sentiment counts and percentages 0.
#[must_use]
pub fn generate_insights_at(docs: &[AnalysisDoc], generated_at: DateTime<Utc>) -> Insights {
    Insights {
        total_analyses: docs.len() as u64,
        period: period_bounds(docs),
        sentiment_distribution: sentiment_distribution(docs),
        top_trends: top_trends(docs, TOP_TRENDS_LIMIT),
        key_insights: key_insights(docs),
        activity_summary: activity_summary(docs),
        generated_at,
    }
}

fn period_bounds(docs: &[AnalysisDoc]) -> Option<Period> {
    let start = docs.iter().map(|d| d.created_at).min()?;
    let end = docs.iter().map(|d| d.created_at).max()?;
    Some(Period { start, end })
}

/// Read a result payload's sentiment label, accepting either a flat string
/// (`"sentiment": "positive"`) or the comprehensive form
/// (`"sentiment": {"overall": "positive", ...}`).
fn sentiment_label(payload: &Value) -> Option<&str> {
    match payload.get("sentiment")? {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => match map.get("overall") {
            // Absent key defaults to neutral; a present non-string is skipped.
            None => Some("neutral"),
            Some(v) => v.as_str(),
        },
        _ => None,
    }
}

fn sentiment_distribution(docs: &[AnalysisDoc]) -> SentimentDistribution {
    let mut counts = SentimentCounts::default();

    for doc in docs {
        match sentiment_label(&doc.payload) {
            Some("positive") => counts.positive += 1,
            Some("negative") => counts.negative += 1,
            Some("neutral") => counts.neutral += 1,
            // Values outside the three buckets are skipped, not counted.
            _ => {}
        }
    }

    let total = counts.positive + counts.negative + counts.neutral;
    let percentages = if total == 0 {
        SentimentPercentages::default()
    } else {
        SentimentPercentages {
            positive: percentage(counts.positive, total),
            negative: percentage(counts.negative, total),
            neutral: percentage(counts.neutral, total),
        }
    };

    SentimentDistribution {
        counts,
        percentages,
    }
}

/// count/total as a percentage rounded to 2 decimals.
#[allow(clippy::cast_precision_loss)]
fn percentage(count: u64, total: u64) -> f64 {
    ((count as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
}

struct TrendAcc {
    topic: String,
    total_mentions: u64,
    score_sum: i64,
    score_count: u64,
}

/// Merge every `trends` entry across all results, keyed by exact topic.
///
/// Mentions default to 1 when absent or malformed. Per-mention scores are
/// +1/-1/0 for positive/negative/other. The final list is sorted by total
/// mentions descending with a stable sort, so ties keep first-encountered
/// order, then truncated to `limit`.
fn top_trends(docs: &[AnalysisDoc], limit: usize) -> Vec<TrendSummary> {
    let mut order: Vec<TrendAcc> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for doc in docs {
        let Some(trends) = doc.payload.get("trends").and_then(Value::as_array) else {
            continue;
        };
        for trend in trends {
            let Some(topic) = trend.get("topic").and_then(Value::as_str) else {
                continue;
            };
            if topic.is_empty() {
                continue;
            }

            let slot = *index.entry(topic.to_string()).or_insert_with(|| {
                order.push(TrendAcc {
                    topic: topic.to_string(),
                    total_mentions: 0,
                    score_sum: 0,
                    score_count: 0,
                });
                order.len() - 1
            });

            let acc = &mut order[slot];
            acc.total_mentions += trend.get("mentions").and_then(Value::as_u64).unwrap_or(1);
            acc.score_sum += match trend.get("sentiment").and_then(Value::as_str) {
                Some("positive") => 1,
                Some("negative") => -1,
                _ => 0,
            };
            acc.score_count += 1;
        }
    }

    let mut merged: Vec<TrendSummary> = order
        .into_iter()
        .map(|acc| TrendSummary {
            topic: acc.topic,
            total_mentions: acc.total_mentions,
            overall_sentiment: overall_sentiment(acc.score_sum, acc.score_count).to_string(),
        })
        .collect();

    // Vec::sort_by is stable: equal mention counts keep first-seen order.
    merged.sort_by(|a, b| b.total_mentions.cmp(&a.total_mentions));
    merged.truncate(limit);
    merged
}

#[allow(clippy::cast_precision_loss)]
fn overall_sentiment(score_sum: i64, score_count: u64) -> &'static str {
    if score_count == 0 {
        return "neutral";
    }
    let mean = score_sum as f64 / score_count as f64;
    if mean > TREND_SENTIMENT_THRESHOLD {
        "positive"
    } else if mean < -TREND_SENTIMENT_THRESHOLD {
        "negative"
    } else {
        "neutral"
    }
}

/// Concatenate `key_insights`, `recommendations`, and `key_points` across
/// all results, deduplicate preserving first-seen order, and cap the list
/// only after full accumulation.
fn key_insights(docs: &[AnalysisDoc]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut insights: Vec<String> = Vec::new();

    for doc in docs {
        for field in ["key_insights", "recommendations", "key_points"] {
            let Some(entries) = doc.payload.get(field).and_then(Value::as_array) else {
                continue;
            };
            for entry in entries {
                let Some(text) = entry.as_str() else { continue };
                if seen.insert(text) {
                    insights.push(text.to_string());
                }
            }
        }
    }

    insights.truncate(KEY_INSIGHTS_LIMIT);
    insights
}

fn activity_summary(docs: &[AnalysisDoc]) -> ActivitySummary {
    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
    for doc in docs {
        *by_type.entry(doc.analysis_type.clone()).or_insert(0) += 1;
    }
    ActivitySummary {
        by_type,
        total: docs.len() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(analysis_type: &str, payload: Value) -> AnalysisDoc {
        AnalysisDoc {
            analysis_type: analysis_type.to_string(),
            payload,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn doc_at(payload: Value, hour: u32) -> AnalysisDoc {
        AnalysisDoc {
            analysis_type: "comprehensive".to_string(),
            payload,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_input_yields_zero_aggregate() {
        let insights = generate_insights(&[]);

        assert_eq!(insights.total_analyses, 0);
        assert!(insights.period.is_none());
        assert_eq!(insights.sentiment_distribution.counts.positive, 0);
        assert!((insights.sentiment_distribution.percentages.positive - 0.0).abs() < f64::EPSILON);
        assert!(insights.top_trends.is_empty());
        assert!(insights.key_insights.is_empty());
        assert!(insights.activity_summary.by_type.is_empty());
        assert_eq!(insights.activity_summary.total, 0);
    }

    #[test]
    fn sentiment_percentages_three_one_one() {
        let docs = vec![
            doc("sentiment", json!({"sentiment": "positive"})),
            doc("sentiment", json!({"sentiment": "positive"})),
            doc("sentiment", json!({"sentiment": "positive"})),
            doc("sentiment", json!({"sentiment": "negative"})),
            doc("sentiment", json!({"sentiment": "neutral"})),
        ];
        let dist = sentiment_distribution(&docs);

        assert_eq!(dist.counts.positive, 3);
        assert_eq!(dist.counts.negative, 1);
        assert_eq!(dist.counts.neutral, 1);
        assert!((dist.percentages.positive - 60.0).abs() < f64::EPSILON);
        assert!((dist.percentages.negative - 20.0).abs() < f64::EPSILON);
        assert!((dist.percentages.neutral - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nested_sentiment_reads_overall_key() {
        let docs = vec![doc(
            "comprehensive",
            json!({"sentiment": {"overall": "negative", "confidence": 0.8}}),
        )];
        let dist = sentiment_distribution(&docs);
        assert_eq!(dist.counts.negative, 1);
    }

    #[test]
    fn sentiment_object_without_overall_counts_neutral() {
        let docs = vec![doc("comprehensive", json!({"sentiment": {"confidence": 0.8}}))];
        let dist = sentiment_distribution(&docs);
        assert_eq!(dist.counts.neutral, 1);
    }

    #[test]
    fn out_of_vocabulary_sentiment_is_skipped() {
        let docs = vec![
            doc("sentiment", json!({"sentiment": "ecstatic"})),
            doc("sentiment", json!({"sentiment": 42})),
            doc("sentiment", json!({"no_sentiment_key": true})),
        ];
        let dist = sentiment_distribution(&docs);
        assert_eq!(dist.counts, SentimentCounts::default());
        // Zero in-vocabulary labels must not divide by zero.
        assert!((dist.percentages.positive - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trends_merge_by_topic_and_derive_neutral_from_mixed_scores() {
        let docs = vec![
            doc(
                "trend",
                json!({"trends": [{"topic": "A", "mentions": 5, "sentiment": "positive"}]}),
            ),
            doc(
                "trend",
                json!({"trends": [{"topic": "A", "mentions": 3, "sentiment": "negative"}]}),
            ),
        ];
        let trends = top_trends(&docs, TOP_TRENDS_LIMIT);

        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].topic, "A");
        assert_eq!(trends[0].total_mentions, 8);
        // mean score (+1 - 1) / 2 = 0 → neutral
        assert_eq!(trends[0].overall_sentiment, "neutral");
    }

    #[test]
    fn trend_mentions_default_to_one_when_absent() {
        let docs = vec![doc("trend", json!({"trends": [{"topic": "B"}]}))];
        let trends = top_trends(&docs, TOP_TRENDS_LIMIT);
        assert_eq!(trends[0].total_mentions, 1);
        assert_eq!(trends[0].overall_sentiment, "neutral");
    }

    #[test]
    fn trend_ties_keep_first_encountered_order() {
        let docs = vec![doc(
            "trend",
            json!({"trends": [
                {"topic": "zulu", "mentions": 2},
                {"topic": "alpha", "mentions": 2},
                {"topic": "mike", "mentions": 7},
            ]}),
        )];
        let trends = top_trends(&docs, TOP_TRENDS_LIMIT);

        let topics: Vec<&str> = trends.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(topics, vec!["mike", "zulu", "alpha"]);
    }

    #[test]
    fn trends_truncate_to_limit_after_global_sort() {
        let entries: Vec<Value> = (0..15)
            .map(|i| json!({"topic": format!("t{i}"), "mentions": 15 - i}))
            .collect();
        let docs = vec![doc("trend", json!({"trends": entries}))];
        let trends = top_trends(&docs, TOP_TRENDS_LIMIT);

        assert_eq!(trends.len(), TOP_TRENDS_LIMIT);
        assert_eq!(trends[0].topic, "t0");
        assert_eq!(trends[9].topic, "t9");
    }

    #[test]
    fn strongly_positive_trend_is_positive() {
        let docs = vec![
            doc("trend", json!({"trends": [{"topic": "launch", "sentiment": "positive"}]})),
            doc("trend", json!({"trends": [{"topic": "launch", "sentiment": "positive"}]})),
            doc("trend", json!({"trends": [{"topic": "launch", "sentiment": "neutral"}]})),
        ];
        let trends = top_trends(&docs, TOP_TRENDS_LIMIT);
        // mean 2/3 ≈ 0.67 > 0.3
        assert_eq!(trends[0].overall_sentiment, "positive");
    }

    #[test]
    fn key_insights_dedup_preserves_first_seen_order() {
        let docs = vec![
            doc(
                "comprehensive",
                json!({"key_insights": ["alpha", "beta"], "recommendations": ["alpha", "gamma"]}),
            ),
            doc("summary", json!({"key_points": ["beta", "delta"]})),
        ];
        let insights = key_insights(&docs);
        assert_eq!(insights, vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn key_insights_cap_applies_after_full_accumulation() {
        let entries: Vec<String> = (0..20).map(|i| format!("insight {i}")).collect();
        let docs = vec![doc("comprehensive", json!({"key_insights": entries}))];
        let insights = key_insights(&docs);

        assert_eq!(insights.len(), KEY_INSIGHTS_LIMIT);
        assert_eq!(insights[0], "insight 0");
        assert_eq!(insights[14], "insight 14");
    }

    #[test]
    fn non_string_insight_entries_are_skipped() {
        let docs = vec![doc(
            "comprehensive",
            json!({"key_insights": ["keep", 42, null, {"nested": true}]}),
        )];
        assert_eq!(key_insights(&docs), vec!["keep"]);
    }

    #[test]
    fn activity_summary_counts_by_type() {
        let docs = vec![
            doc("sentiment", json!({})),
            doc("sentiment", json!({})),
            doc("trend", json!({})),
        ];
        let activity = activity_summary(&docs);
        assert_eq!(activity.by_type.get("sentiment"), Some(&2));
        assert_eq!(activity.by_type.get("trend"), Some(&1));
        assert_eq!(activity.total, 3);
    }

    #[test]
    fn period_spans_min_and_max_created_at() {
        let docs = vec![
            doc_at(json!({}), 9),
            doc_at(json!({}), 3),
            doc_at(json!({}), 17),
        ];
        let insights = generate_insights(&docs);
        let period = insights.period.expect("period for non-empty input");
        assert_eq!(period.start, Utc.with_ymd_and_hms(2025, 6, 1, 3, 0, 0).unwrap());
        assert_eq!(period.end, Utc.with_ymd_and_hms(2025, 6, 1, 17, 0, 0).unwrap());
    }

    #[test]
    fn aggregation_is_byte_identical_for_identical_input() {
        let docs = vec![
            doc(
                "comprehensive",
                json!({
                    "sentiment": {"overall": "positive"},
                    "trends": [
                        {"topic": "alpha", "mentions": 2, "sentiment": "positive"},
                        {"topic": "beta", "mentions": 2, "sentiment": "negative"},
                    ],
                    "key_insights": ["one", "two"],
                }),
            ),
            doc("sentiment", json!({"sentiment": "negative"})),
        ];
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

        let first = serde_json::to_string(&generate_insights_at(&docs, at)).expect("serialize");
        let second = serde_json::to_string(&generate_insights_at(&docs, at)).expect("serialize");
        assert_eq!(first, second);
    }
}
