//! Executive summary composition.

use crate::insights::Insights;

/// Render a short narrative from aggregate insights.
///
/// The output is fully deterministic: the dominant sentiment is a strict
/// argmax over the three percentages, and exact ties resolve by the fixed
/// precedence positive, then negative, then neutral.
#[must_use]
pub fn generate_summary(insights: &Insights) -> String {
    let mut parts = vec![format!(
        "Analysis of {} data points collected during the specified period.",
        insights.total_analyses
    )];

    let pcts = &insights.sentiment_distribution.percentages;
    let (dominant, pct) = dominant_sentiment(pcts.positive, pcts.negative, pcts.neutral);
    parts.push(format!(
        "Overall sentiment is predominantly {dominant} ({pct}%)."
    ));

    if !insights.top_trends.is_empty() {
        let names: Vec<&str> = insights
            .top_trends
            .iter()
            .take(3)
            .map(|t| t.topic.as_str())
            .collect();
        parts.push(format!(
            "Top trending topics include: {}.",
            names.join(", ")
        ));
    }

    parts.join(" ")
}

/// Strict argmax with fixed tie-break precedence positive > negative > neutral.
fn dominant_sentiment(positive: f64, negative: f64, neutral: f64) -> (&'static str, f64) {
    let mut dominant = ("positive", positive);
    for candidate in [("negative", negative), ("neutral", neutral)] {
        if candidate.1 > dominant.1 {
            dominant = candidate;
        }
    }
    dominant
}
