//! Report export in JSON, HTML, and stubbed PDF form.
//!
//! The HTML renderer reads the stored insights JSONB tolerantly (missing
//! keys render as "no data" blocks rather than failing) and escapes every
//! report-derived text field before embedding it in markup.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::ReportError;

/// The read shape of a persisted report, as consumed by the exporter.
#[derive(Debug, Clone)]
pub struct ReportDoc {
    pub title: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub summary: String,
    pub insights: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Html,
    Pdf,
}

impl FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ReportError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// A rendered export payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPayload {
    /// The stored insights value, unchanged.
    Json(Value),
    Html(String),
    /// Placeholder bytes; real PDF rendering is out of scope.
    Pdf(Vec<u8>),
}

/// Export a report in the given format.
#[must_use]
pub fn export(report: &ReportDoc, format: ExportFormat) -> ExportPayload {
    match format {
        ExportFormat::Json => ExportPayload::Json(report.insights.clone()),
        ExportFormat::Html => ExportPayload::Html(render_html(report)),
        ExportFormat::Pdf => {
            tracing::warn!("PDF export not yet implemented; returning placeholder");
            ExportPayload::Pdf(b"PDF export not yet implemented".to_vec())
        }
    }
}

/// Parse a format string and export, reporting unsupported formats.
///
/// # Errors
///
/// Returns [`ReportError::UnsupportedFormat`] naming the received value and
/// the three supported formats.
pub fn export_as(report: &ReportDoc, format: &str) -> Result<ExportPayload, ReportError> {
    Ok(export(report, format.parse()?))
}

/// Escape text for embedding in HTML element content or attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn render_html(report: &ReportDoc) -> String {
    let title = escape_html(&report.title);
    let summary = escape_html(&report.summary);

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <title>{title}</title>\n\
         <style>\n\
         body {{ font-family: Arial, sans-serif; margin: 40px; }}\n\
         h1 {{ color: #333; }}\n\
         .metric {{ margin: 20px 0; padding: 15px; background: #f5f5f5; }}\n\
         .trend {{ margin: 10px 0; padding: 10px; border-left: 3px solid #007bff; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <p><strong>Period:</strong> {period_start} to {period_end}</p>\n\
         <p><strong>Generated:</strong> {created_at}</p>\n\
         <h2>Summary</h2>\n\
         <p>{summary}</p>\n\
         <h2>Sentiment Distribution</h2>\n\
         <div class=\"metric\">\n{sentiment}</div>\n\
         <h2>Top Trends</h2>\n{trends}\
         <h2>Key Insights</h2>\n\
         <ul>\n{insights}</ul>\n\
         </body>\n\
         </html>\n",
        period_start = report.period_start.to_rfc3339(),
        period_end = report.period_end.to_rfc3339(),
        created_at = report.created_at.to_rfc3339(),
        sentiment = render_sentiment_html(report.insights.get("sentiment_distribution")),
        trends = render_trends_html(report.insights.get("top_trends")),
        insights = render_insights_html(report.insights.get("key_insights")),
    )
}

fn render_sentiment_html(sentiment: Option<&Value>) -> String {
    let Some(pcts) = sentiment.and_then(|s| s.get("percentages")) else {
        return "<p>No sentiment data available</p>\n".to_string();
    };

    let pct = |key: &str| pcts.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    format!(
        "<p>Positive: {}%</p>\n<p>Neutral: {}%</p>\n<p>Negative: {}%</p>\n",
        pct("positive"),
        pct("neutral"),
        pct("negative"),
    )
}

fn render_trends_html(trends: Option<&Value>) -> String {
    let trends = trends.and_then(Value::as_array);
    let Some(trends) = trends.filter(|t| !t.is_empty()) else {
        return "<p>No trends data available</p>\n".to_string();
    };

    let mut html = String::new();
    for trend in trends {
        let topic = trend.get("topic").and_then(Value::as_str).unwrap_or("");
        let mentions = trend
            .get("total_mentions")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let sentiment = trend
            .get("overall_sentiment")
            .and_then(Value::as_str)
            .unwrap_or("neutral");
        let _ = writeln!(
            html,
            "<div class=\"trend\"><strong>{}</strong> - {mentions} mentions ({} sentiment)</div>",
            escape_html(topic),
            escape_html(sentiment),
        );
    }
    html
}

fn render_insights_html(insights: Option<&Value>) -> String {
    let Some(insights) = insights.and_then(Value::as_array) else {
        return String::new();
    };

    let mut html = String::new();
    for insight in insights {
        if let Some(text) = insight.as_str() {
            let _ = writeln!(html, "<li>{}</li>", escape_html(text));
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_report(insights: Value) -> ReportDoc {
        ReportDoc {
            title: "Weekly OSINT Report".to_string(),
            period_start: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap(),
            summary: "Analysis of 12 data points.".to_string(),
            insights,
            created_at: Utc.with_ymd_and_hms(2025, 6, 8, 6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn json_export_is_identity_over_stored_insights() {
        let insights = json!({
            "total_analyses": 12,
            "sentiment_distribution": {"percentages": {"positive": 60.0}},
            "top_trends": [{"topic": "alpha", "total_mentions": 4}],
        });
        let report = sample_report(insights.clone());

        let payload = export_as(&report, "json").expect("json is supported");
        assert_eq!(payload, ExportPayload::Json(insights));
    }

    #[test]
    fn unsupported_format_names_received_value_and_valid_formats() {
        let report = sample_report(json!({}));
        let err = export_as(&report, "xml").expect_err("xml is unsupported");

        let msg = err.to_string();
        assert!(msg.contains("xml"), "names the received format: {msg}");
        assert!(msg.contains("json"), "{msg}");
        assert!(msg.contains("html"), "{msg}");
        assert!(msg.contains("pdf"), "{msg}");
    }

    #[test]
    fn pdf_export_returns_placeholder_payload() {
        let report = sample_report(json!({}));
        let payload = export_as(&report, "pdf").expect("pdf stub is supported");
        assert_eq!(
            payload,
            ExportPayload::Pdf(b"PDF export not yet implemented".to_vec())
        );
    }

    #[test]
    fn html_export_embeds_sentiment_trends_and_insights() {
        let report = sample_report(json!({
            "sentiment_distribution": {
                "percentages": {"positive": 60.0, "negative": 20.0, "neutral": 20.0}
            },
            "top_trends": [
                {"topic": "release cadence", "total_mentions": 8, "overall_sentiment": "positive"}
            ],
            "key_insights": ["shipping is accelerating"],
        }));

        let ExportPayload::Html(html) = export(&report, ExportFormat::Html) else {
            panic!("expected HTML payload");
        };
        assert!(html.contains("Weekly OSINT Report"));
        assert!(html.contains("Positive: 60%"));
        assert!(html.contains("<strong>release cadence</strong> - 8 mentions (positive sentiment)"));
        assert!(html.contains("<li>shipping is accelerating</li>"));
    }

    #[test]
    fn html_export_escapes_report_derived_text() {
        let mut report = sample_report(json!({
            "top_trends": [{"topic": "<svg onload=alert(1)>", "total_mentions": 1}],
            "key_insights": ["<script>alert('x')</script>"],
        }));
        report.title = "Q2 <Report> & \"Friends\"".to_string();

        let ExportPayload::Html(html) = export(&report, ExportFormat::Html) else {
            panic!("expected HTML payload");
        };
        assert!(!html.contains("<script>alert"), "script must be escaped");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Q2 &lt;Report&gt; &amp; &quot;Friends&quot;"));
        assert!(html.contains("&lt;svg onload=alert(1)&gt;"));
    }

    #[test]
    fn html_export_degrades_gracefully_on_missing_keys() {
        let report = sample_report(json!({}));
        let ExportPayload::Html(html) = export(&report, ExportFormat::Html) else {
            panic!("expected HTML payload");
        };
        assert!(html.contains("No sentiment data available"));
        assert!(html.contains("No trends data available"));
    }
}
