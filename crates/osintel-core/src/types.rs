use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four recognized analysis kinds.
///
/// Serialized as lowercase strings (`"sentiment"`, `"trend"`, `"summary"`,
/// `"comprehensive"`) both over the wire and in the `analyses` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Sentiment,
    Trend,
    Summary,
    Comprehensive,
}

impl AnalysisType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::Sentiment => "sentiment",
            AnalysisType::Trend => "trend",
            AnalysisType::Summary => "summary",
            AnalysisType::Comprehensive => "comprehensive",
        }
    }

    /// Parse an analysis-type string.
    ///
    /// Unrecognized values fall back to [`AnalysisType::Comprehensive`],
    /// matching the prompt-selection behavior of the engine.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "sentiment" => AnalysisType::Sentiment,
            "trend" => AnalysisType::Trend,
            "summary" => AnalysisType::Summary,
            _ => AnalysisType::Comprehensive,
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive time period `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The read shape of one stored analysis result, as consumed by the
/// aggregator and the trends endpoint.
///
/// `payload` is the raw JSONB result column. Its structure is not
/// schema-enforced at write time; readers must tolerate missing or
/// malformed keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDoc {
    pub analysis_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}
