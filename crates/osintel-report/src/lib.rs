//! Aggregation and reporting for osintel.
//!
//! Reduces an ordered collection of stored analysis results into an
//! [`Insights`] aggregate (sentiment distribution, ranked trends,
//! deduplicated key insights, activity counts), composes a short
//! deterministic narrative summary, and exports persisted reports as JSON,
//! HTML, or a stubbed PDF. Every read path tolerates missing or malformed
//! payload keys, so a single bad result can never abort an aggregate.

pub mod error;
pub mod export;
pub mod insights;
pub mod summary;

pub use error::ReportError;
pub use export::{export, export_as, ExportFormat, ExportPayload, ReportDoc};
pub use insights::{
    generate_insights, generate_insights_at, ActivitySummary, Insights, SentimentCounts,
    SentimentDistribution, SentimentPercentages, TrendSummary,
};
pub use summary::generate_summary;
