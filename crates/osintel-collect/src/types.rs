use chrono::{DateTime, Utc};
use serde_json::Value;

/// HTTP client settings shared by all collectors.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "osintel-collector".to_string(),
        }
    }
}

/// The write shape of one newly collected item.
///
/// Ids and the collection timestamp are assigned by the persistence layer;
/// items are immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    /// `commit`, `issue`, `article`, ...
    pub item_type: String,
    /// Identifier within the external source (commit SHA, issue number,
    /// feed GUID). Used for idempotent inserts.
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub content: String,
    /// Source-specific context, stored as JSONB and passed to the analysis
    /// engine as prompt context.
    pub metadata: Value,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}
