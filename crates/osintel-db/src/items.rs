//! Database operations for the `collected_items` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `collected_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectedItemRow {
    pub id: i64,
    pub source_id: i64,
    pub item_type: String,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub content: String,
    pub metadata: Option<Value>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
}

const ITEM_COLUMNS: &str = "id, source_id, item_type, external_id, title, content, metadata, \
                            url, author, published_at, collected_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a collected item, skipping duplicates of (source, type, external id).
///
/// Returns the inserted row, or `None` when the item was already present.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // write shape of a full item row; no sensible grouping
pub async fn insert_item(
    pool: &PgPool,
    source_id: i64,
    item_type: &str,
    external_id: Option<&str>,
    title: Option<&str>,
    content: &str,
    metadata: &Value,
    url: Option<&str>,
    author: Option<&str>,
    published_at: Option<DateTime<Utc>>,
) -> Result<Option<CollectedItemRow>, DbError> {
    let row = sqlx::query_as::<_, CollectedItemRow>(&format!(
        "INSERT INTO collected_items \
           (source_id, item_type, external_id, title, content, metadata, url, author, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (source_id, item_type, external_id) WHERE external_id IS NOT NULL \
         DO NOTHING \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(source_id)
    .bind(item_type)
    .bind(external_id)
    .bind(title)
    .bind(content)
    .bind(metadata)
    .bind(url)
    .bind(author)
    .bind(published_at)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the most recently collected items for a source, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_items(
    pool: &PgPool,
    source_id: i64,
    limit: i64,
) -> Result<Vec<CollectedItemRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectedItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM collected_items \
         WHERE source_id = $1 \
         ORDER BY collected_at DESC \
         LIMIT $2"
    ))
    .bind(source_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns items collected for a source since a timestamp, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_since(
    pool: &PgPool,
    source_id: i64,
    since: DateTime<Utc>,
) -> Result<Vec<CollectedItemRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectedItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM collected_items \
         WHERE source_id = $1 AND collected_at >= $2 \
         ORDER BY collected_at ASC, id ASC"
    ))
    .bind(source_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns items by explicit ids, in the order of the `ids` slice.
///
/// Ids with no matching row are silently absent from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_by_ids(
    pool: &PgPool,
    ids: &[i64],
) -> Result<Vec<CollectedItemRow>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows = sqlx::query_as::<_, CollectedItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM collected_items WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    // Postgres returns ANY() matches in storage order; restore request order.
    let position = |id: i64| ids.iter().position(|x| *x == id).unwrap_or(usize::MAX);
    rows.sort_by_key(|row| position(row.id));
    Ok(rows)
}

/// Returns how many items have been collected for a source.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_items_for_source(pool: &PgPool, source_id: i64) -> Result<i64, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM collected_items WHERE source_id = $1")
            .bind(source_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
