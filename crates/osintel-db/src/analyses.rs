//! Database operations for the `analyses` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `analyses` table.
///
/// `result` is stored as-is; callers must tolerate any shape inside it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRow {
    pub id: i64,
    pub source_id: i64,
    pub item_id: Option<i64>,
    pub analysis_type: String,
    pub result: Value,
    pub confidence: Option<f64>,
    pub model_used: Option<String>,
    pub processing_time: Option<f64>,
    pub created_at: DateTime<Utc>,
}

const ANALYSIS_COLUMNS: &str = "id, source_id, item_id, analysis_type, result, confidence, \
                                model_used, processing_time, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts an analysis result and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // write shape of a full analysis row; no sensible grouping
pub async fn insert_analysis(
    pool: &PgPool,
    source_id: i64,
    item_id: Option<i64>,
    analysis_type: &str,
    result: &Value,
    confidence: Option<f64>,
    model_used: Option<&str>,
    processing_time: Option<f64>,
) -> Result<AnalysisRow, DbError> {
    let row = sqlx::query_as::<_, AnalysisRow>(&format!(
        "INSERT INTO analyses \
           (source_id, item_id, analysis_type, result, confidence, model_used, processing_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {ANALYSIS_COLUMNS}"
    ))
    .bind(source_id)
    .bind(item_id)
    .bind(analysis_type)
    .bind(result)
    .bind(confidence)
    .bind(model_used)
    .bind(processing_time)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a single analysis by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_analysis(pool: &PgPool, analysis_id: i64) -> Result<Option<AnalysisRow>, DbError> {
    let row = sqlx::query_as::<_, AnalysisRow>(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = $1"
    ))
    .bind(analysis_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns analyses, newest first, optionally filtered by type.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_analyses(
    pool: &PgPool,
    analysis_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AnalysisRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses \
         WHERE ($1::VARCHAR IS NULL OR analysis_type = $1) \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(analysis_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns analyses for one source, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_analyses_for_source(
    pool: &PgPool,
    source_id: i64,
    limit: i64,
) -> Result<Vec<AnalysisRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses \
         WHERE source_id = $1 \
         ORDER BY created_at DESC \
         LIMIT $2"
    ))
    .bind(source_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns all analyses created inside a period, oldest first, optionally
/// restricted to a set of source ids.
///
/// Oldest-first ordering keeps downstream aggregation deterministic.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_analyses_in_period(
    pool: &PgPool,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    source_ids: Option<&[i64]>,
) -> Result<Vec<AnalysisRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses \
         WHERE created_at >= $1 AND created_at <= $2 \
           AND ($3::BIGINT[] IS NULL OR source_id = ANY($3)) \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(period_start)
    .bind(period_end)
    .bind(source_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns how many analyses match an optional type filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_analyses(pool: &PgPool, analysis_type: Option<&str>) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM analyses WHERE ($1::VARCHAR IS NULL OR analysis_type = $1)",
    )
    .bind(analysis_type)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
