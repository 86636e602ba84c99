//! Database operations for the `reports` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `reports` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub title: String,
    pub report_type: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub source_ids: Option<Vec<i64>>,
    pub summary: Option<String>,
    pub insights: Value,
    pub created_at: DateTime<Utc>,
}

const REPORT_COLUMNS: &str = "id, title, report_type, period_start, period_end, source_ids, \
                              summary, insights, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a generated report and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::too_many_arguments)] // write shape of a full report row; no sensible grouping
pub async fn insert_report(
    pool: &PgPool,
    title: &str,
    report_type: &str,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    source_ids: Option<&[i64]>,
    summary: Option<&str>,
    insights: &Value,
) -> Result<ReportRow, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "INSERT INTO reports \
           (title, report_type, period_start, period_end, source_ids, summary, insights) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {REPORT_COLUMNS}"
    ))
    .bind(title)
    .bind(report_type)
    .bind(period_start)
    .bind(period_end)
    .bind(source_ids)
    .bind(summary)
    .bind(insights)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns reports, newest first, optionally filtered by report type.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reports(
    pool: &PgPool,
    report_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ReportRow>, DbError> {
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports \
         WHERE ($1::VARCHAR IS NULL OR report_type = $1) \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(report_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single report by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_report(pool: &PgPool, report_id: i64) -> Result<Option<ReportRow>, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
    ))
    .bind(report_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the most recently generated report, or `None` when none exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_report(pool: &PgPool) -> Result<Option<ReportRow>, DbError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, id DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Deletes a report. Returns `true` when a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_report(pool: &PgPool, report_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM reports WHERE id = $1")
        .bind(report_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
