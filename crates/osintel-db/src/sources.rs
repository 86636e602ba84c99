//! Database operations for the `data_sources` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `data_sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DataSourceRow {
    pub id: i64,
    pub name: String,
    pub source_type: String,
    pub config: Value,
    pub enabled: bool,
    pub check_interval: i32,
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SOURCE_COLUMNS: &str = "id, name, source_type, config, enabled, check_interval, \
                              last_checked, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all data sources, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sources(pool: &PgPool) -> Result<Vec<DataSourceRow>, DbError> {
    let rows = sqlx::query_as::<_, DataSourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM data_sources ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single data source by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_source(pool: &PgPool, source_id: i64) -> Result<Option<DataSourceRow>, DbError> {
    let row = sqlx::query_as::<_, DataSourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM data_sources WHERE id = $1"
    ))
    .bind(source_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a new data source and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_source(
    pool: &PgPool,
    name: &str,
    source_type: &str,
    config: &Value,
    enabled: bool,
    check_interval: i32,
) -> Result<DataSourceRow, DbError> {
    let row = sqlx::query_as::<_, DataSourceRow>(&format!(
        "INSERT INTO data_sources (name, source_type, config, enabled, check_interval) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {SOURCE_COLUMNS}"
    ))
    .bind(name)
    .bind(source_type)
    .bind(config)
    .bind(enabled)
    .bind(check_interval)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Updates a data source, overlaying supplied fields onto the existing row.
///
/// `Some(v)` sets the field, `None` preserves the existing value.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the id, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn update_source(
    pool: &PgPool,
    source_id: i64,
    name: Option<&str>,
    config: Option<&Value>,
    enabled: Option<bool>,
    check_interval: Option<i32>,
) -> Result<DataSourceRow, DbError> {
    let row = sqlx::query_as::<_, DataSourceRow>(&format!(
        "UPDATE data_sources \
         SET name           = COALESCE($2, name), \
             config         = COALESCE($3, config), \
             enabled        = COALESCE($4, enabled), \
             check_interval = COALESCE($5, check_interval), \
             updated_at     = NOW() \
         WHERE id = $1 \
         RETURNING {SOURCE_COLUMNS}"
    ))
    .bind(source_id)
    .bind(name)
    .bind(config)
    .bind(enabled)
    .bind(check_interval)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a data source and, via cascade, its collected items and analyses.
///
/// Returns `true` when a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_source(pool: &PgPool, source_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM data_sources WHERE id = $1")
        .bind(source_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns enabled sources whose check interval has elapsed since the last
/// collection (or that have never been collected).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_due_sources(pool: &PgPool) -> Result<Vec<DataSourceRow>, DbError> {
    let rows = sqlx::query_as::<_, DataSourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM data_sources \
         WHERE enabled = true \
           AND (last_checked IS NULL \
                OR last_checked + make_interval(secs => check_interval) <= NOW()) \
         ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records a completed collection pass for a source.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn mark_source_checked(pool: &PgPool, source_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE data_sources SET last_checked = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(source_id)
        .execute(pool)
        .await?;
    Ok(())
}
