use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;
use crate::scheduler::collect_source as run_collection;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SourceItem {
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

impl From<osintel_db::DataSourceRow> for SourceItem {
    fn from(row: osintel_db::DataSourceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            source_type: row.source_type,
            config: row.config,
            enabled: row.enabled,
            check_interval: row.check_interval,
            last_checked: row.last_checked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateSourceBody {
    pub name: String,
    pub source_type: String,
    pub config: Value,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_check_interval")]
    pub check_interval: i32,
}

fn default_enabled() -> bool {
    true
}

fn default_check_interval() -> i32 {
    300
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateSourceBody {
    pub name: Option<String>,
    pub config: Option<Value>,
    pub enabled: Option<bool>,
    pub check_interval: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(super) struct ConnectionTestResult {
    pub source_id: i64,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectionResult {
    pub source_id: i64,
    pub items_collected: u64,
}

pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<SourceItem>>>, ApiError> {
    let rows = osintel_db::list_sources(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SourceItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<i64>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    let row = osintel_db::get_source(&state.pool, source_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "source not found"))?;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateSourceBody>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    // The registry is the single authority on which source types exist and
    // which configs are well-formed.
    state
        .registry
        .create(&body.source_type, &body.config)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let row = osintel_db::create_source(
        &state.pool,
        &body.name,
        &body.source_type,
        &body.config,
        body.enabled,
        body.check_interval,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<i64>,
    Json(body): Json<UpdateSourceBody>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    let row = osintel_db::update_source(
        &state.pool,
        source_id,
        body.name.as_deref(),
        body.config.as_ref(),
        body.enabled,
        body.check_interval,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let deleted = osintel_db::delete_source(&state.pool, source_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !deleted {
        return Err(ApiError::new(req_id.0, "not_found", "source not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({"deleted": source_id}),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn test_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<i64>,
) -> Result<Json<ApiResponse<ConnectionTestResult>>, ApiError> {
    let row = osintel_db::get_source(&state.pool, source_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "source not found"))?;

    let collector = state
        .registry
        .create(&row.source_type, &row.config)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let success = collector.test_connection().await;

    Ok(Json(ApiResponse {
        data: ConnectionTestResult { source_id, success },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn collect_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<i64>,
) -> Result<Json<ApiResponse<CollectionResult>>, ApiError> {
    let row = osintel_db::get_source(&state.pool, source_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "source not found"))?;

    if !row.enabled {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "source is disabled",
        ));
    }

    let items_collected = run_collection(&state.pool, &state.registry, &row)
        .await
        .map_err(|e| {
            tracing::error!(source_id, error = %e, "manual collection failed");
            ApiError::new(req_id.0.clone(), "internal_error", "collection failed")
        })?;

    Ok(Json(ApiResponse {
        data: CollectionResult {
            source_id,
            items_collected,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
