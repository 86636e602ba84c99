use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use osintel_core::AnalysisDoc;
use osintel_report::{export_as, generate_insights, generate_summary, ExportPayload, ReportDoc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, normalize_offset, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ReportItem {
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

impl From<osintel_db::ReportRow> for ReportItem {
    fn from(row: osintel_db::ReportRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            report_type: row.report_type,
            period_start: row.period_start,
            period_end: row.period_end,
            source_ids: row.source_ids,
            summary: row.summary,
            insights: row.insights,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GenerateReportBody {
    pub title: Option<String>,
    pub report_type: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub source_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListReportsQuery {
    pub report_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ExportQuery {
    pub format: Option<String>,
}

pub(super) async fn generate_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GenerateReportBody>,
) -> Result<Json<ApiResponse<ReportItem>>, ApiError> {
    if body.period_end < body.period_start {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "period_end must not precede period_start",
        ));
    }

    let rows = osintel_db::list_analyses_in_period(
        &state.pool,
        body.period_start,
        body.period_end,
        body.source_ids.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // Aggregating an empty set is well-defined; an empty report is not.
    // Zero matching analyses is the boundary-level "not found".
    if rows.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "no analyses found in the requested period",
        ));
    }

    let docs: Vec<AnalysisDoc> = rows
        .iter()
        .map(|row| AnalysisDoc {
            analysis_type: row.analysis_type.clone(),
            payload: row.result.clone(),
            created_at: row.created_at,
        })
        .collect();

    let insights = generate_insights(&docs);
    let summary = generate_summary(&insights);
    let insights_value = serde_json::to_value(&insights).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize insights");
        ApiError::new(req_id.0.clone(), "internal_error", "report generation failed")
    })?;

    let title = body
        .title
        .unwrap_or_else(|| "OSINT Analysis Report".to_string());
    let report_type = body.report_type.unwrap_or_else(|| "custom".to_string());

    let row = osintel_db::insert_report(
        &state.pool,
        &title,
        &report_type,
        body.period_start,
        body.period_end,
        body.source_ids.as_deref(),
        Some(&summary),
        &insights_value,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ReportItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ApiResponse<Vec<ReportItem>>>, ApiError> {
    let rows = osintel_db::list_reports(
        &state.pool,
        query.report_type.as_deref(),
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ReportItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn latest_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ReportItem>>, ApiError> {
    let row = osintel_db::get_latest_report(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "no reports generated yet"))?;

    Ok(Json(ApiResponse {
        data: ReportItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(report_id): Path<i64>,
) -> Result<Json<ApiResponse<ReportItem>>, ApiError> {
    let row = osintel_db::get_report(&state.pool, report_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "report not found"))?;

    Ok(Json(ApiResponse {
        data: ReportItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn export_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(report_id): Path<i64>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let row = osintel_db::get_report(&state.pool, report_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "report not found"))?;

    let doc = ReportDoc {
        title: row.title,
        period_start: row.period_start,
        period_end: row.period_end,
        summary: row.summary.unwrap_or_default(),
        insights: row.insights,
        created_at: row.created_at,
    };

    let format = query.format.as_deref().unwrap_or("json");
    let payload = export_as(&doc, format)
        .map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.to_string()))?;

    let response = match payload {
        ExportPayload::Json(value) => Json(value).into_response(),
        ExportPayload::Html(html) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        ExportPayload::Pdf(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            bytes,
        )
            .into_response(),
    };
    Ok(response)
}

pub(super) async fn delete_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(report_id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let deleted = osintel_db::delete_report(&state.pool, report_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !deleted {
        return Err(ApiError::new(req_id.0, "not_found", "report not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({"deleted": report_id}),
        meta: ResponseMeta::new(req_id.0),
    }))
}
