use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use osintel_core::{AnalysisDoc, AnalysisType};
use osintel_engine::AnalysisInput;
use osintel_report::insights::{generate_insights, TrendSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, normalize_offset, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct AnalysisResultItem {
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

impl From<osintel_db::AnalysisRow> for AnalysisResultItem {
    fn from(row: osintel_db::AnalysisRow) -> Self {
        Self {
            id: row.id,
            source_id: row.source_id,
            item_id: row.item_id,
            analysis_type: row.analysis_type,
            result: row.result,
            confidence: row.confidence,
            model_used: row.model_used,
            processing_time: row.processing_time,
            created_at: row.created_at,
        }
    }
}

/// Request body for `POST /analysis/analyze`.
///
/// Exactly one of `source_id` (analyze the source's last 24 h of items) or
/// `item_ids` (analyze specific items) must be given.
#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeBody {
    pub source_id: Option<i64>,
    pub item_ids: Option<Vec<i64>>,
    pub analysis_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalyzeSummary {
    pub analysis_type: String,
    pub items_analyzed: usize,
    pub failures: usize,
    pub analysis_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResultsQuery {
    pub analysis_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SourceTrends {
    pub source_id: i64,
    pub days: i64,
    pub analyses_considered: u64,
    pub trends: Vec<TrendSummary>,
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<ApiResponse<AnalyzeSummary>>, ApiError> {
    let analysis_type = AnalysisType::parse_lossy(body.analysis_type.as_deref().unwrap_or(""));

    let items = match (&body.source_id, &body.item_ids) {
        (Some(source_id), _) => {
            let since = Utc::now() - Duration::hours(24);
            osintel_db::list_items_since(&state.pool, *source_id, since)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        }
        (None, Some(item_ids)) => osintel_db::list_items_by_ids(&state.pool, item_ids)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?,
        (None, None) => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "either source_id or item_ids is required",
            ));
        }
    };

    let inputs: Vec<AnalysisInput> = items
        .iter()
        .map(|item| AnalysisInput {
            content: item.content.clone(),
            metadata: item.metadata.clone(),
        })
        .collect();

    let outcomes = state.engine.batch_analyze(&inputs, analysis_type).await;

    // Every outcome is stored, including recovered failures: the error payload
    // is data, and the aggregate later skips what it cannot read.
    let mut analysis_ids = Vec::with_capacity(outcomes.len());
    let mut failures = 0;
    for (item, outcome) in items.iter().zip(&outcomes) {
        if outcome.is_error() {
            failures += 1;
        }
        let row = osintel_db::insert_analysis(
            &state.pool,
            item.source_id,
            Some(item.id),
            outcome.analysis_type.as_str(),
            &outcome.payload,
            outcome.confidence,
            Some(&outcome.model),
            Some(outcome.processing_time),
        )
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
        analysis_ids.push(row.id);
    }

    Ok(Json(ApiResponse {
        data: AnalyzeSummary {
            analysis_type: analysis_type.as_str().to_string(),
            items_analyzed: outcomes.len(),
            failures,
            analysis_ids,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_results(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<ApiResponse<Vec<AnalysisResultItem>>>, ApiError> {
    let rows = osintel_db::list_analyses(
        &state.pool,
        query.analysis_type.as_deref(),
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(AnalysisResultItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_result(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(analysis_id): Path<i64>,
) -> Result<Json<ApiResponse<AnalysisResultItem>>, ApiError> {
    let row = osintel_db::get_analysis(&state.pool, analysis_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "analysis not found"))?;

    Ok(Json(ApiResponse {
        data: AnalysisResultItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn source_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(source_id): Path<i64>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<ApiResponse<SourceTrends>>, ApiError> {
    let days = query.days.unwrap_or(7).clamp(1, 90);
    let end = Utc::now();
    let start = end - Duration::days(days);

    let source_ids = [source_id];
    let rows = osintel_db::list_analyses_in_period(&state.pool, start, end, Some(&source_ids))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let docs: Vec<AnalysisDoc> = rows
        .iter()
        .map(|row| AnalysisDoc {
            analysis_type: row.analysis_type.clone(),
            payload: row.result.clone(),
            created_at: row.created_at,
        })
        .collect();

    let insights = generate_insights(&docs);

    Ok(Json(ApiResponse {
        data: SourceTrends {
            source_id,
            days,
            analyses_considered: insights.total_analyses,
            trends: insights.top_trends,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
