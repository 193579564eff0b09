//! HTTP surface over `LocalizationService`.

use crate::assets::{AssetPatch, AssetRegistration, AssetType};
use crate::error::LocalizationError;
use crate::jobs::{JobFilter, JobRequest, JobStatus};
use crate::security::is_authorized;
use crate::service::LocalizationService;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub struct AppState {
    pub service: Arc<LocalizationService>,
    /// Required in `X-API-Key` on mutating routes when set
    pub api_key: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/stats", get(job_statistics))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/retry", post(retry_job))
        .route("/jobs/:id/review", post(review_job))
        .route("/batches", post(create_batch))
        .route("/batches/:id", get(get_batch))
        .route("/assets", post(add_asset))
        .route("/assets/stats", get(asset_statistics))
        .route("/assets/missing/:lang", get(missing_assets))
        .route("/assets/preload/:lang", post(preload_assets))
        .route("/assets/variants/:id", put(update_asset).delete(remove_asset))
        .route("/assets/:base_id", get(get_asset))
        .route("/assets/:base_id/url", get(get_asset_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Errors ====================

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    NotFound(String),
    Engine(LocalizationError),
}

impl From<LocalizationError> for ApiError {
    fn from(e: LocalizationError) -> Self {
        ApiError::Engine(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Engine(e) => match e {
                LocalizationError::NotFound { .. } => StatusCode::NOT_FOUND,
                LocalizationError::InvalidState { .. } => StatusCode::CONFLICT,
                LocalizationError::InvalidInput(_) | LocalizationError::UnsupportedLanguage(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Unauthorized => "missing or invalid API key".to_string(),
            ApiError::BadRequest(m) | ApiError::NotFound(m) => m.clone(),
            ApiError::Engine(e) => e.to_string(),
        };
        if status.is_server_error() {
            error!("Request failed: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    if is_authorized(state.api_key.as_deref(), headers) {
        Ok(())
    } else {
        warn!("Rejected request with missing or invalid API key");
        Err(ApiError::Unauthorized)
    }
}

// ==================== Jobs ====================

#[derive(Debug, Deserialize)]
struct ListJobsQuery {
    status: Option<String>,
    target_language: Option<String>,
    batch_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    reviewer: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateBatchBody {
    name: String,
    #[serde(default)]
    jobs: Vec<JobRequest>,
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<JobRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let job = state.service.create_job(request)?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let filter = JobFilter {
        status,
        target_language: query.target_language,
        batch_id: query.batch_id,
    };
    Ok(Json(state.service.list_jobs(&filter)))
}

async fn job_statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.get_job_statistics())
}

async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_job_status(&id)?))
}

async fn retry_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    Ok(Json(state.service.retry_job(&id)?))
}

async fn review_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReviewBody>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    Ok(Json(state.service.mark_job_for_review(&id, &body.reviewer, body.notes)?))
}

async fn create_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBatchBody>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let batch = state.service.create_batch(&body.name, body.jobs)?;
    Ok((StatusCode::CREATED, Json(batch)))
}

async fn get_batch(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_batch_status(&id)?))
}

// ==================== Assets ====================

#[derive(Debug, Deserialize)]
struct AssetQuery {
    lang: String,
    region: Option<String>,
    #[serde(rename = "type")]
    asset_type: Option<String>,
}

async fn add_asset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(registration): Json<AssetRegistration>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    let asset = state.service.add_asset(registration)?;
    Ok((StatusCode::CREATED, Json(asset)))
}

async fn update_asset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<AssetPatch>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    Ok(Json(state.service.update_asset(&id, patch)?))
}

async fn remove_asset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    Ok(Json(state.service.remove_asset(&id)?))
}

async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(base_id): Path<String>,
    Query(query): Query<AssetQuery>,
) -> ApiResult<impl IntoResponse> {
    let region = query.region.as_deref();
    let asset = match query.asset_type.as_deref() {
        Some(raw) => {
            let asset_type: AssetType = raw.parse().map_err(ApiError::BadRequest)?;
            state
                .service
                .get_asset_of_type(&base_id, asset_type, &query.lang, region)
        }
        None => state.service.get_asset(&base_id, &query.lang, region),
    };
    asset
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no variant of {} for {}", base_id, query.lang)))
}

async fn get_asset_url(
    State(state): State<Arc<AppState>>,
    Path(base_id): Path<String>,
    Query(query): Query<AssetQuery>,
) -> ApiResult<impl IntoResponse> {
    match state
        .service
        .get_asset_url(&base_id, &query.lang, query.region.as_deref())
        .await
    {
        Some(url) => Ok(Json(json!({ "asset_id": base_id, "language": query.lang, "url": url }))),
        None => Err(ApiError::NotFound(format!("no variant of {} for {}", base_id, query.lang))),
    }
}

async fn preload_assets(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lang): Path<String>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &headers)?;
    Ok(Json(state.service.preload_assets(&lang).await?))
}

async fn missing_assets(State(state): State<Arc<AppState>>, Path(lang): Path<String>) -> impl IntoResponse {
    Json(json!({ "language": lang, "missing": state.service.get_missing_assets(&lang) }))
}

async fn asset_statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.get_asset_statistics())
}

// ==================== Operations ====================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.health())
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = &state.service;
    Json(json!({
        "engine": service.metrics(),
        "jobs": service.get_job_statistics(),
        "assets": service.get_asset_statistics(),
        "recent_asset_warnings": service.asset_warnings(),
    }))
}
