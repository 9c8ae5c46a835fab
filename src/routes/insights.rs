use axum::{
    extract::{Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    services::profiling::{ProfileSummary, Profiler},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/key-insights", get(key_insights))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct InsightsParams {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub success: bool,
    pub data: ProfileSummary,
}

pub async fn key_insights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InsightsParams>,
) -> Result<Json<InsightsResponse>, AppError> {
    let query = params
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::InvalidInput("query parameter is required".to_string()))?;

    let start = std::time::Instant::now();
    tracing::info!("Profiling query: {}", query);

    let profiler = Profiler::new(state.source.clone()).with_seed(state.config.sample_seed);
    let summary = tokio::task::spawn_blocking(move || profiler.profile(&query)).await??;

    tracing::info!(
        "Profile completed in {:?}: {} rows, {} columns, {} correlation pairs",
        start.elapsed(),
        summary.overview.row_count,
        summary.overview.column_count,
        summary.correlations.len()
    );

    Ok(Json(InsightsResponse {
        success: true,
        data: summary,
    }))
}
