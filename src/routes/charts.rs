use axum::{
    extract::State,
    http::Method,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    services::{
        charts::{bind_axes, plot_series, ChartKind, ChartRequest, PlotSeries},
        data_source::DataSource,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/chart", post(chart))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub sql: String,
    pub chart: ChartRequest,
}

#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub success: bool,
    pub row_count: usize,
    pub plotly_data: Option<PlotSeries>,
}

pub async fn chart(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChartQuery>,
) -> Result<Json<ChartResponse>, AppError> {
    if request.sql.trim().is_empty() {
        return Err(AppError::InvalidInput("sql is required".to_string()));
    }
    let kind: ChartKind = request.chart.chart_type.parse()?;

    let source = state.source.clone();
    let sql = request.sql.clone();
    let result = tokio::task::spawn_blocking(move || source.execute(&sql)).await??;

    let ChartRequest { x, y, title, .. } = request.chart;
    let binding = bind_axes(&result.column_names(), &x, &y);
    if let Some(b) = binding.filter(|b| b.x_fallback || b.y_fallback) {
        tracing::warn!(
            "Chart axes '{}'/'{}' not found, using columns {} and {}",
            x, y, b.x, b.y
        );
    }

    let plotly_data = binding.and_then(|b| plot_series(&result, kind, b, &title));
    tracing::info!(
        "Chart '{}' built from {} rows, plotted: {}",
        title,
        result.row_count(),
        plotly_data.is_some()
    );

    Ok(Json(ChartResponse {
        success: true,
        row_count: result.row_count(),
        plotly_data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::StatusCode;
    use tokio_test::{assert_err, assert_ok};

    fn setup() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE daily (day TEXT, total REAL);
             INSERT INTO daily VALUES ('2024-01-01', 10), ('2024-01-02', NULL), ('2024-01-03', 30);",
        )
        .unwrap();
        drop(conn);

        let state = Arc::new(AppState::new(Config {
            database_path: path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            sample_seed: None,
        }));
        (dir, state)
    }

    fn request(chart_type: &str, x: &str, y: &str) -> Json<ChartQuery> {
        Json(ChartQuery {
            sql: "SELECT day, total FROM daily".to_string(),
            chart: ChartRequest {
                chart_type: chart_type.to_string(),
                x: x.to_string(),
                y: y.to_string(),
                title: "Daily total".to_string(),
            },
        })
    }

    #[tokio::test]
    async fn builds_line_series() {
        let (_dir, state) = setup();
        let Json(response) = assert_ok!(chart(State(state), request("line", "Day", "TOTAL")).await);
        assert_eq!(response.row_count, 3);
        let series = response.plotly_data.unwrap();
        assert_eq!(series.y, [10.0, 30.0]);
        assert_eq!(series.mode, Some("lines"));
    }

    #[tokio::test]
    async fn falls_back_to_first_columns() {
        let (_dir, state) = setup();
        let Json(response) = assert_ok!(chart(State(state), request("bar", "date", "revenue")).await);
        assert_eq!(response.plotly_data.unwrap().x.len(), 2);
    }

    #[tokio::test]
    async fn rejects_unsupported_chart_types() {
        let (_dir, state) = setup();
        let err = assert_err!(chart(State(state), request("pie", "day", "total")).await);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Unsupported chart type: pie"));
    }
}
