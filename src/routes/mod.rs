use axum::{routing::get, Router};
use std::sync::Arc;

use crate::AppState;

pub mod charts;
pub mod insights;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .merge(insights::routes())
        .merge(charts::routes())
}

async fn health_check() -> &'static str {
    "OK"
}
