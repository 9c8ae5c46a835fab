pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use services::data_source::SqliteSource;

// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: config::Config,
    pub source: SqliteSource,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let source = SqliteSource::new(config.database_path.clone());
        Self { config, source }
    }
}
