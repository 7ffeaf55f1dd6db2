//! Futurisys ML Deployment API
//!
//! Serves a pre-trained binary classifier over HTTP and keeps an audit trail
//! of predictions made for stored clients.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FUTURISYS PREDICT                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │  API      │  │  Artifact     │  │  Predictor          │ │
//! │  │  (Axum)   │─▶│  Loader       │─▶│  (proba/threshold)  │ │
//! │  └─────┬─────┘  │  (memoized)   │  └─────────────────────┘ │
//! │        │        └───────────────┘                           │
//! │        ▼                                                    │
//! │  ┌─────────────┐   clients / prediction_requests /          │
//! │  │ PostgreSQL  │   prediction_outputs                       │
//! │  └─────────────┘                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod inference;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};
pub use inference::ArtifactLoader;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub models: Arc<ArtifactLoader>,
    pub config: Config,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/model", get(handlers::model::info))
        .route("/predict", post(handlers::predict::predict))
        .route("/clients/:id", get(handlers::clients::get))
        .route("/predictions/:id", get(handlers::predictions::get))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
