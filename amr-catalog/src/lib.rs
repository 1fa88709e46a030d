//! amr-catalog library interface
//!
//! Curated catalog of antimicrobial-resistance surveillance resources:
//! browse/filter/search over approved entries, public submissions, admin
//! moderation, and AI-assisted extraction of submission drafts from
//! documents.

pub mod api;
pub mod db;
pub mod error;
pub mod extract;
pub mod moderation;
pub mod validate;

pub use crate::error::{ApiError, ApiResult};

use amr_common::taxonomy::Taxonomy;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::extract::DocumentClassifier;

/// HTTP client for content fetches in the extraction pipeline, capped by the
/// same configured ceiling as the classifier calls so a hung URL cannot
/// block a request indefinitely.
pub fn fetch_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Load-once immutable controlled vocabulary
    pub taxonomy: Arc<Taxonomy>,
    /// Extraction classifier; `None` when no API key is configured
    pub classifier: Option<Arc<dyn DocumentClassifier>>,
    /// Client for content fetches in the extraction pipeline
    pub http_client: reqwest::Client,
    /// Admin credentials from config
    pub admin_password: Option<String>,
    pub admin_token: Option<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        taxonomy: Arc<Taxonomy>,
        classifier: Option<Arc<dyn DocumentClassifier>>,
        http_client: reqwest::Client,
        admin_password: Option<String>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            db,
            taxonomy,
            classifier,
            http_client,
            admin_password,
            admin_token,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::taxonomy_routes())
        .merge(api::resource_routes())
        .merge(api::submission_routes())
        .merge(api::extract_routes())
        .merge(api::admin_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
