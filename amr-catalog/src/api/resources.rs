//! Catalog read endpoints: list, filter, search, get by id

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::resources::{self, ResourceFilter, SearchHit};
use crate::{ApiError, ApiResult, AppState};
use amr_common::models::ResourceEntry;

/// Default search result cap
const DEFAULT_SEARCH_LIMIT: usize = 15;

/// Filter parameters. Multi-valued fields take comma-separated lists; values
/// within a field are OR-combined and fields AND-combined.
#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub countries: Option<String>,
    pub domains: Option<String>,
    pub resource_types: Option<String>,
}

fn split_multi(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// GET /api/resources
pub async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Json<Vec<ResourceEntry>>> {
    let filter = ResourceFilter {
        countries: split_multi(&query.countries),
        domains: split_multi(&query.domains),
        resource_types: split_multi(&query.resource_types),
    };
    let entries = resources::filter(&state.db, &filter).await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/resources/search
///
/// Queries shorter than 2 characters return an empty list, not an error.
pub async fn search_resources(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let term = query.q.unwrap_or_default();
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let hits = resources::search(&state.db, &term, limit).await?;
    Ok(Json(hits))
}

/// GET /api/resources/{id}
///
/// Accepts either the internal numeric id or the external `data_source_id`.
pub async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResourceEntry>> {
    let entry = match id.parse::<i64>() {
        Ok(numeric) => resources::get_by_id(&state.db, numeric).await?,
        Err(_) => resources::get_by_external_id(&state.db, &id).await?,
    };
    entry
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("resource {}", id)))
}

/// Build resource read routes
pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/api/resources", get(list_resources))
        .route("/api/resources/search", get(search_resources))
        .route("/api/resources/:id", get(get_resource))
}
