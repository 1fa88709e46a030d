//! Taxonomy read endpoints
//!
//! Serve the controlled vocabulary to the catalog UI. A degraded (empty)
//! taxonomy answers 503 so a hierarchy-dependent form is never rendered
//! silently empty.

use amr_common::taxonomy::TaxonomyNode;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{ApiError, ApiResult, AppState};

/// GET /api/main-categories
pub async fn get_main_categories(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    require_taxonomy(&state)?;
    Ok(Json(json!({
        "countries": state.taxonomy.countries(),
        "domains": state.taxonomy.domains(),
    })))
}

/// GET /api/taxonomy
pub async fn get_taxonomy(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    require_taxonomy(&state)?;
    let hierarchy: Vec<Value> = state.taxonomy.hierarchy().iter().map(node_to_json).collect();
    Ok(Json(json!({
        "countries": state.taxonomy.countries(),
        "domains": state.taxonomy.domains(),
        "resource_type_hierarchy": hierarchy,
    })))
}

fn require_taxonomy(state: &AppState) -> ApiResult<()> {
    if !state.taxonomy.available() {
        return Err(ApiError::Unavailable(
            "Taxonomy configuration unavailable".to_string(),
        ));
    }
    Ok(())
}

fn node_to_json(node: &TaxonomyNode) -> Value {
    json!({
        "key": node.key,
        "title": node.display_title(),
        "children": node.children.iter().map(node_to_json).collect::<Vec<_>>(),
    })
}

/// Build taxonomy routes
pub fn taxonomy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/taxonomy", get(get_taxonomy))
        .route("/api/main-categories", get(get_main_categories))
}
