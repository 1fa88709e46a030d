//! Admin endpoints: moderation queue, approve/reject, catalog edit/delete
//!
//! Guarded by a bearer token obtained from POST /api/admin/login. The
//! service is a JSON API, so unauthenticated access answers 401 rather than
//! a server-rendered login redirect; the UI owns the challenge page.

use axum::{
    extract::{Path, Query, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::db::resources::{self, ResourcePatch};
use crate::db::submissions;
use crate::{moderation, ApiError, ApiResult, AppState};
use amr_common::models::{HierarchyPath, PendingSubmission, ResourceMetadata, SubmissionStatus};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /api/admin/login
///
/// Exchanges the configured admin password for the bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (Some(password), Some(token)) = (&state.admin_password, &state.admin_token) else {
        return Err(ApiError::Unavailable(
            "Admin access is not configured".to_string(),
        ));
    };
    if payload.password != *password {
        warn!("Failed admin login attempt");
        return Err(ApiError::Unauthorized("Wrong password".to_string()));
    }
    Ok(Json(LoginResponse {
        token: token.clone(),
    }))
}

/// Middleware: require `Authorization: Bearer <token>` on admin routes.
async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = &state.admin_token else {
        return Err(ApiError::Unavailable(
            "Admin access is not configured".to_string(),
        ));
    };
    let presented = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized(
            "Admin authentication required".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Moderation queue
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// pending | rejected; absent lists everything
    pub status: Option<String>,
}

/// GET /api/admin/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<Vec<PendingSubmission>>> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(value) => Some(SubmissionStatus::parse(value).ok_or_else(|| {
            ApiError::BadRequest(format!("unknown status '{}'", value))
        })?),
    };
    Ok(Json(submissions::list(&state.db, status).await?))
}

/// POST /api/admin/submissions/{id}/approve
pub async fn approve_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let external_id = moderation::approve(&state.db, &state.taxonomy, id).await?;
    Ok(Json(json!({ "data_source_id": external_id })))
}

/// POST /api/admin/submissions/{id}/reject
pub async fn reject_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    moderation::reject(&state.db, id).await?;
    Ok(Json(json!({ "status": "rejected" })))
}

// ---------------------------------------------------------------------------
// Catalog edit / delete
// ---------------------------------------------------------------------------

/// Admin edit payload. Absent fields are left untouched; empty strings
/// clear nullable columns.
#[derive(Debug, Default, Deserialize)]
pub struct EditRequest {
    pub hierarchy: Option<HierarchyPath>,
    pub year_start: Option<i64>,
    pub year_end: Option<i64>,
    pub data_format: Option<String>,
    pub data_resolution: Option<String>,
    pub repository: Option<String>,
    pub repository_url: Option<String>,
    pub data_description: Option<String>,
    pub keywords: Option<String>,
    pub contact_information: Option<String>,
    pub metadata: Option<ResourceMetadata>,
    pub countries: Option<Vec<String>>,
    pub domains: Option<Vec<String>>,
}

fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}

/// PUT /api/admin/resources/{id}
pub async fn edit_resource(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<EditRequest>,
) -> ApiResult<Json<Value>> {
    if let Some(hierarchy) = &payload.hierarchy {
        if !state.taxonomy.available() {
            return Err(ApiError::Unavailable(
                "Taxonomy configuration unavailable".to_string(),
            ));
        }
        if !state.taxonomy.resolve_path(hierarchy) {
            return Err(ApiError::BadRequest(
                "Hierarchy path is not part of the taxonomy".to_string(),
            ));
        }
    }
    // Year ordering is enforced in the repository against the stored entry,
    // so a single-year patch is checked against its current counterpart.
    let patch = ResourcePatch {
        hierarchy: payload.hierarchy,
        year_start: payload.year_start.map(Some),
        year_end: payload.year_end.map(Some),
        data_format: payload.data_format,
        data_resolution: payload.data_resolution,
        repository: payload.repository,
        repository_url: clearable(payload.repository_url),
        data_description: clearable(payload.data_description),
        keywords: clearable(payload.keywords),
        contact_information: clearable(payload.contact_information),
        metadata: payload.metadata,
        countries: payload.countries,
        domains: payload.domains,
    };
    resources::update(&state.db, id, &patch).await?;
    Ok(Json(json!({ "updated": id })))
}

/// DELETE /api/admin/resources/{id}
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !resources::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("resource {}", id)));
    }
    Ok(Json(json!({ "deleted": id })))
}

/// Build admin routes. Everything except login sits behind the token check.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/admin/submissions", get(list_submissions))
        .route("/api/admin/submissions/:id/approve", post(approve_submission))
        .route("/api/admin/submissions/:id/reject", post(reject_submission))
        .route("/api/admin/resources/:id", put(edit_resource))
        .route("/api/admin/resources/:id", delete(delete_resource))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        .route("/api/admin/login", post(login))
        .merge(protected)
}
