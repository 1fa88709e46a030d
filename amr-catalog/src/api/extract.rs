//! AI extraction endpoint
//!
//! Takes a URL or an uploaded file (base64 in the JSON body; upload
//! transport is the UI's concern) and either pre-fills the submission form
//! or, when the extracted draft clears the direct-submit gate, queues a
//! pending submission. Missing required fields always downgrade to pre-fill
//! instead of inserting an invalid record.

use axum::{extract::State, routing::post, Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::extract::{self, reconcile, ExtractionSource};
use crate::{moderation, ApiError, ApiResult, AppState};
use amr_common::models::SubmissionDraft;

/// Requested downstream action.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    Prefill,
    DirectSubmit,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: Option<String>,
    pub file_base64: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub mode: ExtractMode,
}

/// Extraction outcome. `prefill` carries the flattened form parameters and
/// the draft; `submitted` carries the new submission id.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExtractResponse {
    Prefill {
        params: Vec<(String, String)>,
        draft: SubmissionDraft,
        /// Fields that kept a direct submit from happening, when one was
        /// requested
        missing: Vec<String>,
    },
    Submitted {
        submission_id: i64,
    },
}

/// POST /api/extract
pub async fn extract_handler(
    State(state): State<AppState>,
    Json(payload): Json<ExtractRequest>,
) -> ApiResult<Json<ExtractResponse>> {
    if !state.taxonomy.available() {
        return Err(ApiError::Unavailable(
            "Taxonomy configuration unavailable".to_string(),
        ));
    }
    let Some(classifier) = &state.classifier else {
        return Err(ApiError::Unavailable(
            "Extraction classifier is not configured".to_string(),
        ));
    };

    let source = match (&payload.url, &payload.file_base64) {
        (Some(url), None) if !url.trim().is_empty() => {
            ExtractionSource::Url(url.trim().to_string())
        }
        (None, Some(encoded)) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| ApiError::BadRequest(format!("file_base64 is not base64: {}", e)))?;
            ExtractionSource::File {
                bytes,
                filename: payload.filename.clone(),
                content_type: payload.content_type.clone(),
            }
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Provide exactly one of url or file_base64".to_string(),
            ));
        }
    };

    let draft = extract::extract(
        &state.http_client,
        classifier.as_ref(),
        &state.taxonomy,
        &source,
    )
    .await?;

    let missing = reconcile::direct_submit_missing(&draft);
    if payload.mode == ExtractMode::DirectSubmit && missing.is_empty() {
        let submission_id = moderation::submit(&state.db, &draft).await?;
        info!(submission_id, "Extraction submitted directly to the queue");
        return Ok(Json(ExtractResponse::Submitted { submission_id }));
    }

    if payload.mode == ExtractMode::DirectSubmit {
        info!(missing = ?missing, "Direct submit downgraded to pre-fill");
    }
    Ok(Json(ExtractResponse::Prefill {
        params: reconcile::prefill_params(&draft),
        draft,
        missing,
    }))
}

/// Build extraction routes
pub fn extract_routes() -> Router<AppState> {
    Router::new().route("/api/extract", post(extract_handler))
}
