//! Public submission endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::{moderation, ApiResult, AppState};
use amr_common::models::SubmissionDraft;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submission_id: i64,
    pub status: &'static str,
}

/// POST /api/submissions
///
/// Queues a submission for moderation. Validation here is the minimal
/// existence set; taxonomy legality is checked at approval time, since the
/// submitter's view of the vocabulary may lag the live one. Violations come
/// back as one complete list (400) so the form can redisplay everything in
/// one round trip, with the submitted values untouched on the client.
pub async fn submit(
    State(state): State<AppState>,
    Json(draft): Json<SubmissionDraft>,
) -> ApiResult<Json<SubmitResponse>> {
    let submission_id = moderation::submit(&state.db, &draft).await?;
    Ok(Json(SubmitResponse {
        submission_id,
        status: "pending",
    }))
}

/// Build submission routes
pub fn submission_routes() -> Router<AppState> {
    Router::new().route("/api/submissions", post(submit))
}
