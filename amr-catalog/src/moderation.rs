//! Moderation workflow: Pending -> Approved / Rejected
//!
//! Approval is realized as "catalog entry exists AND queue row is gone",
//! executed inside one SQLite transaction so a failure at any step leaves
//! both stores untouched. Rejection flips the status in place and keeps the
//! row.

use crate::db::{resources, submissions};
use crate::validate::{validate, FieldPolicy};
use amr_common::models::{
    PendingSubmission, ResourceMetadata, SubmissionDraft, SubmissionStatus,
};
use amr_common::taxonomy::Taxonomy;
use amr_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Queue a submission.
///
/// Validation here is minimal on purpose: name, countries and domains must
/// exist and a present year range must not be inverted. Taxonomy legality is
/// deferred to approval time, since the submitter's view of the vocabulary
/// may lag the admin's.
pub async fn submit(pool: &SqlitePool, draft: &SubmissionDraft) -> Result<i64> {
    let mut violations = Vec::new();
    if draft.resource_name.trim().is_empty() {
        violations.push("Resource name is required".to_string());
    }
    if draft.countries.is_empty() {
        violations.push("At least one country is required".to_string());
    }
    if draft.domains.is_empty() {
        violations.push("At least one domain is required".to_string());
    }
    if draft.year_range_inverted() {
        violations.push("Start year must not be later than end year".to_string());
    }
    if !violations.is_empty() {
        return Err(Error::Validation(violations));
    }

    submissions::insert(pool, draft).await
}

/// Approve a submission: validate it against the live taxonomy, copy it into
/// the catalog, and consume the queue row. Returns the new external id.
///
/// A duplicate repository URL (or any other insert failure) rolls the whole
/// attempt back and leaves the pending row untouched. Approving the same id
/// twice fails with "not found", since the first approval deleted the row.
pub async fn approve(pool: &SqlitePool, taxonomy: &Taxonomy, submission_id: i64) -> Result<String> {
    // Malformed stored JSON surfaces here as a typed per-submission error,
    // before anything is written.
    let submission = submissions::get(pool, submission_id).await?;

    if submission.status != SubmissionStatus::Pending {
        return Err(Error::InvalidInput(format!(
            "submission {} is {}, only pending submissions can be approved",
            submission_id,
            submission.status.as_str()
        )));
    }

    let draft = submission_to_draft(&submission);
    let report = validate(&draft, taxonomy, &FieldPolicy::approval());
    if !report.is_valid() {
        warn!(
            submission_id,
            violations = report.violations().len(),
            "Approval blocked by validation"
        );
        return Err(Error::Validation(report.into_violations()));
    }

    let entry = build_entry_draft(&submission);

    let mut tx = pool.begin().await?;
    let external_id = resources::insert(&mut *tx, &entry).await?;
    submissions::delete(&mut *tx, submission_id).await?;
    tx.commit().await?;

    info!(submission_id, external_id = %external_id, "Submission approved");
    Ok(external_id)
}

/// Reject a submission in place. Terminal: the row is retained with
/// `status = rejected` and no further transition exists.
pub async fn reject(pool: &SqlitePool, submission_id: i64) -> Result<()> {
    // Load first so a missing id reports as not-found rather than a no-op.
    let submission = submissions::get(pool, submission_id).await?;
    if submission.status == SubmissionStatus::Rejected {
        return Ok(());
    }

    let mut conn = pool.acquire().await?;
    submissions::set_status(&mut *conn, submission_id, SubmissionStatus::Rejected).await?;
    info!(submission_id, "Submission rejected");
    Ok(())
}

/// View a stored submission as a draft for re-validation.
fn submission_to_draft(submission: &PendingSubmission) -> SubmissionDraft {
    SubmissionDraft {
        resource_name: submission.resource_name.clone(),
        countries: submission.countries.clone(),
        domains: submission.domains.clone(),
        primary_hierarchy_path: submission.primary_hierarchy_path.clone(),
        year_start: submission.year_start,
        year_end: submission.year_end,
        resource_url: submission.resource_url.clone(),
        contact_info: submission.contact_info.clone(),
        description: submission.description.clone(),
        keywords: submission.keywords.clone(),
        license: submission.license.clone(),
        related_metadata: submission.related_metadata.clone(),
        related_resources: submission.related_resources.clone(),
        submitter_info: submission.submitter_info.clone(),
    }
}

/// Build the catalog entry draft for an approved submission.
fn build_entry_draft(submission: &PendingSubmission) -> resources::ResourceEntryDraft {
    resources::ResourceEntryDraft {
        hierarchy: submission.primary_hierarchy_path.clone(),
        year_start: submission.year_start,
        year_end: submission.year_end,
        data_format: None,
        data_resolution: None,
        repository: repository_from_url(submission.resource_url.as_deref()),
        repository_url: submission.resource_url.clone(),
        data_description: submission.description.clone(),
        keywords: submission.keywords.clone(),
        contact_information: submission.contact_info.clone(),
        metadata: ResourceMetadata {
            title: Some(submission.resource_name.clone()),
            license: submission.license.clone(),
            original_url: submission.resource_url.clone(),
            description: submission.description.clone(),
            related_resources: submission.related_resources.clone(),
            related_categories: submission.related_metadata.clone(),
        },
        countries: submission.countries.clone(),
        domains: submission.domains.clone(),
    }
}

/// Repository display name derived from the URL host, else None (stored as
/// "Unknown").
fn repository_from_url(url: Option<&str>) -> Option<String> {
    let url = url?.trim();
    if url.is_empty() {
        return None;
    }
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
}
