//! Pending submission queue (`pending_submissions`)
//!
//! The moderation inbox. Rows are created by the public submit path,
//! consumed (deleted) on approval, and retained with `status = rejected`
//! on rejection.

use amr_common::models::{PendingSubmission, SubmissionDraft, SubmissionStatus};
use amr_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};

/// Insert a new pending submission from a draft. List and object fields are
/// serialized to JSON. Returns the new submission id.
pub async fn insert(pool: &SqlitePool, draft: &SubmissionDraft) -> Result<i64> {
    let countries = encode("countries", &draft.countries)?;
    let domains = encode("domains", &draft.domains)?;
    let hierarchy = encode("primary_hierarchy_path", &draft.primary_hierarchy_path)?;
    let related_metadata = encode("related_metadata", &draft.related_metadata)?;
    let related_resources = encode("related_resources", &draft.related_resources)?;

    let result = sqlx::query(
        r#"
        INSERT INTO pending_submissions (
            status, resource_name, countries, domains, primary_hierarchy_path,
            year_start, year_end, resource_url, contact_info, description,
            keywords, license, related_metadata, related_resources,
            submitted_at, submitter_info
        ) VALUES ('pending', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&draft.resource_name)
    .bind(&countries)
    .bind(&domains)
    .bind(&hierarchy)
    .bind(draft.year_start)
    .bind(draft.year_end)
    .bind(&draft.resource_url)
    .bind(&draft.contact_info)
    .bind(&draft.description)
    .bind(&draft.keywords)
    .bind(&draft.license)
    .bind(&related_metadata)
    .bind(&related_resources)
    .bind(Utc::now().to_rfc3339())
    .bind(&draft.submitter_info)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    info!(submission_id = id, resource_name = %draft.resource_name, "Submission queued");
    Ok(id)
}

/// Load a submission by id.
pub async fn get(pool: &SqlitePool, submission_id: i64) -> Result<PendingSubmission> {
    let row = sqlx::query("SELECT * FROM pending_submissions WHERE submission_id = ?")
        .bind(submission_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("submission {}", submission_id)))?;
    decode_row(&row)
}

/// List submissions, optionally restricted to one status, newest first.
///
/// Rows whose serialized fields fail to decode are skipped with a warning so
/// one corrupt submission cannot hide the rest of the queue; acting on such
/// a row individually still reports its error through [`get`].
pub async fn list(
    pool: &SqlitePool,
    status: Option<SubmissionStatus>,
) -> Result<Vec<PendingSubmission>> {
    let rows = match status {
        Some(status) => {
            sqlx::query(
                "SELECT * FROM pending_submissions WHERE status = ? \
                 ORDER BY submitted_at DESC, submission_id DESC",
            )
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT * FROM pending_submissions \
                 ORDER BY submitted_at DESC, submission_id DESC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    let mut submissions = Vec::with_capacity(rows.len());
    for row in &rows {
        match decode_row(row) {
            Ok(sub) => submissions.push(sub),
            Err(e) => {
                let id: i64 = row.get("submission_id");
                warn!(submission_id = id, error = %e, "Skipping undecodable submission");
            }
        }
    }
    Ok(submissions)
}

/// Flip a submission's status in place.
pub async fn set_status(
    conn: &mut SqliteConnection,
    submission_id: i64,
    status: SubmissionStatus,
) -> Result<()> {
    let result = sqlx::query("UPDATE pending_submissions SET status = ? WHERE submission_id = ?")
        .bind(status.as_str())
        .bind(submission_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("submission {}", submission_id)));
    }
    Ok(())
}

/// Delete a submission (the consume step of approval).
pub async fn delete(conn: &mut SqliteConnection, submission_id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM pending_submissions WHERE submission_id = ?")
        .bind(submission_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("submission {}", submission_id)));
    }
    Ok(())
}

fn encode<T: serde::Serialize>(field: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("encode {}: {}", field, e)))
}

/// Decode one row, reporting malformed serialized fields as typed errors
/// scoped to this submission.
fn decode_row(row: &SqliteRow) -> Result<PendingSubmission> {
    let id: i64 = row.get("submission_id");
    let status: String = row.get("status");
    let countries: String = row.get("countries");
    let domains: String = row.get("domains");
    let hierarchy: String = row.get("primary_hierarchy_path");
    let related_metadata: String = row.get("related_metadata");
    let related_resources: String = row.get("related_resources");
    let submitted_at: String = row.get("submitted_at");

    let decode_err = |field: &str, e: serde_json::Error| {
        Error::InvalidInput(format!(
            "submission {}: malformed stored {} field: {}",
            id, field, e
        ))
    };

    Ok(PendingSubmission {
        submission_id: id,
        status: SubmissionStatus::parse(&status)
            .ok_or_else(|| Error::InvalidInput(format!("submission {}: unknown status '{}'", id, status)))?,
        resource_name: row.get("resource_name"),
        countries: serde_json::from_str(&countries).map_err(|e| decode_err("countries", e))?,
        domains: serde_json::from_str(&domains).map_err(|e| decode_err("domains", e))?,
        primary_hierarchy_path: serde_json::from_str(&hierarchy)
            .map_err(|e| decode_err("primary_hierarchy_path", e))?,
        year_start: row.get("year_start"),
        year_end: row.get("year_end"),
        resource_url: row.get("resource_url"),
        contact_info: row.get("contact_info"),
        description: row.get("description"),
        keywords: row.get("keywords"),
        license: row.get("license"),
        related_metadata: serde_json::from_str(&related_metadata)
            .map_err(|e| decode_err("related_metadata", e))?,
        related_resources: serde_json::from_str(&related_resources)
            .map_err(|e| decode_err("related_resources", e))?,
        submitted_at: DateTime::parse_from_rfc3339(&submitted_at)
            .map_err(|e| Error::Internal(format!("submission {}: bad submitted_at: {}", id, e)))?
            .with_timezone(&Utc),
        submitter_info: row.get("submitter_info"),
    })
}
