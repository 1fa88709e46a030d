//! Resource repository: the approved catalog entries (`data_points`)
//!
//! Owns external-id generation and duplicate-URL detection. Insert runs
//! against a plain connection so the moderation workflow can call it inside
//! the same transaction that consumes the pending submission.

use amr_common::models::{HierarchyPath, ResourceEntry, ResourceMetadata};
use amr_common::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

/// Default for optional descriptive fields
pub const UNKNOWN: &str = "Unknown";

/// Result cap applied to `search` regardless of the caller's limit
const SEARCH_HARD_CAP: usize = 50;

/// Candidate catalog entry, as built by the moderation workflow on approval.
#[derive(Debug, Clone, Default)]
pub struct ResourceEntryDraft {
    pub hierarchy: HierarchyPath,
    pub year_start: Option<i64>,
    pub year_end: Option<i64>,
    pub data_format: Option<String>,
    pub data_resolution: Option<String>,
    /// Repository name; also the "institution" fragment of the external id
    pub repository: Option<String>,
    pub repository_url: Option<String>,
    pub data_description: Option<String>,
    pub keywords: Option<String>,
    pub contact_information: Option<String>,
    pub metadata: ResourceMetadata,
    pub countries: Vec<String>,
    pub domains: Vec<String>,
}

/// Partial update for an admin edit. `None` leaves the column untouched;
/// nested `Option`s write NULL.
#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub hierarchy: Option<HierarchyPath>,
    pub year_start: Option<Option<i64>>,
    pub year_end: Option<Option<i64>>,
    pub data_format: Option<String>,
    pub data_resolution: Option<String>,
    pub repository: Option<String>,
    pub repository_url: Option<Option<String>>,
    pub data_description: Option<Option<String>>,
    pub keywords: Option<Option<String>>,
    pub contact_information: Option<Option<String>>,
    pub metadata: Option<ResourceMetadata>,
    pub countries: Option<Vec<String>>,
    pub domains: Option<Vec<String>>,
}

/// Filter parameters for catalog listing. Values within a field are
/// OR-combined; fields are AND-combined; empty lists impose no constraint.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub countries: Vec<String>,
    pub domains: Vec<String>,
    pub resource_types: Vec<String>,
}

/// One hit from `search`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub external_id: String,
    pub display_text: String,
}

/// Insert a new catalog entry.
///
/// Rejects duplicates by `repository_url` (exact equality), generates the
/// deterministic external id, applies defaults, and stamps `last_updated`
/// with today's date. Returns the generated external id.
pub async fn insert(conn: &mut SqliteConnection, draft: &ResourceEntryDraft) -> Result<String> {
    let repository_url = normalize_url(draft.repository_url.as_deref());

    if let Some(url) = &repository_url {
        let existing = sqlx::query("SELECT id FROM data_points WHERE repository_url = ?")
            .bind(url)
            .fetch_optional(&mut *conn)
            .await?;
        if existing.is_some() {
            return Err(Error::DuplicateUrl(url.clone()));
        }
    }

    let external_id = generate_external_id(conn, draft).await?;

    let countries = serde_json::to_string(&draft.countries)
        .map_err(|e| Error::Internal(format!("encode countries: {}", e)))?;
    let domains = serde_json::to_string(&draft.domains)
        .map_err(|e| Error::Internal(format!("encode domains: {}", e)))?;
    let metadata = serde_json::to_string(&draft.metadata)
        .map_err(|e| Error::Internal(format!("encode metadata: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO data_points (
            data_source_id, resource_type, category, subcategory, data_type, level5,
            year_start, year_end, data_format, data_resolution,
            repository, repository_url, data_description, keywords,
            contact_information, last_updated, metadata, countries, domains, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&external_id)
    .bind(draft.hierarchy.resource_type.as_deref().unwrap_or_default())
    .bind(&draft.hierarchy.category)
    .bind(&draft.hierarchy.subcategory)
    .bind(&draft.hierarchy.data_type)
    .bind(&draft.hierarchy.level5)
    .bind(draft.year_start)
    .bind(draft.year_end)
    .bind(draft.data_format.as_deref().unwrap_or(UNKNOWN))
    .bind(draft.data_resolution.as_deref().unwrap_or(UNKNOWN))
    .bind(draft.repository.as_deref().unwrap_or(UNKNOWN))
    .bind(&repository_url)
    .bind(&draft.data_description)
    .bind(&draft.keywords)
    .bind(&draft.contact_information)
    .bind(Utc::now().date_naive().format("%Y-%m-%d").to_string())
    .bind(&metadata)
    .bind(&countries)
    .bind(&domains)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => {
            info!(external_id = %external_id, "Catalog entry inserted");
            Ok(external_id)
        }
        // The UNIQUE constraint on repository_url backs up the equality
        // check above and closes the check-then-insert race.
        Err(sqlx::Error::Database(db_err))
            if db_err.message().contains("repository_url") =>
        {
            Err(Error::DuplicateUrl(repository_url.unwrap_or_default()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Pool wrapper around [`insert`] for callers outside a transaction.
pub async fn insert_pool(pool: &SqlitePool, draft: &ResourceEntryDraft) -> Result<String> {
    let mut conn = pool.acquire().await?;
    insert(&mut *conn, draft).await
}

/// Generate the deterministic external id:
/// `{first4(category)}-{first4(institution)}-{year}`, uppercased, with
/// `-1`, `-2`, ... appended until unique.
async fn generate_external_id(
    conn: &mut SqliteConnection,
    draft: &ResourceEntryDraft,
) -> Result<String> {
    let category = draft
        .hierarchy
        .category
        .as_deref()
        .or(draft.hierarchy.resource_type.as_deref())
        .unwrap_or(UNKNOWN);
    let institution = draft.repository.as_deref().unwrap_or(UNKNOWN);
    let year = Utc::now().year();

    let base = format!(
        "{}-{}-{}",
        id_fragment(category),
        id_fragment(institution),
        year
    );

    let mut candidate = base.clone();
    let mut suffix = 0u32;
    loop {
        let exists = sqlx::query("SELECT id FROM data_points WHERE data_source_id = ?")
            .bind(&candidate)
            .fetch_optional(&mut *conn)
            .await?
            .is_some();
        if !exists {
            return Ok(candidate);
        }
        suffix += 1;
        candidate = format!("{}-{}", base, suffix);
        debug!(candidate = %candidate, "External id collision, trying suffix");
    }
}

/// First four alphanumeric characters of a label, uppercased.
/// Empty labels fall back to the fragment of "Unknown".
fn id_fragment(label: &str) -> String {
    let fragment: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    if fragment.is_empty() {
        "UNKN".to_string()
    } else {
        fragment
    }
}

/// Treat empty and whitespace-only URLs as absent so the UNIQUE constraint
/// never binds them.
fn normalize_url(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// Load entry by internal id.
pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<ResourceEntry>> {
    let row = sqlx::query("SELECT * FROM data_points WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| decode_row(&r)).transpose()
}

/// Load entry by external id (`data_source_id`).
pub async fn get_by_external_id(
    pool: &SqlitePool,
    external_id: &str,
) -> Result<Option<ResourceEntry>> {
    let row = sqlx::query("SELECT * FROM data_points WHERE data_source_id = ?")
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| decode_row(&r)).transpose()
}

/// All catalog entries, newest first.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ResourceEntry>> {
    let rows = sqlx::query("SELECT * FROM data_points ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(decode_row).collect()
}

/// Delete entry by internal id. Returns false when no such entry existed.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM data_points WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Apply a partial update to an entry. Touches `last_updated`.
///
/// A patch touching either year is checked against the entry's stored
/// counterpart, so a single-year edit can never leave an inverted range.
pub async fn update(pool: &SqlitePool, id: i64, patch: &ResourcePatch) -> Result<()> {
    if patch.year_start.is_some() || patch.year_end.is_some() {
        check_year_order(pool, id, patch).await?;
    }

    // Column name plus bound value, in declaration order.
    enum Bind {
        Text(String),
        OptText(Option<String>),
        OptInt(Option<i64>),
    }
    let mut sets: Vec<&'static str> = Vec::new();
    let mut binds: Vec<Bind> = Vec::new();

    if let Some(hierarchy) = &patch.hierarchy {
        sets.push("resource_type = ?");
        binds.push(Bind::Text(
            hierarchy.resource_type.clone().unwrap_or_default(),
        ));
        sets.push("category = ?");
        binds.push(Bind::OptText(hierarchy.category.clone()));
        sets.push("subcategory = ?");
        binds.push(Bind::OptText(hierarchy.subcategory.clone()));
        sets.push("data_type = ?");
        binds.push(Bind::OptText(hierarchy.data_type.clone()));
        sets.push("level5 = ?");
        binds.push(Bind::OptText(hierarchy.level5.clone()));
    }
    if let Some(value) = patch.year_start {
        sets.push("year_start = ?");
        binds.push(Bind::OptInt(value));
    }
    if let Some(value) = patch.year_end {
        sets.push("year_end = ?");
        binds.push(Bind::OptInt(value));
    }
    if let Some(value) = &patch.data_format {
        sets.push("data_format = ?");
        binds.push(Bind::Text(value.clone()));
    }
    if let Some(value) = &patch.data_resolution {
        sets.push("data_resolution = ?");
        binds.push(Bind::Text(value.clone()));
    }
    if let Some(value) = &patch.repository {
        sets.push("repository = ?");
        binds.push(Bind::Text(value.clone()));
    }
    if let Some(value) = &patch.repository_url {
        sets.push("repository_url = ?");
        binds.push(Bind::OptText(normalize_url(value.as_deref())));
    }
    if let Some(value) = &patch.data_description {
        sets.push("data_description = ?");
        binds.push(Bind::OptText(value.clone()));
    }
    if let Some(value) = &patch.keywords {
        sets.push("keywords = ?");
        binds.push(Bind::OptText(value.clone()));
    }
    if let Some(value) = &patch.contact_information {
        sets.push("contact_information = ?");
        binds.push(Bind::OptText(value.clone()));
    }
    if let Some(value) = &patch.metadata {
        sets.push("metadata = ?");
        binds.push(Bind::Text(serde_json::to_string(value).map_err(|e| {
            Error::Internal(format!("encode metadata: {}", e))
        })?));
    }
    if let Some(value) = &patch.countries {
        sets.push("countries = ?");
        binds.push(Bind::Text(serde_json::to_string(value).map_err(|e| {
            Error::Internal(format!("encode countries: {}", e))
        })?));
    }
    if let Some(value) = &patch.domains {
        sets.push("domains = ?");
        binds.push(Bind::Text(serde_json::to_string(value).map_err(|e| {
            Error::Internal(format!("encode domains: {}", e))
        })?));
    }

    if sets.is_empty() {
        return Ok(());
    }
    sets.push("last_updated = ?");
    binds.push(Bind::Text(
        Utc::now().date_naive().format("%Y-%m-%d").to_string(),
    ));

    let sql = format!("UPDATE data_points SET {} WHERE id = ?", sets.join(", "));
    let mut query = sqlx::query(&sql);
    for bind in binds {
        query = match bind {
            Bind::Text(v) => query.bind(v),
            Bind::OptText(v) => query.bind(v),
            Bind::OptInt(v) => query.bind(v),
        };
    }
    let result = match query.bind(id).execute(pool).await {
        Ok(result) => result,
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("repository_url") => {
            return Err(Error::DuplicateUrl(
                patch
                    .repository_url
                    .clone()
                    .flatten()
                    .unwrap_or_default(),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("catalog entry {}", id)));
    }
    Ok(())
}

/// Validate the year range that would result from applying a patch: each
/// patched year combined with the stored value of the other.
async fn check_year_order(pool: &SqlitePool, id: i64, patch: &ResourcePatch) -> Result<()> {
    let row = sqlx::query("SELECT year_start, year_end FROM data_points WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("catalog entry {}", id)))?;
    let start = patch.year_start.unwrap_or_else(|| row.get("year_start"));
    let end = patch.year_end.unwrap_or_else(|| row.get("year_end"));
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(Error::InvalidInput(
                "Start year must not be later than end year".to_string(),
            ));
        }
    }
    Ok(())
}

/// Filter the catalog.
///
/// Values within a field are OR-combined, fields are AND-combined, and
/// country/domain membership is exact (decoded-list membership, not
/// substring containment). Rows are decoded and matched in memory; the
/// catalog is a small curated set and exactness was preferred over SQL
/// LIKE pushdown on serialized columns.
pub async fn filter(pool: &SqlitePool, filter: &ResourceFilter) -> Result<Vec<ResourceEntry>> {
    let all = list_all(pool).await?;
    Ok(all
        .into_iter()
        .filter(|entry| {
            let country_ok = filter.countries.is_empty()
                || entry
                    .countries
                    .iter()
                    .any(|c| filter.countries.iter().any(|want| want == c));
            let domain_ok = filter.domains.is_empty()
                || entry
                    .domains
                    .iter()
                    .any(|d| filter.domains.iter().any(|want| want == d));
            let type_ok = filter.resource_types.is_empty()
                || entry
                    .hierarchy
                    .resource_type
                    .as_deref()
                    .map(|rt| filter.resource_types.iter().any(|want| want == rt))
                    .unwrap_or(false);
            country_ok && domain_ok && type_ok
        })
        .collect())
}

/// Free-text search over external id, keywords, description, and the title
/// nested in metadata. Case-insensitive substring match; queries shorter
/// than 2 characters return empty.
pub async fn search(pool: &SqlitePool, term: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let term = term.trim().to_lowercase();
    if term.chars().count() < 2 {
        return Ok(Vec::new());
    }
    let limit = limit.clamp(1, SEARCH_HARD_CAP);

    let all = list_all(pool).await?;
    let mut hits = Vec::new();
    for entry in all {
        let matched = entry.data_source_id.to_lowercase().contains(&term)
            || entry
                .keywords
                .as_deref()
                .map(|k| k.to_lowercase().contains(&term))
                .unwrap_or(false)
            || entry
                .data_description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&term))
                .unwrap_or(false)
            || entry
                .metadata
                .title
                .as_deref()
                .map(|t| t.to_lowercase().contains(&term))
                .unwrap_or(false);
        if matched {
            let title = entry
                .metadata
                .title
                .clone()
                .unwrap_or_else(|| entry.data_source_id.clone());
            hits.push(SearchHit {
                display_text: format!("{} ({})", title, entry.data_source_id),
                external_id: entry.data_source_id,
            });
            if hits.len() >= limit {
                break;
            }
        }
    }
    Ok(hits)
}

/// Decode one `data_points` row, validating JSON column shapes.
fn decode_row(row: &SqliteRow) -> Result<ResourceEntry> {
    let id: i64 = row.get("id");
    let countries: String = row.get("countries");
    let domains: String = row.get("domains");
    let metadata: String = row.get("metadata");
    let last_updated: String = row.get("last_updated");
    let created_at: String = row.get("created_at");

    let decode_err =
        |field: &str, e: serde_json::Error| Error::Internal(format!("catalog entry {}: corrupt {} column: {}", id, field, e));

    Ok(ResourceEntry {
        id,
        data_source_id: row.get("data_source_id"),
        hierarchy: HierarchyPath {
            resource_type: non_empty(row.get("resource_type")),
            category: row.get("category"),
            subcategory: row.get("subcategory"),
            data_type: row.get("data_type"),
            level5: row.get("level5"),
        },
        year_start: row.get("year_start"),
        year_end: row.get("year_end"),
        data_format: row.get("data_format"),
        data_resolution: row.get("data_resolution"),
        repository: row.get("repository"),
        repository_url: row.get("repository_url"),
        data_description: row.get("data_description"),
        keywords: row.get("keywords"),
        contact_information: row.get("contact_information"),
        last_updated: NaiveDate::parse_from_str(&last_updated, "%Y-%m-%d")
            .map_err(|e| Error::Internal(format!("catalog entry {}: bad last_updated: {}", id, e)))?,
        metadata: serde_json::from_str(&metadata).map_err(|e| decode_err("metadata", e))?,
        countries: serde_json::from_str(&countries).map_err(|e| decode_err("countries", e))?,
        domains: serde_json::from_str(&domains).map_err(|e| decode_err("domains", e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(format!("catalog entry {}: bad created_at: {}", id, e)))?
            .with_timezone(&Utc),
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_fragment_takes_first_four_alphanumerics() {
        assert_eq!(id_fragment("omics_data"), "OMIC");
        assert_eq!(id_fragment("Unknown"), "UNKN");
        assert_eq!(id_fragment("EU"), "EU");
        assert_eq!(id_fragment("--"), "UNKN");
    }

    #[test]
    fn empty_urls_normalize_to_none() {
        assert_eq!(normalize_url(None), None);
        assert_eq!(normalize_url(Some("  ")), None);
        assert_eq!(
            normalize_url(Some("https://a.example")),
            Some("https://a.example".to_string())
        );
    }
}
