//! Catalog domain models
//!
//! Explicit structs for the records and blobs the legacy data model kept as
//! loose JSON: the 5-level hierarchy path, the approved catalog entry, the
//! pending submission, and the unvalidated submission draft.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A walk through the resource-type hierarchy, L1 (resource type) through
/// L5 (item). Levels beyond the first are optional, but an absent level may
/// never be followed by a present one; `Taxonomy::resolve_path` enforces
/// both rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyPath {
    pub resource_type: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub data_type: Option<String>,
    pub level5: Option<String>,
}

impl HierarchyPath {
    /// Path consisting of a single L1 level.
    pub fn resource_type(key: impl Into<String>) -> Self {
        Self {
            resource_type: Some(key.into()),
            ..Default::default()
        }
    }

    /// Levels in order, L1 first.
    pub fn levels(&self) -> [Option<&str>; 5] {
        [
            self.resource_type.as_deref(),
            self.category.as_deref(),
            self.subcategory.as_deref(),
            self.data_type.as_deref(),
            self.level5.as_deref(),
        ]
    }

    /// True when no level is set.
    pub fn is_empty(&self) -> bool {
        self.levels().iter().all(|l| l.is_none())
    }
}

/// Structured metadata carried on an approved catalog entry.
///
/// Stored as one JSON column; shape is validated on read and write rather
/// than trusted downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub title: Option<String>,
    pub license: Option<String>,
    pub original_url: Option<String>,
    pub description: Option<String>,
    /// External ids (`data_source_id`) of related catalog entries.
    /// Informational only; never validated against the repository, so
    /// dangling references are possible.
    #[serde(default)]
    pub related_resources: Vec<String>,
    /// Related taxonomy paths beyond the entry's own primary path.
    #[serde(default)]
    pub related_categories: Vec<HierarchyPath>,
}

/// An approved catalog entry (`data_points` row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Internal surrogate key, assigned on insert
    pub id: i64,
    /// Externally visible unique identifier, e.g. `OMIC-UNKN-2026`
    pub data_source_id: String,
    /// Primary hierarchy path (L1 required, validated at write time)
    pub hierarchy: HierarchyPath,
    pub year_start: Option<i64>,
    pub year_end: Option<i64>,
    pub data_format: String,
    pub data_resolution: String,
    /// Repository name, derived from the URL host when one is present
    pub repository: String,
    pub repository_url: Option<String>,
    pub data_description: Option<String>,
    pub keywords: Option<String>,
    pub contact_information: Option<String>,
    /// Date of the approval that created or last touched this entry
    pub last_updated: NaiveDate,
    pub metadata: ResourceMetadata,
    pub countries: Vec<String>,
    pub domains: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Moderation state of a pending submission.
///
/// Approval ordinarily deletes the row inside the same transaction as the
/// catalog insert, so `Approved` is only ever written by the compensating
/// path when that delete cannot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Rejected,
    Approved,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Approved => "approved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SubmissionStatus::Pending),
            "rejected" => Some(SubmissionStatus::Rejected),
            "approved" => Some(SubmissionStatus::Approved),
            _ => None,
        }
    }
}

/// A pending submission (`pending_submissions` row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub submission_id: i64,
    pub status: SubmissionStatus,
    pub resource_name: String,
    pub countries: Vec<String>,
    pub domains: Vec<String>,
    pub primary_hierarchy_path: HierarchyPath,
    pub year_start: Option<i64>,
    pub year_end: Option<i64>,
    pub resource_url: Option<String>,
    pub contact_info: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub license: Option<String>,
    pub related_metadata: Vec<HierarchyPath>,
    pub related_resources: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub submitter_info: Option<String>,
}

/// An unvalidated submission candidate, produced by the public form or by
/// the AI extraction reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub primary_hierarchy_path: HierarchyPath,
    pub year_start: Option<i64>,
    pub year_end: Option<i64>,
    pub resource_url: Option<String>,
    pub contact_info: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub related_metadata: Vec<HierarchyPath>,
    #[serde(default)]
    pub related_resources: Vec<String>,
    pub submitter_info: Option<String>,
}

impl SubmissionDraft {
    /// True when both years are present and inverted.
    pub fn year_range_inverted(&self) -> bool {
        matches!((self.year_start, self.year_end), (Some(s), Some(e)) if s > e)
    }
}
