//! Reconciliation of classifier output against the taxonomy
//!
//! Classifier output is an untrusted candidate: every hierarchy level is
//! re-checked against the live taxonomy (exact key, then normalized key,
//! then display title) and the first level that fails truncates the rest of
//! the path. The result is an ordinary submission draft plus helpers for the
//! two caller actions: pre-fill (tolerant) and direct submit (gated).

use super::classifier::ExtractedDraft;
use amr_common::models::{HierarchyPath, SubmissionDraft};
use amr_common::taxonomy::{Taxonomy, TaxonomyNode};
use tracing::debug;

/// Map classifier output onto a submission draft, re-validating every
/// vocabulary reference.
pub fn reconcile(extracted: &ExtractedDraft, taxonomy: &Taxonomy) -> SubmissionDraft {
    let hierarchy = reconcile_hierarchy(extracted, taxonomy);
    let countries = canonicalize_values(&extracted.countries, taxonomy.countries());
    let domains = canonicalize_values(&extracted.domains, taxonomy.domains());

    // Inverted year ranges are kept on the draft; the direct-submit gate and
    // the validator both catch them, and pre-fill should show what was read.
    SubmissionDraft {
        resource_name: extracted.resource_name.clone().unwrap_or_default(),
        countries,
        domains,
        primary_hierarchy_path: hierarchy,
        year_start: extracted.year_start,
        year_end: extracted.year_end,
        resource_url: extracted.resource_url.clone(),
        contact_info: extracted.contact_info.clone(),
        description: extracted.description.clone(),
        keywords: if extracted.keywords.is_empty() {
            None
        } else {
            Some(extracted.keywords.join(", "))
        },
        license: extracted.license.clone(),
        related_metadata: Vec::new(),
        related_resources: Vec::new(),
        submitter_info: Some("AI extraction".to_string()),
    }
}

/// Fields the direct-submit path still needs. Empty means the draft may be
/// inserted as a pending submission; anything else downgrades to pre-fill.
pub fn direct_submit_missing(draft: &SubmissionDraft) -> Vec<String> {
    let mut missing = Vec::new();
    if draft.resource_name.trim().is_empty() {
        missing.push("resource_name".to_string());
    }
    if draft.countries.is_empty() {
        missing.push("countries".to_string());
    }
    if draft.domains.is_empty() {
        missing.push("domains".to_string());
    }
    if draft
        .primary_hierarchy_path
        .resource_type
        .as_deref()
        .unwrap_or("")
        .is_empty()
    {
        missing.push("resource_type".to_string());
    }
    if draft.year_range_inverted() {
        missing.push("year_range".to_string());
    }
    missing
}

/// Flatten a draft into query-parameter pairs for the submission form.
/// Multi-valued fields repeat their key.
pub fn prefill_params(draft: &SubmissionDraft) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut push = |key: &str, value: &str| {
        if !value.is_empty() {
            params.push((key.to_string(), value.to_string()));
        }
    };

    push("resource_name", &draft.resource_name);
    for country in &draft.countries {
        push("countries", country);
    }
    for domain in &draft.domains {
        push("domains", domain);
    }
    let path = &draft.primary_hierarchy_path;
    push("resource_type", path.resource_type.as_deref().unwrap_or(""));
    push("category", path.category.as_deref().unwrap_or(""));
    push("subcategory", path.subcategory.as_deref().unwrap_or(""));
    push("data_type", path.data_type.as_deref().unwrap_or(""));
    push("level5", path.level5.as_deref().unwrap_or(""));
    if let Some(year) = draft.year_start {
        push("year_start", &year.to_string());
    }
    if let Some(year) = draft.year_end {
        push("year_end", &year.to_string());
    }
    push("resource_url", draft.resource_url.as_deref().unwrap_or(""));
    push("contact_info", draft.contact_info.as_deref().unwrap_or(""));
    push("description", draft.description.as_deref().unwrap_or(""));
    push("keywords", draft.keywords.as_deref().unwrap_or(""));
    push("license", draft.license.as_deref().unwrap_or(""));
    params
}

/// Walk the classifier's hierarchy levels down the taxonomy, matching each
/// candidate to a child node. The first non-matching level truncates the
/// remainder of the path.
fn reconcile_hierarchy(extracted: &ExtractedDraft, taxonomy: &Taxonomy) -> HierarchyPath {
    let candidates = [
        extracted.primary_hierarchy.level1.as_deref(),
        extracted.primary_hierarchy.level2.as_deref(),
        extracted.primary_hierarchy.level3.as_deref(),
        extracted.primary_hierarchy.level4.as_deref(),
        extracted.primary_hierarchy.level5.as_deref(),
    ];

    let mut resolved: Vec<String> = Vec::new();
    let mut children: &[TaxonomyNode] = taxonomy.hierarchy();
    for candidate in candidates.into_iter().flatten() {
        match match_node(children, candidate) {
            Some(node) => {
                resolved.push(node.key.clone());
                children = &node.children;
            }
            None => {
                debug!(candidate, "Classifier hierarchy key not in taxonomy, truncating path");
                break;
            }
        }
    }

    let mut levels = resolved.into_iter();
    HierarchyPath {
        resource_type: levels.next(),
        category: levels.next(),
        subcategory: levels.next(),
        data_type: levels.next(),
        level5: levels.next(),
    }
}

/// Match a candidate against sibling nodes: exact key, then normalized key,
/// then display title.
fn match_node<'a>(nodes: &'a [TaxonomyNode], candidate: &str) -> Option<&'a TaxonomyNode> {
    let normalized = normalize_key(candidate);
    nodes
        .iter()
        .find(|n| n.key == candidate)
        .or_else(|| nodes.iter().find(|n| normalize_key(&n.key) == normalized))
        .or_else(|| {
            nodes
                .iter()
                .find(|n| normalize_key(&n.display_title()) == normalized)
        })
}

fn normalize_key(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// Canonicalize multi-select values against a controlled list
/// (case-insensitive). Values with no match are kept verbatim so the
/// pre-fill form can show them; the validator flags them on submit.
fn canonicalize_values(values: &[String], allowed: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| {
            allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(value.trim()))
                .cloned()
                .unwrap_or_else(|| value.trim().to_string())
        })
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::classifier::ExtractedHierarchy;

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_yaml_str(
            r#"
main_categories:
  Country: [Sweden, Norway, Denmark]
  Domain: [Human, Animal]
resource_type_hierarchy:
  data:
    title: Data
    sub_categories:
      omics_data:
        title: Omics data
        items: [wgs]
"#,
        )
        .unwrap()
    }

    #[test]
    fn exact_keys_resolve() {
        let extracted = ExtractedDraft {
            primary_hierarchy: ExtractedHierarchy {
                level1: Some("data".into()),
                level2: Some("omics_data".into()),
                level3: Some("wgs".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let draft = reconcile(&extracted, &taxonomy());
        assert_eq!(draft.primary_hierarchy_path.subcategory.as_deref(), Some("wgs"));
    }

    #[test]
    fn titles_map_back_to_keys() {
        let extracted = ExtractedDraft {
            primary_hierarchy: ExtractedHierarchy {
                level1: Some("Data".into()),
                level2: Some("Omics data".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let draft = reconcile(&extracted, &taxonomy());
        assert_eq!(
            draft.primary_hierarchy_path.category.as_deref(),
            Some("omics_data")
        );
    }

    #[test]
    fn unknown_level_truncates_the_rest() {
        let extracted = ExtractedDraft {
            primary_hierarchy: ExtractedHierarchy {
                level1: Some("data".into()),
                level2: Some("made_up".into()),
                level3: Some("wgs".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let draft = reconcile(&extracted, &taxonomy());
        assert_eq!(draft.primary_hierarchy_path.resource_type.as_deref(), Some("data"));
        assert_eq!(draft.primary_hierarchy_path.category, None);
        assert_eq!(draft.primary_hierarchy_path.subcategory, None);
    }

    #[test]
    fn countries_canonicalize_case_insensitively() {
        let extracted = ExtractedDraft {
            countries: vec!["sweden".into(), "Atlantis".into()],
            ..Default::default()
        };
        let draft = reconcile(&extracted, &taxonomy());
        assert_eq!(draft.countries, vec!["Sweden", "Atlantis"]);
    }

    #[test]
    fn missing_domains_block_direct_submit() {
        let extracted = ExtractedDraft {
            resource_name: Some("Registry".into()),
            countries: vec!["Sweden".into()],
            primary_hierarchy: ExtractedHierarchy {
                level1: Some("data".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let draft = reconcile(&extracted, &taxonomy());
        assert_eq!(direct_submit_missing(&draft), vec!["domains"]);
    }

    #[test]
    fn inverted_years_block_direct_submit() {
        let draft = SubmissionDraft {
            resource_name: "Registry".into(),
            countries: vec!["Sweden".into()],
            domains: vec!["Human".into()],
            primary_hierarchy_path: HierarchyPath::resource_type("data"),
            year_start: Some(2024),
            year_end: Some(2019),
            ..Default::default()
        };
        assert_eq!(direct_submit_missing(&draft), vec!["year_range"]);
    }

    #[test]
    fn prefill_repeats_multivalue_keys() {
        let draft = SubmissionDraft {
            resource_name: "Registry".into(),
            countries: vec!["Sweden".into(), "Norway".into()],
            domains: vec!["Human".into()],
            primary_hierarchy_path: HierarchyPath::resource_type("data"),
            ..Default::default()
        };
        let params = prefill_params(&draft);
        let countries: Vec<_> = params
            .iter()
            .filter(|(k, _)| k == "countries")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(countries, vec!["Sweden", "Norway"]);
    }
}
