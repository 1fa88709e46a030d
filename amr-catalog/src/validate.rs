//! Submission validation against the controlled vocabulary
//!
//! A pure check: no storage access, all violations collected and returned
//! together so the caller can redisplay the complete list in one round trip.

use amr_common::models::SubmissionDraft;
use amr_common::taxonomy::Taxonomy;

/// Named, versioned required-field set.
///
/// The product has relaxed its required fields over time (`resource_url` and
/// the year range used to be mandatory); keeping the set as a value means a
/// future tightening is a policy change, not a code change.
#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
    pub require_resource_url: bool,
    pub require_year_range: bool,
}

impl FieldPolicy {
    /// Policy applied when a submission enters the queue.
    pub fn submission() -> Self {
        Self {
            require_resource_url: false,
            require_year_range: false,
        }
    }

    /// Policy applied at approval time. Currently the same relaxed set;
    /// approval additionally defers to the live taxonomy for path legality.
    pub fn approval() -> Self {
        Self::submission()
    }
}

/// Outcome of validating a draft. Empty violation list means valid.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    violations: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<String> {
        self.violations
    }

    fn push(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }
}

/// Validate a draft against the taxonomy under the given policy.
///
/// Checks, in order: resource name, countries, domains, hierarchy path,
/// year range, then the policy-dependent fields. Never fails fast.
pub fn validate(draft: &SubmissionDraft, taxonomy: &Taxonomy, policy: &FieldPolicy) -> ValidationReport {
    let mut report = ValidationReport::default();

    if draft.resource_name.trim().is_empty() {
        report.push("Resource name is required");
    }

    if draft.countries.is_empty() {
        report.push("At least one country is required");
    }
    if draft.domains.is_empty() {
        report.push("At least one domain is required");
    }

    if !taxonomy.available() {
        // Distinct condition: the vocabulary itself is missing, which is not
        // the submitter's fault and must not read like an invalid path.
        report.push("Taxonomy configuration unavailable; submission cannot be validated");
    } else {
        for country in &draft.countries {
            if !taxonomy.is_country(country) {
                report.push(format!("Unknown country: {}", country));
            }
        }
        for domain in &draft.domains {
            if !taxonomy.is_domain(domain) {
                report.push(format!("Unknown domain: {}", domain));
            }
        }

        let path = &draft.primary_hierarchy_path;
        if path.resource_type.as_deref().unwrap_or("").is_empty() {
            report.push("Resource type is required");
        } else if !taxonomy.resolve_path(path) {
            report.push(format!(
                "Hierarchy path is not part of the taxonomy: {}",
                path.levels()
                    .iter()
                    .flatten()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" > ")
            ));
        }
    }

    if draft.year_range_inverted() {
        report.push("Start year must not be later than end year");
    }

    if policy.require_resource_url
        && draft.resource_url.as_deref().unwrap_or("").trim().is_empty()
    {
        report.push("Resource URL is required");
    }
    if policy.require_year_range && (draft.year_start.is_none() || draft.year_end.is_none()) {
        report.push("Year range is required");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use amr_common::models::HierarchyPath;

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_yaml_str(
            r#"
main_categories:
  Country: [Sweden, Norway]
  Domain: [Human, Animal]
resource_type_hierarchy:
  data:
    title: Data
    sub_categories:
      omics_data:
        items: [wgs]
"#,
        )
        .unwrap()
    }

    fn valid_draft() -> SubmissionDraft {
        SubmissionDraft {
            resource_name: "Swedish AMR registry".to_string(),
            countries: vec!["Sweden".to_string()],
            domains: vec!["Human".to_string()],
            primary_hierarchy_path: HierarchyPath {
                resource_type: Some("data".to_string()),
                category: Some("omics_data".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn valid_draft_passes() {
        let report = validate(&valid_draft(), &taxonomy(), &FieldPolicy::submission());
        assert!(report.is_valid(), "{:?}", report.violations());
    }

    #[test]
    fn all_violations_collected() {
        let draft = SubmissionDraft {
            year_start: Some(2024),
            year_end: Some(2020),
            ..Default::default()
        };
        let report = validate(&draft, &taxonomy(), &FieldPolicy::submission());
        // name, countries, domains, resource type, year order
        assert_eq!(report.violations().len(), 5);
    }

    #[test]
    fn unavailable_taxonomy_is_its_own_violation() {
        let report = validate(&valid_draft(), &Taxonomy::empty(), &FieldPolicy::submission());
        assert!(!report.is_valid());
        assert!(report.violations()[0].contains("unavailable"));
    }

    #[test]
    fn url_not_required_under_current_policy() {
        let mut draft = valid_draft();
        draft.resource_url = None;
        assert!(validate(&draft, &taxonomy(), &FieldPolicy::approval()).is_valid());
    }
}
