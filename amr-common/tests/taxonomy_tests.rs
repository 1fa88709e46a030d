//! Taxonomy store tests: document parsing, path resolution, degraded load

use amr_common::models::HierarchyPath;
use amr_common::taxonomy::Taxonomy;
use std::path::Path;

const TAXONOMY_YAML: &str = r#"
main_categories:
  Country: [Denmark, Finland, Iceland, Norway, Sweden]
  Domain: [Human, Animal, Environment, Food]
resource_type_hierarchy:
  data:
    title: Data
    sub_categories:
      omics_data:
        title: Omics data
        sub_categories:
          sequencing:
            title: Sequencing
            items:
              - name: wgs
                title: Whole genome sequencing
              - amplicon
      phenotypic_data:
        items: [mic_values]
  systems:
    title: Surveillance systems
  publications: {}
"#;

fn taxonomy() -> Taxonomy {
    Taxonomy::from_yaml_str(TAXONOMY_YAML).unwrap()
}

fn path(levels: &[&str]) -> HierarchyPath {
    let mut iter = levels.iter().map(|l| l.to_string());
    HierarchyPath {
        resource_type: iter.next(),
        category: iter.next(),
        subcategory: iter.next(),
        data_type: iter.next(),
        level5: iter.next(),
    }
}

#[test]
fn loads_main_categories() {
    let t = taxonomy();
    assert!(t.available());
    assert_eq!(t.countries().len(), 5);
    assert!(t.is_country("Sweden"));
    assert!(!t.is_country("Germany"));
    assert!(t.is_domain("Food"));
}

#[test]
fn valid_paths_resolve() {
    let t = taxonomy();
    assert!(t.resolve_path(&path(&["data"])));
    assert!(t.resolve_path(&path(&["data", "omics_data"])));
    assert!(t.resolve_path(&path(&["data", "omics_data", "sequencing"])));
    assert!(t.resolve_path(&path(&["data", "omics_data", "sequencing", "wgs"])));
    assert!(t.resolve_path(&path(&["data", "omics_data", "sequencing", "amplicon"])));
    assert!(t.resolve_path(&path(&["data", "phenotypic_data", "mic_values"])));
    assert!(t.resolve_path(&path(&["systems"])));
    assert!(t.resolve_path(&path(&["publications"])));
}

#[test]
fn wrong_child_keys_fail() {
    let t = taxonomy();
    assert!(!t.resolve_path(&path(&["nope"])));
    assert!(!t.resolve_path(&path(&["data", "sequencing"])));
    assert!(!t.resolve_path(&path(&["data", "omics_data", "wgs"])));
    assert!(!t.resolve_path(&path(&["systems", "omics_data"])));
    // Item leaves have no children
    assert!(!t.resolve_path(&path(&["data", "omics_data", "sequencing", "wgs", "deeper"])));
}

#[test]
fn present_level_after_absent_level_fails() {
    let t = taxonomy();
    let gapped = HierarchyPath {
        resource_type: Some("data".into()),
        category: None,
        subcategory: Some("sequencing".into()),
        ..Default::default()
    };
    assert!(!t.resolve_path(&gapped));
    // Missing resource type is never valid, even with nothing else set
    assert!(!t.resolve_path(&HierarchyPath::default()));
}

#[test]
fn titles_fall_back_to_title_cased_keys() {
    let t = taxonomy();
    assert_eq!(t.title_for("omics_data"), "Omics data");
    assert_eq!(t.title_for("wgs"), "Whole genome sequencing");
    // No title in the document
    assert_eq!(t.title_for("publications"), "Publications");
    assert_eq!(t.title_for("mic_values"), "Mic Values");
}

#[test]
fn prompt_listing_renders_full_chains() {
    let listing = taxonomy().prompt_listing();
    assert!(listing.contains("data > omics_data > sequencing > wgs"));
    assert!(listing.contains("Whole genome sequencing"));
    assert!(listing.contains("publications"));
}

#[test]
fn missing_file_degrades_to_empty() {
    let t = Taxonomy::load(Path::new("/nonexistent/taxonomy.yaml"));
    assert!(!t.available());
    assert!(t.countries().is_empty());
    assert!(!t.resolve_path(&path(&["data"])));
}

#[test]
fn malformed_yaml_degrades_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("taxonomy.yaml");
    std::fs::write(&file, "main_categories: [not: {a map").unwrap();
    let t = Taxonomy::load(&file);
    assert!(!t.available());
}

#[test]
fn node_with_both_children_kinds_is_rejected() {
    let result = Taxonomy::from_yaml_str(
        r#"
resource_type_hierarchy:
  data:
    sub_categories:
      a: {}
    items: [b]
"#,
    );
    assert!(result.is_err());
}

#[test]
fn duplicate_item_keys_are_rejected() {
    let result = Taxonomy::from_yaml_str(
        r#"
resource_type_hierarchy:
  data:
    items: [wgs, wgs]
"#,
    );
    assert!(result.is_err());
}
