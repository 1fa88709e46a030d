//! Controlled-vocabulary taxonomy store
//!
//! Loaded once at startup from a YAML document and injected into every
//! component that validates or renders catalog vocabulary. Immutable for the
//! process lifetime.
//!
//! The document has two top-level keys:
//! - `main_categories`: flat lists (`Country`, `Domain`) used as multi-select
//!   constraints
//! - `resource_type_hierarchy`: the 5-level resource-type tree
//!   (Resource Type > Category > Subcategory > Data Type > Item), where each
//!   node carries an optional display `title` and either a `sub_categories`
//!   map or an `items` list of leaves, never both
//!
//! A missing or malformed document degrades to an empty taxonomy instead of
//! aborting startup; callers must check [`Taxonomy::available`] and report
//! "taxonomy unavailable" separately from "invalid path".

use crate::models::HierarchyPath;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Key of the countries list under `main_categories`
const COUNTRY_KEY: &str = "Country";
/// Key of the domains list under `main_categories`
const DOMAIN_KEY: &str = "Domain";

/// Maximum hierarchy depth (resource type through item)
pub const MAX_DEPTH: usize = 5;

/// One node of the resource-type hierarchy.
///
/// Leaves (items) are represented as nodes with no children, so the runtime
/// tree is uniform even though the source document distinguishes
/// `sub_categories` from `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyNode {
    /// Stable internal identifier, e.g. `omics_data`
    pub key: String,
    /// Display label; `None` falls back to a title-cased key
    pub title: Option<String>,
    /// Child nodes, in document order
    pub children: Vec<TaxonomyNode>,
}

impl TaxonomyNode {
    /// Display title, falling back to a title-cased version of the key.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| title_case_key(&self.key))
    }

    /// Look up a direct child by key.
    pub fn child(&self, key: &str) -> Option<&TaxonomyNode> {
        self.children.iter().find(|c| c.key == key)
    }
}

/// Title-case an internal key: `omics_data` becomes `Omics Data`.
pub fn title_case_key(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Source document shape (serde)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TaxonomyDocument {
    #[serde(default)]
    main_categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    resource_type_hierarchy: NodeMap,
}

/// YAML preserves insertion order only through sequence-of-maps tricks;
/// serde_yaml maps come back ordered by the underlying representation, which
/// for our documents is document order. Keyed as written.
type NodeMap = serde_yaml::Mapping;

#[derive(Debug, Deserialize)]
struct NodeSpec {
    title: Option<String>,
    sub_categories: Option<NodeMap>,
    items: Option<Vec<ItemSpec>>,
}

/// An item leaf is either a bare string key or a `{name, title}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemSpec {
    Bare(String),
    Titled { name: String, title: Option<String> },
}

// ---------------------------------------------------------------------------
// Runtime store
// ---------------------------------------------------------------------------

/// Process-scoped, immutable taxonomy.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    countries: Vec<String>,
    domains: Vec<String>,
    roots: Vec<TaxonomyNode>,
    available: bool,
}

impl Taxonomy {
    /// Empty, unavailable taxonomy. Every `resolve_path` call returns false.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the taxonomy document from disk.
    ///
    /// Missing or malformed documents degrade to [`Taxonomy::empty`] with a
    /// warning; the process keeps running so the condition can be surfaced
    /// per-request instead of failing startup.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Taxonomy file unreadable; running with empty taxonomy"
                );
                return Self::empty();
            }
        };
        match Self::from_yaml_str(&text) {
            Ok(taxonomy) => {
                info!(
                    path = %path.display(),
                    countries = taxonomy.countries.len(),
                    domains = taxonomy.domains.len(),
                    resource_types = taxonomy.roots.len(),
                    "Taxonomy loaded"
                );
                taxonomy
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Taxonomy file malformed; running with empty taxonomy"
                );
                Self::empty()
            }
        }
    }

    /// Parse a taxonomy document from YAML text.
    pub fn from_yaml_str(text: &str) -> crate::Result<Self> {
        let doc: TaxonomyDocument = serde_yaml::from_str(text)
            .map_err(|e| crate::Error::Config(format!("taxonomy parse error: {}", e)))?;

        let roots = build_children(&doc.resource_type_hierarchy, 1)?;

        Ok(Self {
            countries: doc
                .main_categories
                .get(COUNTRY_KEY)
                .cloned()
                .unwrap_or_default(),
            domains: doc
                .main_categories
                .get(DOMAIN_KEY)
                .cloned()
                .unwrap_or_default(),
            roots,
            available: true,
        })
    }

    /// Whether a taxonomy document was successfully loaded.
    pub fn available(&self) -> bool {
        self.available
    }

    /// Controlled country values.
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// Controlled domain values.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Roots of the resource-type hierarchy (the L1 nodes).
    pub fn hierarchy(&self) -> &[TaxonomyNode] {
        &self.roots
    }

    pub fn is_country(&self, value: &str) -> bool {
        self.countries.iter().any(|c| c == value)
    }

    pub fn is_domain(&self, value: &str) -> bool {
        self.domains.iter().any(|d| d == value)
    }

    /// Check that a hierarchy path is a legal walk from the root.
    ///
    /// Each present level must be a child key of the previous level's node,
    /// and once a level is absent all deeper levels must be absent too.
    /// Always false on an empty taxonomy.
    pub fn resolve_path(&self, path: &HierarchyPath) -> bool {
        if !self.available {
            return false;
        }
        let levels = path.levels();

        // No non-empty level may follow an empty one.
        let first_empty = levels.iter().position(|l| l.is_none());
        if let Some(idx) = first_empty {
            if levels[idx..].iter().any(|l| l.is_some()) {
                return false;
            }
        }

        // Resource type (L1) is required.
        let Some(resource_type) = levels[0] else {
            return false;
        };
        let Some(mut node) = self.roots.iter().find(|n| n.key == resource_type) else {
            return false;
        };
        for level in &levels[1..] {
            let Some(key) = level else { break };
            match node.child(key) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }

    /// Display title for a key anywhere in the hierarchy, with the
    /// title-cased fallback for unknown keys.
    pub fn title_for(&self, key: &str) -> String {
        fn find<'a>(nodes: &'a [TaxonomyNode], key: &str) -> Option<&'a TaxonomyNode> {
            for node in nodes {
                if node.key == key {
                    return Some(node);
                }
                if let Some(found) = find(&node.children, key) {
                    return Some(found);
                }
            }
            None
        }
        match find(&self.roots, key) {
            Some(node) => node.display_title(),
            None => title_case_key(key),
        }
    }

    /// Render every valid hierarchy chain as `key > key > key (Title > ...)`
    /// lines for the classifier prompt. Keys are the answer vocabulary;
    /// titles are hints only.
    pub fn prompt_listing(&self) -> String {
        fn walk(
            node: &TaxonomyNode,
            keys: &mut Vec<String>,
            titles: &mut Vec<String>,
            lines: &mut Vec<String>,
        ) {
            keys.push(node.key.clone());
            titles.push(node.display_title());
            lines.push(format!("{}  ({})", keys.join(" > "), titles.join(" > ")));
            for child in &node.children {
                walk(child, keys, titles, lines);
            }
            keys.pop();
            titles.pop();
        }

        let mut lines = Vec::new();
        let mut keys = Vec::new();
        let mut titles = Vec::new();
        for root in &self.roots {
            walk(root, &mut keys, &mut titles, &mut lines);
        }
        lines.join("\n")
    }
}

/// Build child nodes from a `sub_categories`-style mapping.
///
/// Enforces the document invariants: at most one of `sub_categories` and
/// `items` per node, and bounded depth.
fn build_children(map: &NodeMap, depth: usize) -> crate::Result<Vec<TaxonomyNode>> {
    let mut nodes = Vec::with_capacity(map.len());
    for (key, value) in map {
        let key = key
            .as_str()
            .ok_or_else(|| crate::Error::Config("taxonomy node key must be a string".into()))?
            .to_string();
        let spec: NodeSpec = serde_yaml::from_value(value.clone())
            .map_err(|e| crate::Error::Config(format!("taxonomy node '{}': {}", key, e)))?;

        if spec.sub_categories.is_some() && spec.items.is_some() {
            return Err(crate::Error::Config(format!(
                "taxonomy node '{}' has both sub_categories and items",
                key
            )));
        }
        if depth >= MAX_DEPTH && (spec.sub_categories.is_some() || spec.items.is_some()) {
            return Err(crate::Error::Config(format!(
                "taxonomy node '{}' exceeds maximum depth of {}",
                key, MAX_DEPTH
            )));
        }

        let children = if let Some(sub) = &spec.sub_categories {
            build_children(sub, depth + 1)?
        } else if let Some(items) = &spec.items {
            let mut leaves: Vec<TaxonomyNode> = Vec::with_capacity(items.len());
            for item in items {
                let (name, title) = match item {
                    ItemSpec::Bare(name) => (name.clone(), None),
                    ItemSpec::Titled { name, title } => (name.clone(), title.clone()),
                };
                if leaves.iter().any(|l| l.key == name) {
                    return Err(crate::Error::Config(format!(
                        "duplicate taxonomy key '{}' within a sibling set",
                        name
                    )));
                }
                leaves.push(TaxonomyNode {
                    key: name,
                    title,
                    children: Vec::new(),
                });
            }
            leaves
        } else {
            Vec::new()
        };

        if nodes.iter().any(|n: &TaxonomyNode| n.key == key) {
            return Err(crate::Error::Config(format!(
                "duplicate taxonomy key '{}' within a sibling set",
                key
            )));
        }

        nodes.push(TaxonomyNode {
            key,
            title: spec.title,
            children,
        });
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_handles_underscores() {
        assert_eq!(title_case_key("omics_data"), "Omics Data");
        assert_eq!(title_case_key("data"), "Data");
        assert_eq!(title_case_key("one-health"), "One Health");
    }

    #[test]
    fn empty_taxonomy_is_unavailable() {
        let t = Taxonomy::empty();
        assert!(!t.available());
        assert!(!t.resolve_path(&HierarchyPath::resource_type("data")));
    }
}
