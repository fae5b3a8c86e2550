//! Firefox alternatives for extensions that cannot be converted

use crate::error::CatalogLoadError;
use crate::models::{AlternativeCandidate, Recommendation, SourceManifest};
use crate::utils::is_match_pattern;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Catalog shipped with the crate
pub const DEFAULT_CATALOG_JSON: &str = include_str!("../../data/alternatives.json");

/// Manifest keys that imply a capability tag
const KEY_CAPABILITIES: &[(&str, &str)] = &[
    ("chrome_url_overrides", "new_tab"),
    ("commands", "keyboard_shortcuts"),
    ("content_scripts", "page_modification"),
    ("declarative_net_request", "content_blocking"),
    ("devtools_page", "devtools"),
    ("omnibox", "omnibox"),
    ("side_panel", "sidebar"),
];

/// Read-only list of known Firefox add-ons
#[derive(Debug, Clone, Default)]
pub struct AlternativeCatalog {
    candidates: Vec<AlternativeCandidate>,
}

impl AlternativeCatalog {
    pub fn load_default() -> Result<Self, CatalogLoadError> {
        Self::from_json(DEFAULT_CATALOG_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogLoadError> {
        let candidates: Vec<AlternativeCandidate> = serde_json::from_str(json)?;
        let catalog = Self::new(candidates)?;
        info!("Alternatives catalog ready ({} candidates)", catalog.len());
        Ok(catalog)
    }

    pub fn new(candidates: Vec<AlternativeCandidate>) -> Result<Self, CatalogLoadError> {
        let mut seen = HashSet::new();
        for candidate in &candidates {
            if !seen.insert(candidate.name.as_str()) {
                return Err(CatalogLoadError::DuplicateCandidate {
                    name: candidate.name.clone(),
                });
            }
        }
        Ok(Self { candidates })
    }

    pub fn candidates(&self) -> &[AlternativeCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Tags a manifest requests: its API permission names plus the capability
/// tags implied by the keys it declares. Host patterns carry no tag.
pub fn capability_tags(source: &SourceManifest) -> BTreeSet<String> {
    let mut tags: BTreeSet<String> = source
        .declared_permissions()
        .filter(|permission| !is_match_pattern(permission))
        .map(str::to_string)
        .collect();

    for (key, tag) in KEY_CAPABILITIES {
        if source.get(key).is_some() {
            tags.insert(tag.to_string());
        }
    }

    tags
}

/// Ranks catalog candidates by how many tags they share with a manifest
#[derive(Debug, Clone, Copy)]
pub struct AlternativeRecommender<'c> {
    catalog: &'c AlternativeCatalog,
    limit: usize,
}

impl<'c> AlternativeRecommender<'c> {
    pub fn new(catalog: &'c AlternativeCatalog, limit: usize) -> Self {
        Self { catalog, limit }
    }

    /// Top candidates by overlap size, ties broken by name. Candidates
    /// sharing no tag are never returned, so the result may be empty.
    pub fn recommend(&self, source: &SourceManifest) -> Vec<Recommendation> {
        let tags = capability_tags(source);

        let mut ranked: Vec<Recommendation> = self
            .catalog
            .candidates()
            .iter()
            .filter_map(|candidate| {
                let matched_tags: Vec<String> = candidate.tags.intersection(&tags).cloned().collect();
                (!matched_tags.is_empty()).then(|| Recommendation {
                    candidate: candidate.clone(),
                    matched_tags,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.overlap()
                .cmp(&a.overlap())
                .then_with(|| a.candidate.name.cmp(&b.candidate.name))
        });
        ranked.truncate(self.limit);

        debug!(
            "{} alternative(s) for tags [{}]",
            ranked.len(),
            tags.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::manifest::parse_manifest_from_str;
    use pretty_assertions::assert_eq;

    fn candidate(name: &str, tags: &[&str]) -> AlternativeCandidate {
        AlternativeCandidate {
            name: name.to_string(),
            store_url: format!("https://addons.mozilla.org/firefox/addon/{}/", name),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn manifest(json: &str) -> SourceManifest {
        parse_manifest_from_str(json).unwrap()
    }

    #[test]
    fn test_default_catalog_loads() {
        let catalog = AlternativeCatalog::load_default().unwrap();
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = AlternativeCatalog::new(vec![candidate("a", &["tabs"]), candidate("a", &["storage"])])
            .unwrap_err();
        assert!(matches!(err, CatalogLoadError::DuplicateCandidate { name } if name == "a"));
    }

    #[test]
    fn test_capability_tags() {
        let source = manifest(
            r#"{"manifest_version": 3, "name": "x",
                "permissions": ["tabs", "https://*/*"],
                "optional_permissions": ["bookmarks"],
                "content_scripts": [{"matches": ["<all_urls>"], "js": ["c.js"]}]}"#,
        );
        let tags: Vec<String> = capability_tags(&source).into_iter().collect();
        assert_eq!(tags, vec!["bookmarks", "page_modification", "tabs"]);
    }

    #[test]
    fn test_rank_by_overlap_then_name() {
        let catalog = AlternativeCatalog::new(vec![
            candidate("Zeta", &["tabs", "storage"]),
            candidate("Alpha", &["tabs", "storage"]),
            candidate("Solo", &["tabs"]),
            candidate("Unrelated", &["cookies"]),
        ])
        .unwrap();
        let source = manifest(r#"{"manifest_version": 3, "name": "x", "permissions": ["tabs", "storage"]}"#);

        let names: Vec<String> = AlternativeRecommender::new(&catalog, 5)
            .recommend(&source)
            .into_iter()
            .map(|r| r.candidate.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta", "Solo"]);
    }

    #[test]
    fn test_limit_and_empty_results() {
        let catalog = AlternativeCatalog::new(vec![candidate("A", &["tabs"]), candidate("B", &["tabs"])]).unwrap();
        let tabs = manifest(r#"{"manifest_version": 3, "name": "x", "permissions": ["tabs"]}"#);
        let bare = manifest(r#"{"manifest_version": 3, "name": "x"}"#);

        assert_eq!(AlternativeRecommender::new(&catalog, 1).recommend(&tabs).len(), 1);
        assert!(AlternativeRecommender::new(&catalog, 0).recommend(&tabs).is_empty());
        assert!(AlternativeRecommender::new(&catalog, 5).recommend(&bare).is_empty());
    }
}
