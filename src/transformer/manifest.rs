//! Manifest transformation for Firefox compatibility

use crate::analyzer::manifest::EXPANDED_ARRAYS;
use crate::models::{
    AnnexEntry, BlockedAcknowledgement, ConversionReport, FieldRef, Outcome, Policy,
    ReviewAnnex, SourceManifest, TargetManifest,
};
use crate::rules::restructure::Patch;
use crate::rules::CompatibilityRuleset;
use crate::utils::generate_extension_id;
use crate::ConversionOptions;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Builds the Firefox manifest from a source manifest and the verdicts
/// already recorded for it.
pub struct ManifestTransformer<'a> {
    ruleset: &'a CompatibilityRuleset,
    options: &'a ConversionOptions,
}

impl<'a> ManifestTransformer<'a> {
    pub fn new(ruleset: &'a CompatibilityRuleset, options: &'a ConversionOptions) -> Self {
        Self { ruleset, options }
    }

    /// Target manifest for a report that is not `Blocked`
    pub fn transform(&self, source: &SourceManifest, report: &ConversionReport) -> Option<TargetManifest> {
        if report.is_blocked() {
            return None;
        }
        Some(self.build(source, report))
    }

    /// Partial manifest for a `Blocked` report. Blocking subjects are left
    /// out like any other untranslated field.
    pub fn transform_best_effort(
        &self,
        source: &SourceManifest,
        report: &ConversionReport,
        _acknowledged: &BlockedAcknowledgement,
    ) -> TargetManifest {
        warn!("Producing best-effort manifest for blocked extension '{}'", report.extension_name());
        self.build(source, report)
    }

    /// Manifest values judged `ManualReview`, verbatim
    pub fn review_annex(&self, source: &SourceManifest, report: &ConversionReport) -> ReviewAnnex {
        let entries = report
            .with_outcome(Outcome::ManualReview)
            .filter_map(|verdict| {
                let field = verdict.field()?;
                let value = field_value(source, field)?;
                Some(AnnexEntry {
                    subject: verdict.subject.clone(),
                    path: field.to_string(),
                    value: value.clone(),
                    note: verdict.note.clone(),
                })
            })
            .collect();
        ReviewAnnex { entries }
    }

    fn build(&self, source: &SourceManifest, report: &ConversionReport) -> TargetManifest {
        let mut document = Map::new();

        for verdict in report.verdicts() {
            if !matches!(verdict.outcome, Outcome::Translated | Outcome::TranslatedWithWarning) {
                continue;
            }
            let Some(field) = verdict.field() else {
                continue;
            };
            let (Some(rule), Some(value)) = (self.ruleset.resolve(&verdict.subject), field_value(source, field)) else {
                continue;
            };

            match &rule.policy {
                Policy::DirectMap => place_field(&mut document, field, value),
                Policy::Rename { target } => place_subject(&mut document, target, value),
                Policy::Restructure { transform } => match transform.apply(value, source) {
                    Ok(restructured) => {
                        for patch in restructured.patches {
                            apply_patch(&mut document, patch);
                        }
                    }
                    Err(e) => debug!("Skipping '{}': {}", verdict.subject, e),
                },
                Policy::Unsupported | Policy::ManualReview | Policy::Block => {}
            }
        }

        let additions = self.add_firefox_settings(source, &mut document);

        info!(
            "Transformed manifest for '{}' ({} top-level keys)",
            report.extension_name(),
            document.len()
        );
        TargetManifest::new(document, additions)
    }

    /// Give the add-on an id Firefox accepts unless the source already
    /// carries Firefox settings.
    fn add_firefox_settings(&self, source: &SourceManifest, document: &mut Map<String, Value>) -> Vec<String> {
        if source.get("browser_specific_settings").is_some() {
            return Vec::new();
        }

        let mut additions = Vec::new();
        let id = generate_extension_id(source.display_name(), &self.options.gecko_id_suffix);
        set_at(document, &["browser_specific_settings", "gecko", "id"], Value::String(id));
        additions.push("browser_specific_settings.gecko.id".to_string());

        if source.manifest_version() >= 3 {
            if let Some(version) = &self.options.strict_min_version {
                set_at(
                    document,
                    &["browser_specific_settings", "gecko", "strict_min_version"],
                    Value::String(version.clone()),
                );
                additions.push("browser_specific_settings.gecko.strict_min_version".to_string());
            }
        }

        additions
    }
}

fn field_value<'m>(source: &'m SourceManifest, field: &FieldRef) -> Option<&'m Value> {
    match field {
        FieldRef::Key { key } => source.get(key),
        FieldRef::Entry { key, index } => source.get(key)?.as_array()?.get(*index),
        FieldRef::Nested { key, inner } => source.get(key)?.get(inner),
    }
}

/// Copy a value to the place it came from
fn place_field(document: &mut Map<String, Value>, field: &FieldRef, value: &Value) {
    match field {
        FieldRef::Key { key } => set_at(document, &[key.as_str()], value.clone()),
        FieldRef::Entry { key, .. } => append_at(document, &[key.as_str()], vec![value.clone()]),
        FieldRef::Nested { key, inner } => set_at(document, &[key.as_str(), inner.as_str()], value.clone()),
    }
}

/// Copy a value to the place a subject names. A permission subject such as
/// `permissions.tabs` places the permission name, not the value.
fn place_subject(document: &mut Map<String, Value>, subject: &str, value: &Value) {
    if let Some((key, entry)) = subject.split_once('.') {
        if EXPANDED_ARRAYS.contains(&key) {
            append_at(document, &[key], vec![Value::String(entry.to_string())]);
            return;
        }
    }
    let path: Vec<&str> = subject.split('.').collect();
    set_at(document, &path, value.clone());
}

fn apply_patch(document: &mut Map<String, Value>, patch: Patch) {
    match patch {
        Patch::Set { path, value } => {
            let path: Vec<&str> = path.split('.').collect();
            set_at(document, &path, value);
        }
        Patch::Append { path, values } => {
            let path: Vec<&str> = path.split('.').collect();
            append_at(document, &path, values);
        }
    }
}

/// Walk to the parent object of `path`, creating objects on the way.
/// Returns `None` when something that is not an object is in the way.
fn parent_of<'d>(document: &'d mut Map<String, Value>, path: &[&str]) -> Option<&'d mut Map<String, Value>> {
    let (_, parents) = path.split_last()?;
    let mut current = document;
    for segment in parents {
        current = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
    }
    Some(current)
}

/// Place a value, merging with what earlier subjects already placed there
fn set_at(document: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some(last) = path.last() else {
        return;
    };
    let Some(parent) = parent_of(document, path) else {
        warn!("Cannot place '{}': a parent is not an object", path.join("."));
        return;
    };
    match parent.get_mut(*last) {
        Some(existing) => merge(existing, value),
        None => {
            parent.insert(last.to_string(), value);
        }
    }
}

fn append_at(document: &mut Map<String, Value>, path: &[&str], values: Vec<Value>) {
    set_at(document, path, Value::Array(values));
}

/// Arrays union without duplicates, objects fill in missing keys, and
/// anything else keeps the value placed first.
fn merge(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Array(items), Value::Array(incoming)) => {
            for item in incoming {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        (Value::Object(map), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match map.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        map.insert(key, value);
                    }
                }
            }
        }
        (existing, incoming) => {
            if *existing != incoming {
                debug!("Keeping {} over {}", existing, incoming);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::CompatibilityAnalyzer;
    use crate::models::PolicyKind;
    use crate::parser::manifest::parse_manifest_from_str;
    use crate::rules::RuleSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn convert(ruleset: &CompatibilityRuleset, json: &str) -> (Option<TargetManifest>, ReviewAnnex) {
        let options = ConversionOptions::default();
        let source = parse_manifest_from_str(json).unwrap();
        let report = CompatibilityAnalyzer::new(ruleset).analyze(&source, Vec::new(), &[]);
        let transformer = ManifestTransformer::new(ruleset, &options);
        (transformer.transform(&source, &report), transformer.review_annex(&source, &report))
    }

    #[test]
    fn test_service_worker_and_permissions() {
        let ruleset = CompatibilityRuleset::load_default().unwrap();
        let (manifest, _) = convert(
            &ruleset,
            r#"{
                "manifest_version": 3,
                "name": "Tab Counter",
                "version": "1.0",
                "permissions": ["tabs", "https://example.com/*"],
                "background": {"service_worker": "bg.js"}
            }"#,
        );
        let manifest = manifest.unwrap();

        assert_eq!(manifest.get("permissions"), Some(&json!(["tabs"])));
        assert_eq!(manifest.get("host_permissions"), Some(&json!(["https://example.com/*"])));
        assert_eq!(manifest.get_path("background.scripts"), Some(&json!(["bg.js"])));
        assert_eq!(manifest.get_path("background.service_worker"), None);
    }

    #[test]
    fn test_add_firefox_settings() {
        let ruleset = CompatibilityRuleset::load_default().unwrap();
        let (manifest, _) = convert(
            &ruleset,
            r#"{"manifest_version": 3, "name": "My Extension", "version": "1.0"}"#,
        );
        let manifest = manifest.unwrap();

        assert_eq!(
            manifest.get("browser_specific_settings"),
            Some(&json!({"gecko": {
                "id": "my-extension@converted-extension.org",
                "strict_min_version": "121.0"
            }}))
        );
        assert_eq!(manifest.additions().len(), 2);
    }

    #[test]
    fn test_existing_firefox_settings_are_kept() {
        let ruleset = CompatibilityRuleset::load_default().unwrap();
        let (manifest, _) = convert(
            &ruleset,
            r#"{"manifest_version": 2, "name": "x",
                "browser_specific_settings": {"gecko": {"id": "x@example.org"}}}"#,
        );
        let manifest = manifest.unwrap();

        assert_eq!(manifest.get_path("browser_specific_settings.gecko.id"), Some(&json!("x@example.org")));
        assert!(manifest.additions().is_empty());
    }

    #[test]
    fn test_rename_and_review_annex() {
        let ruleset = CompatibilityRuleset::builder()
            .rule(RuleSpec::new("manifest_version", PolicyKind::DirectMap, "Copied"))
            .and_then(|b| b.rule(RuleSpec::new("name", PolicyKind::DirectMap, "Copied")))
            .and_then(|b| {
                b.rule(RuleSpec::new("permissions.webview", PolicyKind::Rename, "Renamed").target("permissions.webRequest"))
            })
            .and_then(|b| b.rule(RuleSpec::new("oauth2", PolicyKind::ManualReview, "Use identity.launchWebAuthFlow")))
            .unwrap()
            .build();

        let (manifest, annex) = convert(
            &ruleset,
            r#"{"manifest_version": 3, "name": "x", "permissions": ["webview"],
                "oauth2": {"client_id": "abc"}}"#,
        );
        let manifest = manifest.unwrap();

        assert_eq!(manifest.get("permissions"), Some(&json!(["webRequest"])));
        assert_eq!(manifest.get("oauth2"), None);
        assert_eq!(annex.len(), 1);
        assert_eq!(annex.entries[0].path, "oauth2");
        assert_eq!(annex.entries[0].value, json!({"client_id": "abc"}));
    }

    #[test]
    fn test_blocked_report_yields_no_manifest() {
        let ruleset = CompatibilityRuleset::builder()
            .rule(RuleSpec::new("name", PolicyKind::DirectMap, "Copied"))
            .and_then(|b| b.rule(RuleSpec::new("manifest_version", PolicyKind::DirectMap, "Copied")))
            .and_then(|b| b.protected_ids(["pppppppppppppppppppppppppppppppp"]))
            .unwrap()
            .build();
        let options = ConversionOptions::default();
        let source = parse_manifest_from_str(r#"{"manifest_version": 3, "name": "x"}"#).unwrap();
        let report = CompatibilityAnalyzer::new(&ruleset).analyze(
            &source,
            Vec::new(),
            &["pppppppppppppppppppppppppppppppp".to_string()],
        );
        let transformer = ManifestTransformer::new(&ruleset, &options);

        assert!(transformer.transform(&source, &report).is_none());

        let ack = report.acknowledge_blocked().unwrap();
        let partial = transformer.transform_best_effort(&source, &report, &ack);
        assert_eq!(partial.get("name"), Some(&json!("x")));
    }

    #[test]
    fn test_merge_keeps_first_scalar_and_unions_arrays() {
        let mut document = Map::new();
        set_at(&mut document, &["a"], json!({"x": 1, "list": [1, 2]}));
        set_at(&mut document, &["a"], json!({"x": 2, "y": 3, "list": [2, 3]}));
        assert_eq!(Value::Object(document), json!({"a": {"x": 1, "y": 3, "list": [1, 2, 3]}}));
    }
}
