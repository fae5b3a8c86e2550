//! Manifest field analysis
//!
//! Top-level keys are judged one by one, except for the containers whose
//! entries carry independent meaning: permission arrays are judged per
//! entry and `background` per inner key.

use super::verdict_for;
use crate::models::{FieldRef, Outcome, Policy, SourceManifest, Verdict, VerdictOrigin};
use crate::rules::{CompatibilityRuleset, HOST_PATTERN_SUBJECT};
use crate::utils::is_match_pattern;
use serde_json::Value;
use tracing::debug;

/// Arrays judged per entry
pub(crate) const EXPANDED_ARRAYS: &[&str] = &["permissions", "optional_permissions"];

/// Objects judged per inner key
const EXPANDED_OBJECTS: &[&str] = &["background"];

/// One judged piece of the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSubject<'m> {
    pub subject: String,
    pub field: FieldRef,
    pub value: &'m Value,
}

/// Break a manifest into the subjects rules are keyed on, in key order.
///
/// Empty permission arrays and an empty `background` object yield nothing.
/// A container with an unexpected shape (say, `permissions` as a string)
/// is kept whole under a subject no rule names, so it lands in review.
pub fn field_subjects(source: &SourceManifest) -> Vec<FieldSubject<'_>> {
    let mut subjects = Vec::new();

    for (key, value) in source.fields() {
        if EXPANDED_ARRAYS.contains(&key.as_str()) {
            match value {
                Value::Array(entries) => {
                    for (index, entry) in entries.iter().enumerate() {
                        subjects.push(FieldSubject {
                            subject: permission_subject(key, index, entry),
                            field: FieldRef::Entry { key: key.clone(), index },
                            value: entry,
                        });
                    }
                }
                _ => subjects.push(malformed_container(key, value)),
            }
        } else if EXPANDED_OBJECTS.contains(&key.as_str()) {
            match value {
                Value::Object(inner) => {
                    for (inner_key, inner_value) in inner {
                        subjects.push(FieldSubject {
                            subject: format!("{}.{}", key, inner_key),
                            field: FieldRef::Nested { key: key.clone(), inner: inner_key.clone() },
                            value: inner_value,
                        });
                    }
                }
                _ => subjects.push(malformed_container(key, value)),
            }
        } else {
            subjects.push(FieldSubject {
                subject: key.clone(),
                field: FieldRef::Key { key: key.clone() },
                value,
            });
        }
    }

    subjects
}

fn permission_subject(key: &str, index: usize, entry: &Value) -> String {
    match entry.as_str() {
        Some(pattern) if is_match_pattern(pattern) => format!("{}.{}", key, HOST_PATTERN_SUBJECT),
        Some(permission) => format!("{}.{}", key, permission),
        None => format!("{}[{}]", key, index),
    }
}

fn malformed_container<'m>(key: &str, value: &'m Value) -> FieldSubject<'m> {
    FieldSubject {
        subject: format!("{}[]", key),
        field: FieldRef::Key { key: key.to_string() },
        value,
    }
}

/// Verdicts for every manifest subject.
///
/// Restructure rules are dry-run here so the verdict reflects what the
/// transformer will actually do: a transform that rejects the value turns
/// into a review item, one that reports a lossy change into a warning.
pub fn field_verdicts(source: &SourceManifest, ruleset: &CompatibilityRuleset) -> Vec<Verdict> {
    field_subjects(source)
        .into_iter()
        .map(|FieldSubject { subject, field, value }| {
            let rule = ruleset.resolve(&subject);
            let mut verdict = verdict_for(subject, rule, VerdictOrigin::ManifestField { field });

            if let Some(Policy::Restructure { transform }) = rule.map(|r| &r.policy) {
                match transform.apply(value, source) {
                    Ok(restructured) => {
                        if let Some(warning) = restructured.warning {
                            verdict.outcome = Outcome::TranslatedWithWarning;
                            verdict.note = format!("{} ({})", verdict.note, warning);
                        }
                    }
                    Err(e) => {
                        debug!("Transform '{}' rejected '{}': {}", transform.name(), verdict.subject, e);
                        verdict.outcome = Outcome::ManualReview;
                        verdict.note = format!(
                            "Could not restructure via '{}': {}; review manually",
                            transform.name(),
                            e
                        );
                    }
                }
            }

            verdict
        })
        .collect()
}
