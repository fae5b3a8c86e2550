//! Per-subject verdicts recorded in the conversion report

use super::{ApiUsageFinding, PolicyKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Translated,
    TranslatedWithWarning,
    ManualReview,
    Dropped,
    Blocking,
}

impl Outcome {
    /// Outcomes that degrade a run to `ConvertibleWithWarnings`
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            Outcome::TranslatedWithWarning | Outcome::ManualReview | Outcome::Dropped
        )
    }
}

/// Where a manifest value lives in the source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRef {
    /// A whole top-level key
    Key { key: String },
    /// One element of a top-level array
    Entry { key: String, index: usize },
    /// One key of a top-level object
    Nested { key: String, inner: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictOrigin {
    ManifestField { field: FieldRef },
    ApiUsage { finding: ApiUsageFinding },
    Identity { extension_id: String },
}

/// Outcome of applying one rule (or the absence of one) to one subject.
///
/// A verdict carries everything needed to render it; no ruleset lookup is
/// required afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub subject: String,
    /// `None` when no rule matched the subject
    pub policy: Option<PolicyKind>,
    pub outcome: Outcome,
    pub note: String,
    pub origin: VerdictOrigin,
}

impl Verdict {
    pub fn field(&self) -> Option<&FieldRef> {
        match &self.origin {
            VerdictOrigin::ManifestField { field } => Some(field),
            _ => None,
        }
    }

    pub fn finding(&self) -> Option<&ApiUsageFinding> {
        match &self.origin {
            VerdictOrigin::ApiUsage { finding } => Some(finding),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Translated => write!(f, "TRANSLATED"),
            Outcome::TranslatedWithWarning => write!(f, "WARNING"),
            Outcome::ManualReview => write!(f, "MANUAL REVIEW"),
            Outcome::Dropped => write!(f, "DROPPED"),
            Outcome::Blocking => write!(f, "BLOCKING"),
        }
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Key { key } => write!(f, "{}", key),
            FieldRef::Entry { key, index } => write!(f, "{}[{}]", key, index),
            FieldRef::Nested { key, inner } => write!(f, "{}.{}", key, inner),
        }
    }
}

impl std::fmt::Display for VerdictOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictOrigin::ManifestField { field } => write!(f, "manifest.json:{}", field),
            VerdictOrigin::ApiUsage { finding } => write!(f, "{}", finding.location),
            VerdictOrigin::Identity { extension_id } => write!(f, "extension id {}", extension_id),
        }
    }
}
