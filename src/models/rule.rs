//! Compatibility rules and translation policies

use crate::rules::restructure::Transform;
use serde::{Deserialize, Serialize};

/// Policy names as they appear in a rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    DirectMap,
    Rename,
    Restructure,
    Unsupported,
    ManualReview,
    Block,
}

/// Translation strategy attached to one subject
#[derive(Debug, Clone, PartialEq)]
pub enum Policy {
    /// Copy the value under the same key
    DirectMap,
    /// Copy the value under another key
    Rename { target: String },
    /// Reshape the value through a registered transform
    Restructure { transform: Transform },
    /// No Firefox counterpart; the field is omitted
    Unsupported,
    /// Never applied automatically
    ManualReview,
    /// Conversion must not proceed
    Block,
}

impl Policy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::DirectMap => PolicyKind::DirectMap,
            Policy::Rename { .. } => PolicyKind::Rename,
            Policy::Restructure { .. } => PolicyKind::Restructure,
            Policy::Unsupported => PolicyKind::Unsupported,
            Policy::ManualReview => PolicyKind::ManualReview,
            Policy::Block => PolicyKind::Block,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityRule {
    pub subject: String,
    pub policy: Policy,
    pub note: String,
    /// Report successful translations of this subject as warnings
    pub warn: bool,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::DirectMap => write!(f, "direct_map"),
            PolicyKind::Rename => write!(f, "rename"),
            PolicyKind::Restructure => write!(f, "restructure"),
            PolicyKind::Unsupported => write!(f, "unsupported"),
            PolicyKind::ManualReview => write!(f, "manual_review"),
            PolicyKind::Block => write!(f, "block"),
        }
    }
}

impl std::fmt::Display for CompatibilityRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.policy {
            Policy::Rename { target } => write!(f, "{} -> {} (rename)", self.subject, target),
            Policy::Restructure { transform } => {
                write!(f, "{} (restructure via {})", self.subject, transform.name())
            }
            other => write!(f, "{} ({})", self.subject, other.kind()),
        }
    }
}
