//! Error types for the conversion pipeline

use thiserror::Error;

/// The source manifest could not be used at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Malformed manifest: {reason}")]
    Malformed { reason: String },
}

impl ManifestError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ManifestError::Malformed {
            reason: reason.into(),
        }
    }
}

/// A rule table was rejected at load time
#[derive(Error, Debug)]
pub enum RulesetLoadError {
    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate rule subject: {subject}")]
    DuplicateSubject { subject: String },

    #[error("Rule '{subject}' requires attribute '{attribute}'")]
    MissingAttribute {
        subject: String,
        attribute: &'static str,
    },

    #[error("Rule '{subject}' sets '{attribute}', which its policy does not use")]
    UnexpectedAttribute {
        subject: String,
        attribute: &'static str,
    },

    #[error("Rule '{subject}' references unknown transform '{transform}'")]
    UnknownTransform { subject: String, transform: String },
}

/// The alternatives catalog was rejected at load time
#[derive(Error, Debug)]
pub enum CatalogLoadError {
    #[error("Failed to parse alternatives catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate catalog entry: {name}")]
    DuplicateCandidate { name: String },
}

/// Process-start failures: nothing can run until these are fixed
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Rules(#[from] RulesetLoadError),

    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),
}

/// Per-run failures. Incompatibilities are never errors; they are verdicts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
