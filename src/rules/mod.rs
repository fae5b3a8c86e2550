//! Compatibility rule table
//!
//! The ruleset maps each subject (manifest field path, API identifier or
//! protected extension id) to exactly one rule. It is loaded once, rejected
//! as a whole on any inconsistency, and only read afterwards.

pub mod restructure;

use crate::error::RulesetLoadError;
use crate::models::{CompatibilityRule, Policy, PolicyKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Rule table shipped with the crate
pub const DEFAULT_RULES_JSON: &str = include_str!("../../data/compatibility_rules.json");

/// Subject prefix for protected extension ids
pub const PROTECTED_PREFIX: &str = "protected:";

/// Subject used for host match patterns inside `permissions`
pub const HOST_PATTERN_SUBJECT: &str = "<host_pattern>";

/// One rule as written in a table, before validation
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub subject: String,
    pub policy: PolicyKind,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub transform: Option<String>,
    pub note: String,
    #[serde(default)]
    pub warn: bool,
}

impl RuleSpec {
    pub fn new(subject: impl Into<String>, policy: PolicyKind, note: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            policy,
            target: None,
            transform: None,
            note: note.into(),
            warn: false,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn warn(mut self) -> Self {
        self.warn = true;
        self
    }

    fn validate(self) -> Result<CompatibilityRule, RulesetLoadError> {
        // A stray attribute is almost always a mistyped policy
        let stray = match self.policy {
            PolicyKind::Rename => self.transform.is_some().then_some("transform"),
            PolicyKind::Restructure => self.target.is_some().then_some("target"),
            _ if self.target.is_some() => Some("target"),
            _ if self.transform.is_some() => Some("transform"),
            _ => None,
        };
        if let Some(attribute) = stray {
            return Err(RulesetLoadError::UnexpectedAttribute {
                subject: self.subject,
                attribute,
            });
        }

        let policy = match self.policy {
            PolicyKind::DirectMap => Policy::DirectMap,
            PolicyKind::Rename => match self.target.filter(|t| !t.is_empty()) {
                Some(target) => Policy::Rename { target },
                None => {
                    return Err(RulesetLoadError::MissingAttribute {
                        subject: self.subject,
                        attribute: "target",
                    })
                }
            },
            PolicyKind::Restructure => {
                let name = self.transform.ok_or_else(|| RulesetLoadError::MissingAttribute {
                    subject: self.subject.clone(),
                    attribute: "transform",
                })?;
                let transform = restructure::lookup(&name).ok_or_else(|| {
                    RulesetLoadError::UnknownTransform {
                        subject: self.subject.clone(),
                        transform: name,
                    }
                })?;
                Policy::Restructure { transform }
            }
            PolicyKind::Unsupported => Policy::Unsupported,
            PolicyKind::ManualReview => Policy::ManualReview,
            PolicyKind::Block => Policy::Block,
        };

        Ok(CompatibilityRule {
            subject: self.subject,
            policy,
            note: self.note,
            warn: self.warn,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleTable {
    version: String,
    rules: Vec<RuleSpec>,
}

/// Read-only rule lookup shared by every conversion run
#[derive(Debug, Clone)]
pub struct CompatibilityRuleset {
    version: String,
    rules: BTreeMap<String, CompatibilityRule>,
}

impl CompatibilityRuleset {
    pub fn builder() -> RulesetBuilder {
        RulesetBuilder::default()
    }

    /// Load the embedded default table
    pub fn load_default() -> Result<Self, RulesetLoadError> {
        Self::from_json(DEFAULT_RULES_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, RulesetLoadError> {
        Ok(Self::builder().table_json(json)?.build())
    }

    pub fn resolve(&self, subject: &str) -> Option<&CompatibilityRule> {
        self.rules.get(subject)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules in subject order
    pub fn iter(&self) -> impl Iterator<Item = &CompatibilityRule> {
        self.rules.values()
    }

    /// Subjects naming script APIs, used to widen the scanner's vocabulary
    pub fn api_subjects(&self) -> impl Iterator<Item = &str> {
        self.rules
            .keys()
            .map(String::as_str)
            .filter(|subject| subject.starts_with("chrome."))
    }
}

/// Accumulates rules from several sources, rejecting duplicates as they
/// arrive.
#[derive(Debug, Default)]
pub struct RulesetBuilder {
    versions: Vec<String>,
    rules: BTreeMap<String, CompatibilityRule>,
}

impl RulesetBuilder {
    pub fn rule(mut self, spec: RuleSpec) -> Result<Self, RulesetLoadError> {
        let rule = spec.validate()?;
        if self.rules.contains_key(&rule.subject) {
            return Err(RulesetLoadError::DuplicateSubject {
                subject: rule.subject,
            });
        }
        self.rules.insert(rule.subject.clone(), rule);
        Ok(self)
    }

    /// Add every rule of a JSON rule table
    pub fn table_json(mut self, json: &str) -> Result<Self, RulesetLoadError> {
        let table: RuleTable = serde_json::from_str(json)?;
        debug!("Loading rule table v{} ({} rules)", table.version, table.rules.len());
        self.versions.push(table.version);
        for spec in table.rules {
            self = self.rule(spec)?;
        }
        Ok(self)
    }

    /// Add a `Block` rule for each protected extension id
    pub fn protected_ids<I, S>(mut self, ids: I) -> Result<Self, RulesetLoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            let id = id.as_ref();
            self = self.rule(RuleSpec::new(
                format!("{}{}", PROTECTED_PREFIX, id),
                PolicyKind::Block,
                "Extension is protected by its distributor and cannot be converted",
            ))?;
        }
        Ok(self)
    }

    pub fn build(self) -> CompatibilityRuleset {
        let version = if self.versions.is_empty() {
            "custom".to_string()
        } else {
            self.versions.join("+")
        };
        info!("Compatibility ruleset v{} ready ({} rules)", version, self.rules.len());
        CompatibilityRuleset {
            version,
            rules: self.rules,
        }
    }
}

/// Parse a protected-id list: one id per line, `#` starts a comment
pub fn parse_protected_ids(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
