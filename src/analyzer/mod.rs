//! Compatibility analysis: every manifest field, API finding and identity
//! of a run resolved against the rule table

pub mod api;
pub mod identity;
pub mod manifest;

use crate::models::{
    ApiUsageFinding, CompatibilityRule, ConversionReport, Outcome, Policy, SourceManifest,
    Verdict, VerdictOrigin,
};
use crate::rules::CompatibilityRuleset;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Produces the verdicts of one run against a borrowed ruleset
#[derive(Debug, Clone)]
pub struct CompatibilityAnalyzer<'r> {
    ruleset: &'r CompatibilityRuleset,
    frozen_scripts: BTreeSet<PathBuf>,
}

impl<'r> CompatibilityAnalyzer<'r> {
    pub fn new(ruleset: &'r CompatibilityRuleset) -> Self {
        Self {
            ruleset,
            frozen_scripts: BTreeSet::new(),
        }
    }

    /// Scripts that cannot be rewritten. Renamed APIs found in them are
    /// sent to manual review instead of being reported as translated.
    pub fn freeze_scripts<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.frozen_scripts.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Judge a manifest, the API findings of its scripts and the extension
    /// ids known for it.
    ///
    /// Verdicts are ordered manifest fields first (sorted by key), then API
    /// findings in the order given, then identities.
    pub fn analyze<I>(
        &self,
        source: &SourceManifest,
        findings: I,
        identities: &[String],
    ) -> ConversionReport
    where
        I: IntoIterator<Item = ApiUsageFinding>,
    {
        let mut verdicts = manifest::field_verdicts(source, self.ruleset);
        verdicts.extend(api::api_verdicts(findings, self.ruleset, &self.frozen_scripts));
        verdicts.extend(identity::identity_verdicts(identities, self.ruleset));

        for verdict in verdicts.iter().filter(|v| v.outcome == Outcome::Blocking) {
            warn!("Blocking verdict for '{}' at {}: {}", verdict.subject, verdict.origin, verdict.note);
        }

        let report = ConversionReport::new(
            source.display_name().to_string(),
            source.version().map(str::to_string),
            self.ruleset.version().to_string(),
            verdicts,
        );
        debug!(
            "Analyzed '{}': {} verdicts, status {:?}",
            report.extension_name(),
            report.verdicts().len(),
            report.status()
        );
        report
    }
}

/// Note used whenever a subject has no rule
pub fn unmapped_note(subject: &str) -> String {
    format!(
        "No compatibility rule for '{}'; review manually before shipping",
        subject
    )
}

/// Map a resolved rule (or its absence) onto a verdict. Restructure
/// verdicts may still be adjusted once the transform has seen the value.
pub(crate) fn verdict_for(
    subject: String,
    rule: Option<&CompatibilityRule>,
    origin: VerdictOrigin,
) -> Verdict {
    let Some(rule) = rule else {
        return Verdict {
            note: unmapped_note(&subject),
            subject,
            policy: None,
            outcome: Outcome::ManualReview,
            origin,
        };
    };

    let outcome = match &rule.policy {
        Policy::DirectMap | Policy::Rename { .. } | Policy::Restructure { .. } => {
            if rule.warn {
                Outcome::TranslatedWithWarning
            } else {
                Outcome::Translated
            }
        }
        Policy::Unsupported => Outcome::Dropped,
        Policy::ManualReview => Outcome::ManualReview,
        Policy::Block => Outcome::Blocking,
    };

    Verdict {
        subject,
        policy: Some(rule.policy.kind()),
        outcome,
        note: rule.note.clone(),
        origin,
    }
}
