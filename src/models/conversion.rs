//! Conversion report and results

use super::{Outcome, Recommendation, TargetManifest, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Attached to every report so readers know what an empty findings list means
pub const SCANNER_LIMITATIONS: &str = "Script findings come from a lexical scan for known \
    Chrome API identifiers. Scripts are not parsed or executed, so aliased or dynamically \
    built API references are not detected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Convertible,
    ConvertibleWithWarnings,
    Blocked,
}

impl ConversionStatus {
    /// A single `Blocking` outcome dominates; otherwise any warning outcome
    /// degrades the status.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let mut status = ConversionStatus::Convertible;
        for outcome in outcomes {
            if outcome == Outcome::Blocking {
                return ConversionStatus::Blocked;
            }
            if outcome.is_warning() {
                status = ConversionStatus::ConvertibleWithWarnings;
            }
        }
        status
    }
}

/// Ordered record of every decision made for one run.
///
/// Built once by the analyzer; its status always agrees with its verdicts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    extension_name: String,
    extension_version: Option<String>,
    ruleset_version: String,
    verdicts: Vec<Verdict>,
    status: ConversionStatus,
    limitations: &'static str,
}

impl ConversionReport {
    pub(crate) fn new(
        extension_name: String,
        extension_version: Option<String>,
        ruleset_version: String,
        verdicts: Vec<Verdict>,
    ) -> Self {
        let status = ConversionStatus::from_outcomes(verdicts.iter().map(|v| v.outcome));
        Self {
            extension_name,
            extension_version,
            ruleset_version,
            verdicts,
            status,
            limitations: SCANNER_LIMITATIONS,
        }
    }

    pub fn extension_name(&self) -> &str {
        &self.extension_name
    }

    pub fn extension_version(&self) -> Option<&str> {
        self.extension_version.as_deref()
    }

    pub fn ruleset_version(&self) -> &str {
        &self.ruleset_version
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub fn status(&self) -> ConversionStatus {
        self.status
    }

    pub fn limitations(&self) -> &str {
        self.limitations
    }

    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(move |v| v.outcome == outcome)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.with_outcome(outcome).count()
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ConversionStatus::Blocked
    }

    /// Obtain the token best-effort transformation requires. Only a blocked
    /// report hands one out.
    pub fn acknowledge_blocked(&self) -> Option<BlockedAcknowledgement> {
        self.is_blocked().then_some(BlockedAcknowledgement { _private: () })
    }
}

/// Proof that the caller looked at a `Blocked` status before asking for a
/// best-effort manifest.
#[derive(Debug)]
pub struct BlockedAcknowledgement {
    _private: (),
}

/// A manifest value held back for manual review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnexEntry {
    pub subject: String,
    pub path: String,
    pub value: Value,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewAnnex {
    pub entries: Vec<AnnexEntry>,
}

impl ReviewAnnex {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A script with Chrome API names substituted for their Firefox equivalents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrittenScript {
    pub path: PathBuf,
    pub content: String,
    pub substitutions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub report: ConversionReport,
    /// Present unless blocked, or blocked in best-effort mode
    pub manifest: Option<TargetManifest>,
    /// Present only when blocked
    pub alternatives: Option<Vec<Recommendation>>,
    pub annex: ReviewAnnex,
    pub rewritten_scripts: Vec<RewrittenScript>,
    /// Scripts the API scan covered, in scan order
    pub scanned_scripts: Vec<PathBuf>,
}

impl ConversionResult {
    pub fn status(&self) -> ConversionStatus {
        self.report.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&[] => ConversionStatus::Convertible ; "empty")]
    #[test_case(&[Outcome::Translated] => ConversionStatus::Convertible ; "translated only")]
    #[test_case(&[Outcome::Translated, Outcome::Dropped] => ConversionStatus::ConvertibleWithWarnings ; "dropped")]
    #[test_case(&[Outcome::ManualReview] => ConversionStatus::ConvertibleWithWarnings ; "manual review")]
    #[test_case(&[Outcome::TranslatedWithWarning, Outcome::Blocking, Outcome::Translated] => ConversionStatus::Blocked ; "blocking dominates")]
    fn test_status_aggregation(outcomes: &[Outcome]) -> ConversionStatus {
        ConversionStatus::from_outcomes(outcomes.iter().copied())
    }

    #[test]
    fn test_acknowledgement_only_for_blocked() {
        let report = ConversionReport::new("Test".into(), None, "1".into(), Vec::new());
        assert_eq!(report.status(), ConversionStatus::Convertible);
        assert!(report.acknowledge_blocked().is_none());
    }
}
