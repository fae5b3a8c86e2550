//! Script API analysis

use super::verdict_for;
use crate::models::{ApiUsageFinding, Outcome, Policy, Verdict, VerdictOrigin};
use crate::rules::CompatibilityRuleset;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One verdict per finding, in the order the findings arrive.
///
/// `frozen_scripts` are scripts whose text cannot be rewritten.
pub fn api_verdicts<I>(
    findings: I,
    ruleset: &CompatibilityRuleset,
    frozen_scripts: &BTreeSet<PathBuf>,
) -> Vec<Verdict>
where
    I: IntoIterator<Item = ApiUsageFinding>,
{
    findings
        .into_iter()
        .map(|finding| api_verdict(finding, ruleset, frozen_scripts))
        .collect()
}

fn api_verdict(
    finding: ApiUsageFinding,
    ruleset: &CompatibilityRuleset,
    frozen_scripts: &BTreeSet<PathBuf>,
) -> Verdict {
    let rule = ruleset.resolve(&finding.symbol);
    let frozen = frozen_scripts.contains(&finding.location.file);
    let mut verdict = verdict_for(
        finding.symbol.clone(),
        rule,
        VerdictOrigin::ApiUsage { finding },
    );

    match rule.map(|r| &r.policy) {
        Some(Policy::Rename { target }) if frozen => {
            verdict.outcome = Outcome::ManualReview;
            verdict.note = format!(
                "{} (script is not valid UTF-8 and was left unchanged; replace with {} manually)",
                verdict.note, target
            );
        }
        Some(Policy::Rename { target }) => {
            verdict.note = format!("{} (rewritten to {})", verdict.note, target);
        }
        // Transforms reshape manifest values; a script call cannot be reshaped
        Some(Policy::Restructure { transform }) => {
            verdict.outcome = Outcome::ManualReview;
            verdict.note = format!(
                "{} (transform '{}' applies to manifest values only; port this call manually)",
                verdict.note,
                transform.name()
            );
        }
        _ => {}
    }

    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileLocation, PolicyKind};
    use crate::rules::RuleSpec;

    fn finding(symbol: &str, matched: &str) -> ApiUsageFinding {
        ApiUsageFinding {
            location: FileLocation::new("popup.js", 3, 4),
            symbol: symbol.to_string(),
            matched: matched.to_string(),
        }
    }

    #[test]
    fn test_rename_notes_target() {
        let ruleset = CompatibilityRuleset::load_default().unwrap();
        let verdicts = api_verdicts(
            [finding("chrome.extension.getURL", "chrome.extension.getURL")],
            &ruleset,
            &BTreeSet::new(),
        );

        assert_eq!(verdicts[0].outcome, Outcome::Translated);
        assert_eq!(verdicts[0].policy, Some(PolicyKind::Rename));
        assert!(verdicts[0].note.ends_with("(rewritten to chrome.runtime.getURL)"));
    }

    #[test]
    fn test_unsupported_api_is_dropped() {
        let ruleset = CompatibilityRuleset::load_default().unwrap();
        let verdicts = api_verdicts(
            [finding("chrome.tabGroups", "chrome.tabGroups.query")],
            &ruleset,
            &BTreeSet::new(),
        );
        assert_eq!(verdicts[0].outcome, Outcome::Dropped);
        assert_eq!(verdicts[0].origin.to_string(), "popup.js:3:4");
    }

    #[test]
    fn test_restructure_on_api_needs_review() {
        let ruleset = CompatibilityRuleset::builder()
            .rule(
                RuleSpec::new("chrome.sidePanel", PolicyKind::Restructure, "Sidebar")
                    .transform("side_panel_to_sidebar_action"),
            )
            .unwrap()
            .build();
        let verdicts = api_verdicts(
            [finding("chrome.sidePanel", "chrome.sidePanel.open")],
            &ruleset,
            &BTreeSet::new(),
        );
        assert_eq!(verdicts[0].outcome, Outcome::ManualReview);
    }

    #[test]
    fn test_rename_in_frozen_script_needs_review() {
        let ruleset = CompatibilityRuleset::load_default().unwrap();
        let frozen = BTreeSet::from([PathBuf::from("popup.js")]);
        let verdicts = api_verdicts(
            [finding("chrome.extension.getURL", "chrome.extension.getURL")],
            &ruleset,
            &frozen,
        );

        assert_eq!(verdicts[0].outcome, Outcome::ManualReview);
        assert_eq!(verdicts[0].policy, Some(PolicyKind::Rename));
        assert!(verdicts[0].note.contains("replace with chrome.runtime.getURL manually"));
    }
}
