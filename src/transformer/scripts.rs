//! API substitution in extension scripts
//!
//! Only findings whose rule is a `Rename` are rewritten, and only at the
//! exact position the scanner reported. Everything else in the script is
//! left byte-for-byte alone.

use crate::models::{ConversionReport, Outcome, Policy, RewrittenScript, ScriptSource};
use crate::rules::CompatibilityRuleset;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// One pending replacement, positioned like a scanner finding
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Substitution<'a> {
    line: usize,
    column: usize,
    symbol: &'a str,
    target: &'a str,
}

/// Rewrite every script that has at least one renamed API reference.
/// Scripts without one are not returned.
pub fn rewrite_scripts(
    scripts: &[ScriptSource],
    report: &ConversionReport,
    ruleset: &CompatibilityRuleset,
) -> Vec<RewrittenScript> {
    let mut by_file: BTreeMap<&Path, Vec<Substitution<'_>>> = BTreeMap::new();

    for verdict in report.verdicts() {
        if !matches!(verdict.outcome, Outcome::Translated | Outcome::TranslatedWithWarning) {
            continue;
        }
        let Some(finding) = verdict.finding() else {
            continue;
        };
        let Some(Policy::Rename { target }) = ruleset.resolve(&finding.symbol).map(|r| &r.policy) else {
            continue;
        };
        by_file
            .entry(finding.location.file.as_path())
            .or_default()
            .push(Substitution {
                line: finding.location.line,
                column: finding.location.column,
                symbol: &finding.symbol,
                target,
            });
    }

    scripts
        .iter()
        .filter_map(|script| {
            let substitutions = by_file.remove(script.path.as_path())?;
            if script.lossy {
                warn!("Not rewriting {}: it is not valid UTF-8", script.path.display());
                return None;
            }
            let (content, applied) = apply(&script.content, substitutions);
            debug!("Rewrote {} API reference(s) in {}", applied, script.path.display());
            (applied > 0).then(|| RewrittenScript {
                path: script.path.clone(),
                content,
                substitutions: applied,
            })
        })
        .collect()
}

fn apply(content: &str, mut substitutions: Vec<Substitution<'_>>) -> (String, usize) {
    // Right to left within a line keeps earlier columns valid
    substitutions.sort_by(|a, b| a.line.cmp(&b.line).then(b.column.cmp(&a.column)));

    let mut output = String::with_capacity(content.len());
    let mut applied = 0;
    let mut pending = substitutions.into_iter().peekable();

    for (index, line) in content.split_inclusive('\n').enumerate() {
        let line_number = index + 1;
        let mut line = line.to_string();

        while let Some(substitution) = pending.next_if(|s| s.line == line_number) {
            let end = substitution.column + substitution.symbol.len();
            if line.get(substitution.column..end) == Some(substitution.symbol) {
                line.replace_range(substitution.column..end, substitution.target);
                applied += 1;
            } else {
                warn!(
                    "Expected '{}' at {}:{}, leaving line unchanged",
                    substitution.symbol, line_number, substitution.column
                );
            }
        }

        output.push_str(&line);
    }

    (output, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::CompatibilityAnalyzer;
    use crate::parser::{parse_manifest, ApiSurfaceScanner};
    use pretty_assertions::assert_eq;

    fn rewrite(scripts: &[ScriptSource]) -> Vec<RewrittenScript> {
        let ruleset = CompatibilityRuleset::load_default().unwrap();
        let source = parse_manifest(br#"{"manifest_version": 2, "name": "Legacy"}"#).unwrap();
        let scanner = ApiSurfaceScanner::default();
        let report = CompatibilityAnalyzer::new(&ruleset).analyze(&source, scanner.scan_all(scripts), &[]);
        rewrite_scripts(scripts, &report, &ruleset)
    }

    #[test]
    fn test_renamed_api_is_substituted_in_place() {
        let scripts = vec![ScriptSource::new(
            "bg.js",
            "const a = chrome.extension.getURL('a.html');\r\nchrome.extension.onRequest.addListener(f);\n",
        )];

        let rewritten = rewrite(&scripts);
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0].substitutions, 2);
        assert_eq!(
            rewritten[0].content,
            "const a = chrome.runtime.getURL('a.html');\r\nchrome.runtime.onMessage.addListener(f);\n"
        );
    }

    #[test]
    fn test_two_renames_on_one_line() {
        let scripts = vec![ScriptSource::new(
            "popup.js",
            "x(chrome.extension.getURL('a'), chrome.extension.getURL('b'))",
        )];

        let rewritten = rewrite(&scripts);
        assert_eq!(
            rewritten[0].content,
            "x(chrome.runtime.getURL('a'), chrome.runtime.getURL('b'))"
        );
    }

    #[test]
    fn test_scripts_without_renames_are_not_returned() {
        let scripts = vec![
            ScriptSource::new("a.js", "chrome.tabGroups.query({});"),
            ScriptSource::new("b.js", "chrome.storage.local.get('k');"),
        ];
        assert!(rewrite(&scripts).is_empty());
    }

    #[test]
    fn test_lossy_script_is_never_rewritten() {
        let script = ScriptSource::from_bytes("bg.js", b"var s = '\xe9t\xe9'; chrome.extension.getURL('a');");
        assert!(script.lossy);
        assert!(rewrite(&[script]).is_empty());
    }
}
