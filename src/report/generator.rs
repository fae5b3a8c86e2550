//! Markdown rendering of a conversion result

use crate::models::{ConversionResult, ConversionStatus, Outcome, Verdict};

pub fn generate_markdown_report(result: &ConversionResult) -> String {
    let summary = &result.report;
    let mut report = String::new();

    report.push_str("# Chrome to Firefox Extension Conversion Report\n\n");

    // Summary
    report.push_str("## Summary\n\n");
    report.push_str(&format!(
        "- **Extension**: {} v{}\n",
        summary.extension_name(),
        summary.extension_version().unwrap_or("?")
    ));
    report.push_str(&format!("- **Conversion Status**: {}\n", status_label(summary.status())));
    report.push_str(&format!("- **Rule Table**: v{}\n", summary.ruleset_version()));
    report.push_str(&format!("- **Scripts Scanned**: {}\n", result.scanned_scripts.len()));
    for outcome in [
        Outcome::Translated,
        Outcome::TranslatedWithWarning,
        Outcome::ManualReview,
        Outcome::Dropped,
        Outcome::Blocking,
    ] {
        report.push_str(&format!("- **{}**: {}\n", outcome, summary.count(outcome)));
    }
    report.push('\n');

    section(&mut report, "## ⛔ Blockers", summary.with_outcome(Outcome::Blocking));
    section(&mut report, "## ⚠️ Manual Review Required", summary.with_outcome(Outcome::ManualReview));
    section(&mut report, "## 🗑️ Dropped", summary.with_outcome(Outcome::Dropped));
    section(&mut report, "## ℹ️ Warnings", summary.with_outcome(Outcome::TranslatedWithWarning));
    section(&mut report, "## ✅ Translated", summary.with_outcome(Outcome::Translated));

    if let Some(manifest) = &result.manifest {
        if !manifest.additions().is_empty() {
            report.push_str("## Added for Firefox\n\n");
            for addition in manifest.additions() {
                report.push_str(&format!("- `{}`\n", addition));
            }
            report.push('\n');
        }
    }

    if !result.rewritten_scripts.is_empty() {
        report.push_str("## Script Rewrites\n\n");
        for script in &result.rewritten_scripts {
            report.push_str(&format!(
                "- {}: {} substitution(s)\n",
                script.path.display(),
                script.substitutions
            ));
        }
        report.push('\n');
    }

    if !result.annex.is_empty() {
        report.push_str("## Review Annex\n\n");
        report.push_str("These values were kept out of the Firefox manifest.\n\n");
        for entry in &result.annex.entries {
            report.push_str(&format!("### `{}`\n\n{}\n\n", entry.path, entry.note));
            let value = serde_json::to_string_pretty(&entry.value).unwrap_or_else(|_| entry.value.to_string());
            report.push_str(&format!("```json\n{}\n```\n\n", value));
        }
    }

    if let Some(alternatives) = &result.alternatives {
        report.push_str("## Firefox Alternatives\n\n");
        if alternatives.is_empty() {
            report.push_str("No catalog entry shares a capability with this extension.\n");
        }
        for recommendation in alternatives {
            report.push_str(&format!(
                "- [{}]({}) (matches: {})\n",
                recommendation.candidate.name,
                recommendation.candidate.store_url,
                recommendation.matched_tags.join(", ")
            ));
        }
        report.push('\n');
    }

    report.push_str("## Limitations\n\n");
    report.push_str(summary.limitations());
    report.push_str("\n\n");

    // Next Steps
    report.push_str("## Next Steps\n\n");
    if summary.status() == ConversionStatus::Blocked {
        report.push_str("1. Consider one of the Firefox alternatives listed above\n");
        report.push_str("2. Contact the extension's publisher about a Firefox release\n\n");
    } else {
        report.push_str("1. Review the converted extension files\n");
        report.push_str("2. Test the extension in Firefox\n");
        report.push_str("3. Address any manual review items listed above\n");
        report.push_str("4. Submit to Firefox Add-ons (AMO) when ready\n\n");
    }

    report
}

fn status_label(status: ConversionStatus) -> &'static str {
    match status {
        ConversionStatus::Convertible => "✅ Convertible",
        ConversionStatus::ConvertibleWithWarnings => "⚠️ Convertible with warnings",
        ConversionStatus::Blocked => "⛔ Blocked",
    }
}

fn section<'a>(report: &mut String, title: &str, verdicts: impl Iterator<Item = &'a Verdict>) {
    let lines: Vec<String> = verdicts
        .map(|v| format!("- `{}` ({}): {}\n", v.subject, v.origin, v.note))
        .collect();
    if lines.is_empty() {
        return;
    }
    report.push_str(title);
    report.push_str("\n\n");
    for line in lines {
        report.push_str(&line);
    }
    report.push('\n');
}
