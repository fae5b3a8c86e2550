//! Report generation

pub mod generator;

use crate::models::{ConversionReport, ConversionResult, Recommendation, ReviewAnnex};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

pub use generator::generate_markdown_report;

pub fn generate_report(result: &ConversionResult) -> String {
    generator::generate_markdown_report(result)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report: &'a ConversionReport,
    manifest: Option<&'a Map<String, Value>>,
    additions: &'a [String],
    alternatives: Option<&'a [Recommendation]>,
    annex: &'a ReviewAnnex,
    rewritten_scripts: Vec<&'a PathBuf>,
    scanned_scripts: &'a [PathBuf],
}

/// Machine-readable form of a run
pub fn report_json(result: &ConversionResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        report: &result.report,
        manifest: result.manifest.as_ref().map(|m| m.document()),
        additions: result.manifest.as_ref().map(|m| m.additions()).unwrap_or_default(),
        alternatives: result.alternatives.as_deref(),
        annex: &result.annex,
        rewritten_scripts: result.rewritten_scripts.iter().map(|s| &s.path).collect(),
        scanned_scripts: &result.scanned_scripts,
    })
}
