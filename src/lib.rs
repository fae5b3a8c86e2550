//! Chrome to Firefox extension porter
//!
//! Judges a Chrome extension's manifest and scripts against a compatibility
//! rule table, records a verdict for every subject, and produces a Firefox
//! manifest when nothing blocks the conversion. Blocked extensions get a
//! list of existing Firefox add-ons instead.

pub mod analyzer;
pub mod error;
pub mod models;
pub mod packager;
pub mod parser;
pub mod recommender;
pub mod report;
pub mod rules;
pub mod transformer;
pub mod utils;
pub mod validator;

pub use error::{CatalogLoadError, ConversionError, LoadError, ManifestError, RulesetLoadError};
pub use models::{ConversionReport, ConversionResult, ConversionStatus, Outcome, ScriptSource, TargetManifest};
pub use recommender::AlternativeCatalog;
pub use rules::CompatibilityRuleset;

use analyzer::{identity, CompatibilityAnalyzer};
use parser::ApiSurfaceScanner;
use recommender::AlternativeRecommender;
use std::sync::Arc;
use tracing::info;
use transformer::{rewrite_scripts, ManifestTransformer};

#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Emit a partial manifest even when the run is `Blocked`
    pub best_effort: bool,
    pub max_alternatives: usize,
    /// Domain part of synthesised Firefox add-on ids
    pub gecko_id_suffix: String,
    /// Minimum Firefox version written for MV3 add-ons
    pub strict_min_version: Option<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            best_effort: false,
            max_alternatives: 5,
            gecko_id_suffix: "converted-extension.org".to_string(),
            strict_min_version: Some("121.0".to_string()),
        }
    }
}

/// Everything one run reads, supplied up front by the caller
#[derive(Debug, Clone, Default)]
pub struct ConversionInput {
    pub manifest: Vec<u8>,
    /// Reachable scripts, in the order they should be scanned
    pub scripts: Vec<ScriptSource>,
    /// Chrome extension id, when the caller knows it
    pub extension_id: Option<String>,
    /// `messages.json` of the default locale
    pub locale_messages: Option<Vec<u8>>,
}

impl ConversionInput {
    pub fn new(manifest: impl Into<Vec<u8>>) -> Self {
        Self {
            manifest: manifest.into(),
            ..Default::default()
        }
    }

    pub fn script(mut self, script: ScriptSource) -> Self {
        self.scripts.push(script);
        self
    }

    pub fn scripts(mut self, scripts: impl IntoIterator<Item = ScriptSource>) -> Self {
        self.scripts.extend(scripts);
        self
    }

    pub fn extension_id(mut self, id: impl Into<String>) -> Self {
        self.extension_id = Some(id.into());
        self
    }

    pub fn locale_messages(mut self, messages: impl Into<Vec<u8>>) -> Self {
        self.locale_messages = Some(messages.into());
        self
    }
}

/// Runs the conversion pipeline.
///
/// The ruleset and catalog are shared and never written after load, so a
/// `Converter` can be cloned across threads to convert extensions in
/// parallel.
#[derive(Debug, Clone)]
pub struct Converter {
    ruleset: Arc<CompatibilityRuleset>,
    catalog: Arc<AlternativeCatalog>,
    scanner: Arc<ApiSurfaceScanner>,
    options: ConversionOptions,
}

impl Converter {
    pub fn new(ruleset: CompatibilityRuleset, catalog: AlternativeCatalog, options: ConversionOptions) -> Self {
        let scanner = ApiSurfaceScanner::new(ruleset.api_subjects().map(str::to_string).collect::<Vec<_>>());
        Self {
            ruleset: Arc::new(ruleset),
            catalog: Arc::new(catalog),
            scanner: Arc::new(scanner),
            options,
        }
    }

    /// Converter over the embedded rule table and catalog
    pub fn with_defaults() -> Result<Self, LoadError> {
        Ok(Self::new(
            CompatibilityRuleset::load_default()?,
            AlternativeCatalog::load_default()?,
            ConversionOptions::default(),
        ))
    }

    pub fn ruleset(&self) -> &CompatibilityRuleset {
        &self.ruleset
    }

    pub fn catalog(&self) -> &AlternativeCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert manifest bytes and script contents
    pub fn convert_bytes(&self, manifest: &[u8], scripts: &[ScriptSource]) -> Result<ConversionResult, ConversionError> {
        self.convert(&ConversionInput::new(manifest).scripts(scripts.iter().cloned()))
    }

    /// Run one conversion.
    ///
    /// Fails only when the manifest itself is unusable; every
    /// incompatibility is reported as a verdict instead.
    pub fn convert(&self, input: &ConversionInput) -> Result<ConversionResult, ConversionError> {
        let source = parser::parse_manifest_with_locale(&input.manifest, input.locale_messages.as_deref())?;
        info!("Converting '{}' v{}", source.display_name(), source.version().unwrap_or("?"));

        let identities = identity::identities(&source, input.extension_id.as_deref());
        let findings = self.scanner.scan_all(&input.scripts);
        let frozen = input.scripts.iter().filter(|s| s.lossy).map(|s| s.path.clone());
        let report = CompatibilityAnalyzer::new(&self.ruleset)
            .freeze_scripts(frozen)
            .analyze(&source, findings, &identities);

        let transformer = ManifestTransformer::new(&self.ruleset, &self.options);
        let manifest = match report.acknowledge_blocked() {
            None => transformer.transform(&source, &report),
            Some(ack) if self.options.best_effort => Some(transformer.transform_best_effort(&source, &report, &ack)),
            Some(_) => None,
        };

        let alternatives = report.is_blocked().then(|| {
            AlternativeRecommender::new(&self.catalog, self.options.max_alternatives).recommend(&source)
        });

        let annex = transformer.review_annex(&source, &report);
        let rewritten_scripts = if manifest.is_some() {
            rewrite_scripts(&input.scripts, &report, &self.ruleset)
        } else {
            Vec::new()
        };

        info!(
            "Finished '{}': {:?} ({} verdicts, {} for review)",
            report.extension_name(),
            report.status(),
            report.verdicts().len(),
            report.count(Outcome::ManualReview)
        );

        Ok(ConversionResult {
            report,
            manifest,
            alternatives,
            annex,
            rewritten_scripts,
            scanned_scripts: input.scripts.iter().map(|s| s.path.clone()).collect(),
        })
    }
}
