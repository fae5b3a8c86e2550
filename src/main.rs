//! Chrome to Firefox extension porter CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use extension_porter::models::{ConversionReport, Outcome, PolicyKind, Verdict};
use extension_porter::packager::{self, LoadedExtension};
use extension_porter::recommender::AlternativeRecommender;
use extension_porter::rules::{self, restructure, CompatibilityRuleset};
use extension_porter::{
    report, AlternativeCatalog, ConversionOptions, ConversionResult, ConversionStatus, Converter,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extension-porter")]
#[command(about = "Port Chrome extensions to Firefox using a compatibility rule table", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    tables: TableArgs,

    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TableArgs {
    /// Rule table(s) to use instead of the built-in one; repeat to merge
    #[arg(long = "rules", global = true)]
    rules: Vec<PathBuf>,

    /// Alternatives catalog to use instead of the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// File of protected extension ids (one per line) that block conversion
    #[arg(long = "protected-ids", global = true)]
    protected_ids: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Chrome extension to Firefox format
    Convert {
        /// Path to the Chrome extension (ZIP, CRX, or directory)
        #[arg(short, long)]
        input: PathBuf,

        /// Output folder; the .xpi is written next to it
        #[arg(short, long)]
        output: PathBuf,

        /// Write a partial manifest even when conversion is blocked
        #[arg(long)]
        best_effort: bool,

        /// Maximum number of Firefox alternatives to suggest
        #[arg(long, default_value_t = 5)]
        max_alternatives: usize,

        /// Chrome extension id, when it cannot be derived from the input
        #[arg(long)]
        extension_id: Option<String>,

        /// Write a Markdown report next to the output
        #[arg(short, long)]
        report: bool,

        /// Print the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Analyze an extension without converting
    Analyze {
        /// Path to the extension
        #[arg(short, long)]
        input: PathBuf,

        /// Chrome extension id, when it cannot be derived from the input
        #[arg(long)]
        extension_id: Option<String>,

        /// Print the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List the loaded compatibility rules
    Rules {
        /// Only show rules with this policy (e.g. unsupported, block)
        #[arg(long)]
        policy: Option<String>,
    },

    /// Suggest Firefox add-ons covering an extension's capabilities
    Alternatives {
        /// Path to the extension
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum number of suggestions
        #[arg(long, default_value_t = 5)]
        max_alternatives: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", "❌ Failed!".red().bold());
            eprintln!("{}", format!("Error: {:#}", e).red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            best_effort,
            max_alternatives,
            extension_id,
            report,
            json,
        } => {
            let options = ConversionOptions {
                best_effort,
                max_alternatives,
                ..ConversionOptions::default()
            };
            let converter = load_converter(&cli.tables, options)?;
            let (extension, result) = convert(&converter, &input, extension_id)?;

            if json {
                println!("{}", report::report_json(&result)?);
            } else {
                println!("{}", "Chrome to Firefox Extension Porter".bold().blue());
                println!("{}", "=".repeat(50).blue());
                println!();
                print_result(&result);
            }

            // stdout carries only the document in JSON mode
            if result.manifest.is_some() {
                let written = packager::write_package(&extension, &result, &output)?;
                if !json {
                    println!();
                    println!("{}", "✅ Package written".green().bold());
                    println!("  - Folder: {}", written.directory.display());
                    println!("  - XPI: {}", written.xpi.display());
                }
            }

            if report {
                let report_path = output.with_extension("md");
                fs::write(&report_path, report::generate_report(&result))
                    .with_context(|| format!("Failed to write {}", report_path.display()))?;
                if !json {
                    println!("  - Report: {}", report_path.display());
                }
            }

            Ok(status_code(result.status()))
        }

        Commands::Analyze {
            input,
            extension_id,
            json,
        } => {
            let options = ConversionOptions::default();
            let converter = load_converter(&cli.tables, options)?;
            let (_, result) = convert(&converter, &input, extension_id)?;

            if json {
                println!("{}", report::report_json(&result)?);
            } else {
                println!("{}", "📊 Analysis Results".bold().blue());
                println!("{}", "=".repeat(50).blue());
                println!();
                print_result(&result);
            }

            Ok(status_code(result.status()))
        }

        Commands::Rules { policy } => {
            let ruleset = load_ruleset(&cli.tables)?;
            let filter: Option<PolicyKind> = policy
                .map(|p| {
                    serde_json::from_value(serde_json::Value::String(p.clone()))
                        .with_context(|| format!("Unknown policy '{}'", p))
                })
                .transpose()?;

            println!(
                "{}",
                format!("Rule table v{} ({} rules)", ruleset.version(), ruleset.len()).bold()
            );
            println!();
            for rule in ruleset.iter().filter(|r| filter.map_or(true, |f| r.policy.kind() == f)) {
                println!("  {}", rule);
                println!("    {}", rule.note.dimmed());
            }

            println!();
            println!("{}", "Restructure transforms:".bold());
            for name in restructure::registered_names() {
                println!("  - {}", name);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Alternatives {
            input,
            max_alternatives,
        } => {
            let catalog = load_catalog(&cli.tables)?;
            let extension = packager::load_extension(&input)?;
            let source = extension_porter::parser::parse_manifest(extension.manifest_bytes()?)?;

            let recommendations = AlternativeRecommender::new(&catalog, max_alternatives).recommend(&source);
            print_alternatives(&recommendations);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Exit code 2 tells scripts the extension is blocked rather than broken
fn status_code(status: ConversionStatus) -> ExitCode {
    match status {
        ConversionStatus::Blocked => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    }
}

fn load_ruleset(tables: &TableArgs) -> Result<CompatibilityRuleset> {
    let mut builder = CompatibilityRuleset::builder();

    if tables.rules.is_empty() {
        builder = builder.table_json(rules::DEFAULT_RULES_JSON)?;
    }
    for path in &tables.rules {
        builder = builder
            .table_json(&read(path)?)
            .with_context(|| format!("Invalid rule table {}", path.display()))?;
    }
    for path in &tables.protected_ids {
        builder = builder
            .protected_ids(rules::parse_protected_ids(&read(path)?))
            .with_context(|| format!("Invalid protected id list {}", path.display()))?;
    }

    Ok(builder.build())
}

fn load_catalog(tables: &TableArgs) -> Result<AlternativeCatalog> {
    match &tables.catalog {
        Some(path) => AlternativeCatalog::from_json(&read(path)?)
            .with_context(|| format!("Invalid catalog {}", path.display())),
        None => Ok(AlternativeCatalog::load_default()?),
    }
}

fn load_converter(tables: &TableArgs, options: ConversionOptions) -> Result<Converter> {
    Ok(Converter::new(load_ruleset(tables)?, load_catalog(tables)?, options))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn convert(
    converter: &Converter,
    input: &Path,
    extension_id: Option<String>,
) -> Result<(LoadedExtension, ConversionResult)> {
    let extension = packager::load_extension(input)
        .with_context(|| format!("Failed to load extension from {}", input.display()))?;

    let mut conversion_input = extension.conversion_input()?;
    if let Some(id) = extension_id {
        conversion_input = conversion_input.extension_id(id);
    }

    let result = converter.convert(&conversion_input)?;
    Ok((extension, result))
}

fn print_result(result: &ConversionResult) {
    let summary = &result.report;
    print_summary(summary);

    for outcome in [Outcome::Blocking, Outcome::ManualReview, Outcome::Dropped, Outcome::TranslatedWithWarning] {
        let verdicts: Vec<&Verdict> = summary.with_outcome(outcome).collect();
        if verdicts.is_empty() {
            continue;
        }
        println!();
        println!("{}", outcome_label(outcome));
        for verdict in verdicts {
            println!("  - {} [{}]", verdict.subject, verdict.origin);
            println!("    {}", verdict.note.dimmed());
        }
    }

    if !result.rewritten_scripts.is_empty() {
        println!();
        println!("{}", "✏️  Scripts rewritten:".bold());
        for script in &result.rewritten_scripts {
            println!("  - {} ({} substitutions)", script.path.display(), script.substitutions);
        }
    }

    if let Some(alternatives) = &result.alternatives {
        println!();
        print_alternatives(alternatives);
    }
}

fn print_summary(summary: &ConversionReport) {
    println!(
        "Extension: {} v{}",
        summary.extension_name(),
        summary.extension_version().unwrap_or("?")
    );
    println!("Rule table: v{}", summary.ruleset_version());
    let status = match summary.status() {
        ConversionStatus::Convertible => "✅ Convertible".green(),
        ConversionStatus::ConvertibleWithWarnings => "⚠️  Convertible with warnings".yellow(),
        ConversionStatus::Blocked => "⛔ Blocked".red(),
    };
    println!("Status: {}", status.bold());
    println!(
        "Verdicts: {} translated, {} warnings, {} for review, {} dropped, {} blocking",
        summary.count(Outcome::Translated),
        summary.count(Outcome::TranslatedWithWarning),
        summary.count(Outcome::ManualReview),
        summary.count(Outcome::Dropped),
        summary.count(Outcome::Blocking)
    );
}

fn outcome_label(outcome: Outcome) -> ColoredString {
    match outcome {
        Outcome::Blocking => "🛑 Blocking:".red().bold(),
        Outcome::ManualReview => "📝 Manual review required:".yellow().bold(),
        Outcome::Dropped => "🗑️  Dropped:".yellow(),
        Outcome::TranslatedWithWarning => "⚠️  Warnings:".yellow(),
        Outcome::Translated => "✅ Translated:".green(),
    }
}

fn print_alternatives(recommendations: &[extension_porter::models::Recommendation]) {
    if recommendations.is_empty() {
        println!("{}", "No Firefox alternatives found in the catalog.".dimmed());
        return;
    }
    println!("{}", "🦊 Firefox alternatives:".bold().blue());
    for recommendation in recommendations {
        println!(
            "  - {} ({})",
            recommendation.candidate.name.bold(),
            recommendation.candidate.store_url
        );
        println!("    matches: {}", recommendation.matched_tags.join(", ").dimmed());
    }
}
