//! Firefox extension package builder

use super::LoadedExtension;
use crate::models::ConversionResult;
use crate::utils::sanitize_name;
use crate::validator;
use anyhow::{Context, Result};
use serde_json::json;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Where a package was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    /// Unpacked add-on, loadable as a temporary add-on
    pub directory: PathBuf,
    pub xpi: PathBuf,
}

/// Write the converted add-on as a folder plus an `.xpi` next to it.
///
/// Original files are copied unchanged except `manifest.json` and the
/// scripts the conversion rewrote. Fails when the result carries no
/// manifest, which is the case for blocked conversions.
pub fn write_package(
    source: &LoadedExtension,
    result: &ConversionResult,
    output_path: &Path,
) -> Result<PackageOutput> {
    let manifest = result
        .manifest
        .as_ref()
        .context("Conversion produced no manifest; nothing to package")?;

    validator::validate_manifest(manifest)?;
    for missing in validator::missing_files(manifest, source.files.keys()) {
        warn!("Manifest references {} which is not in the package", missing);
    }

    build_complete_directory(source, result, output_path)?;
    fs::write(
        output_path.join("manifest.json"),
        manifest.to_json_pretty()?,
    )?;
    write_package_json(result, output_path)?;

    let xpi = output_path.with_extension("xpi");
    create_zip_from_directory(output_path, &xpi)?;

    info!("Wrote {} and {}", output_path.display(), xpi.display());
    Ok(PackageOutput {
        directory: output_path.to_path_buf(),
        xpi,
    })
}

/// Copy original files, then overlay the rewritten scripts
fn build_complete_directory(
    source: &LoadedExtension,
    result: &ConversionResult,
    output_path: &Path,
) -> Result<()> {
    fs::create_dir_all(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;

    let rewritten: BTreeSet<&Path> = result
        .rewritten_scripts
        .iter()
        .map(|s| s.path.as_path())
        .collect();

    for (path, content) in &source.files {
        if path == Path::new("manifest.json") || rewritten.contains(path.as_path()) {
            continue;
        }
        write_file(&output_path.join(path), content)?;
    }

    for script in &result.rewritten_scripts {
        write_file(&output_path.join(&script.path), script.content.as_bytes())?;
    }

    Ok(())
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// `package.json` lets web-ext pick the folder up for testing
fn write_package_json(result: &ConversionResult, output_path: &Path) -> Result<()> {
    let manifest = result.manifest.as_ref();
    let field = |key: &str| manifest.and_then(|m| m.get(key)).and_then(|v| v.as_str());

    let package = json!({
        "name": sanitize_name(result.report.extension_name()),
        "version": field("version").unwrap_or("1.0"),
        "description": field("description").unwrap_or("Converted Chrome extension"),
        "main": "manifest.json",
    });

    fs::write(
        output_path.join("package.json"),
        serde_json::to_string_pretty(&package)?,
    )?;
    Ok(())
}

pub fn create_zip_from_directory(source_dir: &Path, zip_path: &Path) -> Result<()> {
    let file = File::create(zip_path).context("Failed to create ZIP file")?;
    let mut zip = ZipWriter::new(file);

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() {
            let relative_path = path
                .strip_prefix(source_dir)
                .context("Failed to get relative path")?;

            // Archive paths always use forward slashes
            let name = relative_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            zip.start_file(name, options)?;
            let content = fs::read(path)?;
            zip.write_all(&content)?;
        }
    }

    zip.finish()?;
    Ok(())
}
