//! Structural validation of a Firefox manifest before it is written

use crate::models::TargetManifest;
use crate::utils::is_valid_gecko_id;
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Reject manifests Firefox would refuse to load
pub fn validate_manifest(manifest: &TargetManifest) -> Result<()> {
    // Check required fields
    match manifest.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => {}
        _ => anyhow::bail!("Manifest name is required"),
    }

    match manifest.get("version").and_then(Value::as_str) {
        Some(version) if !version.is_empty() => {}
        _ => anyhow::bail!("Manifest version is required"),
    }

    match manifest.get("manifest_version").and_then(Value::as_u64) {
        Some(2) | Some(3) => {}
        Some(other) => anyhow::bail!("Firefox supports manifest_version 2 and 3, found {}", other),
        None => anyhow::bail!("manifest_version is required"),
    }

    // Check Firefox-specific requirements
    if let Some(id) = manifest.get_path("browser_specific_settings.gecko.id") {
        match id.as_str() {
            Some(id) if is_valid_gecko_id(id) => {}
            _ => anyhow::bail!("Invalid Firefox add-on id: {}", id),
        }
    }

    if manifest.get_path("background.service_worker").is_some()
        && manifest.get_path("background.scripts").is_none()
    {
        anyhow::bail!("Firefox cannot run background.service_worker without background.scripts");
    }

    Ok(())
}

/// Package paths the manifest references that are absent from `files`
pub fn missing_files<'a>(
    manifest: &TargetManifest,
    files: impl IntoIterator<Item = &'a PathBuf>,
) -> Vec<String> {
    let present: BTreeSet<&Path> = files.into_iter().map(PathBuf::as_path).collect();

    referenced_files(manifest)
        .into_iter()
        .filter(|reference| !present.contains(Path::new(reference.trim_start_matches('/'))))
        .collect()
}

fn referenced_files(manifest: &TargetManifest) -> BTreeSet<String> {
    let mut references = BTreeSet::new();
    let mut add = |value: Option<&Value>| {
        if let Some(path) = value.and_then(Value::as_str) {
            references.insert(path.to_string());
        }
    };

    for script in array(manifest.get_path("background.scripts")) {
        add(Some(script));
    }
    add(manifest.get_path("background.page"));
    add(manifest.get_path("action.default_popup"));
    add(manifest.get_path("browser_action.default_popup"));
    add(manifest.get_path("options_ui.page"));
    add(manifest.get_path("sidebar_action.default_panel"));

    for content_script in array(manifest.get("content_scripts")) {
        for key in ["js", "css"] {
            for file in array(content_script.get(key)) {
                add(Some(file));
            }
        }
    }

    if let Some(icons) = manifest.get("icons").and_then(Value::as_object) {
        for icon in icons.values() {
            add(Some(icon));
        }
    }

    references
}

fn array(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value.and_then(Value::as_array).into_iter().flatten()
}
