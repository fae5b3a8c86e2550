//! Manifest parsing functionality

use crate::error::ManifestError;
use crate::models::SourceManifest;
use crate::parser::locale;
use serde_json::Value;
use tracing::{debug, warn};

/// Parse manifest.json from bytes.
///
/// Only structure is checked: the document must be an object carrying an
/// integer `manifest_version` and a string `name`.
pub fn parse_manifest(content: &[u8]) -> Result<SourceManifest, ManifestError> {
    parse_manifest_with_locale(content, None)
}

/// Parse manifest.json, resolving a `__MSG_key__` name against the default
/// locale's messages.json when supplied.
pub fn parse_manifest_with_locale(
    content: &[u8],
    messages: Option<&[u8]>,
) -> Result<SourceManifest, ManifestError> {
    let content_str = std::str::from_utf8(content)
        .map_err(|e| ManifestError::malformed(format!("invalid UTF-8: {}", e)))?;

    // json5 accepts the comments Chrome tolerates in manifests
    let document: Value = json5::from_str(content_str)
        .map_err(|e| ManifestError::malformed(format!("not valid JSON: {}", e)))?;

    let Value::Object(object) = document else {
        return Err(ManifestError::malformed("top-level value is not an object"));
    };

    let manifest_version = match object.get("manifest_version") {
        None => return Err(ManifestError::malformed("missing 'manifest_version'")),
        Some(value) => as_manifest_version(value).ok_or_else(|| {
            ManifestError::malformed(format!("'manifest_version' is not a small integer: {}", value))
        })?,
    };

    let name = match object.get("name") {
        None => return Err(ManifestError::malformed("missing 'name'")),
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(ManifestError::malformed(format!("'name' is not a string: {}", other)))
        }
    };

    let display_name = match (locale::message_key(&name), messages) {
        (Some(key), Some(bytes)) => match locale::resolve_message(bytes, key) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Ignoring unreadable locale messages: {}", e);
                None
            }
        },
        _ => None,
    };

    debug!(
        "Parsed manifest '{}' (MV{}, {} fields)",
        display_name.as_deref().unwrap_or(&name),
        manifest_version,
        object.len()
    );

    Ok(SourceManifest::new(
        manifest_version,
        name,
        display_name,
        object.into_iter().collect(),
    ))
}

fn as_manifest_version(value: &Value) -> Option<u8> {
    if let Some(n) = value.as_u64() {
        return u8::try_from(n).ok();
    }
    // json5 may hand integers back as floats
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u8::MAX))
        .map(|f| f as u8)
}

/// Parse manifest.json from string
pub fn parse_manifest_from_str(content: &str) -> Result<SourceManifest, ManifestError> {
    parse_manifest(content.as_bytes())
}
