//! Extension identity and protected-extension detection

use super::verdict_for;
use crate::models::{SourceManifest, Verdict, VerdictOrigin};
use crate::rules::{CompatibilityRuleset, PROTECTED_PREFIX};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

/// Length of a Chrome extension id
pub const EXTENSION_ID_LEN: usize = 32;

/// Derive the Chrome extension id from a manifest `key`.
///
/// Chrome hashes the DER public key with SHA-256, keeps the first 16 bytes
/// and spells each nibble with the letters `a` to `p`.
pub fn derive_extension_id(key: &str) -> Option<String> {
    let compact: String = key.chars().filter(|c| !c.is_whitespace()).collect();
    let der = STANDARD.decode(compact).ok()?;
    if der.is_empty() {
        return None;
    }
    Some(extension_id_from_public_key(&der))
}

/// Extension id for a DER-encoded public key, as carried in CRX2 headers
pub fn extension_id_from_public_key(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    digest[..EXTENSION_ID_LEN / 2]
        .iter()
        .flat_map(|byte| [byte >> 4, byte & 0x0f])
        .map(|nibble| char::from(b'a' + nibble))
        .collect()
}

/// Whether a string has the shape of a Chrome extension id
pub fn is_extension_id(id: &str) -> bool {
    id.len() == EXTENSION_ID_LEN && id.bytes().all(|b| (b'a'..=b'p').contains(&b))
}

/// Every id known for a run: the caller's first, then the key-derived one,
/// without duplicates.
pub fn identities(source: &SourceManifest, supplied: Option<&str>) -> Vec<String> {
    let mut ids = Vec::new();
    if let Some(id) = supplied.map(|id| id.trim().to_ascii_lowercase()) {
        if !id.is_empty() {
            ids.push(id);
        }
    }
    if let Some(derived) = source.key().and_then(derive_extension_id) {
        if !ids.contains(&derived) {
            ids.push(derived);
        }
    }
    ids
}

/// Verdicts for identities that have a rule. Ids without one say nothing
/// about compatibility and produce no verdict.
pub fn identity_verdicts(ids: &[String], ruleset: &CompatibilityRuleset) -> Vec<Verdict> {
    ids.iter()
        .filter_map(|id| {
            let subject = format!("{}{}", PROTECTED_PREFIX, id);
            let rule = ruleset.resolve(&subject)?;
            Some(verdict_for(
                subject,
                Some(rule),
                VerdictOrigin::Identity { extension_id: id.clone() },
            ))
        })
        .collect()
}
