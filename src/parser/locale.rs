//! `__MSG_key__` placeholder resolution against `_locales/*/messages.json`

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct Message {
    message: String,
}

/// Extract `key` from a `__MSG_key__` placeholder
pub fn message_key(value: &str) -> Option<&str> {
    value
        .strip_prefix("__MSG_")
        .and_then(|rest| rest.strip_suffix("__"))
        .filter(|key| !key.is_empty())
}

/// Look up `key` in a messages.json document. Keys compare
/// case-insensitively, as in Chrome.
pub fn resolve_message(messages: &[u8], key: &str) -> Result<Option<String>, json5::Error> {
    let text = String::from_utf8_lossy(messages);
    let catalog: HashMap<String, Message> = json5::from_str(&text)?;

    let mut matches: Vec<_> = catalog
        .into_iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(key))
        .collect();
    // Deterministic pick if a catalog differs only by case
    matches.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(matches.into_iter().next().map(|(_, m)| m.message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_key() {
        assert_eq!(message_key("__MSG_appName__"), Some("appName"));
        assert_eq!(message_key("Plain Name"), None);
        assert_eq!(message_key("__MSG___"), None);
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let messages = br#"{
            "extName": { "message": "Reader Mode", "description": "name" }
        }"#;
        assert_eq!(
            resolve_message(messages, "EXTNAME").unwrap(),
            Some("Reader Mode".to_string())
        );
        assert_eq!(resolve_message(messages, "other").unwrap(), None);
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        assert!(resolve_message(b"{ not json", "x").is_err());
    }
}
