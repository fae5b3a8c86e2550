//! Helper utility functions

/// Check if a permission string is a host match pattern rather than an
/// API permission name
pub fn is_match_pattern(s: &str) -> bool {
    s.contains("://") || s == "<all_urls>" || s.starts_with('*')
}

/// Reduce a name to the characters Firefox accepts in the local part of an
/// email-style add-on id (`[a-zA-Z0-9-._]`). Whitespace becomes `-`.
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect();

    sanitized
        .trim_matches(|c| c == '-' || c == '.' || c == '_')
        .to_string()
}

/// Email-style Firefox add-on id for an extension name
pub fn generate_extension_id(name: &str, suffix: &str) -> String {
    let local = sanitize_name(name);
    let local = if local.is_empty() { "extension".to_string() } else { local };
    format!("{}@{}", local, suffix)
}

/// Whether an id matches Firefox's email-style or GUID add-on id formats
pub fn is_valid_gecko_id(id: &str) -> bool {
    let email_like = id.split_once('@').is_some_and(|(local, domain)| {
        !domain.is_empty()
            && local.chars().chain(domain.chars()).all(|c| {
                c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_'
            })
    });
    let guid_like = id.len() == 38
        && id.starts_with('{')
        && id.ends_with('}')
        && id[1..37].chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    email_like || guid_like
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_match_pattern() {
        assert!(is_match_pattern("https://example.com/*"));
        assert!(is_match_pattern("<all_urls>"));
        assert!(is_match_pattern("*://*.example.com/*"));
        assert!(!is_match_pattern("storage"));
        assert!(!is_match_pattern("tabs"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My Extension"), "my-extension");
        assert_eq!(sanitize_name("My@Extension#2024!"), "myextension2024");
        assert_eq!(sanitize_name("my.extension_v2"), "my.extension_v2");
        assert_eq!(sanitize_name("-test-"), "test");
        assert_eq!(sanitize_name("Übersetzer"), "bersetzer");
    }

    #[test]
    fn test_generate_extension_id() {
        assert_eq!(
            generate_extension_id("My Extension", "converted-extension.org"),
            "my-extension@converted-extension.org"
        );
        assert_eq!(generate_extension_id("日本語", "x.org"), "extension@x.org");
    }

    #[test]
    fn test_is_valid_gecko_id() {
        assert!(is_valid_gecko_id("my-extension@converted-extension.org"));
        assert!(is_valid_gecko_id("{12345678-1234-1234-1234-123456789012}"));
        assert!(!is_valid_gecko_id("no at sign"));
        assert!(!is_valid_gecko_id("bad id@example.org"));
    }
}
