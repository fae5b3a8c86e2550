//! Package extraction and building
//!
//! Host-side I/O around the conversion pipeline: reading an extension from
//! disk into a [`ConversionInput`] and writing the converted add-on out.

pub mod builder;
pub mod extractor;

use crate::models::ScriptSource;
use crate::parser::parse_manifest;
use crate::ConversionInput;
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

pub use builder::{write_package, PackageOutput};

lazy_static! {
    static ref SCRIPT_SRC: Regex = Regex::new(
        r#"<script\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#
    ).unwrap();
}

/// Locales tried when the manifest names none, or names a missing one
const FALLBACK_LOCALES: &[&str] = &["en", "en_US"];

/// Every file of an extension, keyed by path relative to its root
#[derive(Debug, Clone, Default)]
pub struct LoadedExtension {
    pub files: BTreeMap<PathBuf, Vec<u8>>,
    /// Chrome extension id, when the input's location or header reveals it
    pub extension_id_hint: Option<String>,
}

impl LoadedExtension {
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(Vec::as_slice)
    }

    pub fn manifest_bytes(&self) -> Result<&[u8]> {
        self.file("manifest.json").context("manifest.json not found")
    }

    /// Gather the manifest, reachable scripts and default locale messages.
    ///
    /// Scripts are the ones the manifest declares, followed by those the
    /// popup and background pages load with `<script src>`. Declared
    /// scripts missing from the package are skipped with a warning.
    pub fn conversion_input(&self) -> Result<ConversionInput> {
        let manifest = self.manifest_bytes()?;
        let source = parse_manifest(manifest)?;

        let mut paths: Vec<PathBuf> = source
            .declared_scripts()
            .iter()
            .map(|s| normalize(Path::new(""), s))
            .collect();

        let pages = source
            .action_popup()
            .map(str::to_string)
            .into_iter()
            .chain(source.background().and_then(|b| b.page));
        for page in pages {
            let page_path = normalize(Path::new(""), &page);
            let Some(html) = self.file(&page_path) else {
                continue;
            };
            let base = page_path.parent().unwrap_or(Path::new("")).to_path_buf();
            for script in page_scripts(&String::from_utf8_lossy(html)) {
                let path = normalize(&base, &script);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }

        let mut scripts = Vec::with_capacity(paths.len());
        for path in paths {
            match self.file(&path) {
                Some(content) => {
                    let script = ScriptSource::from_bytes(path.clone(), content);
                    if script.lossy {
                        warn!("{} is not valid UTF-8; its API calls will not be rewritten", path.display());
                    }
                    scripts.push(script);
                }
                None => warn!("Declared script {} is not in the package", path.display()),
            }
        }

        let mut input = ConversionInput::new(manifest).scripts(scripts);
        if let Some(id) = &self.extension_id_hint {
            input = input.extension_id(id.clone());
        }
        if let Some(messages) = self.locale_messages(source.default_locale()) {
            input = input.locale_messages(messages);
        }
        Ok(input)
    }

    /// Messages of the default locale, then `en`/`en_US`, then the first
    /// locale the package ships
    fn locale_messages(&self, default_locale: Option<&str>) -> Option<Vec<u8>> {
        default_locale
            .into_iter()
            .chain(FALLBACK_LOCALES.iter().copied())
            .find_map(|locale| self.file(Path::new("_locales").join(locale).join("messages.json")))
            .or_else(|| {
                self.files
                    .iter()
                    .find(|(path, _)| is_locale_messages(path))
                    .map(|(_, content)| content.as_slice())
            })
            .map(<[u8]>::to_vec)
    }
}

/// `_locales/<locale>/messages.json`
fn is_locale_messages(path: &Path) -> bool {
    let mut parts = path.iter();
    parts.next() == Some(OsStr::new("_locales"))
        && parts.next().is_some()
        && parts.next() == Some(OsStr::new("messages.json"))
        && parts.next().is_none()
}

/// Local `<script src>` references of an HTML page, in document order
fn page_scripts(html: &str) -> Vec<String> {
    SCRIPT_SRC
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .filter(|src| !src.contains("://") && !src.starts_with("//"))
        .collect()
}

/// Resolve a manifest or page reference to a package path
fn normalize(base: &Path, reference: &str) -> PathBuf {
    let reference = reference.split(['?', '#']).next().unwrap_or(reference);
    let joined = if reference.starts_with('/') {
        PathBuf::from(reference.trim_start_matches('/'))
    } else {
        base.join(reference)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir => {
                normalized.pop();
            }
            _ => {}
        }
    }
    normalized
}

/// Load extension from file or directory
pub fn load_extension(path: &Path) -> Result<LoadedExtension> {
    if path.is_dir() {
        extractor::load_from_directory(path)
    } else if path.extension().and_then(|e| e.to_str()) == Some("zip")
        || path.extension().and_then(|e| e.to_str()) == Some("crx")
    {
        extractor::load_from_archive(path)
    } else {
        anyhow::bail!("Unsupported input format. Expected directory, .zip, or .crx file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extension(files: &[(&str, &str)]) -> LoadedExtension {
        LoadedExtension {
            files: files
                .iter()
                .map(|(p, c)| (PathBuf::from(p), c.as_bytes().to_vec()))
                .collect(),
            extension_id_hint: None,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("popup"), "../js/a.js"), PathBuf::from("js/a.js"));
        assert_eq!(normalize(Path::new("popup"), "/lib/b.js?v=2"), PathBuf::from("lib/b.js"));
        assert_eq!(normalize(Path::new(""), "./bg.js"), PathBuf::from("bg.js"));
    }

    #[test]
    fn test_conversion_input_collects_scripts() {
        let ext = extension(&[
            (
                "manifest.json",
                r#"{"manifest_version": 3, "name": "__MSG_name__", "default_locale": "de",
                    "background": {"service_worker": "bg.js"},
                    "action": {"default_popup": "popup/popup.html"},
                    "content_scripts": [{"matches": ["<all_urls>"], "js": ["content.js", "missing.js"]}]}"#,
            ),
            ("bg.js", "chrome.runtime.id;"),
            ("content.js", "document.body;"),
            (
                "popup/popup.html",
                r#"<script src="https://cdn.test/x.js"></script><script src="popup.js"></script>"#,
            ),
            ("popup/popup.js", "chrome.tabs.query({});"),
            ("_locales/de/messages.json", r#"{"name": {"message": "Erweiterung"}}"#),
        ]);

        let input = ext.conversion_input().unwrap();
        let paths: Vec<_> = input.scripts.iter().map(|s| s.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("bg.js"),
                PathBuf::from("content.js"),
                PathBuf::from("popup/popup.js"),
            ]
        );
        assert!(input.locale_messages.is_some());
    }

    #[test]
    fn test_locale_falls_back_to_first_available() {
        let ext = extension(&[
            ("manifest.json", r#"{"manifest_version": 3, "name": "__MSG_name__"}"#),
            ("_locales/zh_CN/messages.json", r#"{"name": {"message": "Chinese"}}"#),
            ("_locales/fr/messages.json", r#"{"name": {"message": "Extension"}}"#),
            ("_locales/README.md", "not a locale"),
        ]);

        let input = ext.conversion_input().unwrap();
        assert_eq!(
            input.locale_messages.as_deref(),
            Some(&br#"{"name": {"message": "Extension"}}"#[..])
        );
    }

    #[test]
    fn test_missing_manifest() {
        let ext = extension(&[("bg.js", "")]);
        assert!(ext.conversion_input().is_err());
    }
}
