//! Lexical scan of extension scripts for Chrome API references
//!
//! This is pattern matching over source lines, not a JavaScript parser.
//! References built dynamically (`chrome[name]`, aliased namespaces) are
//! not detected.

use crate::models::{ApiUsageFinding, FileLocation, ScriptSource};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// API identifiers the scanner always looks for
pub const KNOWN_CHROME_APIS: &[&str] = &[
    // Completely unsupported in Firefox
    "chrome.offscreen",
    "chrome.declarativeContent",
    "chrome.tabGroups",
    "chrome.sidePanel",
    "chrome.action.openPopup",
    "chrome.debugger",
    "chrome.tts",
    "chrome.ttsEngine",
    "chrome.gcm",
    "chrome.enterprise",
    "chrome.fontSettings",
    "chrome.tabCapture",
    "chrome.desktopCapture",
    "chrome.readingList",
    "chrome.system.cpu",
    "chrome.system.memory",
    "chrome.system.display",

    // Limited or different implementation in Firefox
    "chrome.declarativeNetRequest",
    "chrome.userScripts",
    "chrome.storage.session",

    // Chrome-specific runtime methods
    "chrome.runtime.getPackageDirectoryEntry",

    // Legacy deprecated APIs (Chrome only)
    "chrome.tabs.getSelected",
    "chrome.tabs.getAllInWindow",
    "chrome.tabs.sendRequest",
    "chrome.extension.getURL",
    "chrome.extension.sendRequest",
    "chrome.extension.onRequest",

    // Chrome-specific downloads features
    "chrome.downloads.acceptDanger",
    "chrome.downloads.setShelfEnabled",
];

lazy_static! {
    // Dotted chrome.* member chains, calls and property reads alike
    static ref CHROME_API_PATTERN: Regex = Regex::new(
        r"\bchrome(?:\.[A-Za-z_$][A-Za-z0-9_$]*)+"
    ).unwrap();
}

/// Scans scripts for references to a fixed set of API identifiers.
///
/// A reference resolves to the longest known identifier that equals it or
/// is a dotted prefix of it, so `chrome.storage.session.get` is reported
/// as `chrome.storage.session`.
#[derive(Debug, Clone)]
pub struct ApiSurfaceScanner {
    known: BTreeSet<String>,
}

impl Default for ApiSurfaceScanner {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl ApiSurfaceScanner {
    /// Build a scanner over [`KNOWN_CHROME_APIS`] plus any extra identifiers,
    /// typically the API subjects of the loaded rule table.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known: BTreeSet<String> =
            KNOWN_CHROME_APIS.iter().map(|s| s.to_string()).collect();
        known.extend(extra.into_iter().map(Into::into));
        Self { known }
    }

    /// Lazily yield findings for one script, in line then column order
    pub fn scan<'a>(&'a self, script: &'a ScriptSource) -> impl Iterator<Item = ApiUsageFinding> + 'a {
        script
            .content
            .lines()
            .enumerate()
            .filter(|(_, line)| !is_comment_line(line))
            .flat_map(move |(index, line)| {
                CHROME_API_PATTERN.find_iter(line).filter_map(move |m| {
                    self.resolve(m.as_str()).map(|symbol| ApiUsageFinding {
                        location: FileLocation::new(script.path.clone(), index + 1, m.start()),
                        symbol: symbol.to_string(),
                        matched: m.as_str().to_string(),
                    })
                })
            })
    }

    /// Scan several scripts in the order given
    pub fn scan_all<'a>(
        &'a self,
        scripts: &'a [ScriptSource],
    ) -> impl Iterator<Item = ApiUsageFinding> + 'a {
        scripts.iter().flat_map(move |script| self.scan(script))
    }

    fn resolve(&self, reference: &str) -> Option<&str> {
        let mut candidate = reference;
        loop {
            if let Some(known) = self.known.get(candidate) {
                return Some(known.as_str());
            }
            match candidate.rfind('.') {
                Some(dot) => candidate = &candidate[..dot],
                None => return None,
            }
        }
    }
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}
