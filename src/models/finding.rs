//! Chrome API usages found in extension scripts

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileLocation {
    pub file: PathBuf,
    pub line: usize,
    /// Byte offset of the match within its line
    pub column: usize,
}

impl FileLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for FileLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A lexical reference to a known Chrome API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsageFinding {
    pub location: FileLocation,
    /// Known API identifier the reference resolved to
    pub symbol: String,
    /// Full dotted expression as written in the script
    pub matched: String,
}

/// A script handed to the pipeline by input provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub path: PathBuf,
    pub content: String,
    /// `content` was decoded with replacement characters, so it must never
    /// be written back over the original bytes
    pub lossy: bool,
}

impl ScriptSource {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            lossy: false,
        }
    }

    /// Decode raw script bytes, marking the script lossy when they are not
    /// valid UTF-8
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(content) => Self::new(path, content),
            Err(_) => Self {
                path: path.into(),
                content: String::from_utf8_lossy(bytes).into_owned(),
                lossy: true,
            },
        }
    }
}
