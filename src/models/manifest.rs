//! Manifest data structures for Chrome sources and Firefox targets

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A parsed Chrome manifest.
///
/// Top-level keys are kept as raw JSON so that every field, known or not,
/// reaches the analyzer. Typed views (`background()`, `content_scripts()`)
/// are decoded on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceManifest {
    manifest_version: u8,
    name: String,
    display_name: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl SourceManifest {
    pub(crate) fn new(
        manifest_version: u8,
        name: String,
        display_name: Option<String>,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            manifest_version,
            name,
            display_name,
            fields,
        }
    }

    pub fn manifest_version(&self) -> u8 {
        self.manifest_version
    }

    /// Raw `name` value, possibly a `__MSG_key__` placeholder
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable name, with locale placeholders resolved when possible
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The public key Chrome derives the extension id from
    pub fn key(&self) -> Option<&str> {
        self.fields.get("key").and_then(Value::as_str)
    }

    pub fn default_locale(&self) -> Option<&str> {
        self.fields.get("default_locale").and_then(Value::as_str)
    }

    /// String entries of `permissions` followed by `optional_permissions`
    pub fn declared_permissions(&self) -> impl Iterator<Item = &str> {
        ["permissions", "optional_permissions"]
            .into_iter()
            .filter_map(|key| self.fields.get(key).and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_str)
    }

    pub fn background(&self) -> Option<Background> {
        self.fields
            .get("background")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn content_scripts(&self) -> Vec<ContentScript> {
        self.fields
            .get("content_scripts")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Popup page of the toolbar action, whichever key declares it
    pub fn action_popup(&self) -> Option<&str> {
        ["action", "browser_action", "page_action"]
            .into_iter()
            .filter_map(|key| self.fields.get(key))
            .find_map(|action| action.get("default_popup").and_then(Value::as_str))
    }

    /// Script paths the manifest declares directly, in declaration order
    /// and without duplicates: background first, then content scripts.
    pub fn declared_scripts(&self) -> Vec<String> {
        let mut scripts: Vec<String> = Vec::new();
        let mut push = |path: &str| {
            if !scripts.iter().any(|s| s == path) {
                scripts.push(path.to_string());
            }
        };

        if let Some(background) = self.background() {
            if let Some(service_worker) = &background.service_worker {
                push(service_worker);
            }
            for script in background.scripts.iter().flatten() {
                push(script);
            }
        }

        for content_script in self.content_scripts() {
            for script in &content_script.js {
                push(script);
            }
        }

        scripts
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_worker: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentScript {
    pub matches: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub js: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub css: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,

    pub all_frames: bool,
}

/// Firefox manifest produced by the transformer.
///
/// The document is a sorted JSON map, so serialising the same manifest
/// twice yields identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetManifest {
    document: Map<String, Value>,
    additions: Vec<String>,
}

impl TargetManifest {
    pub(crate) fn new(document: Map<String, Value>, additions: Vec<String>) -> Self {
        Self {
            document,
            additions,
        }
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Look up a dotted path such as `background.scripts`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.document.get(first)?, |value, segment| value.get(segment))
    }

    /// Fields the transformer synthesised rather than translated
    pub fn additions(&self) -> &[String] {
        &self.additions
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.document)
    }
}
