//! Restructure transforms
//!
//! Each transform is a pure function from one source value (plus the
//! manifest it came from) to a set of patches against the target manifest.
//! Rule tables refer to transforms by name.

use crate::models::SourceManifest;
use crate::utils::is_match_pattern;
use serde_json::{Map, Value};
use thiserror::Error;

/// Edit applied to the target manifest at a dotted path
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Place a value, merging into whatever is already there
    Set { path: String, value: Value },
    /// Add values to an array, skipping ones already present
    Append { path: String, values: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Restructured {
    pub patches: Vec<Patch>,
    /// Set when the reshaping lost or changed something worth reporting
    pub warning: Option<String>,
}

impl Restructured {
    fn patch(patch: Patch) -> Self {
        Self {
            patches: vec![patch],
            warning: None,
        }
    }

    fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing '{0}'")]
    MissingKey(&'static str),
}

pub type TransformFn = fn(&Value, &SourceManifest) -> Result<Restructured, TransformError>;

/// A named, registered transform function
#[derive(Clone, Copy)]
pub struct Transform {
    name: &'static str,
    apply: TransformFn,
}

impl Transform {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, value: &Value, source: &SourceManifest) -> Result<Restructured, TransformError> {
        (self.apply)(value, source)
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transform").field(&self.name).finish()
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

const TRANSFORMS: &[Transform] = &[
    Transform { name: "service_worker_to_scripts", apply: service_worker_to_scripts },
    Transform { name: "host_pattern_by_version", apply: host_pattern_by_version },
    Transform { name: "optional_host_pattern_by_version", apply: optional_host_pattern_by_version },
    Transform { name: "action_by_version", apply: action_by_version },
    Transform { name: "csp_by_version", apply: csp_by_version },
    Transform { name: "web_accessible_resources", apply: web_accessible_resources },
    Transform { name: "side_panel_to_sidebar_action", apply: side_panel_to_sidebar_action },
];

pub fn lookup(name: &str) -> Option<Transform> {
    TRANSFORMS.iter().find(|t| t.name == name).copied()
}

pub fn registered_names() -> impl Iterator<Item = &'static str> {
    TRANSFORMS.iter().map(|t| t.name)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_str<'v>(value: &'v Value) -> Result<&'v str, TransformError> {
    value.as_str().ok_or(TransformError::UnexpectedShape {
        expected: "string",
        found: kind_of(value),
    })
}

fn expect_object(value: &Value) -> Result<&Map<String, Value>, TransformError> {
    value.as_object().ok_or(TransformError::UnexpectedShape {
        expected: "object",
        found: kind_of(value),
    })
}

/// `background.service_worker` becomes an entry of `background.scripts`,
/// which Firefox loads as a non-persistent event page.
fn service_worker_to_scripts(value: &Value, _source: &SourceManifest) -> Result<Restructured, TransformError> {
    let script = expect_str(value)?;
    Ok(Restructured::patch(Patch::Append {
        path: "background.scripts".to_string(),
        values: vec![Value::String(script.to_string())],
    }))
}

/// Host patterns listed under `permissions` move to `host_permissions` in
/// MV3 and stay where they are in MV2.
fn host_pattern_by_version(value: &Value, source: &SourceManifest) -> Result<Restructured, TransformError> {
    let target = if source.manifest_version() >= 3 {
        "host_permissions"
    } else {
        "permissions"
    };
    host_pattern_into(value, target)
}

fn optional_host_pattern_by_version(value: &Value, source: &SourceManifest) -> Result<Restructured, TransformError> {
    let target = if source.manifest_version() >= 3 {
        "optional_host_permissions"
    } else {
        "optional_permissions"
    };
    host_pattern_into(value, target)
}

fn host_pattern_into(value: &Value, target: &str) -> Result<Restructured, TransformError> {
    let pattern = expect_str(value)?;
    if !is_match_pattern(pattern) {
        return Err(TransformError::UnexpectedShape {
            expected: "host match pattern",
            found: "permission name",
        });
    }
    Ok(Restructured::patch(Patch::Append {
        path: target.to_string(),
        values: vec![value.clone()],
    }))
}

/// `action` and `browser_action` land on whichever key the manifest
/// version uses. MV3 drops `browser_style`.
fn action_by_version(value: &Value, source: &SourceManifest) -> Result<Restructured, TransformError> {
    let mut action = expect_object(value)?.clone();

    if source.manifest_version() >= 3 {
        let warning = action
            .remove("browser_style")
            .map(|_| "browser_style is not supported in MV3 and was removed".to_string());
        Ok(Restructured::patch(Patch::Set {
            path: "action".to_string(),
            value: Value::Object(action),
        })
        .with_warning(warning))
    } else {
        Ok(Restructured::patch(Patch::Set {
            path: "browser_action".to_string(),
            value: Value::Object(action),
        }))
    }
}

/// MV3 requires the object form of `content_security_policy`; Firefox
/// ignores the `sandbox` policy.
fn csp_by_version(value: &Value, source: &SourceManifest) -> Result<Restructured, TransformError> {
    let mv3 = source.manifest_version() >= 3;
    match value {
        Value::String(policy) if mv3 => {
            let mut object = Map::new();
            object.insert("extension_pages".to_string(), Value::String(policy.clone()));
            Ok(Restructured::patch(Patch::Set {
                path: "content_security_policy".to_string(),
                value: Value::Object(object),
            })
            .with_warning(Some("string policy converted to MV3 object form".to_string())))
        }
        Value::String(_) => Ok(Restructured::patch(Patch::Set {
            path: "content_security_policy".to_string(),
            value: value.clone(),
        })),
        Value::Object(object) => {
            let mut object = object.clone();
            let warning = object
                .remove("sandbox")
                .map(|_| "sandbox policy is not supported by Firefox and was removed".to_string());
            Ok(Restructured::patch(Patch::Set {
                path: "content_security_policy".to_string(),
                value: Value::Object(object),
            })
            .with_warning(warning))
        }
        other => Err(TransformError::UnexpectedShape {
            expected: "string or object",
            found: kind_of(other),
        }),
    }
}

/// Strip the Chrome-only `use_dynamic_url` flag and give every MV3 entry a
/// `matches` list when it declares neither `matches` nor `extension_ids`.
fn web_accessible_resources(value: &Value, _source: &SourceManifest) -> Result<Restructured, TransformError> {
    let entries = value.as_array().ok_or(TransformError::UnexpectedShape {
        expected: "array",
        found: kind_of(value),
    })?;

    let mut changes = Vec::new();
    let mut rewritten = Vec::with_capacity(entries.len());

    for entry in entries {
        match entry {
            // MV2 form: a plain list of paths
            Value::String(_) => rewritten.push(entry.clone()),
            Value::Object(object) => {
                let mut object = object.clone();
                if object.remove("use_dynamic_url").is_some() {
                    changes.push("removed use_dynamic_url");
                }
                if !object.contains_key("matches") && !object.contains_key("extension_ids") {
                    object.insert(
                        "matches".to_string(),
                        Value::Array(vec![Value::String("<all_urls>".to_string())]),
                    );
                    changes.push("added matches [\"<all_urls>\"]");
                }
                rewritten.push(Value::Object(object));
            }
            other => {
                return Err(TransformError::UnexpectedShape {
                    expected: "string or object entry",
                    found: kind_of(other),
                })
            }
        }
    }

    changes.sort_unstable();
    changes.dedup();
    let warning = (!changes.is_empty()).then(|| changes.join("; "));

    Ok(Restructured::patch(Patch::Set {
        path: "web_accessible_resources".to_string(),
        value: Value::Array(rewritten),
    })
    .with_warning(warning))
}

/// Chrome's `side_panel.default_path` maps onto Firefox's
/// `sidebar_action.default_panel`. Script calls to `chrome.sidePanel` still
/// need manual porting.
fn side_panel_to_sidebar_action(value: &Value, source: &SourceManifest) -> Result<Restructured, TransformError> {
    let panel = expect_object(value)?;
    let path = panel
        .get("default_path")
        .ok_or(TransformError::MissingKey("default_path"))?;
    let path = expect_str(path)?;

    let mut sidebar = Map::new();
    sidebar.insert("default_panel".to_string(), Value::String(path.to_string()));
    sidebar.insert("default_title".to_string(), Value::String(source.name().to_string()));

    Ok(Restructured::patch(Patch::Set {
        path: "sidebar_action".to_string(),
        value: Value::Object(sidebar),
    }))
}
