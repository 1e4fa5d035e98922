//! Structural diff between two config values
//!
//! JSON objects are compared key by key and reported with dotted paths.
//! Arrays, scalars, text and binary payloads are compared as a whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tamarind_persistence::entity::{ConfigValue, ConfigVersion};

/// Path reported for a change to the value as a whole
pub const ROOT_PATH: &str = "$";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub entries: Vec<DiffEntry>,
}

impl ConfigDiff {
    pub fn is_identical(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of comparing two versions of the same config
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionComparison {
    pub config_id: String,
    pub from: ConfigVersion,
    pub to: ConfigVersion,
    pub diff: ConfigDiff,
}

pub fn diff_values(old: &ConfigValue, new: &ConfigValue) -> ConfigDiff {
    let mut entries = Vec::new();
    match (old, new) {
        (ConfigValue::Json(a), ConfigValue::Json(b)) => diff_json(ROOT_PATH, a, b, &mut entries),
        (a, b) if a != b => entries.push(DiffEntry {
            path: ROOT_PATH.to_string(),
            kind: DiffKind::Modified,
            old: serde_json::to_value(a).ok(),
            new: serde_json::to_value(b).ok(),
        }),
        _ => {}
    }
    ConfigDiff { entries }
}

fn child_path(parent: &str, key: &str) -> String {
    format!("{}.{}", parent, key)
}

fn diff_json(path: &str, old: &Value, new: &Value, out: &mut Vec<DiffEntry>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, old_child) in a {
                match b.get(key) {
                    Some(new_child) => diff_json(&child_path(path, key), old_child, new_child, out),
                    None => out.push(DiffEntry {
                        path: child_path(path, key),
                        kind: DiffKind::Removed,
                        old: Some(old_child.clone()),
                        new: None,
                    }),
                }
            }
            for (key, new_child) in b {
                if !a.contains_key(key) {
                    out.push(DiffEntry {
                        path: child_path(path, key),
                        kind: DiffKind::Added,
                        old: None,
                        new: Some(new_child.clone()),
                    });
                }
            }
        }
        (a, b) if a != b => out.push(DiffEntry {
            path: path.to_string(),
            kind: DiffKind::Modified,
            old: Some(a.clone()),
            new: Some(b.clone()),
        }),
        _ => {}
    }
}
