//! Typed configuration payloads

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// A configuration value tagged with its content type
///
/// Serialized adjacently tagged, e.g.
/// `{"content_type":"json","data":{"pool":10}}`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type", content = "data", rename_all = "snake_case")]
pub enum ConfigValue {
    Json(serde_json::Value),
    Text(String),
    Binary(#[serde_as(as = "Base64")] Vec<u8>),
}

impl ConfigValue {
    pub fn content_type(&self) -> &'static str {
        match self {
            ConfigValue::Json(_) => "json",
            ConfigValue::Text(_) => "text",
            ConfigValue::Binary(_) => "binary",
        }
    }

    /// JSON projection used in diffs and audit payloads
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ConfigValue::Json(v) => v.clone(),
            ConfigValue::Text(s) => serde_json::Value::String(s.clone()),
            ConfigValue::Binary(_) => serde_json::to_value(self)
                .ok()
                .and_then(|v| v.get("data").cloned())
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        ConfigValue::Json(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_wire_format() {
        let value = ConfigValue::Json(json!({"pool": 10}));
        let wire = serde_json::to_value(&value).unwrap();
        assert_eq!(wire, json!({"content_type": "json", "data": {"pool": 10}}));
    }

    #[test]
    fn test_binary_is_base64() {
        let value = ConfigValue::Binary(vec![0xde, 0xad, 0xbe, 0xef]);
        let wire = serde_json::to_value(&value).unwrap();
        assert_eq!(wire, json!({"content_type": "binary", "data": "3q2+7w=="}));

        let parsed: ConfigValue = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed, value);
        assert_eq!(value.to_json(), json!("3q2+7w=="));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(ConfigValue::from("plain").content_type(), "text");
        assert_eq!(ConfigValue::from(json!(1)).content_type(), "json");
    }
}
