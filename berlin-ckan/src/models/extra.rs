use serde::{Deserialize, Serialize};

/// Represents an extra key-value pair in CKAN datasets
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extra {
    #[serde(rename = "key")]
    pub key: String,
    #[serde(rename = "value", default)]
    pub value: serde_json::Value,
}

impl Extra {
    pub fn new(key: String, value: serde_json::Value) -> Extra {
        Extra { key, value }
    }

    /// The value as display text. Strings are returned unquoted, `null` as empty.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
