use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The envelope wrapping every CKAN action response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

/// Error payload of a failed action, e.g.
/// `{"__type": "Not Found Error", "message": "Not found"}`.
///
/// Validation errors carry no `message`; their per-field messages land in
/// `details`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionError {
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl ActionError {
    /// Human readable summary: the message if present, otherwise the field details.
    pub fn summary(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }

        let details = self
            .details
            .iter()
            .map(|(field, value)| match value {
                Value::Array(items) => {
                    let parts: Vec<String> = items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                        .collect();
                    format!("{field}: {}", parts.join(", "))
                }
                Value::String(s) => format!("{field}: {s}"),
                other => format!("{field}: {other}"),
            })
            .collect::<Vec<_>>();

        if details.is_empty() {
            self.kind
                .clone()
                .unwrap_or_else(|| "CKAN API reported failure".to_string())
        } else {
            details.join("; ")
        }
    }
}
