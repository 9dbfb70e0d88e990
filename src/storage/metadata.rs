use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `metadata.json` sidecar stored next to each model.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<f64>,
    /// Fields written by other tools survive edits.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelMetadata {
    /// Overwrites only the fields that carry a non-empty value.
    pub fn merge(&mut self, title: Option<&str>, date: Option<&str>) {
        if let Some(title) = title.filter(|value| !value.is_empty()) {
            self.title = Some(title.to_string());
        }
        if let Some(date) = date.filter(|value| !value.is_empty()) {
            self.date = Some(date.to_string());
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DiaryEntry {
    pub date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<f64>,
}
