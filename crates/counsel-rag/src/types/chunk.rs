//! Retrievable document chunks

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata keys probed, in priority order, for a displayable source
/// identifier. Keys vary by partition: course partitions carry `course_id`,
/// profession partitions `profession_id`, and so on.
pub const SOURCE_ID_KEYS: &[&str] = &[
    "university_id",
    "profession_id",
    "course_id",
    "serial_no",
    "source_file",
];

/// One retrievable unit of text plus its source metadata.
///
/// Chunks are produced by an offline indexing process and are immutable once
/// indexed; the engine only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The text to ground the answer on
    pub content: String,
    /// Identifying fields; keys vary by partition
    #[serde(default)]
    pub source: HashMap<String, serde_json::Value>,
}

impl DocumentChunk {
    /// Best-effort source identifier for display, probing the priority key
    /// list and falling back to a generic marker.
    pub fn source_label(&self) -> String {
        for key in SOURCE_ID_KEYS {
            if let Some(value) = self.source.get(*key) {
                if let Some(text) = value_as_text(value) {
                    return format!("{}: {}", key, text);
                }
            }
        }
        "source: unknown".to_string()
    }

    /// Text to place in the generation prompt. Some partitions carry a
    /// curated `blurb_text` field that reads better than the raw indexed
    /// content; prefer it when present.
    pub fn display_content(&self) -> &str {
        self.source
            .get("blurb_text")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.content)
    }
}

/// Render a metadata value as display text, skipping nulls and empties
fn value_as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
