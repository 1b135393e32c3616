//! Caller-supplied requester profiles

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form requester attributes (education level, target country, field of
/// interest, budget, ...). The profile tailors answer generation only; it is
/// never used as retrieval evidence and never enters the index.
///
/// No schema is enforced beyond string keys mapping to JSON values: callers
/// supply heterogeneous fields and absent fields simply read as unknown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    /// Empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Look up an attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether any attributes are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize for the generation prompt as pretty JSON. An empty or
    /// unserializable profile renders as `{}` rather than failing the
    /// request.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<Map<String, Value>> for UserProfile {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_profile_renders_as_empty_object() {
        assert_eq!(UserProfile::new().to_prompt_json(), "{}");
    }

    #[test]
    fn prompt_json_carries_heterogeneous_fields() {
        let mut profile = UserProfile::new();
        profile.set("highestLevel", json!("Masters"));
        profile.set("DreamCountry", json!(["Canada", "Ireland"]));
        profile.set("Funds", json!(40000));

        let rendered = profile.to_prompt_json();
        assert!(rendered.contains("\"highestLevel\": \"Masters\""));
        assert!(rendered.contains("Canada"));
        assert!(rendered.contains("40000"));
    }

    #[test]
    fn deserializes_from_plain_object() {
        let profile: UserProfile =
            serde_json::from_value(json!({ "category": "Engineering" })).unwrap();
        assert_eq!(profile.get("category"), Some(&json!("Engineering")));
    }
}
