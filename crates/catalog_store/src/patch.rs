//! Typed partial-update payloads for `UpdateAsset` / `UpdateView`.
//!
//! The original store built its `UPDATE` statements from a stringly-keyed
//! `map[string]any`, trusting the HTTP layer to have already validated the
//! key set before it ever reached SQL. A typed patch makes the same "field
//! absent leaves the column untouched" contract enforceable at compile time
//! instead of by convention: a missing field is skipped entirely, a present
//! text field replaces the column verbatim (including an empty string), and
//! a present JSON field is `Option<Option<Value>>` (via [`deserialize_some`])
//! so an explicit `null` (clear the column) is distinguishable from an
//! omitted key (leave it alone).

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use serde_json::Value;

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub primary_content: Option<Option<Value>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Option<Value>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub files: Option<Option<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub extra: Option<Option<Value>>,
}

impl AssetPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.asset_type.is_none()
            && self.primary_content.is_none()
            && self.properties.is_none()
            && self.files.is_none()
            && self.media.is_none()
            && self.thumbnail.is_none()
            && self.keywords.is_none()
            && self.status.is_none()
            && self.extra.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<i32>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_config: Option<Option<Value>>,
}

impl ViewPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.icon_url.is_none()
            && self.sort.is_none()
            && self.display_config.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_field_stays_none() {
        let patch: AssetPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.primary_content.is_none());
        assert!(patch.is_empty());
    }

    #[test]
    fn explicit_null_is_some_none() {
        let patch: AssetPatch = serde_json::from_str(r#"{"extra": null}"#).unwrap();
        assert_eq!(patch.extra, Some(None));
        assert!(!patch.is_empty());
    }

    #[test]
    fn present_value_is_some_some() {
        let patch: AssetPatch = serde_json::from_str(r#"{"extra": {"a": 1}}"#).unwrap();
        assert_eq!(patch.extra, Some(Some(serde_json::json!({"a": 1}))));
    }
}
