//! JSON request bodies accepted by the `/v2/*` handlers. Separate from
//! [`catalog_model`]'s entities because the wire shape allows fields the
//! stored entity always has filled in (id, timestamps) to be omitted.

use catalog_model::{
    Asset,
    Tag,
    View,
};
use serde::Deserialize;
use serde_json::Value;

fn default_value() -> Value {
    Value::Null
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetCreateRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub creator_user_id: Option<String>,
    pub name: String,
    pub asset_type: String,
    #[serde(default = "default_value")]
    pub primary_content: Value,
    #[serde(default)]
    pub properties: Option<Value>,
    #[serde(default)]
    pub files: Option<Value>,
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub extra: Option<Value>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub updated_timestamp: i64,
}

impl AssetCreateRequest {
    pub fn into_asset_and_tags(self, team_id: &str) -> (Asset, Vec<String>) {
        let asset = Asset {
            id: self.id,
            team_id: team_id.to_string(),
            creator_user_id: self.creator_user_id,
            name: self.name,
            asset_type: self.asset_type,
            primary_content: self.primary_content,
            properties: self.properties,
            files: self.files,
            media: self.media,
            thumbnail: self.thumbnail,
            keywords: self.keywords,
            status: self.status,
            extra: self.extra,
            tag_ids: Vec::new(),
            created_timestamp: self.created_timestamp,
            updated_timestamp: self.updated_timestamp,
        };
        (asset, self.tag_ids)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagCreateRequest {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub extra: Option<Value>,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub updated_timestamp: i64,
}

impl TagCreateRequest {
    pub fn into_tag(self) -> Tag {
        Tag {
            id: self.id,
            team_id: String::new(),
            name: self.name,
            name_norm: String::new(),
            color: self.color,
            extra: self.extra,
            created_timestamp: self.created_timestamp,
            updated_timestamp: self.updated_timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewCreateRequest {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub path: String,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub sort: i32,
    #[serde(default)]
    pub display_config: Option<Value>,
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub updated_timestamp: i64,
}

impl ViewCreateRequest {
    pub fn into_view(self) -> View {
        View {
            id: self.id,
            team_id: None,
            name: self.name,
            description: self.description,
            icon_url: self.icon_url,
            parent_id: self.parent_id,
            path: self.path,
            level: self.level,
            sort: self.sort,
            display_config: self.display_config,
            created_timestamp: self.created_timestamp,
            updated_timestamp: self.updated_timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagIdsRequest {
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchAssetsQuery {
    #[serde(default)]
    pub view_id: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListTagsQuery {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RebuildRequest {
    #[serde(default)]
    pub app_ids: Vec<String>,
    #[serde(default)]
    pub batch_size: i64,
    #[serde(default)]
    pub delete_index: bool,
    #[serde(default)]
    pub create_index: bool,
    #[serde(default)]
    pub refresh: bool,
}

/// Splits a free-form tag string on commas, semicolons, and whitespace,
/// trimming and deduping while preserving first-seen order.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for part in raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if seen.insert(part.to_string()) {
            out.push(part.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_dedupes_and_trims() {
        assert_eq!(
            split_tags(" red, red ;blue\tgreen"),
            vec!["red".to_string(), "blue".to_string(), "green".to_string()]
        );
    }

    #[test]
    fn split_tags_empty_is_empty() {
        assert!(split_tags("").is_empty());
        assert!(split_tags("   ").is_empty());
    }
}
