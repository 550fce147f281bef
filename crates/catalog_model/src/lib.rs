//! Catalog entities shared by the store, indexer, search, and reindex crates.
//!
//! Every open-ended field (`primary_content`, `properties`, `files`, `extra`,
//! `display_config`) is carried as [`serde_json::Value`] end to end; nothing
//! downstream tries to give it a static shape.

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub id: String,
    pub team_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_user_id: Option<String>,
    pub name: String,
    pub asset_type: String,
    pub primary_content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    pub created_timestamp: i64,
    pub updated_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub name_norm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    pub created_timestamp: i64,
    pub updated_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct View {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub path: String,
    pub level: i32,
    pub sort: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_config: Option<Value>,
    pub created_timestamp: i64,
    pub updated_timestamp: i64,
}

/// One leased row of the `*_data_outbox_events_v2` table.
///
/// `event_type` is carried as the raw column value rather than
/// [`OutboxEventType`] so a row with a type this build doesn't recognize can
/// still be leased and handed to the worker, which pre-fails it instead of
/// leaving it unleased and rescanned forever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboxEvent {
    pub event_id: i64,
    pub team_id: String,
    pub aggregate_id: String,
    pub event_type: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutboxEventType {
    #[serde(rename = "asset.upsert")]
    AssetUpsert,
    #[serde(rename = "asset.delete")]
    AssetDelete,
}

impl OutboxEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxEventType::AssetUpsert => "asset.upsert",
            OutboxEventType::AssetDelete => "asset.delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asset.upsert" => Some(OutboxEventType::AssetUpsert),
            "asset.delete" => Some(OutboxEventType::AssetDelete),
            _ => None,
        }
    }
}
