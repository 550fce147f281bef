//! Maps a catalog asset to the document shape the search index stores.
//!
//! Includes `name` alongside the keyword/status/timestamp fields — the
//! reindex engine's full-rebuild document already carries it, and the
//! contract for what a document looks like is the same regardless of
//! whether it arrived via the incremental worker or a rebuild.

use catalog_model::Asset;
use serde_json::{
    json,
    Value,
};

pub fn map_asset_doc(asset: &Asset) -> Value {
    json!({
        "asset_id": asset.id,
        "team_id": asset.team_id,
        "name": asset.name,
        "tag_ids": asset.tag_ids,
        "asset_type": asset.asset_type,
        "status": asset.status,
        "created_timestamp": asset.created_timestamp,
        "updated_timestamp": asset.updated_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_asset() -> Asset {
        Asset {
            id: "a1".into(),
            team_id: "team1".into(),
            creator_user_id: None,
            name: "My Asset".into(),
            asset_type: "image".into(),
            primary_content: json!({"url": "s3://x"}),
            properties: None,
            files: None,
            media: None,
            thumbnail: None,
            keywords: None,
            status: "published".into(),
            extra: None,
            tag_ids: vec!["t1".into(), "t2".into()],
            created_timestamp: 1,
            updated_timestamp: 2,
        }
    }

    #[test]
    fn doc_includes_name() {
        let doc = map_asset_doc(&sample_asset());
        assert_eq!(doc["name"], json!("My Asset"));
        assert_eq!(doc["tag_ids"], json!(["t1", "t2"]));
    }
}
