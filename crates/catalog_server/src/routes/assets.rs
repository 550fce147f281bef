use axum::extract::{
    Path,
    State,
};
use catalog_store::AssetPatch;
use errors::ErrorMetadata;
use serde_json::json;

use crate::dto::{
    split_tags,
    AssetCreateRequest,
    SearchAssetsQuery,
};
use crate::extract::{
    Json,
    Query,
    Tenant,
};
use crate::response::{
    ok,
    HttpResponseError,
};
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: i64 = 20;

pub async fn search_assets(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<SearchAssetsQuery>,
) -> Result<axum::response::Response, HttpResponseError> {
    let user_tags = split_tags(&query.tags);
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let result = state
        .service
        .search_assets(
            &tenant.app_id,
            &tenant.team_id,
            &query.view_id,
            &user_tags,
            &query.name,
            limit,
            query.page_token.as_deref(),
        )
        .await?;
    Ok(ok(json!({
        "items": result.asset_ids,
        "next_page_token": result.next_token,
        "total": result.total,
    })))
}

pub async fn create_asset(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(req): Json<AssetCreateRequest>,
) -> Result<axum::response::Response, HttpResponseError> {
    if req.name.is_empty() || req.asset_type.is_empty() || req.primary_content.is_null() {
        return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
            "AssetFieldsRequired",
            "name, asset_type, primary_content required"
        ))));
    }
    let (asset, tag_ids) = req.into_asset_and_tags(&tenant.team_id);
    let id = state
        .service
        .create_asset(&tenant.app_id, &tenant.team_id, asset, tag_ids)
        .await?;
    Ok(ok(json!({"id": id})))
}

pub async fn get_asset(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(asset_id): Path<String>,
) -> Result<axum::response::Response, HttpResponseError> {
    let asset = state.service.get_asset(&tenant.app_id, &tenant.team_id, &asset_id).await?;
    Ok(ok(asset))
}

/// An empty string in a text field is treated as "leave unchanged" rather
/// than Go's convention of clearing the column to `NULL`; clearing a text
/// field isn't exposed over this API.
fn drop_empty_strings(mut patch: AssetPatch) -> AssetPatch {
    if patch.name.as_deref() == Some("") {
        patch.name = None;
    }
    if patch.asset_type.as_deref() == Some("") {
        patch.asset_type = None;
    }
    if patch.media.as_deref() == Some("") {
        patch.media = None;
    }
    if patch.thumbnail.as_deref() == Some("") {
        patch.thumbnail = None;
    }
    if patch.keywords.as_deref() == Some("") {
        patch.keywords = None;
    }
    if patch.status.as_deref() == Some("") {
        patch.status = None;
    }
    patch
}

pub async fn update_asset(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(asset_id): Path<String>,
    Json(mut body): Json<serde_json::Value>,
) -> Result<axum::response::Response, HttpResponseError> {
    let tag_ids: Option<Vec<String>> = body
        .as_object_mut()
        .and_then(|obj| obj.remove("tag_ids"))
        .map(serde_json::from_value)
        .transpose()
        .map_err(|error| {
            HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
                "InvalidTagIds",
                error.to_string()
            )))
        })?;
    let patch: AssetPatch = serde_json::from_value(body).map_err(|error| {
        HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
            "InvalidAssetPatch",
            error.to_string()
        )))
    })?;
    let patch = drop_empty_strings(patch);

    if patch.is_empty() && tag_ids.is_none() {
        return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
            "NoUpdates",
            "no updates"
        ))));
    }
    if !patch.is_empty() {
        state
            .service
            .update_asset(&tenant.app_id, &tenant.team_id, &asset_id, patch)
            .await?;
    }
    if let Some(tag_ids) = tag_ids {
        state
            .service
            .replace_asset_tags(&tenant.app_id, &tenant.team_id, &asset_id, tag_ids)
            .await?;
    }
    Ok(ok(json!({"ok": true})))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(asset_id): Path<String>,
) -> Result<axum::response::Response, HttpResponseError> {
    state.service.delete_asset(&tenant.app_id, &tenant.team_id, &asset_id).await?;
    Ok(ok(json!({"ok": true})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_empty_strings_clears_only_blank_text_fields() {
        let patch: AssetPatch = serde_json::from_str(r#"{"name": "", "status": "live"}"#).unwrap();
        let patch = drop_empty_strings(patch);
        assert!(patch.name.is_none());
        assert_eq!(patch.status.as_deref(), Some("live"));
    }
}
