use axum::extract::{
    Path,
    State,
};
use catalog_store::ViewPatch;
use errors::ErrorMetadata;
use serde_json::json;

use crate::dto::{
    TagIdsRequest,
    ViewCreateRequest,
};
use crate::extract::{
    Json,
    Tenant,
};
use crate::response::{
    ok,
    HttpResponseError,
};
use crate::state::AppState;

pub async fn create_view(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(req): Json<ViewCreateRequest>,
) -> Result<axum::response::Response, HttpResponseError> {
    if req.name.is_empty() || req.path.is_empty() {
        return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
            "ViewFieldsRequired",
            "name and path required"
        ))));
    }
    let view = req.into_view();
    let id = state
        .service
        .create_view(&tenant.app_id, Some(tenant.team_id.as_str()), view)
        .await?;
    Ok(ok(json!({"id": id})))
}

/// Mirrors [`crate::routes::assets::update_asset`]'s empty-string handling:
/// a blank text field leaves the column untouched instead of clearing it.
fn drop_empty_strings(mut patch: ViewPatch) -> ViewPatch {
    if patch.name.as_deref() == Some("") {
        patch.name = None;
    }
    if patch.description.as_deref() == Some("") {
        patch.description = None;
    }
    if patch.icon_url.as_deref() == Some("") {
        patch.icon_url = None;
    }
    patch
}

pub async fn update_view(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(view_id): Path<String>,
    Json(patch): Json<ViewPatch>,
) -> Result<axum::response::Response, HttpResponseError> {
    let patch = drop_empty_strings(patch);
    if patch.is_empty() {
        return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
            "NoUpdates",
            "no updates"
        ))));
    }
    state.service.update_view(&tenant.app_id, &tenant.team_id, &view_id, patch).await?;
    Ok(ok(json!({"ok": true})))
}

pub async fn delete_view(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(view_id): Path<String>,
) -> Result<axum::response::Response, HttpResponseError> {
    state.service.delete_view(&tenant.app_id, &tenant.team_id, &view_id).await?;
    Ok(ok(json!({"ok": true})))
}

pub async fn view_tree(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<axum::response::Response, HttpResponseError> {
    let items = state.service.get_view_tree(&tenant.app_id, &tenant.team_id).await?;
    Ok(ok(json!({"items": items})))
}

pub async fn get_view_tags(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(view_id): Path<String>,
) -> Result<axum::response::Response, HttpResponseError> {
    let items = state.service.get_view_tags(&tenant.app_id, &tenant.team_id, &view_id).await?;
    Ok(ok(json!({"items": items})))
}

pub async fn replace_view_tags(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(view_id): Path<String>,
    Json(req): Json<TagIdsRequest>,
) -> Result<axum::response::Response, HttpResponseError> {
    state
        .service
        .replace_view_tags(&tenant.app_id, &tenant.team_id, &view_id, req.tag_ids)
        .await?;
    Ok(ok(json!({"ok": true})))
}
