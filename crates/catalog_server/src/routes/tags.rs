use axum::extract::{
    Path,
    State,
};
use errors::ErrorMetadata;
use serde_json::json;

use crate::dto::{
    ListTagsQuery,
    TagCreateRequest,
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

const DEFAULT_LIST_LIMIT: i64 = 20;

pub async fn create_tag(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(req): Json<TagCreateRequest>,
) -> Result<axum::response::Response, HttpResponseError> {
    if req.name.is_empty() {
        return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
            "NameRequired",
            "name required"
        ))));
    }
    let tag = req.into_tag();
    let id = state.service.create_tag(&tenant.app_id, &tenant.team_id, tag).await?;
    Ok(ok(json!({"id": id})))
}

pub async fn list_tags(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(query): Query<ListTagsQuery>,
) -> Result<axum::response::Response, HttpResponseError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let (items, next_token) = state
        .service
        .list_tags(&tenant.app_id, &tenant.team_id, &query.keyword, limit, query.page_token.as_deref())
        .await?;
    Ok(ok(json!({"items": items, "next_page_token": next_token})))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(tag_id): Path<String>,
) -> Result<axum::response::Response, HttpResponseError> {
    state.service.delete_tag(&tenant.app_id, &tenant.team_id, &tag_id).await?;
    Ok(ok(json!({"ok": true})))
}
