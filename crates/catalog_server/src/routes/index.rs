use axum::extract::{
    Path,
    State,
};
use catalog_reindex::ReindexOptions;
use serde_json::json;

use crate::dto::RebuildRequest;
use crate::extract::Json;
use crate::response::{
    ok,
    HttpResponseError,
};
use crate::state::AppState;

pub async fn app_ids(State(state): State<AppState>) -> Result<axum::response::Response, HttpResponseError> {
    let app_ids = state.reindex.list_app_ids().await?;
    Ok(ok(json!({"items": app_ids})))
}

pub async fn rebuild(
    State(state): State<AppState>,
    Json(req): Json<RebuildRequest>,
) -> Result<axum::response::Response, HttpResponseError> {
    let opts = ReindexOptions {
        batch_size: req.batch_size,
        delete_index: req.delete_index,
        create_index: req.create_index,
        refresh: req.refresh,
    };
    let job = state.reindex.start_rebuild(req.app_ids, opts)?;
    Ok(ok(job))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<axum::response::Response, HttpResponseError> {
    match state.reindex.get_job(&job_id) {
        Some(job) => Ok(ok(job)),
        None => Err(HttpResponseError(anyhow::anyhow!(errors::ErrorMetadata::not_found(
            "JobNotFound",
            format!("job {job_id} not found")
        )))),
    }
}
