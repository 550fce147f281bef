use axum::extract::State;
use serde_json::json;

use crate::response::{
    ok,
    HttpResponseError,
};
use crate::state::AppState;

pub async fn healthz() -> axum::response::Response {
    ok(json!({"ok": true}))
}

pub async fn readyz(State(state): State<AppState>) -> Result<axum::response::Response, HttpResponseError> {
    state.service.ready().await?;
    Ok(ok(json!({"ok": true})))
}
