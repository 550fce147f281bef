use axum::extract::{
    FromRequest,
    FromRequestParts,
    Request,
};
use axum::http::request::Parts;
use errors::ErrorMetadata;
use serde::de::DeserializeOwned;

use crate::response::HttpResponseError;
use crate::state::AppState;

/// JSON body extractor that rejects unknown fields and routes every
/// rejection (malformed JSON, missing content-type, ...) through the same
/// envelope as a handler-level error.
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpResponseError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|error| HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument("InvalidJson", error.to_string()))))?;
        Ok(Json(value))
    }
}

/// Query-string extractor with the same rejection-to-envelope behavior as
/// [`Json`].
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpResponseError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|error| HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument("InvalidQuery", error.to_string()))))?;
        Ok(Query(value))
    }
}

/// Tenant identity read from the two configurable headers; 400s before the
/// handler body runs if either is missing or blank.
pub struct Tenant {
    pub app_id: String,
    pub team_id: String,
}

impl FromRequestParts<AppState> for Tenant {
    type Rejection = HttpResponseError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let app_id = headers
            .get(state.config.app_id_header.as_str())
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_string();
        let team_id = headers
            .get(state.config.team_id_header.as_str())
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_string();

        if app_id.is_empty() {
            return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
                "AppIdRequired",
                "app_id required"
            ))));
        }
        if team_id.is_empty() {
            return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::invalid_argument(
                "TeamIdRequired",
                "team_id required"
            ))));
        }

        Ok(Tenant { app_id, team_id })
    }
}

pub async fn require_internal_token(
    axum::extract::State(state): axum::extract::State<AppState>,
    request: Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, HttpResponseError> {
    if state.config.internal_token.is_empty() {
        return Ok(next.run(request).await);
    }
    let token = request
        .headers()
        .get("X-Internal-Token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if token != state.config.internal_token {
        return Err(HttpResponseError(anyhow::anyhow!(ErrorMetadata::unauthorized(
            "Unauthorized",
            "unauthorized"
        ))));
    }
    Ok(next.run(request).await)
}
