use axum::response::{
    IntoResponse,
    Response,
};
use axum::Json;
use errors::ErrorMetadataAnyhowExt;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub code: &'static str,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope { code: "OK", data }).into_response()
}

/// Wraps an `anyhow::Error` so axum handlers can return it with `?`; converts
/// into the `{code, data: {message}}` envelope at the status the error's
/// `ErrorMetadata` (if any) carries, defaulting to Internal/500.
pub struct HttpResponseError(pub anyhow::Error);

impl IntoResponse for HttpResponseError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "request failed");
        let status = self.0.http_status();
        let code = self.0.envelope_code();
        let message = self.0.msg().to_string();
        (status, Json(json!({"code": code, "data": {"message": message}}))).into_response()
    }
}

impl<E> From<E> for HttpResponseError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self(error.into())
    }
}
