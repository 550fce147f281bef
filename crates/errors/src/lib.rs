use std::borrow::Cow;

use http::StatusCode;

/// ErrorMetadata is attached to an anyhow error chain via
/// `.context(e /* ErrorMetadata */)`. It classifies an error for the HTTP
/// boundary without forcing every fallible call to return a bespoke enum.
///
/// `msg` is shown to the caller if it makes it out to a response body.
/// `short_msg` is a stable, ScreamingCamelCase tag usable in tests and logs.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{msg}")]
pub struct ErrorMetadata {
    pub code: ErrorCode,
    pub short_msg: Cow<'static, str>,
    pub msg: Cow<'static, str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    Conflict,
    Unauthorized,
    Transient,
    Internal,
}

impl ErrorMetadata {
    /// Malformed or missing client input. Maps to 400.
    pub fn invalid_argument(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::InvalidArgument,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Target row absent or soft-deleted. Maps to 404.
    pub fn not_found(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::NotFound,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// A conflicting operation is already in flight. Maps to 409.
    pub fn conflict(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::Conflict,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Missing or wrong internal token. Maps to 401.
    pub fn unauthorized(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::Unauthorized,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Database or search-engine I/O failure that a retry may resolve.
    /// Maps to 503.
    pub fn transient(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::Transient,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.code == ErrorCode::InvalidArgument
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.code == ErrorCode::Conflict
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Unauthorized
    }

    pub fn is_transient(&self) -> bool {
        self.code == ErrorCode::Transient
    }
}

impl ErrorCode {
    pub fn http_status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The string used as `code` in the `{code, data}` response envelope.
    pub fn envelope_code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Transient => "INTERNAL",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

pub trait ErrorMetadataAnyhowExt {
    fn is_invalid_argument(&self) -> bool;
    fn is_not_found(&self) -> bool;
    fn is_conflict(&self) -> bool;
    fn is_unauthorized(&self) -> bool;
    fn is_transient(&self) -> bool;
    fn short_msg(&self) -> &str;
    fn msg(&self) -> &str;
    fn http_status(&self) -> StatusCode;
    fn envelope_code(&self) -> &'static str;
    fn map_error_metadata<F: FnOnce(ErrorMetadata) -> ErrorMetadata>(self, f: F) -> Self;
    /// Escape hatch classification, called at the store boundary. Reality is
    /// that some driver errors don't carry a typed variant for "serialization
    /// failure", so we pattern-match the message once here instead of at every
    /// throw site.
    fn last_second_classification(self) -> Self;
}

impl ErrorMetadataAnyhowExt for anyhow::Error {
    fn is_invalid_argument(&self) -> bool {
        self.downcast_ref::<ErrorMetadata>()
            .is_some_and(ErrorMetadata::is_invalid_argument)
    }

    fn is_not_found(&self) -> bool {
        self.downcast_ref::<ErrorMetadata>()
            .is_some_and(ErrorMetadata::is_not_found)
    }

    fn is_conflict(&self) -> bool {
        self.downcast_ref::<ErrorMetadata>()
            .is_some_and(ErrorMetadata::is_conflict)
    }

    fn is_unauthorized(&self) -> bool {
        self.downcast_ref::<ErrorMetadata>()
            .is_some_and(ErrorMetadata::is_unauthorized)
    }

    fn is_transient(&self) -> bool {
        self.downcast_ref::<ErrorMetadata>()
            .is_some_and(ErrorMetadata::is_transient)
    }

    fn short_msg(&self) -> &str {
        match self.downcast_ref::<ErrorMetadata>() {
            Some(e) => &e.short_msg,
            None => INTERNAL_SERVER_ERROR,
        }
    }

    fn msg(&self) -> &str {
        match self.downcast_ref::<ErrorMetadata>() {
            Some(e) => &e.msg,
            None => INTERNAL_SERVER_ERROR_MSG,
        }
    }

    fn http_status(&self) -> StatusCode {
        match self.downcast_ref::<ErrorMetadata>() {
            Some(e) => e.code.http_status_code(),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn envelope_code(&self) -> &'static str {
        match self.downcast_ref::<ErrorMetadata>() {
            Some(e) => e.code.envelope_code(),
            None => "INTERNAL",
        }
    }

    fn map_error_metadata<F>(self, f: F) -> Self
    where
        F: FnOnce(ErrorMetadata) -> ErrorMetadata,
    {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>().cloned() {
            return self.context(f(e));
        }
        self
    }

    fn last_second_classification(self) -> Self {
        let as_string = self.to_string();
        let occs = [
            "could not serialize access due to read/write dependencies among transactions",
            "could not serialize access due to concurrent update",
        ];
        if occs.into_iter().any(|occ| as_string.contains(occ)) {
            return self
                .context(ErrorMetadata::conflict("WriteConflict", as_string.clone()))
                .context(as_string);
        }
        self
    }
}

pub const INTERNAL_SERVER_ERROR_MSG: &str = "Your request couldn't be completed. Try again later.";
pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use crate::{
        ErrorCode,
        ErrorMetadata,
        ErrorMetadataAnyhowExt,
    };

    #[test]
    fn envelope_and_status_agree_per_code() {
        let cases = [
            (
                ErrorMetadata::invalid_argument("Bad", "bad"),
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
            ),
            (
                ErrorMetadata::not_found("NF", "nf"),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                ErrorMetadata::conflict("C", "c"),
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                ErrorMetadata::unauthorized("U", "u"),
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
            ),
            (
                ErrorMetadata::transient("T", "t"),
                StatusCode::SERVICE_UNAVAILABLE,
                "INTERNAL",
            ),
        ];
        for (em, status, envelope) in cases {
            assert_eq!(em.code.http_status_code(), status);
            assert_eq!(em.code.envelope_code(), envelope);
        }
    }

    #[test]
    fn untagged_error_defaults_to_internal() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.envelope_code(), "INTERNAL");
    }

    #[test]
    fn tagged_error_round_trips_through_the_chain() {
        let err: anyhow::Error =
            anyhow::Error::msg("row missing").context(ErrorMetadata::not_found(
                "AssetNotFound",
                "asset not found",
            ));
        assert!(err.is_not_found());
        assert_eq!(err.msg(), "asset not found");
        assert_eq!(err.short_msg(), "AssetNotFound");
    }

    #[test]
    fn serialization_failure_reclassifies_as_conflict() {
        let err = anyhow::anyhow!(
            "could not serialize access due to concurrent update detected"
        )
        .last_second_classification();
        assert!(err.is_conflict());
    }

    #[test]
    fn error_code_is_unused_variant_still_maps_to_internal() {
        assert_eq!(
            ErrorCode::Internal.http_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorCode::Internal.envelope_code(), "INTERNAL");
    }
}
