//! The tagged error value every handler returns.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::{codes, responder};

/// Reference-counted error, so `ApiError` can travel through response extensions.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to clients through the error protocol.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request input rejected; code and message are safe to expose.
    #[error(transparent)]
    Validation(ValidationError),

    /// Self-describing failure with its own status and code.
    #[error(transparent)]
    Domain(HttpError),

    /// OAuth-shaped failure, always 400.
    #[error(transparent)]
    OAuth(OAuthError),

    /// Anything unclassified. Always 500 with a generic message.
    #[error("unhandled server error: {0}")]
    Generic(#[source] SharedError),
}

/// A rejected input, rendered as 422.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: Cow<'static, str>,
    pub message: String,
}

/// Where an internal cause came from.
#[derive(Debug, Clone)]
pub enum Cause {
    /// Storage or schema failure; its details must never reach a client.
    Persistence(SharedError),
    Other(SharedError),
}

impl Cause {
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Cause::Persistence(Arc::new(err))
    }

    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Cause::Other(Arc::new(err))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Cause::Persistence(_))
    }

    pub fn error(&self) -> &SharedError {
        match self {
            Cause::Persistence(e) | Cause::Other(e) => e,
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Persistence(e) => write!(f, "persistence: {e}"),
            Cause::Other(e) => write!(f, "{e}"),
        }
    }
}

/// A domain failure carrying its own HTTP status.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: StatusCode,
    /// Explicit machine code; synthesized from the status when absent.
    pub code: Option<Cow<'static, str>>,
    pub message: String,
    pub cause: Option<Cause>,
}

impl HttpError {
    pub fn new(status: StatusCode, code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code.into()),
            message: message.into(),
            cause: None,
        }
    }

    /// An error without an explicit code.
    pub fn uncoded(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// The explicit code, or `unexpected_failure` for 5xx and `unknown` otherwise.
    pub fn machine_code(&self) -> Cow<'static, str> {
        match &self.code {
            Some(code) if !code.is_empty() => code.clone(),
            _ if self.status.is_server_error() => Cow::Borrowed(codes::UNEXPECTED_FAILURE),
            _ => Cow::Borrowed(codes::UNKNOWN),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| {
            let err: &(dyn std::error::Error + 'static) = c.error().as_ref();
            err
        })
    }
}

/// An OAuth error response (`error` / `error_description`).
#[derive(Debug, Clone, Error)]
#[error("{error}: {description}")]
pub struct OAuthError {
    pub error: String,
    pub description: String,
}

impl ApiError {
    pub fn validation(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        ApiError::Validation(ValidationError {
            code: code.into(),
            message: message.into(),
        })
    }

    pub fn bad_request(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        HttpError::new(StatusCode::BAD_REQUEST, code, message).into()
    }

    pub fn unauthorized(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        HttpError::new(StatusCode::UNAUTHORIZED, code, message).into()
    }

    pub fn forbidden(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        HttpError::new(StatusCode::FORBIDDEN, code, message).into()
    }

    pub fn not_found(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        HttpError::new(StatusCode::NOT_FOUND, code, message).into()
    }

    pub fn too_many_requests(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        HttpError::new(StatusCode::TOO_MANY_REQUESTS, code, message).into()
    }

    pub fn internal(message: impl Into<String>) -> Self {
        HttpError::uncoded(StatusCode::INTERNAL_SERVER_ERROR, message).into()
    }

    pub fn oauth(error: impl Into<String>, description: impl Into<String>) -> Self {
        ApiError::OAuth(OAuthError {
            error: error.into(),
            description: description.into(),
        })
    }

    pub fn generic(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Generic(Arc::new(err))
    }

    /// HTTP status for this error. Independent of locale and version.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Domain(e) => e.status,
            ApiError::OAuth(_) => StatusCode::BAD_REQUEST,
            ApiError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine code for this error.
    pub fn machine_code(&self) -> Cow<'static, str> {
        match self {
            ApiError::Validation(e) => e.code.clone(),
            ApiError::Domain(e) => e.machine_code(),
            ApiError::OAuth(e) => Cow::Owned(e.error.clone()),
            ApiError::Generic(_) => Cow::Borrowed(codes::UNEXPECTED_FAILURE),
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(e: HttpError) -> Self {
        ApiError::Domain(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<OAuthError> for ApiError {
    fn from(e: OAuthError) -> Self {
        ApiError::OAuth(e)
    }
}

impl IntoResponse for ApiError {
    /// Renders quietly with the initial version and default locale, and parks
    /// the error in the response extensions so `error_protocol` can log it and
    /// re-render it with the values negotiated for the request.
    fn into_response(self) -> Response {
        let ctx = responder::ErrorContext::default();
        let rendered = responder::ErrorResponder::prepare(self.clone(), &ctx);
        let mut response = responder::ErrorResponder::into_response(rendered, ctx.version);
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("relation \"users\" does not exist")]
    struct MissingRelation;

    #[test]
    fn status_is_fixed_per_kind() {
        assert_eq!(ApiError::validation(codes::WEAK_PASSWORD, "too short").status(), 422);
        assert_eq!(ApiError::oauth("invalid_grant", "bad code").status(), 400);
        assert_eq!(ApiError::generic(MissingRelation).status(), 500);
        assert_eq!(ApiError::too_many_requests(codes::OVER_REQUEST_RATE_LIMIT, "slow down").status(), 429);
    }

    #[test]
    fn missing_code_is_synthesized_from_status() {
        let e = HttpError::uncoded(StatusCode::SERVICE_UNAVAILABLE, "down");
        assert_eq!(e.machine_code(), codes::UNEXPECTED_FAILURE);

        let e = HttpError::uncoded(StatusCode::CONFLICT, "taken");
        assert_eq!(e.machine_code(), codes::UNKNOWN);

        let e = HttpError::new(StatusCode::CONFLICT, "", "taken");
        assert_eq!(e.machine_code(), codes::UNKNOWN);
    }

    #[test]
    fn cause_is_exposed_as_source() {
        use std::error::Error as _;

        let e = HttpError::uncoded(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
            .with_cause(Cause::persistence(MissingRelation));
        assert!(e.cause.as_ref().unwrap().is_persistence());
        assert!(e.source().unwrap().to_string().contains("users"));
    }

    #[test]
    fn into_response_parks_the_error() {
        let response = ApiError::not_found(codes::NOT_FOUND, "no route").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ApiError>().is_some());
    }
}
