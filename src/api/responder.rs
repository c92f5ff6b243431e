//! Maps an [`ApiError`] to a status, headers, and a localized JSON body.
//!
//! # Wire Formats
//! ```text
//! legacy    (version < 2024-01-01): {"code": 422, "error_code": "...", "msg": "...", "error_id": "..."}
//! versioned (version ≥ 2024-01-01): {"code": "...", "message": "..."}
//! oauth     (any version):          {"error": "...", "error_description": "..."}
//! ```
//!
//! # Logging
//! Only [`ErrorResponder::render`] logs.
//! - 5xx: error, with the correlation id that is also sent to the client
//! - 429: warn
//! - everything else: info

use axum::{
    http::{HeaderValue, StatusCode},
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::{codes, ApiError, ApiVersion, API_VERSION_HEADER};
use crate::http::response::json_response;
use crate::i18n::catalog::{self, keys};
use crate::i18n::Locale;
use crate::observability::metrics;

/// Response header carrying the machine error code.
pub const ERROR_CODE_HEADER: &str = "x-error-code";

/// Per-request values the responder needs.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub version: ApiVersion,
    pub locale: Locale,
    /// The request's `x-request-id`, reused as the correlation id.
    pub request_id: Option<String>,
}

impl ErrorContext {
    fn correlation_id(&self) -> String {
        self.request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

/// Flat error shape served before the versioned format existed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LegacyErrorBody {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionedErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorBody {
    Legacy(LegacyErrorBody),
    Versioned(VersionedErrorBody),
    OAuth(OAuthErrorBody),
}

/// A fully decided error response, before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedError {
    pub status: StatusCode,
    /// Value for [`ERROR_CODE_HEADER`], if the format calls for it.
    pub error_code_header: Option<String>,
    pub body: ErrorBody,
}

impl RenderedError {
    fn new(status: StatusCode, body: ErrorBody) -> Self {
        Self {
            status,
            error_code_header: None,
            body,
        }
    }

    fn with_error_code_header(mut self, code: impl Into<String>) -> Self {
        self.error_code_header = Some(code.into());
        self
    }

    fn legacy(status: StatusCode, code: impl Into<String>, msg: impl Into<String>, error_id: Option<String>) -> Self {
        Self::new(
            status,
            ErrorBody::Legacy(LegacyErrorBody {
                code: status.as_u16(),
                error_code: Some(code.into()),
                msg: msg.into(),
                error_id,
            }),
        )
    }

    fn versioned(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            status,
            ErrorBody::Versioned(VersionedErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        )
    }
}

/// Renders [`ApiError`] values for one negotiated version and locale.
pub struct ErrorResponder;

impl ErrorResponder {
    /// Decide status, headers, and body for `err`. Pure; nothing is logged.
    pub fn prepare(err: ApiError, ctx: &ErrorContext) -> RenderedError {
        let versioned = ctx.version.uses_versioned_errors();

        match err {
            ApiError::Validation(e) => {
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                let message = catalog::friendly_lookup(ctx.locale, &e.code, &e.message);
                if versioned {
                    RenderedError::versioned(status, e.code, message)
                } else {
                    RenderedError::legacy(status, e.code.clone(), message, None).with_error_code_header(e.code)
                }
            }

            ApiError::Domain(e) => {
                let explicit_code = e.code.as_deref().filter(|c| !c.is_empty()).map(str::to_string);
                let code = e.machine_code();
                let message = catalog::friendly_lookup(ctx.locale, explicit_code.as_deref().unwrap_or(""), &e.message);

                let rendered = if versioned {
                    RenderedError::versioned(e.status, code, message)
                } else if e.cause.as_ref().is_some_and(|c| c.is_persistence()) {
                    RenderedError::legacy(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        codes::UNEXPECTED_FAILURE,
                        catalog::lookup(ctx.locale, keys::INTERNAL_SERVER_ERROR),
                        Some(ctx.correlation_id()),
                    )
                } else {
                    let error_id = e.status.is_server_error().then(|| ctx.correlation_id());
                    RenderedError::legacy(e.status, code, message, error_id)
                };

                match explicit_code {
                    Some(code) => rendered.with_error_code_header(code),
                    None => rendered,
                }
            }

            ApiError::OAuth(e) => RenderedError::new(
                StatusCode::BAD_REQUEST,
                ErrorBody::OAuth(OAuthErrorBody {
                    error: e.error,
                    error_description: catalog::friendly_lookup(ctx.locale, "", &e.description).to_string(),
                }),
            ),

            ApiError::Generic(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let message = catalog::lookup(ctx.locale, keys::UNEXPECTED_FAILURE);
                if versioned {
                    RenderedError::versioned(status, codes::UNEXPECTED_FAILURE, message)
                } else {
                    RenderedError::legacy(status, codes::UNEXPECTED_FAILURE, message, Some(ctx.correlation_id()))
                }
            }
        }
    }

    /// Log `err`, then render it into a JSON response.
    ///
    /// A correlation id is fixed up front so the log line and the body agree.
    pub fn render(err: ApiError, ctx: &ErrorContext) -> Response {
        let ctx = ErrorContext {
            request_id: Some(ctx.correlation_id()),
            ..ctx.clone()
        };
        log_error(&err, &ctx);

        let rendered = Self::prepare(err, &ctx);
        metrics::record_error_rendered(rendered.status, &rendered.body);
        Self::into_response(rendered, ctx.version)
    }

    /// Serialize a decided response without logging or metrics.
    pub fn into_response(rendered: RenderedError, version: ApiVersion) -> Response {
        let mut response = json_response(rendered.status, &rendered.body);
        let headers = response.headers_mut();

        if let Some(code) = rendered.error_code_header {
            match HeaderValue::from_str(&code) {
                Ok(value) => {
                    headers.insert(ERROR_CODE_HEADER, value);
                }
                Err(_) => tracing::debug!(code = %code, "Error code is not a valid header value"),
            }
        }

        if !version.is_initial() {
            if let Ok(value) = HeaderValue::from_str(&version.to_string()) {
                headers.insert(API_VERSION_HEADER, value);
            }
        }

        response
    }
}

fn log_error(err: &ApiError, ctx: &ErrorContext) {
    let error_id = ctx.request_id.as_deref().unwrap_or_default();

    match err {
        ApiError::Validation(e) => {
            tracing::info!(code = %e.code, error = %e.message, "Validation error");
        }
        ApiError::Domain(e) => {
            let code = e.machine_code();
            let cause = e.cause.as_ref().map(ToString::to_string).unwrap_or_default();

            if e.status.is_server_error() {
                tracing::error!(error_id, status = e.status.as_u16(), code = %code, cause = %cause, "{}", e.message);
            } else if e.status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(status = e.status.as_u16(), code = %code, cause = %cause, "{}", e.message);
            } else {
                tracing::info!(status = e.status.as_u16(), code = %code, cause = %cause, "{}", e.message);
            }

            if !ctx.version.uses_versioned_errors() && e.cause.as_ref().is_some_and(|c| c.is_persistence()) {
                tracing::error!(error_id, cause = %cause, "Persistence error occurred");
            }
        }
        ApiError::OAuth(e) => {
            tracing::info!(error = %e.error, description = %e.description, "OAuth error occurred");
        }
        ApiError::Generic(e) => {
            tracing::error!(error_id, error = %e, "Unhandled server error");
        }
    }
}

impl ErrorBody {
    /// The machine code carried by the body.
    pub fn code(&self) -> &str {
        match self {
            ErrorBody::Legacy(b) => b.error_code.as_deref().unwrap_or(codes::UNKNOWN),
            ErrorBody::Versioned(b) => &b.code,
            ErrorBody::OAuth(b) => &b.error,
        }
    }
}
