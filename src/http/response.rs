//! JSON response writing.
//!
//! # Design Decisions
//! - Bodies are serialized up front so a serialization failure can still
//!   produce a well-formed response
//! - Failures are logged, never retried

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Serialize `body` as a JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, status = status.as_u16(), "Failed to serialize JSON response");
            status.into_response()
        }
    }
}
