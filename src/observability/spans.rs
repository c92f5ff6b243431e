//! Request spans carrying the correlation id.

use axum::extract::Request;
use tracing::Span;

use crate::http::request::request_id;

/// Span for one request, tagged with its `x-request-id`.
///
/// Used as the `make_span_with` hook of the HTTP trace layer; the request-id
/// layer runs first, so the id is always present.
pub fn request_span(req: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = request_id(req.headers()).unwrap_or("-"),
    )
}
