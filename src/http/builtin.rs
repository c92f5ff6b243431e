//! Built-in handler served when no business handlers are plugged in.
//!
//! `GET /health` reports the build version; every other path is a
//! `not_found` error rendered through the error protocol.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::api::{codes, ApiError};
use crate::config::ServiceConfig;
use crate::i18n::Locale;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
    /// Locale resolved for this request.
    pub locale: Locale,
}

/// [`crate::http::HandlerFactory`] for the built-in handler.
pub fn router(_config: Arc<ServiceConfig>) -> Router {
    Router::new().route("/health", get(health)).fallback(not_found)
}

async fn health(locale: Locale) -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
        locale,
    })
}

async fn not_found() -> ApiError {
    ApiError::not_found(codes::NOT_FOUND, "no route matches the request path")
}
