//! End-to-end error responses through a running server.

use std::sync::Arc;

use auth_frontend::api::{codes, ApiError, Cause, HttpError};
use auth_frontend::config::ServiceConfig;
use auth_frontend::http::builtin;
use auth_frontend::i18n::{claims_locale_layer, resolver::Claims};
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};

mod common;

#[derive(Debug, thiserror::Error)]
#[error("pq: relation \"auth.users\" does not exist")]
struct MissingRelation;

async fn weak_password() -> Result<&'static str, ApiError> {
    Err(ApiError::validation(codes::WEAK_PASSWORD, "password is too short"))
}

async fn email_taken() -> Result<&'static str, ApiError> {
    Err(HttpError::new(StatusCode::BAD_REQUEST, codes::EMAIL_EXISTS, "could not insert user")
        .with_cause(Cause::persistence(MissingRelation))
        .into())
}

async fn crash() -> Result<&'static str, ApiError> {
    Err(ApiError::generic(MissingRelation))
}

async fn bad_grant() -> Result<&'static str, ApiError> {
    Err(ApiError::oauth("invalid_grant", "Unauthorized: refresh token revoked"))
}

async fn rate_limited() -> impl IntoResponse {
    (
        [(header::RETRY_AFTER, "30")],
        ApiError::too_many_requests(codes::OVER_REQUEST_RATE_LIMIT, "slow down"),
    )
}

/// Stands in for an auth layer: trusts a test header as the user's language.
async fn fake_auth(mut req: Request, next: Next) -> Response {
    if let Some(lang) = req.headers().get("x-test-user-language").and_then(|v| v.to_str().ok()) {
        let claims = Claims(json!({ "user_metadata": { "user_language": lang } }));
        req.extensions_mut().insert(claims);
    }
    next.run(req).await
}

fn auth_api(_config: Arc<ServiceConfig>) -> Router {
    Router::new()
        .route("/signup", get(weak_password))
        .route("/users", get(email_taken))
        .route("/crash", get(crash))
        .route("/token", get(bad_grant))
        .route("/otp", get(rate_limited))
        .layer(middleware::from_fn(claims_locale_layer))
        .layer(middleware::from_fn(fake_auth))
}

async fn json_body(res: reqwest::Response) -> Value {
    res.json().await.unwrap()
}

#[tokio::test]
async fn legacy_validation_error() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client().get(server.url("/signup")).send().await.unwrap();
    assert_eq!(res.status(), 422);
    assert_eq!(res.headers()["x-error-code"], "weak_password");
    assert!(res.headers().get("x-api-version").is_none());
    assert_eq!(
        json_body(res).await,
        json!({
            "code": 422,
            "error_code": "weak_password",
            "msg": "Password does not meet security requirements",
        })
    );

    server.stop().await;
}

#[tokio::test]
async fn versioned_validation_error_in_chinese() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client()
        .get(server.url("/signup?lang=zh"))
        .header("x-api-version", "2024-06-01")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
    assert!(res.headers().get("x-error-code").is_none());
    assert_eq!(res.headers()["x-api-version"], "2024-01-01");
    assert_eq!(
        json_body(res).await,
        json!({ "code": "weak_password", "message": "密码不符合安全要求" })
    );

    server.stop().await;
}

#[tokio::test]
async fn accept_language_negotiation() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client()
        .get(server.url("/signup"))
        .header("accept-language", "fr-FR;q=1.0, zh-CN;q=0.8, en;q=0.5")
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(res).await["msg"], "密码不符合安全要求");

    server.stop().await;
}

#[tokio::test]
async fn unsupported_explicit_language_uses_default() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client()
        .get(server.url("/signup?lang=fr"))
        .header("accept-language", "zh")
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(res).await["msg"], "Password does not meet security requirements");

    server.stop().await;
}

#[tokio::test]
async fn claims_language_applies_after_authentication() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client()
        .get(server.url("/signup"))
        .header("accept-language", "en")
        .header("x-test-user-language", "zh")
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(res).await["msg"], "密码不符合安全要求");

    server.stop().await;
}

#[tokio::test]
async fn malformed_version_falls_back_to_legacy() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client()
        .get(server.url("/signup"))
        .header("x-api-version", "next-tuesday")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
    assert!(res.headers().get("x-api-version").is_none());
    assert_eq!(json_body(res).await["code"], 422);

    server.stop().await;
}

#[tokio::test]
async fn legacy_persistence_error_is_sanitized() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client()
        .get(server.url("/users"))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.headers()["x-request-id"], "trace-42");

    let text = res.text().await.unwrap();
    assert!(!text.contains("auth.users"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error_code"], "unexpected_failure");
    assert_eq!(body["msg"], "Internal server error");
    assert_eq!(body["error_id"], "trace-42");

    server.stop().await;
}

#[tokio::test]
async fn versioned_domain_error_keeps_its_status() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client()
        .get(server.url("/users"))
        .header("x-api-version", "2024-01-01")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["x-error-code"], "email_exists");
    assert_eq!(json_body(res).await["code"], "email_exists");

    server.stop().await;
}

#[tokio::test]
async fn generic_error_carries_generated_request_id() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client().get(server.url("/crash")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();

    let text = res.text().await.unwrap();
    assert!(!text.contains("auth.users"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error_code"], "unexpected_failure");
    assert_eq!(body["error_id"], request_id.as_str());

    server.stop().await;
}

#[tokio::test]
async fn oauth_shape_is_version_independent() {
    let server = common::spawn_server(common::test_config(), auth_api).await;
    let client = common::client();

    for version in ["", "2024-01-01"] {
        let res = client
            .get(server.url("/token"))
            .header("x-api-version", version)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400);
        assert_eq!(
            json_body(res).await,
            json!({ "error": "invalid_grant", "error_description": "Unauthorized" })
        );
    }

    server.stop().await;
}

#[tokio::test]
async fn rate_limit_error_is_not_a_server_error() {
    let server = common::spawn_server(common::test_config(), auth_api).await;

    let res = common::client().get(server.url("/otp")).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(res.headers()["retry-after"], "30");
    assert_eq!(res.headers()["content-type"], "application/json");
    let body = json_body(res).await;
    assert_eq!(body["error_code"], "over_request_rate_limit");
    assert!(body.get("error_id").is_none());

    server.stop().await;
}

#[tokio::test]
async fn builtin_handler_serves_health_and_not_found() {
    let server = common::spawn_server(common::test_config(), builtin::router).await;
    let client = common::client();

    let res = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(json_body(res).await["status"], "ok");

    let res = client
        .get(server.url("/missing"))
        .header("x-api-version", "2024-01-01")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(json_body(res).await["code"], "not_found");

    server.stop().await;
}
