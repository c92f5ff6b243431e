//! Middleware that renders parked [`ApiError`]s with the request's
//! negotiated version and locale.

use axum::{
    extract::Request,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};

use crate::api::responder::{ErrorContext, ErrorResponder};
use crate::api::{version, ApiError, API_VERSION_HEADER, ERROR_CODE_HEADER};
use crate::http::request::X_REQUEST_ID;
use crate::i18n::{resolver, Locale};

/// Re-render any error a handler returned, using values taken from the request.
///
/// Version negotiation only runs when there is an error to render. A
/// [`Locale`] found on the response overrides the one resolved on the way in.
/// Headers set by the handler or inner layers survive re-rendering.
pub async fn error_protocol(req: Request, next: Next) -> Response {
    let version_token = header_string(&req, API_VERSION_HEADER);
    let request_id = header_string(&req, X_REQUEST_ID.as_str());
    let locale = match req.extensions().get::<Locale>() {
        Some(locale) => *locale,
        None => resolver::resolve(req.uri(), req.headers(), req.extensions()),
    };

    let mut response = next.run(req).await;

    let Some(err) = response.extensions_mut().remove::<ApiError>() else {
        return response;
    };
    // Set by `claims_locale_layer` when authentication refined the locale.
    let locale = response.extensions().get::<Locale>().copied().unwrap_or(locale);

    let negotiated = version::negotiate(version_token.as_deref());
    if let Some(e) = &negotiated.error {
        tracing::warn!(
            error = %e,
            "Invalid version passed to {} header, defaulting to initial version",
            API_VERSION_HEADER
        );
    }

    let ctx = ErrorContext {
        version: negotiated.version,
        locale,
        request_id,
    };
    let mut rendered = ErrorResponder::render(err, &ctx);
    carry_headers(response.headers(), rendered.headers_mut());
    rendered
}

/// Copy headers the renderer does not own. Values it already set win.
fn carry_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in from.keys() {
        if *name == CONTENT_TYPE
            || *name == CONTENT_LENGTH
            || *name == ERROR_CODE_HEADER
            || to.contains_key(name)
        {
            continue;
        }
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

fn header_string(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
