//! Locale detection middleware and extractor.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::i18n::{resolver, Claims, Locale};

/// Resolve the request's locale once and store it in the request extensions.
pub async fn locale_layer(mut req: Request, next: Next) -> Response {
    let locale = resolver::resolve(req.uri(), req.headers(), req.extensions());
    tracing::trace!(locale = %locale, "Resolved request locale");
    req.extensions_mut().insert(locale);
    next.run(req).await
}

/// Re-resolve the locale once an auth layer has placed [`Claims`] in the request.
///
/// Apply inside the layer that authenticates. The refined locale replaces the
/// one in the request extensions and is copied onto the response, where the
/// error protocol prefers it over the locale resolved before authentication.
pub async fn claims_locale_layer(mut req: Request, next: Next) -> Response {
    if req.extensions().get::<Claims>().is_none() {
        return next.run(req).await;
    }

    let locale = resolver::resolve(req.uri(), req.headers(), req.extensions());
    req.extensions_mut().insert(locale);

    let mut response = next.run(req).await;
    response.extensions_mut().insert(locale);
    response
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match parts.extensions.get::<Locale>() {
            Some(locale) => *locale,
            None => resolver::resolve(&parts.uri, &parts.headers, &parts.extensions),
        })
    }
}
