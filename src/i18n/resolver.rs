//! Per-request locale resolution.
//!
//! # Precedence (first match wins)
//! 1. `lang` query parameter
//! 2. `X-Language` header
//! 3. `user_language` from authenticated [`Claims`] (user metadata, then app metadata)
//! 4. `Accept-Language`, by descending quality
//! 5. [`Locale::DEFAULT`]
//!
//! A query parameter or header that names an unsupported language still
//! ends resolution, with [`Locale::DEFAULT`]. Unsupported claims fall through
//! to `Accept-Language`. Resolution never fails.

use axum::extract::Query;
use axum::http::{header, Extensions, HeaderMap, Uri};
use serde::Deserialize;

use crate::i18n::Locale;

/// Query parameter carrying an explicit language override.
pub const LANG_QUERY_PARAM: &str = "lang";

/// Header carrying an explicit language override.
pub const LANGUAGE_HEADER: &str = "x-language";

/// Token claims placed in request extensions by an upstream auth layer.
#[derive(Debug, Clone, Default)]
pub struct Claims(pub serde_json::Value);

#[derive(Debug, Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// One entry of an `Accept-Language` list.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRange {
    pub tag: String,
    pub quality: f32,
}

/// Resolve the locale for a request from its URI, headers, and extensions.
pub fn resolve(uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Locale {
    if let Some(lang) = query_lang(uri) {
        return Locale::normalize(&lang).unwrap_or(Locale::DEFAULT);
    }

    if let Some(lang) = header_str(headers, LANGUAGE_HEADER) {
        return Locale::normalize(lang).unwrap_or(Locale::DEFAULT);
    }

    if let Some(locale) = extensions.get::<Claims>().and_then(locale_from_claims) {
        return locale;
    }

    if let Some(locale) =
        header_str(headers, header::ACCEPT_LANGUAGE.as_str()).and_then(negotiate_accept_language)
    {
        return locale;
    }

    Locale::DEFAULT
}

fn query_lang(uri: &Uri) -> Option<String> {
    Query::<LangQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.lang)
        .filter(|lang| !lang.trim().is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

/// Read `user_language` from user metadata, falling back to app metadata.
pub fn locale_from_claims(claims: &Claims) -> Option<Locale> {
    ["user_metadata", "app_metadata"].iter().find_map(|section| {
        claims
            .0
            .get(section)
            .and_then(|meta| meta.get("user_language"))
            .and_then(|lang| lang.as_str())
            .and_then(Locale::normalize)
    })
}

/// Parse an `Accept-Language` value into ranges ordered by descending
/// quality. Entries with equal quality keep their original order.
///
/// A missing or unparseable `q` counts as 1.0. Finite values are clamped to
/// `[0, 1]`; `NaN` and infinities count as 0.
pub fn parse_accept_language(value: &str) -> Vec<LanguageRange> {
    let mut ranges: Vec<LanguageRange> = value
        .split(',')
        .filter_map(|part| {
            let mut params = part.split(';');
            let tag = params.next()?.trim();
            if tag.is_empty() {
                return None;
            }

            let quality = params
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .map(|q| if q.is_finite() { q.clamp(0.0, 1.0) } else { 0.0 })
                .unwrap_or(1.0);

            Some(LanguageRange {
                tag: tag.to_string(),
                quality,
            })
        })
        .collect();

    // sort_by is stable, so ties keep list order
    ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    ranges
}

/// Pick the first supported locale from an `Accept-Language` value.
pub fn negotiate_accept_language(value: &str) -> Option<Locale> {
    parse_accept_language(value).into_iter().find_map(|range| {
        // Step 1: normalize the tag against the supported set.
        let locale = Locale::normalize(&range.tag)?;

        // Step 2: only accept it if the original tag really carries that prefix.
        range
            .tag
            .to_lowercase()
            .starts_with(locale.as_str())
            .then_some(locale)
    })
}
