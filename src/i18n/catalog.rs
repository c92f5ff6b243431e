//! Static message catalog.
//!
//! # Lookup Order
//! ```text
//! lookup(locale, key):
//!     locale table → `en` table → the key itself
//!
//! friendly_lookup(locale, code, raw):
//!     code as key → ordered substring rules over `raw` → `unknown_error`
//! ```
//!
//! `friendly_lookup` never returns the raw message, so internal error text
//! cannot leak through it.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::i18n::Locale;

/// Catalog keys referenced by this crate.
pub mod keys {
    pub const WEAK_PASSWORD: &str = "weak_password";
    pub const UNEXPECTED_FAILURE: &str = "unexpected_failure";
    pub const UNKNOWN_ERROR: &str = "unknown_error";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const BAD_JSON: &str = "bad_json";
    pub const INTERNAL_SERVER_ERROR: &str = "internal_server_error";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const TOO_MANY_REQUESTS: &str = "too_many_requests";
    pub const CONFLICT: &str = "conflict";
    pub const DUPLICATE_EMAIL: &str = "duplicate_email";
    pub const DUPLICATE_PHONE: &str = "duplicate_phone";
    pub const CAPTCHA_FAILED: &str = "captcha_failed";
}

const EN: &[(&str, &str)] = &[
    ("weak_password", "Password does not meet security requirements"),
    ("unexpected_failure", "Unexpected failure, please check server logs for more information"),
    ("unknown_error", "Unknown error occurred"),
    ("validation_failed", "Validation failed"),
    ("bad_json", "Could not parse request body as JSON"),
    ("internal_server_error", "Internal server error"),
    ("unauthorized", "Unauthorized"),
    ("forbidden", "Forbidden"),
    ("not_found", "Not found"),
    ("too_many_requests", "Too many requests"),
    ("conflict", "Conflict"),
    ("unprocessable_entity", "Unprocessable entity"),
    ("bad_request", "Bad request"),
    ("duplicate_email", "A user with this email address has already been registered"),
    ("duplicate_phone", "A user with this phone number has already been registered"),
    ("captcha_failed", "Captcha verification failed"),
    ("email_not_confirmed", "Email not confirmed"),
    ("phone_not_confirmed", "Phone not confirmed"),
    ("mfa_verification_failed", "MFA verification failed"),
    ("insufficient_aal", "Insufficient authentication assurance level"),
];

const ZH: &[(&str, &str)] = &[
    ("weak_password", "密码不符合安全要求"),
    ("unexpected_failure", "意外错误，请检查服务器日志以获取更多信息"),
    ("unknown_error", "发生未知错误"),
    ("validation_failed", "验证失败"),
    ("bad_json", "无法解析请求体为JSON格式"),
    ("internal_server_error", "内部服务器错误"),
    ("unauthorized", "未授权"),
    ("forbidden", "禁止访问"),
    ("not_found", "未找到"),
    ("too_many_requests", "请求过于频繁"),
    ("conflict", "冲突"),
    ("unprocessable_entity", "无法处理的实体"),
    ("bad_request", "错误的请求"),
    ("duplicate_email", "该邮箱地址已被注册"),
    ("duplicate_phone", "该手机号码已被注册"),
    ("captcha_failed", "验证码验证失败"),
    ("email_not_confirmed", "邮箱未确认"),
    ("phone_not_confirmed", "手机号未确认"),
    ("mfa_verification_failed", "多因子认证验证失败"),
    ("insufficient_aal", "认证保证级别不足"),
];

type Table = HashMap<&'static str, &'static str>;

static CATALOG: LazyLock<HashMap<Locale, Table>> = LazyLock::new(|| {
    Locale::ALL
        .iter()
        .map(|&locale| {
            let entries = match locale {
                Locale::En => EN,
                Locale::Zh => ZH,
            };
            (locale, entries.iter().copied().collect())
        })
        .collect()
});

/// How a rule inspects the lowercased raw message.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Every needle must appear.
    All(&'static [&'static str]),
    /// At least one needle must appear.
    Any(&'static [&'static str]),
}

impl Pattern {
    fn matches(&self, haystack: &str) -> bool {
        match self {
            Pattern::All(needles) => needles.iter().all(|n| haystack.contains(n)),
            Pattern::Any(needles) => needles.iter().any(|n| haystack.contains(n)),
        }
    }
}

/// Ordered; the first matching rule wins.
const FRIENDLY_RULES: &[(Pattern, &str)] = &[
    (Pattern::All(&["weak password"]), keys::WEAK_PASSWORD),
    (Pattern::All(&["duplicate", "email"]), keys::DUPLICATE_EMAIL),
    (Pattern::All(&["duplicate", "phone"]), keys::DUPLICATE_PHONE),
    (Pattern::All(&["captcha"]), keys::CAPTCHA_FAILED),
    (Pattern::All(&["validation"]), keys::VALIDATION_FAILED),
    (Pattern::All(&["json"]), keys::BAD_JSON),
    (Pattern::All(&["unauthorized"]), keys::UNAUTHORIZED),
    (Pattern::All(&["forbidden"]), keys::FORBIDDEN),
    (Pattern::All(&["not found"]), keys::NOT_FOUND),
    (Pattern::All(&["too many"]), keys::TOO_MANY_REQUESTS),
    (Pattern::All(&["conflict"]), keys::CONFLICT),
    (
        Pattern::Any(&["internal", "server error", "database", "sql", "pq:"]),
        keys::INTERNAL_SERVER_ERROR,
    ),
];

/// Look `key` up in `locale`, falling back to the default locale.
pub fn try_lookup(locale: Locale, key: &str) -> Option<&'static str> {
    let in_table = |l: Locale| CATALOG.get(&l).and_then(|table| table.get(key)).copied();

    in_table(locale).or_else(|| {
        if locale == Locale::DEFAULT {
            None
        } else {
            in_table(Locale::DEFAULT)
        }
    })
}

/// Localized text for `key`, or the key itself when no locale defines it.
pub fn lookup<'a>(locale: Locale, key: &'a str) -> &'a str {
    try_lookup(locale, key).unwrap_or(key)
}

/// Client-safe localized text for an error.
///
/// Tries `code` as a catalog key first, then classifies `raw` with the
/// substring rules. Falls back to the generic unknown-error text.
pub fn friendly_lookup(locale: Locale, code: &str, raw: &str) -> &'static str {
    if !code.is_empty() {
        if let Some(text) = try_lookup(locale, code) {
            return text;
        }
    }

    let raw = raw.to_lowercase();
    let key = FRIENDLY_RULES
        .iter()
        .find(|(pattern, _)| pattern.matches(&raw))
        .map(|(_, key)| *key)
        .unwrap_or(keys::UNKNOWN_ERROR);

    lookup(locale, key)
}
