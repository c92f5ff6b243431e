//! Stable machine-readable error codes.
//!
//! Codes that double as catalog keys get a localized message directly; the
//! rest are localized through the substring rules in `i18n::catalog`.

pub const UNEXPECTED_FAILURE: &str = "unexpected_failure";
pub const UNKNOWN: &str = "unknown";
pub const VALIDATION_FAILED: &str = "validation_failed";
pub const BAD_JSON: &str = "bad_json";
pub const WEAK_PASSWORD: &str = "weak_password";
pub const EMAIL_EXISTS: &str = "email_exists";
pub const PHONE_EXISTS: &str = "phone_exists";
pub const CAPTCHA_FAILED: &str = "captcha_failed";
pub const EMAIL_NOT_CONFIRMED: &str = "email_not_confirmed";
pub const PHONE_NOT_CONFIRMED: &str = "phone_not_confirmed";
pub const MFA_VERIFICATION_FAILED: &str = "mfa_verification_failed";
pub const INSUFFICIENT_AAL: &str = "insufficient_aal";
pub const OVER_REQUEST_RATE_LIMIT: &str = "over_request_rate_limit";
pub const NOT_FOUND: &str = "not_found";
