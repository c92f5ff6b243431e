//! API version negotiation.
//!
//! Clients send a date-formatted token (`YYYY-MM-DD`) in [`API_VERSION_HEADER`].
//! The token resolves to the newest known version that does not exceed it,
//! so any date on or after a release selects that release.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// Header carrying the requested (and echoed) API version.
pub const API_VERSION_HEADER: &str = "x-api-version";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A date-ordered API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion(NaiveDate);

/// Error returned for tokens that are not a valid version.
#[derive(Debug, Error)]
#[error("invalid API version {token:?}, expected YYYY-MM-DD")]
pub struct VersionError {
    pub token: String,
    #[source]
    source: chrono::ParseError,
}

/// Outcome of negotiating one request's version token.
#[derive(Debug)]
pub struct Negotiated {
    /// Version to serve.
    pub version: ApiVersion,
    /// Set when the token was malformed; `version` is then the initial one.
    pub error: Option<VersionError>,
}

const fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(d) => d,
        None => panic!("invalid version date"),
    }
}

impl ApiVersion {
    /// Behaviour before any dated version existed.
    pub const INITIAL: ApiVersion = ApiVersion(NaiveDate::MIN);

    /// First version with the `{code, message}` error shape.
    pub const V2024_01_01: ApiVersion = ApiVersion(date(2024, 1, 1));

    /// Versions this server implements, oldest first.
    pub const KNOWN: [ApiVersion; 2] = [ApiVersion::INITIAL, ApiVersion::V2024_01_01];

    /// Versions at or after this one get the versioned error shape.
    pub const VERSIONED_ERRORS: ApiVersion = ApiVersion::V2024_01_01;

    /// Parse a token. `initial` names the initial version.
    pub fn parse(token: &str) -> Result<Self, VersionError> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("initial") {
            return Ok(ApiVersion::INITIAL);
        }

        NaiveDate::parse_from_str(token, DATE_FORMAT)
            .map(ApiVersion)
            .map_err(|source| VersionError {
                token: token.to_string(),
                source,
            })
    }

    /// The newest known version not after `requested`.
    pub fn closest(requested: ApiVersion) -> ApiVersion {
        ApiVersion::KNOWN
            .iter()
            .rev()
            .find(|known| **known <= requested)
            .copied()
            .unwrap_or(ApiVersion::INITIAL)
    }

    pub fn is_initial(&self) -> bool {
        *self == ApiVersion::INITIAL
    }

    /// Whether errors for this version use the versioned wire format.
    pub fn uses_versioned_errors(&self) -> bool {
        *self >= ApiVersion::VERSIONED_ERRORS
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        ApiVersion::INITIAL
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial() {
            f.write_str("initial")
        } else {
            write!(f, "{}", self.0.format(DATE_FORMAT))
        }
    }
}

/// Resolve a raw header value to the version to serve.
///
/// Missing or blank tokens select the initial version without error.
pub fn negotiate(token: Option<&str>) -> Negotiated {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        None => Negotiated {
            version: ApiVersion::INITIAL,
            error: None,
        },
        Some(token) => match ApiVersion::parse(token) {
            Ok(requested) => Negotiated {
                version: ApiVersion::closest(requested),
                error: None,
            },
            Err(e) => Negotiated {
                version: ApiVersion::INITIAL,
                error: Some(e),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let n = negotiate(Some("2024-01-01"));
        assert_eq!(n.version, ApiVersion::V2024_01_01);
        assert!(n.error.is_none());
    }

    #[test]
    fn picks_closest_not_exceeding() {
        assert_eq!(negotiate(Some("2023-12-31")).version, ApiVersion::INITIAL);
        assert_eq!(negotiate(Some("2025-06-30")).version, ApiVersion::V2024_01_01);
    }

    #[test]
    fn closest_is_monotonic() {
        let dates = ["2000-01-01", "2023-12-31", "2024-01-01", "2024-01-02", "2099-12-31"];
        let resolved: Vec<_> = dates
            .iter()
            .map(|d| ApiVersion::closest(ApiVersion::parse(d).unwrap()))
            .collect();
        assert!(resolved.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn malformed_reports_error_and_uses_initial() {
        let n = negotiate(Some("2024-13-45"));
        assert_eq!(n.version, ApiVersion::INITIAL);
        let err = n.error.expect("parse error reported");
        assert_eq!(err.token, "2024-13-45");
    }

    #[test]
    fn empty_is_initial_without_error() {
        for token in [None, Some(""), Some("   ")] {
            let n = negotiate(token);
            assert!(n.version.is_initial());
            assert!(n.error.is_none());
        }
    }

    #[test]
    fn display_round_trips_dated_versions() {
        assert_eq!(ApiVersion::V2024_01_01.to_string(), "2024-01-01");
        assert_eq!(ApiVersion::parse("initial").unwrap(), ApiVersion::INITIAL);
    }

    #[test]
    fn threshold_selects_wire_format() {
        assert!(!ApiVersion::INITIAL.uses_versioned_errors());
        assert!(ApiVersion::V2024_01_01.uses_versioned_errors());
    }
}
