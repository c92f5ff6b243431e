//! The closed set of supported locales.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user-facing language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English, the default and the catalog's source of truth.
    #[default]
    En,
    /// Chinese.
    Zh,
}

/// Error returned when a tag does not name a supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale: {0:?}")]
pub struct UnsupportedLocale(pub String);

impl Locale {
    /// Locale used when no request signal matches.
    pub const DEFAULT: Locale = Locale::En;

    /// Every supported locale.
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    /// The primary language subtag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// Normalize a language tag: trim, case-fold, then prefix-match it against
    /// the supported set. Also accepts the aliases `english` and `chinese`.
    ///
    /// Returns `None` for anything outside the supported set; callers decide
    /// what the fallback is.
    pub fn normalize(tag: &str) -> Option<Locale> {
        let tag = tag.trim().to_lowercase();

        if tag.starts_with("zh") {
            return Some(Locale::Zh);
        }
        if tag.starts_with("en") {
            return Some(Locale::En);
        }

        match tag.as_str() {
            "chinese" => Some(Locale::Zh),
            "english" => Some(Locale::En),
            _ => None,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::normalize(s).ok_or_else(|| UnsupportedLocale(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_region() {
        assert_eq!(Locale::normalize("zh-CN"), Some(Locale::Zh));
        assert_eq!(Locale::normalize(" ZH-Hans "), Some(Locale::Zh));
        assert_eq!(Locale::normalize("en-GB"), Some(Locale::En));
        assert_eq!(Locale::normalize("Chinese"), Some(Locale::Zh));
    }

    #[test]
    fn normalize_rejects_unsupported() {
        assert_eq!(Locale::normalize("fr-FR"), None);
        assert_eq!(Locale::normalize(""), None);
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn default_is_english() {
        assert_eq!(Locale::default(), Locale::En);
        assert_eq!(Locale::DEFAULT.to_string(), "en");
    }
}
