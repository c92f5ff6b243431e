//! Localization subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → resolver.rs (query `lang` → X-Language → claims → Accept-Language → default)
//!     → middleware.rs (store Locale in request extensions; refine it after auth)
//!     → handlers / error responder read the Locale
//!     → catalog.rs (locale text → `en` text → raw key)
//! ```
//!
//! # Design Decisions
//! - The supported set is closed: every request resolves to exactly one `Locale`
//! - `en` is the source of truth; other locales may omit keys
//! - The catalog is immutable static data, built once on first use

pub mod catalog;
pub mod locale;
pub mod middleware;
pub mod resolver;

pub use catalog::{friendly_lookup, lookup};
pub use locale::Locale;
pub use middleware::{claims_locale_layer, locale_layer};
pub use resolver::Claims;
