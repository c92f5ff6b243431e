//! Hot-reloadable HTTP front end with a versioned, localized error protocol.

pub mod api;
pub mod config;
pub mod http;
pub mod i18n;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use api::{ApiError, ApiVersion};
pub use config::ServiceConfig;
pub use http::{HandlerFactory, Server};
pub use i18n::Locale;
pub use lifecycle::{DrainOutcome, ServerState, Shutdown};
