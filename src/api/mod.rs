//! Error-response protocol shared by every handler.
//!
//! # Data Flow
//! ```text
//! handler returns Err(ApiError)
//!     → error.rs (ApiError::into_response parks the error in response extensions)
//!     → middleware.rs (error_protocol picks it up on the way out)
//!     → version.rs (negotiate x-api-version → legacy or versioned wire format)
//!     → responder.rs (status, headers, localized JSON body, logging)
//! ```
//!
//! # Design Decisions
//! - ApiError is a closed enum; dispatch is an exhaustive match
//! - The wire format depends only on the negotiated version
//! - Raw internal error text never reaches a response body

pub mod codes;
pub mod error;
pub mod middleware;
pub mod responder;
pub mod version;

pub use error::{ApiError, Cause, HttpError, OAuthError, SharedError, ValidationError};
pub use middleware::error_protocol;
pub use responder::{ErrorContext, ErrorResponder, ERROR_CODE_HEADER};
pub use version::{ApiVersion, API_VERSION_HEADER};
