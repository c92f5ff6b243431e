//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper-util connection, HTTP/1.1 + HTTP/2)
//!     → holder.rs (current handler, swapped on reload)
//!     → request.rs (request id) → tracing → locale → error protocol
//!     → handler built by a HandlerFactory (builtin.rs by default)
//!     → response.rs (JSON bodies)
//!     → Send to client
//! ```

pub mod builtin;
pub mod holder;
pub mod request;
pub mod response;
pub mod server;

pub use holder::{HandlerFactory, HandlerHolder};
pub use request::X_REQUEST_ID;
pub use server::{build_handler, Server, ServerError};
