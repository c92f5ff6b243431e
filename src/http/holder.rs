//! Hot-swappable request handler.
//!
//! # Responsibilities
//! - Hold the handler built from the current configuration snapshot
//! - Swap it atomically when a new snapshot arrives
//!
//! # Design Decisions
//! - `ArcSwap` gives lock-free, wait-free reads; a reader never sees a
//!   partially built handler
//! - Readers take their own `Arc`, so a request keeps the handler it started
//!   with even if a swap happens mid-flight
//! - A superseded handler is dropped when its last in-flight request finishes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::Router;

use crate::config::ServiceConfig;

/// Builds an immutable request handler from a configuration snapshot.
///
/// Implementations must not touch process-wide state.
pub trait HandlerFactory: Send + Sync + 'static {
    fn build(&self, config: Arc<ServiceConfig>) -> Router;
}

impl<F> HandlerFactory for F
where
    F: Fn(Arc<ServiceConfig>) -> Router + Send + Sync + 'static,
{
    fn build(&self, config: Arc<ServiceConfig>) -> Router {
        self(config)
    }
}

/// Holds exactly one handler; single writer, many readers.
pub struct HandlerHolder {
    current: ArcSwap<Router>,
    generation: AtomicU64,
}

impl HandlerHolder {
    pub fn new(handler: Router) -> Self {
        Self {
            current: ArcSwap::from_pointee(handler),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the handler. Visible to every `current()` call that starts afterwards.
    pub fn store(&self, handler: Router) -> u64 {
        self.current.store(Arc::new(handler));
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The handler to dispatch the next request to.
    pub fn current(&self) -> Arc<Router> {
        self.current.load_full()
    }

    /// Number of swaps since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for HandlerHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerHolder")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
