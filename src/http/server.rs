//! HTTP server lifecycle.
//!
//! # Responsibilities
//! - Accept connections and serve HTTP/1.1 and HTTP/2 on each
//! - Dispatch every request to the handler currently held by [`HandlerHolder`]
//! - Rebuild and swap the handler when a new configuration snapshot arrives
//! - Drain in-flight requests on shutdown, within a grace period
//!
//! # Data Flow
//! ```text
//! Listener::accept ─▶ connection task ─▶ holder.current() ─▶ Router (per request)
//!
//! ConfigUpdate ─▶ reload task ─▶ HandlerFactory::build ─▶ holder.store()
//!
//! shutdown ─▶ drop listener ─▶ connections finish ─▶ Stopped
//!                               └─ grace elapsed ─▶ abort remaining
//! ```
//!
//! # Design Decisions
//! - hyper-util's connection builder instead of `axum::serve`: we need the
//!   header-read timeout, a per-request handler lookup, and a drain deadline
//! - The protocol layers (request id, tracing, locale, error rendering)
//!   wrap every factory-built router, so business handlers only return
//!   `ApiError`
//! - Listener and header-read settings are fixed at startup; a reload only
//!   rebuilds the handler

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use hyper::{body::Incoming, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto::Builder,
};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::api::error_protocol;
use crate::config::{ConfigUpdate, ServiceConfig};
use crate::http::holder::{HandlerFactory, HandlerHolder};
use crate::http::request::with_request_id;
use crate::i18n::locale_layer;
use crate::lifecycle::{DrainOutcome, ServerState};
use crate::net::{ConnectionGuard, ConnectionTracker, Listener, ListenerError};
use crate::net::listener::ConnectionPermit;
use crate::observability::{metrics, spans};

/// Pause after a failed accept (e.g. out of file descriptors) before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The request-serving front end.
pub struct Server {
    config: Arc<ServiceConfig>,
    factory: Arc<dyn HandlerFactory>,
    holder: Arc<HandlerHolder>,
    state: watch::Sender<ServerState>,
    connections: ConnectionTracker,
}

impl Server {
    /// Build the initial handler from `config`. The server starts in [`ServerState::Starting`].
    pub fn new(config: ServiceConfig, factory: impl HandlerFactory) -> Self {
        let config = Arc::new(config);
        let factory: Arc<dyn HandlerFactory> = Arc::new(factory);
        let holder = Arc::new(HandlerHolder::new(build_handler(factory.as_ref(), Arc::clone(&config))));

        Self {
            config,
            factory,
            holder,
            state: watch::Sender::new(ServerState::Starting),
            connections: ConnectionTracker::new(),
        }
    }

    /// Bind the configured listener. Failure here is fatal for the process.
    pub fn bind(&self) -> Result<Listener, ListenerError> {
        Listener::bind(&self.config.listener)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub fn holder(&self) -> Arc<HandlerHolder> {
        Arc::clone(&self.holder)
    }

    /// Serve until `shutdown` fires, then drain.
    ///
    /// `config_updates` feeds the reload task; an `Err` update or a closed
    /// channel stops reloading but not serving. `shutdown` also fires when
    /// every sender is dropped.
    pub async fn run(
        self,
        listener: Listener,
        config_updates: mpsc::UnboundedReceiver<ConfigUpdate>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<DrainOutcome, ServerError> {
        let addr = listener.local_addr()?;
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);

        let mut builder = Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(Duration::from_secs(self.config.timeouts.header_read_secs));

        let reload = tokio::spawn(reload_loop(
            Arc::clone(&self.factory),
            Arc::clone(&self.holder),
            config_updates,
        ));

        self.state.send_replace(ServerState::Serving);
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            "HTTP server serving"
        );

        let mut tasks = JoinSet::new();
        let accept_result = loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break Ok(());
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = self.connections.track();
                        tracing::trace!(connection_id = %guard.id(), peer_addr = %peer, "Serving connection");
                        tasks.spawn(serve_connection(
                            builder.clone(),
                            Arc::clone(&self.holder),
                            stream,
                            guard,
                            permit,
                        ));
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                    Err(e) => break Err(e),
                },
            }
        };

        drop(listener);
        self.state.send_replace(ServerState::Draining);
        self.connections.begin_drain();
        tracing::info!(
            active_connections = self.connections.active_count(),
            grace_secs = grace.as_secs(),
            "Draining connections"
        );

        let outcome = tokio::select! {
            biased;

            _ = self.connections.wait_idle() => DrainOutcome::Completed,
            _ = tokio::time::sleep(grace) => {
                let remaining = self.connections.active_count();
                tracing::warn!(
                    remaining_connections = remaining,
                    "Grace period elapsed, closing remaining connections"
                );
                DrainOutcome::TimedOut { remaining }
            }
        };
        tasks.shutdown().await;

        reload.abort();
        self.state.send_replace(ServerState::Stopped);
        tracing::info!(outcome = ?outcome, "HTTP server stopped");

        accept_result?;
        Ok(outcome)
    }
}

/// Wrap a factory-built router with the protocol layers every handler relies on.
///
/// No per-request deadline is added; handlers own the timeouts of their
/// downstream calls.
pub fn build_handler(factory: &dyn HandlerFactory, config: Arc<ServiceConfig>) -> Router {
    let router = factory
        .build(config)
        .layer(middleware::from_fn(error_protocol))
        .layer(middleware::from_fn(locale_layer))
        .layer(TraceLayer::new_for_http().make_span_with(spans::request_span));

    with_request_id(router)
}

async fn reload_loop(
    factory: Arc<dyn HandlerFactory>,
    holder: Arc<HandlerHolder>,
    mut updates: mpsc::UnboundedReceiver<ConfigUpdate>,
) {
    while let Some(update) = updates.recv().await {
        match update {
            Ok(config) => {
                let handler = build_handler(factory.as_ref(), Arc::new(config));
                let generation = holder.store(handler);
                metrics::record_handler_reload(generation);
                tracing::info!(generation, "Handler reloaded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Configuration watcher failed, watcher is exiting");
                return;
            }
        }
    }
    tracing::debug!("Configuration update channel closed");
}

async fn serve_connection(
    builder: Builder<TokioExecutor>,
    holder: Arc<HandlerHolder>,
    stream: TcpStream,
    mut guard: ConnectionGuard,
    _permit: ConnectionPermit,
) {
    let service = hyper::service::service_fn(move |req: Request<Incoming>| {
        let handler = holder.current();
        async move { Router::clone(&handler).oneshot(req).await }
    });

    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = guard.drain_requested() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = %guard.id(), error = %e, "Connection ended with error");
    }
}
