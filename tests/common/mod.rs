//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use auth_frontend::config::{ConfigUpdate, ServiceConfig};
use auth_frontend::http::{HandlerFactory, Server, ServerError};
use auth_frontend::lifecycle::{DrainOutcome, ServerState, Shutdown};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A server running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<ConfigUpdate>,
    pub state: watch::Receiver<ServerState>,
    pub handle: JoinHandle<Result<DrainOutcome, ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for `run` to return.
    pub async fn stop(self) -> DrainOutcome {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server stopped in time")
            .expect("server task panicked")
            .expect("server returned an error")
    }
}

/// Loopback config with an ephemeral port.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.reuse_port = false;
    config
}

pub async fn spawn_server(config: ServiceConfig, factory: impl HandlerFactory) -> TestServer {
    let server = Server::new(config, factory);
    let listener = server.bind().expect("bind loopback");
    let addr = listener.local_addr().unwrap();
    let mut state = server.state();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, config_updates, server_shutdown).await });

    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == ServerState::Serving))
        .await
        .expect("server started")
        .expect("state channel open");

    TestServer {
        addr,
        shutdown,
        updates,
        state,
        handle,
    }
}

/// A client that never reuses connections, so every request sees the current handler.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
