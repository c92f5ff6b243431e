//! Configuration file watcher for hot reload.
//!
//! # Design Decisions
//! - The parent directory is watched, not the file, so atomic renames and
//!   symlink swaps (e.g. a mounted ConfigMap) keep producing events
//! - Events are debounced on a dedicated thread; one burst yields one read
//! - Empty content is treated as a write in progress and skipped, as is
//!   content identical to the last published snapshot

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::ServiceConfig;

/// Quiet period that ends a burst of file events.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// One notification from the watcher.
///
/// `Ok` carries a validated snapshot. `Err` means the watcher itself failed;
/// no further updates should be expected after it.
pub type ConfigUpdate = Result<ServiceConfig, ConfigError>;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ConfigUpdate>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ConfigUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// Updates stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, ConfigError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, event_rx) = std_mpsc::channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = event_tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let reloader = Reloader {
            last: std::fs::read_to_string(&self.path).ok(),
            path: self.path.clone(),
            update_tx: self.update_tx,
        };
        thread::Builder::new()
            .name("config-watcher".into())
            .spawn(move || reloader.run(event_rx))
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Turns bursts of directory events into validated snapshots.
struct Reloader {
    path: PathBuf,
    last: Option<String>,
    update_tx: mpsc::UnboundedSender<ConfigUpdate>,
}

impl Reloader {
    /// Runs until the notify watcher, and with it the event sender, is dropped.
    fn run(mut self, events: std_mpsc::Receiver<notify::Result<Event>>) {
        while let Ok(res) = events.recv() {
            if !self.relevant(res) {
                continue;
            }

            // Drain the rest of the burst.
            loop {
                match events.recv_timeout(DEBOUNCE) {
                    Ok(res) => {
                        self.relevant(res);
                    }
                    Err(std_mpsc::RecvTimeoutError::Timeout) => break,
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => return,
                }
            }

            self.reload();
        }
        tracing::debug!(path = ?self.path, "Config watcher stopped");
    }

    /// Whether an event should trigger a reload. Watch errors are forwarded.
    fn relevant(&self, res: notify::Result<Event>) -> bool {
        match res {
            Ok(event) => !event.kind.is_access(),
            Err(e) => {
                let _ = self.update_tx.send(Err(ConfigError::Watch(e)));
                false
            }
        }
    }

    fn reload(&mut self) {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = ?self.path, error = %e, "Config file not readable, waiting for next change");
                return;
            }
        };

        if content.trim().is_empty() {
            tracing::debug!(path = ?self.path, "Config file is empty, waiting for next change");
            return;
        }
        if self.last.as_deref() == Some(content.as_str()) {
            return;
        }

        tracing::info!(path = ?self.path, "Config file change detected, reloading");
        match parse_config(&content) {
            Ok(new_config) => {
                self.last = Some(content);
                let _ = self.update_tx.send(Ok(new_config));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_snapshot(updates: &mut mpsc::UnboundedReceiver<ConfigUpdate>) -> ServiceConfig {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match updates.recv().await {
                    Some(Ok(config)) => return config,
                    Some(Err(e)) => panic!("watcher failed: {e}"),
                    None => panic!("watcher channel closed"),
                }
            }
        })
        .await
        .expect("update delivered")
    }

    fn write_atomically(path: &Path, content: &str) {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content).unwrap();
        std::fs::rename(&tmp, path).unwrap();
    }

    #[tokio::test]
    async fn rewritten_file_produces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        std::fs::write(&path, "[timeouts]\nshutdown_grace_secs = 30\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, "[timeouts]\nshutdown_grace_secs = 7\n").unwrap();

        let update = next_snapshot(&mut updates).await;
        assert_eq!(update.timeouts.shutdown_grace_secs, 7);
    }

    #[tokio::test]
    async fn empty_write_does_not_publish_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        std::fs::write(&path, "[timeouts]\nshutdown_grace_secs = 30\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, "").unwrap();
        tokio::time::sleep(DEBOUNCE * 3).await;
        std::fs::write(&path, "[timeouts]\nshutdown_grace_secs = 9\n").unwrap();

        let update = next_snapshot(&mut updates).await;
        assert_eq!(update.timeouts.shutdown_grace_secs, 9);
    }

    #[tokio::test]
    async fn rapid_rewrites_settle_on_final_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        std::fs::write(&path, "[timeouts]\nshutdown_grace_secs = 30\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        for grace in 1..=50 {
            std::fs::write(&path, format!("[timeouts]\nshutdown_grace_secs = {grace}\n")).unwrap();
        }

        let mut last = next_snapshot(&mut updates).await;
        tokio::time::sleep(DEBOUNCE * 5).await;
        while let Ok(update) = updates.try_recv() {
            last = update.unwrap();
        }
        assert_eq!(last.timeouts.shutdown_grace_secs, 50);
    }

    #[tokio::test]
    async fn unchanged_content_is_not_republished() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        let original = "[timeouts]\nshutdown_grace_secs = 30\n";
        std::fs::write(&path, original).unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, original).unwrap();
        tokio::time::sleep(DEBOUNCE * 3).await;
        std::fs::write(&path, "[timeouts]\nshutdown_grace_secs = 4\n").unwrap();

        let update = next_snapshot(&mut updates).await;
        assert_eq!(update.timeouts.shutdown_grace_secs, 4);
    }

    #[tokio::test]
    async fn replaced_file_keeps_reloading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        std::fs::write(&path, "[timeouts]\nshutdown_grace_secs = 30\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        write_atomically(&path, "[timeouts]\nshutdown_grace_secs = 11\n");
        assert_eq!(next_snapshot(&mut updates).await.timeouts.shutdown_grace_secs, 11);

        write_atomically(&path, "[timeouts]\nshutdown_grace_secs = 12\n");
        assert_eq!(next_snapshot(&mut updates).await.timeouts.shutdown_grace_secs, 12);
    }

    #[test]
    fn missing_directory_cannot_be_watched() {
        let (watcher, _updates) = ConfigWatcher::new(Path::new("/definitely/not/here.toml"));
        assert!(matches!(watcher.run(), Err(ConfigError::Watch(_))));
    }
}
