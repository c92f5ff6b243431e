//! Observable server lifecycle state.

use std::fmt;

/// Where the server is in its lifecycle. Transitions only move forward.
///
/// ```text
/// Starting → Serving → Draining → Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServerState {
    /// Built, not yet accepting.
    Starting,
    /// Accepting connections and dispatching requests.
    Serving,
    /// No longer accepting; in-flight requests are finishing.
    Draining,
    Stopped,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Starting => "starting",
            ServerState::Serving => "serving",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How draining ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection finished within the grace period.
    Completed,
    /// The grace period elapsed and `remaining` connections were closed forcibly.
    TimedOut { remaining: u64 },
}
