//! Listener lifecycle state.

use std::fmt;

/// Lifecycle state of a [`SecureListener`](crate::infrastructure::SecureListener).
///
/// ```text
/// Stopped ──start──▶ Starting ──bound──▶ Running ──stop──▶ Stopped
///                       │
///                       └──any failure──▶ Stopped
/// ```
///
/// Only the listener mutates its state; everything else observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    #[default]
    Stopped,
    Starting,
    Running,
}

impl ServerState {
    pub fn is_running(self) -> bool {
        self == ServerState::Running
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_stopped() {
        assert_eq!(ServerState::default(), ServerState::Stopped);
    }

    #[test]
    fn test_only_running_reports_running() {
        assert!(ServerState::Running.is_running());
        assert!(!ServerState::Starting.is_running());
        assert!(!ServerState::Stopped.is_running());
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(ServerState::Starting.to_string(), "starting");
    }
}
