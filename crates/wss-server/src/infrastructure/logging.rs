//! Tracing subscriber setup with a runtime-adjustable filter.
//!
//! The binary installs one global subscriber: `fmt` output filtered by an
//! `EnvFilter`.  The filter sits behind a `reload` layer so the console's
//! `debug` command can swap it without restarting, e.g. `debug wss_server=trace`.
//!
//! Filter precedence at startup: `RUST_LOG` if set and valid, otherwise the
//! configured level.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Errors from logging setup and filter changes.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid filter directive: {0}")]
    InvalidDirective(#[from] ParseError),

    #[error("failed to swap log filter: {0}")]
    Reload(#[from] reload::Error),

    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Handle for reading and replacing the active log filter.
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogControl {
    pub fn new(handle: reload::Handle<EnvFilter, Registry>) -> Self {
        Self { handle }
    }

    /// The active filter rendered as directives.
    ///
    /// # Errors
    ///
    /// [`LoggingError::Reload`] if the subscriber is gone.
    pub fn current(&self) -> Result<String, LoggingError> {
        Ok(self.handle.with_current(|filter| filter.to_string())?)
    }

    /// Replaces the active filter.
    ///
    /// # Errors
    ///
    /// [`LoggingError::InvalidDirective`] if `directive` does not parse; the
    /// previous filter stays active.
    pub fn set(&self, directive: &str) -> Result<(), LoggingError> {
        let filter = EnvFilter::try_new(directive)?;
        self.handle.reload(filter)?;
        tracing::info!(directive, "log filter changed");
        Ok(())
    }
}

impl std::fmt::Debug for LogControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogControl").finish_non_exhaustive()
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// [`LoggingError::InvalidDirective`] if `default_level` does not parse and
/// `RUST_LOG` is unset, [`LoggingError::Init`] if a subscriber is already
/// installed.
pub fn init_logging(default_level: &str) -> Result<LogControl, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };
    let (filter_layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init()?;

    Ok(LogControl::new(handle))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
