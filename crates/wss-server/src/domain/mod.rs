//! Domain layer for wss-server.
//!
//! Pure types with no I/O:
//!
//! - **`config`** – The TOML configuration schema with serde defaults for
//!   every field, so a missing or partial file still yields a working setup.
//! - **`state`** – The listener lifecycle state machine
//!   (`Stopped → Starting → Running → Stopped`).

pub mod config;
pub mod state;

pub use config::{
    AppConfig, CertificateConfig, LoggingConfig, ServerConfig, TlsVersion, ARCHIVE_EXTENSION,
};
pub use state::ServerState;
