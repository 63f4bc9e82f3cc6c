//! Infrastructure layer for wss-server.
//!
//! The infrastructure layer handles all I/O.
//!
//! # Responsibilities
//!
//! - Loading the certificate archive into a rustls server configuration
//! - Binding the listener socket and running the accept loop
//! - Performing TLS handshakes and WebSocket upgrades per connection
//! - Reading the TOML configuration file
//! - Installing the tracing subscriber
//!
//! # What does NOT belong here?
//!
//! - Certificate generation (that is the application layer)
//! - Echo and static-file behavior (application layer)
//! - The configuration schema (domain layer)

pub mod config_file;
pub mod listener;
pub mod logging;
pub mod tls;

// Re-export the primary entry points so callers can use them concisely.
pub use config_file::{load_config, ConfigError, DEFAULT_CONFIG_FILE};
pub use listener::{ListenerError, SecureListener, StartOptions, ECHO_PATH};
pub use logging::{init_logging, LogControl, LoggingError};
pub use tls::{load_tls_config, AcceptAnyClientCert, TlsConfig, TlsConfigError};
