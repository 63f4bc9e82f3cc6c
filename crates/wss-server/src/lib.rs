//! wss-server library crate.
//!
//! This crate turns a small device into a network endpoint: it serves static
//! files over HTTP(S) and echoes WebSocket messages back to their sender on a
//! single port, optionally over TLS with a self-signed certificate it
//! generates itself.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (HTTP GET / WebSocket on /echo, plain or TLS)
//!         ↕
//! [wss-server]
//!   ├── domain/           Pure types: AppConfig, ServerState
//!   ├── application/      Certificate authority, static files, echo session,
//!   │                     console commands
//!   └── infrastructure/
//!         ├── tls/        PKCS#12 archive → rustls ServerConfig
//!         ├── listener/   SecureListener: accept loop + connection routing
//!         ├── config_file/ TOML loading
//!         └── logging/    Reloadable tracing subscriber
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `wss-core`; the console controller
//!   also drives the infrastructure listener.  The echo session is generic
//!   over its transport so it can be tested over an in-memory pipe.
//! - `infrastructure` owns sockets, files, TLS, and the tracing subscriber.
//!
//! # For beginners: why this structure?
//!
//! Separating *what the program does* (domain + application) from *how it
//! does it* (infrastructure) keeps the certificate and session logic testable
//! without a real network, and keeps the console host in `main.rs` a thin
//! layer that only calls public operations.

/// Domain layer: configuration schema and listener state.
pub mod domain;

/// Application layer: certificates, static files, echo sessions, commands.
pub mod application;

/// Infrastructure layer: TLS, listener, config file, logging.
pub mod infrastructure;
