//! SecureWss server: entry point and interactive console.
//!
//! Serves static files and a WebSocket echo endpoint on one port, plain or
//! over TLS with a self-signed certificate generated on the device.
//!
//! # Usage
//!
//! ```text
//! wss-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>            TOML config file [default: securewss.toml]
//!   --port <PORT>              Listener port (overrides config)
//!   --root <DIR>               Web root (overrides config)
//!   --cert-password <PASS>     Certificate archive password (overrides config)
//!   --log-level <FILTER>       Log filter when RUST_LOG is unset (overrides config)
//!   --autostart <plain|secure> Start the listener without waiting for a command
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable            | Flag              |
//! |---------------------|-------------------|
//! | `WSS_CONFIG`        | `--config`        |
//! | `WSS_PORT`          | `--port`          |
//! | `WSS_ROOT`          | `--root`          |
//! | `WSS_CERT_PASSWORD` | `--cert-password` |
//! | `WSS_LOG`           | `--log-level`     |
//!
//! Precedence: CLI flag, then environment variable, then config file, then
//! built-in default.
//!
//! # Console
//!
//! Once running, the process reads commands from stdin (`getcommands` lists
//! them).  Ctrl+C stops the listener and exits.  If stdin closes, the server
//! keeps running until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use wss_server::application::{Command, Controller, Reply};
use wss_server::domain::AppConfig;
use wss_server::infrastructure::{init_logging, load_config, SecureListener, DEFAULT_CONFIG_FILE};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Listener mode for `--autostart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Autostart {
    Plain,
    Secure,
}

/// SecureWss static-file and WebSocket echo server.
#[derive(Debug, Parser)]
#[command(
    name = "wss-server",
    about = "Static files and WebSocket echo over HTTP(S) with a self-signed certificate",
    version
)]
struct Cli {
    /// TOML configuration file.  A missing file means built-in defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, env = "WSS_CONFIG")]
    config: PathBuf,

    /// TCP port for HTTP and WebSocket traffic.
    #[arg(long, env = "WSS_PORT")]
    port: Option<u16>,

    /// Directory static files are served from.
    #[arg(long, env = "WSS_ROOT")]
    root: Option<PathBuf>,

    /// Password protecting the certificate archive.
    #[arg(long, env = "WSS_CERT_PASSWORD", hide_env_values = true)]
    cert_password: Option<String>,

    /// Log filter used when `RUST_LOG` is unset, e.g. `info` or `wss_server=debug`.
    #[arg(long, env = "WSS_LOG")]
    log_level: Option<String>,

    /// Start the listener immediately.
    #[arg(long, value_enum)]
    autostart: Option<Autostart>,
}

impl Cli {
    /// Loads the config file and applies CLI overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    fn into_app_config(self) -> anyhow::Result<(AppConfig, Option<Autostart>)> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(root) = self.root {
            config.server.root_path = root;
        }
        if let Some(password) = self.cert_password {
            config.certificate.password = password;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }

        Ok((config, self.autostart))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged over the config file.
/// 2. The reloadable tracing subscriber is installed.
/// 3. A [`Controller`] is built around a fresh [`SecureListener`].
/// 4. With `--autostart`, the listener starts right away.
/// 5. The console loop runs until `quit`/`exit` or Ctrl+C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, autostart) = cli.into_app_config()?;

    let log = init_logging(&config.logging.level).context("failed to initialise logging")?;

    info!(
        port = config.server.port,
        root = %config.server.root_path.display(),
        archive = %config.certificate.archive_path().display(),
        "SecureWss starting"
    );

    let controller = Controller::new(Arc::new(SecureListener::new()), config, Some(log));

    if let Some(mode) = autostart {
        let reply = controller
            .execute(Command::StartServer {
                secure: mode == Autostart::Secure,
            })
            .await;
        println!("{reply}");
    }

    println!("type 'getcommands' for a list of commands");
    run_console(&controller).await;

    controller.listener().stop().await;
    info!("SecureWss stopped");
    Ok(())
}

/// Reads commands from stdin until `quit`/`exit` or Ctrl+C.
async fn run_console(controller: &Controller) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match controller.handle_line(&line).await {
                    Reply::Message(text) => {
                        if !text.is_empty() {
                            println!("{text}");
                        }
                    }
                    Reply::Exit(text) => {
                        println!("{text}");
                        return;
                    }
                },
                Ok(None) => {
                    info!("stdin closed; running until Ctrl+C");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("failed to read console input: {e}");
                    stdin_open = false;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("received Ctrl+C, shutting down"),
                    Err(e) => warn!("failed to listen for Ctrl+C: {e}"),
                }
                return;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
