//! Console commands and the controller that executes them.
//!
//! The binary reads lines from stdin and hands each one to
//! [`Controller::handle_line`].  Parsing is case-insensitive on the command
//! word; arguments keep their case.
//!
//! | Command                | Effect                                           |
//! |------------------------|--------------------------------------------------|
//! | `getcommands` / `help` | list commands                                    |
//! | `createcert`           | generate and write the certificate archive       |
//! | `startserver [secure]` | (re)start the listener, plain or TLS             |
//! | `stopserver`           | stop the listener                                |
//! | `status`               | report state, address, TLS mode                  |
//! | `certinfo`             | describe the certificate in the archive          |
//! | `debug [directive]`    | show or replace the log filter                   |
//! | `quit` / `exit`        | stop the listener and exit                       |
//!
//! Certificate work is CPU-bound (RSA key generation), so it runs on the
//! blocking thread pool and never stalls connection tasks.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::application::certificate_authority::{
    inspect_certificate, CertificateAuthority, CertificateError,
};
use crate::domain::AppConfig;
use crate::infrastructure::{LogControl, SecureListener, StartOptions};

/// Help text for every command, in display order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("getcommands", "list available commands (alias: help)"),
    ("createcert", "generate a self-signed certificate and write the archive"),
    ("startserver [secure]", "start the server, with TLS when 'secure' is given"),
    ("stopserver", "stop the server"),
    ("status", "show server state, address and TLS mode"),
    ("certinfo", "describe the certificate in the configured archive"),
    ("debug [directive]", "show or replace the log filter, e.g. 'debug trace'"),
    ("quit", "stop the server and exit (alias: exit)"),
];

// ── Command parsing ───────────────────────────────────────────────────────────

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    CreateCert,
    StartServer { secure: bool },
    StopServer,
    Status,
    CertInfo,
    Debug(Option<String>),
    Quit,
}

/// Reasons a console line is not a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'; type 'getcommands' for a list")]
    Unknown(String),

    #[error("'{command}' does not take argument '{argument}'")]
    UnexpectedArgument { command: String, argument: String },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let word = words.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();

        let no_args = |command: Command| {
            match rest.first() {
                Some(arg) => Err(CommandError::UnexpectedArgument {
                    command: word.clone(),
                    argument: (*arg).to_string(),
                }),
                None => Ok(command),
            }
        };

        match word.as_str() {
            "getcommands" | "help" => no_args(Command::Help),
            "createcert" => no_args(Command::CreateCert),
            "startserver" => match rest.as_slice() {
                [] => Ok(Command::StartServer { secure: false }),
                [arg] if arg.eq_ignore_ascii_case("secure") => {
                    Ok(Command::StartServer { secure: true })
                }
                [arg, ..] => Err(CommandError::UnexpectedArgument {
                    command: word.clone(),
                    argument: (*arg).to_string(),
                }),
            },
            "stopserver" => no_args(Command::StopServer),
            "status" => no_args(Command::Status),
            "certinfo" => no_args(Command::CertInfo),
            "debug" => Ok(Command::Debug(
                (!rest.is_empty()).then(|| rest.join(" ")),
            )),
            "quit" | "exit" => no_args(Command::Quit),
            _ => Err(CommandError::Unknown(word.clone())),
        }
    }
}

/// Renders [`COMMANDS`] as an aligned list.
pub fn help_text() -> String {
    let width = COMMANDS.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    COMMANDS
        .iter()
        .map(|(name, help)| format!("  {name:<width$}  {help}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Controller ────────────────────────────────────────────────────────────────

/// What the console should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print the text and keep reading.
    Message(String),
    /// Print the text and exit.
    Exit(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Message(text) | Reply::Exit(text) => f.write_str(text),
        }
    }
}

/// Executes console commands against one listener and one configuration.
pub struct Controller {
    listener: Arc<SecureListener>,
    config: AppConfig,
    log: Option<LogControl>,
}

impl Controller {
    pub fn new(listener: Arc<SecureListener>, config: AppConfig, log: Option<LogControl>) -> Self {
        Self {
            listener,
            config,
            log,
        }
    }

    pub fn listener(&self) -> &Arc<SecureListener> {
        &self.listener
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parses and executes one console line.
    pub async fn handle_line(&self, line: &str) -> Reply {
        match line.parse::<Command>() {
            Ok(command) => self.execute(command).await,
            Err(CommandError::Empty) => Reply::Message(String::new()),
            Err(e) => Reply::Message(format!("error: {e}")),
        }
    }

    pub async fn execute(&self, command: Command) -> Reply {
        info!(?command, "console command");
        match command {
            Command::Help => Reply::Message(help_text()),
            Command::CreateCert => Reply::Message(self.create_certificate().await),
            Command::StartServer { secure } => Reply::Message(self.start_server(secure).await),
            Command::StopServer => {
                self.listener.stop().await;
                Reply::Message("server stopped".to_string())
            }
            Command::Status => Reply::Message(self.status().await),
            Command::CertInfo => Reply::Message(self.certificate_info().await),
            Command::Debug(directive) => Reply::Message(self.debug_filter(directive)),
            Command::Quit => {
                self.listener.stop().await;
                Reply::Exit("bye".to_string())
            }
        }
    }

    /// Builds listener options from the configuration.
    ///
    /// # Errors
    ///
    /// Returns a message if `bind_address` is not an IP address.
    pub fn start_options(&self, secure: bool) -> Result<StartOptions, String> {
        let server = &self.config.server;
        let bind_address: IpAddr = server
            .bind_address
            .parse()
            .map_err(|e| format!("invalid bind address '{}': {e}", server.bind_address))?;

        let mut options = StartOptions::new(server.port, server.root_path.clone())
            .with_bind_address(bind_address)
            .with_tls_versions(server.tls_versions.clone());
        if secure {
            let cert = &self.config.certificate;
            options = options.with_certificate(cert.archive_path(), cert.password.clone());
        }
        Ok(options)
    }

    async fn start_server(&self, secure: bool) -> String {
        let options = match self.start_options(secure) {
            Ok(options) => options,
            Err(message) => return format!("error: {message}"),
        };
        match self.listener.try_start(options).await {
            Ok(addr) => {
                let scheme = if secure { "https" } else { "http" };
                format!("server running on {scheme}://{addr}")
            }
            Err(e) => {
                error!("start failed: {e}");
                format!("error: {e}")
            }
        }
    }

    async fn status(&self) -> String {
        let state = self.listener.state().await;
        let alive = self.listener.is_running().await;
        match self.listener.local_addr().await {
            Some(addr) if alive => {
                let mode = if self.listener.is_secure().await {
                    "TLS"
                } else {
                    "plain"
                };
                format!("{state} on {addr} ({mode})")
            }
            _ => state.to_string(),
        }
    }

    async fn create_certificate(&self) -> String {
        let cert = self.config.certificate.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<PathBuf, CertificateError> {
            let request = cert.to_request()?;
            std::fs::create_dir_all(&cert.directory).map_err(|source| CertificateError::Io {
                path: cert.directory.clone(),
                source,
            })?;
            let authority = CertificateAuthority::new(cert.password.clone());
            let issued = authority.issue(&request)?;
            authority.write_certificate(issued, &cert.directory, &cert.file_base_name)
        })
        .await;

        match result {
            Ok(Ok(path)) => format!("certificate written to {}", path.display()),
            Ok(Err(e)) => {
                error!("certificate creation failed: {e}");
                format!("error: {e}")
            }
            Err(e) => format!("error: certificate task failed: {e}"),
        }
    }

    async fn certificate_info(&self) -> String {
        let path = self.config.certificate.archive_path();
        let password = self.config.certificate.password.clone();
        let result =
            tokio::task::spawn_blocking(move || inspect_certificate(&path, &password)).await;

        match result {
            Ok(Ok(summary)) => summary.to_string(),
            Ok(Err(e)) => format!("error: {e}"),
            Err(e) => format!("error: certificate task failed: {e}"),
        }
    }

    fn debug_filter(&self, directive: Option<String>) -> String {
        let Some(log) = &self.log else {
            return "error: log filter is not adjustable in this process".to_string();
        };
        match directive {
            None => match log.current() {
                Ok(current) => format!("log filter: {current}"),
                Err(e) => format!("error: {e}"),
            },
            Some(directive) => match log.set(&directive) {
                Ok(()) => format!("log filter set to {directive}"),
                Err(e) => format!("error: {e}"),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServerState;

    #[test]
    fn test_command_word_is_case_insensitive() {
        assert_eq!("GetCommands".parse(), Ok(Command::Help));
        assert_eq!("STOPSERVER".parse(), Ok(Command::StopServer));
        assert_eq!("exit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_startserver_secure_argument() {
        assert_eq!(
            "startserver".parse(),
            Ok(Command::StartServer { secure: false })
        );
        assert_eq!(
            "startserver Secure".parse(),
            Ok(Command::StartServer { secure: true })
        );
        assert!(matches!(
            "startserver fast".parse::<Command>(),
            Err(CommandError::UnexpectedArgument { .. })
        ));
    }

    #[test]
    fn test_debug_keeps_directive_case() {
        assert_eq!(
            "debug wss_server=TRACE".parse(),
            Ok(Command::Debug(Some("wss_server=TRACE".to_string())))
        );
        assert_eq!("debug".parse(), Ok(Command::Debug(None)));
    }

    #[test]
    fn test_unknown_and_empty_lines() {
        assert_eq!(
            "launch".parse::<Command>(),
            Err(CommandError::Unknown("launch".to_string()))
        );
        assert_eq!("   ".parse::<Command>(), Err(CommandError::Empty));
    }

    #[test]
    fn test_argument_to_plain_command_is_rejected() {
        assert_eq!(
            "status now".parse::<Command>(),
            Err(CommandError::UnexpectedArgument {
                command: "status".to_string(),
                argument: "now".to_string(),
            })
        );
    }

    #[test]
    fn test_help_lists_every_command() {
        let text = help_text();
        for (name, _) in COMMANDS {
            assert!(text.contains(name));
        }
    }

    fn test_config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.server.port = 0;
        config.server.bind_address = "127.0.0.1".to_string();
        config.server.root_path = dir.to_path_buf();
        config.certificate.directory = dir.join("user");
        config.certificate.password = "console-test".to_string();
        config
    }

    #[tokio::test]
    async fn test_unknown_command_reply_keeps_console_running() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Controller::new(Arc::new(SecureListener::new()), test_config(dir.path()), None);

        let reply = controller.handle_line("frobnicate").await;

        assert!(matches!(reply, Reply::Message(ref text) if text.starts_with("error:")));
    }

    #[tokio::test]
    async fn test_start_status_stop_cycle() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let controller = Controller::new(Arc::new(SecureListener::new()), test_config(dir.path()), None);

        // Act / Assert
        let started = controller.execute(Command::StartServer { secure: false }).await;
        assert!(started.to_string().starts_with("server running on http://127.0.0.1:"));

        let status = controller.execute(Command::Status).await.to_string();
        assert!(status.starts_with("running on 127.0.0.1:"));
        assert!(status.ends_with("(plain)"));

        controller.execute(Command::StopServer).await;
        assert_eq!(controller.listener().state().await, ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_createcert_then_secure_start() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let controller = Controller::new(Arc::new(SecureListener::new()), test_config(dir.path()), None);

        // Act
        let created = controller.execute(Command::CreateCert).await.to_string();
        let info = controller.execute(Command::CertInfo).await.to_string();
        let started = controller.execute(Command::StartServer { secure: true }).await.to_string();

        // Assert
        assert!(created.starts_with("certificate written to"), "{created}");
        assert!(info.contains("subject:      CN=SecureWss"), "{info}");
        assert!(info.contains("localhost, 127.0.0.1"), "{info}");
        assert!(started.starts_with("server running on https://"), "{started}");
        assert!(controller.listener().is_secure().await);

        let reply = controller.execute(Command::Quit).await;
        assert_eq!(reply, Reply::Exit("bye".to_string()));
        assert!(!controller.listener().is_running().await);
    }

    #[tokio::test]
    async fn test_secure_start_without_certificate_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Controller::new(Arc::new(SecureListener::new()), test_config(dir.path()), None);

        let reply = controller.execute(Command::StartServer { secure: true }).await.to_string();

        assert!(reply.starts_with("error:"), "{reply}");
        assert!(!controller.listener().is_running().await);
    }

    #[tokio::test]
    async fn test_debug_without_log_control_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Controller::new(Arc::new(SecureListener::new()), test_config(dir.path()), None);

        let reply = controller.execute(Command::Debug(None)).await.to_string();

        assert!(reply.starts_with("error:"));
    }
}
