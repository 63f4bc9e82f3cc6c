//! SecureListener: restartable HTTP(S) + WebSocket listener on one port.
//!
//! This module is responsible for:
//!
//! 1. Validating the web root and, in secure mode, loading TLS material.
//! 2. Binding a TCP listener on the configured address and port.
//! 3. Accepting connections until the shutdown flag is cleared.
//! 4. Running each connection in its own task: TLS handshake (secure mode),
//!    request-head parsing, then routing to the static file dispatcher or to
//!    a new [`EchoSession`].
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! Stopped ──try_start──▶ Starting ──bound──▶ Running ──stop──▶ Stopped
//!                            │
//!                            └── root missing / TLS error / bind error ──▶ Stopped
//! ```
//!
//! Every transition happens while holding one `tokio::sync::Mutex`, so a
//! `start` racing a `stop` can never leave two sockets bound to the port.
//! Starting while already running stops the old listener first.
//!
//! # Routing
//!
//! | Request                                   | Response                      |
//! |-------------------------------------------|-------------------------------|
//! | `GET /echo` with WebSocket upgrade headers | `101`, then an echo session   |
//! | WebSocket upgrade to any other path       | `404`                         |
//! | `GET /<path>`                             | file bytes or `404`           |
//! | any other method                          | `405`                         |
//! | unparseable request head                  | `400`                         |
//!
//! Plain HTTP responses close the connection afterwards.
//!
//! # Shutdown
//!
//! The accept loop polls `accept()` with a 200 ms timeout and re-checks a
//! shared `AtomicBool` between polls.  `stop` clears the flag and awaits the
//! accept task, so the port is free by the time `stop` returns.  Connections
//! that were already accepted keep running until their peers hang up.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use wss_core::{parse_request_head, Response, StatusCode};

use crate::application::echo_session::{EchoSession, SessionError, SessionSummary};
use crate::application::static_files::StaticFileDispatcher;
use crate::domain::{ServerState, TlsVersion};
use crate::infrastructure::tls::{load_tls_config, TlsConfigError};

/// Path that accepts WebSocket upgrades.
pub const ECHO_PATH: &str = "/echo";

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Only WebSocket protocol version 13 (RFC 6455) is spoken.
const WEBSOCKET_VERSION: &str = "13";

/// Pause after an accept error that is not specific to one connection,
/// e.g. the process running out of file descriptors.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 1024;

// ── Options and errors ────────────────────────────────────────────────────────

/// Parameters for one listener start.
#[derive(Clone)]
pub struct StartOptions {
    pub port: u16,
    pub bind_address: IpAddr,
    /// Directory static files are served from.
    pub root_path: PathBuf,
    /// Certificate archive; `None` serves plaintext.
    pub cert_path: Option<PathBuf>,
    pub cert_password: String,
    pub tls_versions: Vec<TlsVersion>,
}

impl StartOptions {
    /// Plaintext on all interfaces.
    pub fn new(port: u16, root_path: impl Into<PathBuf>) -> Self {
        Self {
            port,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            root_path: root_path.into(),
            cert_path: None,
            cert_password: String::new(),
            tls_versions: vec![TlsVersion::Tls12, TlsVersion::Tls13],
        }
    }

    pub fn with_bind_address(mut self, bind_address: IpAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Serves TLS using the archive at `cert_path`.
    pub fn with_certificate(mut self, cert_path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        self.cert_path = Some(cert_path.into());
        self.cert_password = password.into();
        self
    }

    pub fn with_tls_versions(mut self, versions: Vec<TlsVersion>) -> Self {
        self.tls_versions = versions;
        self
    }

    fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl std::fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartOptions")
            .field("port", &self.port)
            .field("bind_address", &self.bind_address)
            .field("root_path", &self.root_path)
            .field("cert_path", &self.cert_path)
            .field("tls_versions", &self.tls_versions)
            .finish_non_exhaustive()
    }
}

/// Reasons a listener fails to start.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The web root is missing or not a directory.
    #[error("web root {path} is not a usable directory: {source}")]
    RootDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// TLS material could not be loaded.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsConfigError),

    /// The socket could not be bound.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

// ── Listener handle ───────────────────────────────────────────────────────────

/// Owned handle to the listener; share it as `Arc<SecureListener>`.
#[derive(Default)]
pub struct SecureListener {
    slot: Mutex<ListenerSlot>,
}

#[derive(Default)]
struct ListenerSlot {
    state: ServerState,
    running: Option<RunningListener>,
}

struct RunningListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    accept_task: JoinHandle<()>,
    secure: bool,
}

/// Shared by every connection task of one listener run.
struct ConnectionContext {
    files: StaticFileDispatcher,
    tls: Option<TlsAcceptor>,
}

impl SecureListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the listener, logging any failure instead of returning it.
    ///
    /// Failure is observable only through [`is_running`](Self::is_running)
    /// staying `false`.
    pub async fn start(&self, options: StartOptions) {
        if let Err(e) = self.try_start(options).await {
            error!("listener failed to start: {e}");
        }
    }

    /// Starts the listener and returns the bound address.
    ///
    /// A running listener is stopped first.  On any error the state ends at
    /// [`ServerState::Stopped`] with no socket held.
    ///
    /// # Errors
    ///
    /// [`ListenerError::RootDirectory`], [`ListenerError::Tls`], or
    /// [`ListenerError::Bind`].
    pub async fn try_start(&self, options: StartOptions) -> Result<SocketAddr, ListenerError> {
        let mut slot = self.slot.lock().await;

        if slot.running.is_some() {
            info!("listener already running; stopping it before restart");
            stop_locked(&mut slot).await;
        }

        slot.state = ServerState::Starting;
        debug!(?options, "starting listener");

        match launch(&options).await {
            Ok(running) => {
                let addr = running.local_addr;
                info!(
                    %addr,
                    secure = running.secure,
                    root = %options.root_path.display(),
                    "listener running"
                );
                slot.running = Some(running);
                slot.state = ServerState::Running;
                Ok(addr)
            }
            Err(e) => {
                slot.state = ServerState::Stopped;
                Err(e)
            }
        }
    }

    /// Stops accepting connections and releases the socket.  Idempotent.
    pub async fn stop(&self) {
        let mut slot = self.slot.lock().await;
        stop_locked(&mut slot).await;
    }

    /// `true` while the state is Running and the accept loop is alive.
    pub async fn is_running(&self) -> bool {
        let slot = self.slot.lock().await;
        slot.state.is_running()
            && slot
                .running
                .as_ref()
                .is_some_and(|r| !r.accept_task.is_finished())
    }

    pub async fn state(&self) -> ServerState {
        self.slot.lock().await.state
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.slot.lock().await.running.as_ref().map(|r| r.local_addr)
    }

    /// `true` while running in TLS mode.
    pub async fn is_secure(&self) -> bool {
        self.slot
            .lock()
            .await
            .running
            .as_ref()
            .is_some_and(|r| r.secure)
    }
}

impl Drop for SecureListener {
    fn drop(&mut self) {
        if let Some(running) = &self.slot.get_mut().running {
            running.running.store(false, Ordering::Relaxed);
        }
    }
}

async fn stop_locked(slot: &mut ListenerSlot) {
    if let Some(running) = slot.running.take() {
        running.running.store(false, Ordering::Relaxed);
        if let Err(e) = running.accept_task.await {
            warn!("accept loop ended abnormally: {e}");
        }
        info!(addr = %running.local_addr, "listener stopped");
    }
    slot.state = ServerState::Stopped;
}

/// Validates, loads TLS, binds, and spawns the accept loop.
async fn launch(options: &StartOptions) -> Result<RunningListener, ListenerError> {
    let root_error = |source| ListenerError::RootDirectory {
        path: options.root_path.clone(),
        source,
    };
    let metadata = tokio::fs::metadata(&options.root_path)
        .await
        .map_err(root_error)?;
    if !metadata.is_dir() {
        return Err(root_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a directory",
        )));
    }

    let tls = match &options.cert_path {
        Some(path) => {
            let config = load_tls_config(path, &options.cert_password, &options.tls_versions)?;
            Some(config.acceptor())
        }
        None => None,
    };
    let secure = tls.is_some();

    let addr = options.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { addr, source })?;

    let context = Arc::new(ConnectionContext {
        files: StaticFileDispatcher::new(options.root_path.clone()),
        tls,
    });
    let running = Arc::new(AtomicBool::new(true));
    let accept_task = tokio::spawn(accept_loop(listener, context, Arc::clone(&running)));

    Ok(RunningListener {
        local_addr,
        running,
        accept_task,
        secure,
    })
}

// ── Accept loop ───────────────────────────────────────────────────────────────

async fn accept_loop(listener: TcpListener, context: Arc<ConnectionContext>, running: Arc<AtomicBool>) {
    loop {
        if !running.load(Ordering::Relaxed) {
            debug!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("connection from {peer_addr}");
                let ctx = Arc::clone(&context);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, ctx).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
                if let Some(pause) = accept_error_backoff(&e) {
                    tokio::time::sleep(pause).await;
                }
            }
            Err(_) => {
                // Poll interval elapsed; re-check the flag.
            }
        }
    }
    // `listener` drops here, releasing the port.
}

/// How long to wait before accepting again after `error`.
///
/// Errors that only concern the connection being accepted retry at once.
/// Anything else (EMFILE, ENFILE, ENOBUFS) would fail again immediately.
fn accept_error_backoff(error: &io::Error) -> Option<Duration> {
    match error.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => None,
        _ => Some(ACCEPT_ERROR_BACKOFF),
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

/// What a connection ended up doing.
#[derive(Debug)]
pub enum ConnectionOutcome {
    /// A plain HTTP response was sent.
    Http { path: String, status: StatusCode },
    /// An echo session ran to completion.
    Echo(SessionSummary),
    /// The peer disconnected before sending a complete request head.
    Abandoned,
}

/// Errors that end a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Top-level handler for one accepted TCP connection.
///
/// Wraps [`serve_connection`] and logs the outcome, so the inner function can
/// use `?` freely.
async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, context: Arc<ConnectionContext>) {
    let result = match &context.tls {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => serve_connection(tls_stream, &context.files).await,
            Err(e) => Err(ConnectionError::Handshake(e)),
        },
        None => serve_connection(stream, &context.files).await,
    };

    match result {
        Ok(ConnectionOutcome::Http { path, status }) => {
            info!("{peer_addr} {path} -> {}", status.as_u16());
        }
        Ok(ConnectionOutcome::Echo(summary)) => {
            info!(
                session = %summary.id,
                echoed = summary.echoed,
                "{peer_addr} echo session finished"
            );
        }
        Ok(ConnectionOutcome::Abandoned) => {
            debug!("{peer_addr} closed without a request");
        }
        Err(e) => warn!("connection {peer_addr} closed with error: {e}"),
    }
}

/// Reads one request head from `stream` and answers it.
///
/// # Errors
///
/// I/O failures on the stream and echo session failures.
pub async fn serve_connection<S>(
    mut stream: S,
    files: &StaticFileDispatcher,
) -> Result<ConnectionOutcome, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let (head, head_len) = loop {
        match parse_request_head(&buf) {
            Ok(Some(parsed)) => break parsed,
            Ok(None) => {}
            Err(e) => {
                debug!("rejecting request: {e}");
                let response = Response::bad_request(&e.to_string());
                return respond(stream, String::new(), response).await;
            }
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(ConnectionOutcome::Abandoned);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let path = head.path().to_string();

    if head.is_websocket_upgrade() {
        if path != ECHO_PATH {
            return respond(stream, path.clone(), Response::not_found(&path)).await;
        }
        if head.method != "GET" {
            return respond(stream, path, Response::method_not_allowed(&head.method)).await;
        }
        let version_ok = head
            .header("sec-websocket-version")
            .is_some_and(|v| v.trim() == WEBSOCKET_VERSION);
        let Some(key) = head.websocket_key().filter(|_| version_ok) else {
            let response = Response::bad_request("missing Sec-WebSocket-Key or unsupported version");
            return respond(stream, path, response).await;
        };

        let accept_key = derive_accept_key(key.as_bytes());
        stream
            .write_all(&Response::switching_protocols(&accept_key).encode())
            .await?;
        stream.flush().await?;

        let leftover = buf.split_off(head_len);
        let ws = WebSocketStream::from_partially_read(stream, leftover, Role::Server, None).await;
        let summary = EchoSession::new(ws).run().await?;
        return Ok(ConnectionOutcome::Echo(summary));
    }

    if head.method != "GET" {
        return respond(stream, path, Response::method_not_allowed(&head.method)).await;
    }

    let response = files.dispatch(&path).await;
    respond(stream, path, response).await
}

async fn respond<S>(
    mut stream: S,
    path: String,
    response: Response,
) -> Result<ConnectionOutcome, ConnectionError>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&response.encode()).await?;
    stream.flush().await?;
    // Peer may already be gone; the response is out either way.
    let _ = stream.shutdown().await;
    Ok(ConnectionOutcome::Http {
        path,
        status: response.status,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
