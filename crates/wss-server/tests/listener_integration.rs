//! Listener tests over real sockets: lifecycle, static files, and echo
//! sessions in plain and TLS mode.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async, WebSocketStream};

use wss_core::KeyPurpose;
use wss_server::application::{read_certificate, CertificateAuthority};
use wss_server::domain::ServerState;
use wss_server::infrastructure::{SecureListener, StartOptions};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const PASSWORD: &str = "listener-secret";

// ── Helpers ───────────────────────────────────────────────────────────────────

fn web_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), b"<h1>SecureWss</h1>").unwrap();
    std::fs::create_dir(dir.path().join("css")).unwrap();
    std::fs::write(dir.path().join("css").join("site.css"), b"body{}").unwrap();
    dir
}

fn plain_options(root: &tempfile::TempDir) -> StartOptions {
    StartOptions::new(0, root.path()).with_bind_address(LOCALHOST)
}

/// Sends one GET and returns the raw response text.
async fn http_get<S>(mut stream: S, path: &str) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    String::from_utf8_lossy(&reply).into_owned()
}

async fn open_echo(addr: SocketAddr) -> WebSocketStream<TcpStream> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (ws, response) = client_async("ws://localhost/echo", stream).await.unwrap();
    assert_eq!(response.status().as_u16(), 101);
    ws
}

/// Writes a fresh archive into `dir` and returns its path.
fn issue_archive(dir: &std::path::Path) -> std::path::PathBuf {
    let authority = CertificateAuthority::new(PASSWORD);
    let issued = authority
        .create_self_signed_certificate(
            "CN=SecureWss",
            &["localhost", "127.0.0.1"],
            &[KeyPurpose::ServerAuth, KeyPurpose::ClientAuth],
        )
        .unwrap();
    authority.write_certificate(issued, dir, "selfCert").unwrap()
}

/// A client connector that trusts exactly the archived certificate.
fn trusting_connector(archive: &std::path::Path) -> TlsConnector {
    let archived = read_certificate(archive, PASSWORD).unwrap();
    let mut roots = rustls::RootCertStore::empty();
    roots
        .add(rustls::pki_types::CertificateDer::from(archived.certificate_der.clone()))
        .unwrap();

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_then_stop_releases_port() {
    // Arrange
    let root = web_root();
    let listener = SecureListener::new();

    // Act
    let addr = listener.try_start(plain_options(&root)).await.unwrap();
    assert!(listener.is_running().await);
    listener.stop().await;

    // Assert: nothing accepts on the old address any more.
    assert_eq!(listener.state().await, ServerState::Stopped);
    assert!(!listener.is_running().await);
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_restart_on_same_port_replaces_running_listener() {
    // Arrange: a listener bound to a concrete port.
    let root = web_root();
    let listener = SecureListener::new();
    let first = listener.try_start(plain_options(&root)).await.unwrap();

    // Act: start again on the same port without an explicit stop.
    let options = StartOptions::new(first.port(), root.path()).with_bind_address(LOCALHOST);
    let second = listener.try_start(options).await.unwrap();

    // Assert: the rebind succeeded, so the first socket was released.
    assert_eq!(first, second);
    assert!(listener.is_running().await);
    let reply = http_get(TcpStream::connect(second).await.unwrap(), "/").await;
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));

    listener.stop().await;
}

#[tokio::test]
async fn test_restart_on_new_port_releases_old_port() {
    // Arrange
    let root = web_root();
    let listener = SecureListener::new();
    let first = listener.try_start(plain_options(&root)).await.unwrap();

    // Act: start again on a fresh ephemeral port.
    let second = listener.try_start(plain_options(&root)).await.unwrap();

    // Assert: only the new address accepts connections.
    assert_ne!(first, second);
    assert_eq!(listener.local_addr().await, Some(second));
    assert!(TcpStream::connect(first).await.is_err());
    let reply = http_get(TcpStream::connect(second).await.unwrap(), "/").await;
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));

    listener.stop().await;
}

#[tokio::test]
async fn test_repeated_stop_is_idempotent() {
    let root = web_root();
    let listener = SecureListener::new();
    listener.try_start(plain_options(&root)).await.unwrap();

    listener.stop().await;
    listener.stop().await;

    assert_eq!(listener.state().await, ServerState::Stopped);
    assert_eq!(listener.local_addr().await, None);
}

#[tokio::test]
async fn test_bind_conflict_leaves_second_listener_stopped() {
    let root = web_root();
    let holder = SecureListener::new();
    let addr = holder.try_start(plain_options(&root)).await.unwrap();

    let contender = SecureListener::new();
    let options = StartOptions::new(addr.port(), root.path()).with_bind_address(LOCALHOST);
    let result = contender.try_start(options).await;

    assert!(result.is_err());
    assert_eq!(contender.state().await, ServerState::Stopped);
    assert!(holder.is_running().await);
    holder.stop().await;
}

// ── Static files ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_root_path_serves_index_document() {
    // Arrange
    let root = web_root();
    let listener = SecureListener::new();
    let addr = listener.try_start(plain_options(&root)).await.unwrap();

    // Act
    let slash = http_get(TcpStream::connect(addr).await.unwrap(), "/").await;
    let index = http_get(TcpStream::connect(addr).await.unwrap(), "/index.html").await;

    // Assert
    assert_eq!(slash, index);
    assert!(slash.contains("Content-Type: text/html"));
    assert!(slash.ends_with("<h1>SecureWss</h1>"));

    listener.stop().await;
}

#[tokio::test]
async fn test_nested_file_has_its_content_type() {
    let root = web_root();
    let listener = SecureListener::new();
    let addr = listener.try_start(plain_options(&root)).await.unwrap();

    let reply = http_get(TcpStream::connect(addr).await.unwrap(), "/css/site.css").await;

    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(reply.contains("Content-Type: text/css"));
    assert!(reply.ends_with("body{}"));
    listener.stop().await;
}

#[tokio::test]
async fn test_missing_file_is_not_found_with_path_in_body() {
    let root = web_root();
    let listener = SecureListener::new();
    let addr = listener.try_start(plain_options(&root)).await.unwrap();

    let reply = http_get(TcpStream::connect(addr).await.unwrap(), "/nope.html").await;

    assert!(reply.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(reply.ends_with("Path not found /nope.html"));
    listener.stop().await;
}

// ── Echo sessions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_echo_returns_text_and_binary_in_order() {
    // Arrange
    let root = web_root();
    let listener = SecureListener::new();
    let addr = listener.try_start(plain_options(&root)).await.unwrap();
    let mut ws = open_echo(addr).await;
    let sent = vec![
        Message::text("first"),
        Message::binary(vec![0u8, 1, 2, 255]),
        Message::text("third"),
    ];

    // Act
    for message in &sent {
        ws.send(message.clone()).await.unwrap();
    }
    let mut received = Vec::new();
    for _ in 0..sent.len() {
        received.push(ws.next().await.unwrap().unwrap());
    }

    // Assert
    assert_eq!(received, sent);
    ws.close(None).await.unwrap();
    listener.stop().await;
}

#[tokio::test]
async fn test_ping_is_answered_but_not_echoed() {
    let root = web_root();
    let listener = SecureListener::new();
    let addr = listener.try_start(plain_options(&root)).await.unwrap();
    let mut ws = open_echo(addr).await;

    ws.send(Message::Ping(b"beat".to_vec().into())).await.unwrap();
    ws.send(Message::text("after")).await.unwrap();

    let first = ws.next().await.unwrap().unwrap();
    let second = ws.next().await.unwrap().unwrap();
    assert!(matches!(first, Message::Pong(_)));
    assert_eq!(second, Message::text("after"));
    listener.stop().await;
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_share_frames() {
    // Arrange
    let root = web_root();
    let listener = SecureListener::new();
    let addr = listener.try_start(plain_options(&root)).await.unwrap();

    // Act: each client sends its own tagged frames.
    let mut clients = Vec::new();
    for client in 0..4 {
        clients.push(tokio::spawn(async move {
            let mut ws = open_echo(addr).await;
            let mut echoed = Vec::new();
            for n in 0..5 {
                ws.send(Message::text(format!("client-{client}-{n}")))
                    .await
                    .unwrap();
                echoed.push(ws.next().await.unwrap().unwrap().into_text().unwrap());
            }
            ws.close(None).await.unwrap();
            (client, echoed)
        }));
    }

    // Assert
    for handle in clients {
        let (client, echoed) = handle.await.unwrap();
        let expected: Vec<String> = (0..5).map(|n| format!("client-{client}-{n}")).collect();
        let echoed: Vec<String> = echoed.into_iter().map(|t| t.to_string()).collect();
        assert_eq!(echoed, expected);
    }
    listener.stop().await;
}

#[tokio::test]
async fn test_session_survives_listener_stop() {
    let root = web_root();
    let listener = SecureListener::new();
    let addr = listener.try_start(plain_options(&root)).await.unwrap();
    let mut ws = open_echo(addr).await;

    listener.stop().await;
    ws.send(Message::text("still here")).await.unwrap();

    assert_eq!(
        ws.next().await.unwrap().unwrap(),
        Message::text("still here")
    );
}

// ── TLS ───────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tls_listener_serves_files_and_echo() {
    // Arrange
    let root = web_root();
    let certs = tempfile::tempdir().unwrap();
    let archive = issue_archive(certs.path());
    let listener = SecureListener::new();
    let options = plain_options(&root).with_certificate(&archive, PASSWORD);
    let addr = listener.try_start(options).await.unwrap();
    let connector = trusting_connector(&archive);
    let server_name = rustls::pki_types::ServerName::try_from("localhost").unwrap();

    // Act: static file over TLS.
    let tls = connector
        .connect(server_name.clone(), TcpStream::connect(addr).await.unwrap())
        .await
        .unwrap();
    let page = http_get(tls, "/").await;

    // Act: echo over TLS.
    let tls = connector
        .connect(server_name, TcpStream::connect(addr).await.unwrap())
        .await
        .unwrap();
    let (mut ws, _) = client_async("wss://localhost/echo", tls).await.unwrap();
    ws.send(Message::text("secure hello")).await.unwrap();
    let echoed = ws.next().await.unwrap().unwrap();

    // Assert
    assert!(listener.is_secure().await);
    assert!(page.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(page.ends_with("<h1>SecureWss</h1>"));
    assert_eq!(echoed, Message::text("secure hello"));

    ws.close(None).await.unwrap();
    listener.stop().await;
}

#[tokio::test]
async fn test_plain_client_cannot_talk_to_tls_listener() {
    let root = web_root();
    let certs = tempfile::tempdir().unwrap();
    let archive = issue_archive(certs.path());
    let listener = SecureListener::new();
    let addr = listener
        .try_start(plain_options(&root).with_certificate(&archive, PASSWORD))
        .await
        .unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut reply = Vec::new();
    // The server may reset instead of closing; either way no page comes back.
    let _ = stream.read_to_end(&mut reply).await;

    assert!(!reply.starts_with(b"HTTP/1.1 200"));
    assert!(listener.is_running().await);
    listener.stop().await;
}
