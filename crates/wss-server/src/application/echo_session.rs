//! WebSocket echo session.
//!
//! One [`EchoSession`] exists per accepted `/echo` upgrade and lives exactly
//! as long as the connection.  Its only behavior is to send every data frame
//! straight back to the peer, unchanged and with the same framing (text stays
//! text, binary stays binary).
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//! open ──▶ message* ──▶ close
//!   │          │
//!   │          └── send fails ──▶ error ──▶ close
//!   └── assigned a UUID, logged
//! ```
//!
//! Control frames are handled inside tungstenite: a Ping is answered with a
//! Pong automatically, and a Close is answered with a Close before the stream
//! ends.  None of them are echoed or counted.
//!
//! The session is generic over its transport, so the same code runs over a
//! plain `TcpStream`, a TLS stream, or an in-memory pipe in tests.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors that end a session abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading the next frame failed.
    #[error("session {id}: receive failed: {source}")]
    Receive {
        id: Uuid,
        #[source]
        source: WsError,
    },

    /// Echoing a frame back failed.
    #[error("session {id}: send failed: {source}")]
    Send {
        id: Uuid,
        #[source]
        source: WsError,
    },
}

/// Outcome of a session that ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: Uuid,
    /// Number of data frames echoed back.
    pub echoed: u64,
    /// Whether the peer completed the closing handshake.  `false` means the
    /// transport simply went away.
    pub closed_cleanly: bool,
}

/// A single WebSocket connection that echoes data frames.
pub struct EchoSession<S> {
    id: Uuid,
    ws: WebSocketStream<S>,
}

impl<S> EchoSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens a session over an already upgraded WebSocket stream.
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "echo session opened");
        Self { id, ws }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Echoes frames until the peer closes or the transport fails.
    ///
    /// # Errors
    ///
    /// [`SessionError::Send`] if a frame cannot be written back and
    /// [`SessionError::Receive`] for read failures other than the peer
    /// disconnecting.
    pub async fn run(mut self) -> Result<SessionSummary, SessionError> {
        let id = self.id;
        let mut echoed = 0u64;
        let mut closed_cleanly = false;

        while let Some(frame) = self.ws.next().await {
            let message = match frame {
                Ok(message) => message,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    closed_cleanly = true;
                    break;
                }
                Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                    debug!(session = %id, "peer reset without closing handshake");
                    break;
                }
                Err(source) => {
                    warn!(session = %id, "receive error: {source}");
                    return Err(SessionError::Receive { id, source });
                }
            };

            match message {
                Message::Text(_) | Message::Binary(_) => {
                    let len = message.len();
                    if let Err(source) = self.ws.send(message).await {
                        warn!(session = %id, "echo failed: {source}");
                        return Err(SessionError::Send { id, source });
                    }
                    echoed += 1;
                    debug!(session = %id, bytes = len, "frame echoed");
                }
                Message::Ping(_) | Message::Pong(_) => {
                    debug!(session = %id, "control frame");
                }
                Message::Close(frame) => {
                    debug!(session = %id, ?frame, "close frame received");
                    closed_cleanly = true;
                }
                Message::Frame(_) => {}
            }
        }

        info!(session = %id, echoed, "echo session closed");
        Ok(SessionSummary {
            id,
            echoed,
            closed_cleanly,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
