//! WebSocket transport for the chat stream.
//!
//! [`connect`] opens the socket and spawns a reader and a writer task. The
//! caller gets a [`WsChannel`] for outgoing text and a receiver of
//! [`TransportEvent`]s. Frames are forwarded as raw text; decoding happens
//! in the session layer.
//!
//! There is no reconnection: once `Closed` has been delivered the channel
//! stays closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The handshake failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The handshake did not finish in time.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// The channel is not open.
    #[error("Transport is not open")]
    NotReady,

    /// An outgoing command could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Events delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket is open and ready to send.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The socket closed; no further events follow.
    Closed {
        /// Human-readable reason.
        reason: String,
    },
}

/// Outgoing side of a chat connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether a send would currently be attempted.
    fn is_ready(&self) -> bool;

    /// Send one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotReady`] if the channel is closed.
    async fn send(&self, text: String) -> Result<(), TransportError>;

    /// Close the channel. Idempotent.
    async fn close(&self);
}

enum Outgoing {
    Text(String),
    Close,
}

/// Handle to an open WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsChannel {
    tx: mpsc::Sender<Outgoing>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for Outgoing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "Text({} bytes)", text.len()),
            Self::Close => f.write_str("Close"),
        }
    }
}

#[async_trait]
impl Transport for WsChannel {
    fn is_ready(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        self.tx
            .send(Outgoing::Text(text))
            .await
            .map_err(|_| TransportError::NotReady)
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.tx.send(Outgoing::Close).await;
        }
    }
}

/// Open a WebSocket connection to `url`.
///
/// The first event on the returned receiver is always
/// [`TransportEvent::Opened`]; the last is always [`TransportEvent::Closed`].
///
/// # Errors
///
/// Returns an error if the handshake fails or takes longer than `timeout`.
pub async fn connect(
    url: &str,
    timeout: Duration,
) -> Result<(WsChannel, mpsc::Receiver<TransportEvent>), TransportError> {
    let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    tracing::info!(url = %url, "WebSocket connected");

    let (write, read) = ws_stream.split();
    let open = Arc::new(AtomicBool::new(true));

    let (outgoing_tx, outgoing_rx) = mpsc::channel::<Outgoing>(32);
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(128);

    tokio::spawn(ws_writer(write, outgoing_rx, Arc::clone(&open)));
    tokio::spawn(ws_reader(read, event_tx, Arc::clone(&open)));

    Ok((
        WsChannel {
            tx: outgoing_tx,
            open,
        },
        event_rx,
    ))
}

async fn ws_writer(
    mut write: SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<Outgoing>,
    open: Arc<AtomicBool>,
) {
    while let Some(outgoing) = rx.recv().await {
        match outgoing {
            Outgoing::Text(text) => {
                tracing::debug!(bytes = text.len(), "Sending frame");
                if let Err(e) = write.send(Message::Text(text)).await {
                    tracing::warn!(error = %e, "WebSocket write failed");
                    open.store(false, Ordering::Release);
                    break;
                }
            }
            Outgoing::Close => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

async fn ws_reader(
    mut read: SplitStream<WsStream>,
    tx: mpsc::Sender<TransportEvent>,
    open: Arc<AtomicBool>,
) {
    let _ = tx.send(TransportEvent::Opened).await;

    let reason = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                tracing::debug!(bytes = text.len(), "Received frame");
                if tx.send(TransportEvent::Frame(text)).await.is_err() {
                    break "receiver dropped".to_string();
                }
            }
            Some(Ok(Message::Close(frame))) => {
                break frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "connection closed".to_string());
            }
            // Control and binary frames carry nothing for the chat stream.
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
            Some(Err(e)) => break e.to_string(),
            None => break "connection closed".to_string(),
        }
    };

    open.store(false, Ordering::Release);
    tracing::info!(reason = %reason, "WebSocket closed");
    let _ = tx.send(TransportEvent::Closed { reason }).await;
}
