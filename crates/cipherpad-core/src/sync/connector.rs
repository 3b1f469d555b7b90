//! Transport seam for the sync channel.
//!
//! A [`Connector`] opens one duplex connection and hands back a [`Link`]:
//! text frames pushed into `outbound` are written to the peer, frames read
//! from the peer arrive on `inbound`. The link is dead once `inbound` yields
//! `None` or `outbound` refuses a frame.
//!
//! A frame accepted by `outbound` may still sit in the link's own buffer.
//! When the link has a `writer` task, that task finishes only after every
//! accepted frame was written (or the socket failed), once `outbound` is
//! dropped.

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{NotesError, Result};

/// One open duplex connection.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
    /// Task writing `outbound` frames to the transport, if there is one.
    pub writer: Option<JoinHandle<()>>,
}

impl Link {
    /// Create a connected pair of links, useful for in-process peers.
    pub fn pair() -> (Link, Link) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Link {
                outbound: a_tx,
                inbound: b_rx,
                writer: None,
            },
            Link {
                outbound: b_tx,
                inbound: a_rx,
                writer: None,
            },
        )
    }

    /// Attach the task that drains `outbound` into the transport.
    pub fn with_writer(mut self, writer: JoinHandle<()>) -> Self {
        self.writer = Some(writer);
        self
    }
}

/// Opens connections for the sync channel; called again on every reconnect.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self) -> BoxFuture<'static, Result<Link>>;
}

/// WebSocket connector for `/notes/socket`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
    cookie: Option<String>,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self { url, cookie: None }
    }

    /// Attach the session cookie header used to authenticate the upgrade.
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }
}

impl Connector for WsConnector {
    fn connect(&self) -> BoxFuture<'static, Result<Link>> {
        let url = self.url.clone();
        let cookie = self.cookie.clone();
        Box::pin(async move { open_websocket(url, cookie).await })
    }
}

async fn open_websocket(url: Url, cookie: Option<String>) -> Result<Link> {
    let mut request = url.as_str().into_client_request()?;
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| NotesError::InvalidInput(format!("Invalid session cookie: {}", e)))?;
        request.headers_mut().insert("Cookie", value);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

    // Writer: ends when the channel drops its sender or the socket refuses a frame.
    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                tracing::warn!(error = %e, "socket write failed");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Reader: the inbound sender drops when this task ends, signaling disconnect.
    tokio::spawn(async move {
        while let Some(frame) = ws_rx.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if in_tx.send(text.to_string()).is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(data)) => {
                    if in_tx.send(String::from_utf8_lossy(&data).into_owned()).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "socket read failed");
                    break;
                }
            }
        }
    });

    Ok(Link {
        outbound: out_tx,
        inbound: in_rx,
        writer: Some(writer),
    })
}
