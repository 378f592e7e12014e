use std::time::Duration;

use async_trait::async_trait;
use dashboard_core::hub::{self, RECORD_SEPARATOR};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::{PushChannel, PushConnector};
use crate::error::ClientError;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Maps an http(s) hub address onto the ws(s) scheme.
pub fn hub_ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

/// Connects to the hub over a plain WebSocket, skipping HTTP negotiation.
pub struct WebSocketConnector {
    url: String,
    keepalive: Duration,
}

impl WebSocketConnector {
    pub fn new(hub_url: &str, keepalive: Duration) -> Self {
        Self {
            url: hub_ws_url(hub_url),
            keepalive,
        }
    }
}

/// Validates the handshake reply and returns whatever records followed it in
/// the same frame.
fn accept_handshake(frame: &str) -> Result<Option<String>, ClientError> {
    let (first, rest) = frame.split_once(RECORD_SEPARATOR).unwrap_or((frame, ""));
    hub::parse_handshake_response(first.trim())?;
    if rest.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(rest.to_string()))
    }
}

async fn handshake(sink: &mut SplitSink<Ws, Message>, stream: &mut SplitStream<Ws>) -> Result<Option<String>, ClientError> {
    sink.send(Message::Text(hub::handshake_request().into())).await?;

    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return accept_handshake(text.as_str()),
            Some(Ok(Message::Close(frame))) => {
                return Err(ClientError::Transport(format!(
                    "Connection closed during handshake: {frame:?}"
                )));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(ClientError::Transport(
                    "Connection closed during handshake".to_string(),
                ));
            }
        }
    }
}

#[async_trait]
impl PushConnector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn PushChannel>, ClientError> {
        debug!(url = %self.url, "Opening hub connection");
        let (ws, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();

        let pending = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut sink, &mut stream))
            .await
            .map_err(|_| ClientError::Transport("Hub handshake timed out".to_string()))??;

        let mut keepalive =
            tokio::time::interval_at(Instant::now() + self.keepalive, self.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(Box::new(WebSocketChannel {
            sink,
            stream,
            pending,
            keepalive,
            closed: false,
        }))
    }
}

pub struct WebSocketChannel {
    sink: SplitSink<Ws, Message>,
    stream: SplitStream<Ws>,
    /// Records that arrived together with the handshake reply.
    pending: Option<String>,
    keepalive: Interval,
    closed: bool,
}

#[async_trait]
impl PushChannel for WebSocketChannel {
    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        if let Some(frame) = self.pending.take() {
            return Some(Ok(frame));
        }
        if self.closed {
            return None;
        }

        loop {
            tokio::select! {
                msg = self.stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => return Some(Ok(text.as_str().to_owned())),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => return Some(Ok(text)),
                        Err(_) => warn!(len = bytes.len(), "Dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Hub sent close frame");
                        self.closed = true;
                        return None;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.closed = true;
                        return Some(Err(e.into()));
                    }
                    None => {
                        self.closed = true;
                        return None;
                    }
                },
                _ = self.keepalive.tick() => {
                    if let Err(e) = self.sink.send(Message::Text(hub::ping_record().into())).await {
                        self.closed = true;
                        return Some(Err(e.into()));
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "Error while closing hub connection");
        }
    }
}
