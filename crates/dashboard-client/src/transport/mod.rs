//! Push channel abstraction. The session only sees raw hub frames; framing
//! and decoding happen in `dashboard_core::hub`.

pub mod websocket;

use async_trait::async_trait;

use crate::error::ClientError;

pub use websocket::{WebSocketConnector, hub_ws_url};

/// An open push connection that has completed the hub handshake.
#[async_trait]
pub trait PushChannel: Send {
    /// Next text frame. `None` means the server ended the stream.
    async fn recv(&mut self) -> Option<Result<String, ClientError>>;

    async fn close(&mut self);
}

#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn PushChannel>, ClientError>;
}
