//! The single bidirectional connection a phase runs over.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// An open phase connection.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next inbound text frame. `Ok(None)` once the peer has closed.
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError>;

    /// Close from our side. Safe to call on an already closed connection.
    async fn close(&mut self);
}

/// Opens connections to phase endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError>;
}

pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        debug!(%url, "websocket connected");
        Ok(Box::new(WsTransport {
            stream,
            closed: false,
        }))
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        if self.closed {
            return Ok(None);
        }
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "server closed websocket");
                    self.closed = true;
                    return Ok(None);
                }
                // ping/pong are answered by tungstenite; binary is not part of the protocol
                Ok(_) => continue,
                Err(e) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
        self.closed = true;
        Ok(None)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "websocket close failed");
        }
    }
}
