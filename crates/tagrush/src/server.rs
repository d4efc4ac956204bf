//! `TagrushServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → rooms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tagrush_protocol::{Codec, JsonCodec};
use tagrush_room::{RoomConfig, RoomRegistry};
use tagrush_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::TagrushError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Tagrush server.
///
/// # Example
///
/// ```rust,no_run
/// use tagrush::prelude::*;
///
/// # async fn start() -> Result<(), TagrushError> {
/// let server = TagrushServer::builder()
///     .bind("0.0.0.0:3000")
///     .room_config(RoomConfig { win_score: 5, ..RoomConfig::default() })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TagrushServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    idle_timeout: Duration,
}

impl TagrushServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the address to bind the server to. Port 0 picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Rules and timings for every room this server creates.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Drops connections that stay silent for longer than `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener. Frames are JSON over WebSocket.
    pub async fn build(self) -> Result<TagrushServer<JsonCodec>, TagrushError> {
        let transport = WebSocketTransport::bind(self.bind_addr.as_str()).await?;

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(self.room_config)),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(TagrushServer { transport, state })
    }
}

impl Default for TagrushServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Tagrush server. Call [`run()`](Self::run) to start serving.
pub struct TagrushServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl TagrushServer<JsonCodec> {
    pub fn builder() -> TagrushServerBuilder {
        TagrushServerBuilder::new()
    }
}

impl<C: Codec> TagrushServer<C> {
    pub fn local_addr(&self) -> Result<SocketAddr, TagrushError> {
        Ok(self.transport.local_addr()?)
    }

    /// Accepts connections forever, one handler task per connection.
    pub async fn run(mut self) -> Result<(), TagrushError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "tagrush server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
