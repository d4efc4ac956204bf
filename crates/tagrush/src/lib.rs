//! # Tagrush
//!
//! Authoritative server for room-based multiplayer tag.
//!
//! Clients connect over WebSocket, create or join a named room, and play
//! rounds of tag: one player is IT and must catch another before the
//! round timer runs out. The server owns every score, role, and timer;
//! clients only report movement and catches.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagrush::prelude::*;
//!
//! # async fn start() -> Result<(), TagrushError> {
//! let server = TagrushServer::builder().bind("0.0.0.0:3000").build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::TagrushError;
pub use server::{TagrushServer, TagrushServerBuilder};

pub mod prelude {
    pub use crate::{ServerConfig, TagrushError, TagrushServer, TagrushServerBuilder};
    pub use tagrush_protocol::{
        ClientEnvelope, ClientMessage, Codec, JsonCodec, Outcome, PlayerId, PlayerSnapshot,
        PlayerState, Reply, RoomId, RoomListEntry, ServerMessage,
    };
    pub use tagrush_room::{RoomConfig, RoomError, RoomPhase};
}
