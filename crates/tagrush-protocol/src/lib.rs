//! Wire protocol for Tagrush.
//!
//! - **Types** — identifiers ([`PlayerId`], [`RoomId`]), player state, and
//!   the two message families: [`ClientEnvelope`]/[`ClientMessage`] going
//!   in, [`ServerMessage`] coming out.
//! - **Codec** — the [`Codec`] trait and [`JsonCodec`].
//! - **Errors** — [`ProtocolError`].
//!
//! The protocol layer knows nothing about connections or rooms.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEnvelope, ClientMessage, Outcome, PlayerId, PlayerSnapshot, PlayerState, Position,
    Reply, RoomId, RoomListEntry, ServerMessage,
};
