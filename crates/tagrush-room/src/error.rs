//! Error types for the room layer.

use tagrush_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
///
/// Races between clients (a stale collision report, a message for a room
/// that just emptied) are not errors; they are ignored inside the room
/// actor. These variants cover requests that fail outright.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Every spawn corner is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player is already a member of a room (the one named here).
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is not a member of this room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// The room actor stopped or its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// HTTP-style status code used when the error is reported to a client.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::RoomFull(_) | Self::AlreadyInRoom(..) => 409,
            Self::NotInRoom(..) => 400,
            Self::Unavailable(_) => 503,
        }
    }
}
