//! Rooms, rounds, and scoring for Tagrush.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! members, the IT role, scores, and the two round timers.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates/destroys rooms, tracks which player is where
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomPhase`] — game lifecycle state machine
//! - [`RoomConfig`] — win score, timings, spawn corners
//! - [`round`] — the rules applied when a round ends and the next begins

mod config;
mod error;
mod player;
mod registry;
mod room;
pub mod round;

pub use config::{RoomConfig, RoomPhase};
pub use error::RoomError;
pub use player::Player;
pub use registry::RoomRegistry;
pub use room::{GameStart, PlayerSender, RoomHandle, RoomInfo};
