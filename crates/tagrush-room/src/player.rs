//! Per-connection game state held by a room.

use tagrush_protocol::{PlayerId, PlayerSnapshot, PlayerState, Position};

/// One member's position, score, and role.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub position: Position,
    pub score: i32,
    pub is_it: bool,
}

impl Player {
    /// A fresh member standing at the origin.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            position: Position::ORIGIN,
            score: 0,
            is_it: false,
        }
    }

    /// Back to the start-of-game values. Identity is kept.
    pub fn reset(&mut self) {
        self.position = Position::ORIGIN;
        self.score = 0;
        self.is_it = false;
    }

    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            score: self.score,
            is_it: self.is_it,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            x: self.position.x,
            y: self.position.y,
            score: self.score,
            is_it: self.is_it,
        }
    }
}
