//! Room configuration and the per-room phase machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagrush_protocol::Position;

/// Shortest round a room will run.
const MIN_ROUND_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Rules and timings shared by every room on a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Score that wins the game.
    pub win_score: i32,

    /// How long the chaser has to make a catch before the round fails.
    pub round_timeout: Duration,

    /// Delay between `startGame` and the first round.
    pub start_delay: Duration,

    /// Spawn corners. Also caps the room size: every member needs its
    /// own corner.
    pub spawn_points: Vec<Position>,

    /// Member count at which `ready` tells everyone to load the game.
    pub ready_players: usize,

    /// Fewer members than this and no round starts.
    pub min_players: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            win_score: 10,
            round_timeout: Duration::from_secs(20),
            start_delay: Duration::from_secs(5),
            spawn_points: vec![
                Position::new(8.0, 8.0),
                Position::new(120.0, 8.0),
                Position::new(120.0, 120.0),
                Position::new(8.0, 120.0),
            ],
            ready_players: 2,
            min_players: 2,
        }
    }
}

impl RoomConfig {
    /// Maximum members a room accepts.
    pub fn max_players(&self) -> usize {
        self.spawn_points.len()
    }

    /// Fixes out-of-range values so the config is safe to run with.
    ///
    /// - `win_score` is at least 1, so a fresh game is never already won.
    /// - `round_timeout` is at least one second.
    /// - `spawn_points` is never empty; an empty list falls back to the
    ///   default corners.
    /// - `min_players` is at least 1 and at most [`max_players`](Self::max_players).
    pub fn validated(mut self) -> Self {
        if self.win_score < 1 {
            tracing::warn!(win_score = self.win_score, "win_score below 1, clamping");
            self.win_score = 1;
        }
        if self.round_timeout < MIN_ROUND_TIMEOUT {
            tracing::warn!(
                round_timeout_ms = self.round_timeout.as_millis() as u64,
                "round_timeout too short, clamping"
            );
            self.round_timeout = MIN_ROUND_TIMEOUT;
        }
        if self.spawn_points.is_empty() {
            tracing::warn!("no spawn points configured, using the default corners");
            self.spawn_points = Self::default().spawn_points;
        }
        let max = self.max_players();
        if self.min_players == 0 || self.min_players > max {
            tracing::warn!(
                min_players = self.min_players,
                max_players = max,
                "min_players out of range, clamping"
            );
            self.min_players = self.min_players.clamp(1, max);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its game lifecycle.
///
/// ```text
///          startGame           start delay            win score
///   Idle ────────────→ Starting ──────────→ RoundActive ─────────→ GameOver
///                         ↑                  ⟲ collision/timeout      │
///                         └──────────────── startGame ────────────────┘
///
///   Starting / RoundActive ── member left ──→ Idle
/// ```
///
/// `Resolved` from the round diagram is not a stored phase: a round is
/// resolved and the next one begun inside a single actor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    /// No game running. Members can chat in the waiting room.
    Idle,
    /// `startGame` was called; the first round starts when the delay ends.
    Starting,
    /// A round is running with exactly one IT and an armed round timer.
    RoundActive,
    /// Someone reached the win score. Terminal until the next `startGame`.
    GameOver,
}

impl RoomPhase {
    /// Returns `true` while a game is starting or running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Starting | Self::RoundActive)
    }

    /// Returns `true` if moving from `self` to `target` is a legal step.
    pub fn can_transition_to(self, target: Self) -> bool {
        use RoomPhase::*;
        matches!(
            (self, target),
            (Idle, Starting)
                | (Starting, Starting | RoundActive | Idle)
                | (RoundActive, RoundActive | GameOver | Idle | Starting)
                | (GameOver, Starting)
        )
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Starting => write!(f, "Starting"),
            Self::RoundActive => write!(f, "RoundActive"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.win_score, 10);
        assert_eq!(config.round_timeout, Duration::from_secs(20));
        assert_eq!(config.start_delay, Duration::from_secs(5));
        assert_eq!(config.max_players(), 4);
        assert_eq!(config.ready_players, 2);
    }

    #[test]
    fn test_default_spawn_points_are_arena_corners() {
        let config = RoomConfig::default();
        for corner in [(8.0, 8.0), (120.0, 8.0), (120.0, 120.0), (8.0, 120.0)] {
            assert!(config.spawn_points.contains(&Position::new(corner.0, corner.1)));
        }
    }

    #[test]
    fn test_validated_clamps_bad_values() {
        let config = RoomConfig {
            win_score: 0,
            min_players: 9,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.win_score, 1);
        assert_eq!(config.min_players, 4);
    }

    #[test]
    fn test_validated_clamps_zero_round_timeout() {
        let config = RoomConfig {
            round_timeout: Duration::ZERO,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.round_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_validated_refills_empty_spawn_points() {
        let config = RoomConfig {
            spawn_points: Vec::new(),
            min_players: 2,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.spawn_points, RoomConfig::default().spawn_points);
        assert_eq!(config.max_players(), 4);
        assert_eq!(config.min_players, 2, "min_players is checked against the refilled corners");
    }

    #[test]
    fn test_validated_keeps_good_values() {
        let config = RoomConfig::default().validated();
        assert_eq!(config, RoomConfig::default());
    }

    #[test]
    fn test_phase_transitions() {
        use RoomPhase::*;
        assert!(Idle.can_transition_to(Starting));
        assert!(Starting.can_transition_to(RoundActive));
        assert!(RoundActive.can_transition_to(RoundActive));
        assert!(RoundActive.can_transition_to(GameOver));
        assert!(GameOver.can_transition_to(Starting));

        assert!(!Idle.can_transition_to(RoundActive));
        assert!(!Idle.can_transition_to(GameOver));
        assert!(!GameOver.can_transition_to(RoundActive));
        assert!(!GameOver.can_transition_to(Idle));
    }

    #[test]
    fn test_phase_is_running() {
        assert!(!RoomPhase::Idle.is_running());
        assert!(RoomPhase::Starting.is_running());
        assert!(RoomPhase::RoundActive.is_running());
        assert!(!RoomPhase::GameOver.is_running());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RoomPhase::RoundActive.to_string(), "RoundActive");
        assert_eq!(RoomPhase::GameOver.to_string(), "GameOver");
    }
}
