//! Round rules: spawns, role rotation, scoring, and win detection.
//!
//! These are plain functions over the member list so the rules can be
//! tested without an actor or a clock. The room actor decides *when* to
//! call them; this module decides *what* a round transition does.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use tagrush_protocol::{PlayerId, PlayerSnapshot, Position};

use crate::Player;

/// What ended the previous round (or started the first one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The start delay after `startGame` elapsed.
    Start,
    /// The chaser reported a catch.
    Collision,
    /// The round timer elapsed with no catch.
    Timeout,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Collision => write!(f, "collision"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Places members on a uniform random permutation of the spawn points,
/// member `i` on shuffled point `i`.
///
/// Callers keep `players.len() <= spawn_points.len()`; extra members (if
/// any) keep their position.
pub fn assign_spawns<R: Rng + ?Sized>(
    players: &mut [Player],
    spawn_points: &[Position],
    rng: &mut R,
) {
    let mut spawns = spawn_points.to_vec();
    spawns.shuffle(rng);
    for (player, spawn) in players.iter_mut().zip(spawns) {
        player.position = spawn;
    }
}

/// Hands the IT role to the next member and settles the catch.
///
/// In member order: whoever was IT stops being IT and, when the round
/// ended by `caught`, scores a point for the tag; the first member that
/// was not IT becomes the new IT; everyone else is not IT.
///
/// Returns the new IT, if any member was eligible.
pub fn rotate_roles(players: &mut [Player], caught: bool) -> Option<PlayerId> {
    let mut new_it = None;
    for player in players.iter_mut() {
        if player.is_it {
            player.is_it = false;
            if caught {
                player.score += 1;
            }
        } else if new_it.is_none() {
            player.is_it = true;
            new_it = Some(player.id);
        } else {
            player.is_it = false;
        }
    }
    new_it
}

/// The round failed: the current IT loses a point. Returns who it was.
pub fn penalize_it(players: &mut [Player]) -> Option<PlayerId> {
    let it = players.iter_mut().find(|p| p.is_it)?;
    it.score -= 1;
    Some(it.id)
}

/// First member (in member order) whose score reached `win_score`.
pub fn find_winner(players: &[Player], win_score: i32) -> Option<PlayerId> {
    players.iter().find(|p| p.score >= win_score).map(|p| p.id)
}

pub fn it_count(players: &[Player]) -> usize {
    players.iter().filter(|p| p.is_it).count()
}

/// Round broadcast payload: every member keyed by id.
pub fn snapshot(players: &[Player]) -> BTreeMap<PlayerId, PlayerSnapshot> {
    players.iter().map(|p| (p.id, p.snapshot())).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::RoomConfig;

    fn players(n: u64) -> Vec<Player> {
        (1..=n).map(|i| Player::new(PlayerId(i))).collect()
    }

    fn corners() -> Vec<Position> {
        RoomConfig::default().spawn_points
    }

    #[test]
    fn test_spawns_are_distinct_corners() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut ps = players(4);
        assign_spawns(&mut ps, &corners(), &mut rng);

        let taken: HashSet<(u64, u64)> = ps
            .iter()
            .map(|p| (p.position.x.to_bits(), p.position.y.to_bits()))
            .collect();
        assert_eq!(taken.len(), 4);
        for p in &ps {
            assert!(corners().contains(&p.position));
        }
    }

    #[test]
    fn test_spawns_vary_with_the_shuffle() {
        let mut seen = HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ps = players(2);
            assign_spawns(&mut ps, &corners(), &mut rng);
            seen.insert((ps[0].position.x.to_bits(), ps[0].position.y.to_bits()));
        }
        assert_eq!(seen.len(), 4, "every corner should be reachable");
    }

    #[test]
    fn test_first_round_makes_first_member_it() {
        let mut ps = players(2);
        let it = rotate_roles(&mut ps, false);
        assert_eq!(it, Some(PlayerId(1)));
        assert!(ps[0].is_it);
        assert!(!ps[1].is_it);
        assert_eq!(it_count(&ps), 1);
    }

    #[test]
    fn test_catch_scores_the_chaser_and_flips_roles() {
        let mut ps = players(2);
        ps[0].is_it = true;

        let it = rotate_roles(&mut ps, true);
        assert_eq!(it, Some(PlayerId(2)));
        assert_eq!(ps[0].score, 1, "the chaser who tagged scores");
        assert!(!ps[0].is_it);
        assert_eq!(ps[1].score, 0, "the tagged player gets nothing");
        assert!(ps[1].is_it);
    }

    #[test]
    fn test_catch_when_it_is_later_in_order() {
        let mut ps = players(2);
        ps[1].is_it = true;

        let it = rotate_roles(&mut ps, true);
        assert_eq!(it, Some(PlayerId(1)));
        assert_eq!(ps[1].score, 1);
        assert_eq!(ps[0].score, 0);
        assert_eq!(it_count(&ps), 1);
    }

    #[test]
    fn test_rotation_without_catch_does_not_score() {
        let mut ps = players(2);
        ps[0].is_it = true;
        rotate_roles(&mut ps, false);
        assert_eq!(ps[0].score, 0);
        assert_eq!(ps[1].score, 0);
        assert!(ps[1].is_it);
    }

    #[test]
    fn test_rotation_keeps_single_it_with_four_players() {
        let mut ps = players(4);
        ps[2].is_it = true;
        let it = rotate_roles(&mut ps, true);
        assert_eq!(it, Some(PlayerId(1)));
        assert_eq!(it_count(&ps), 1);
        assert_eq!(ps[2].score, 1);
    }

    #[test]
    fn test_penalize_it_decrements_below_zero() {
        let mut ps = players(2);
        ps[1].is_it = true;
        assert_eq!(penalize_it(&mut ps), Some(PlayerId(2)));
        assert_eq!(ps[1].score, -1);
        assert_eq!(ps[0].score, 0);
    }

    #[test]
    fn test_penalize_without_it_is_noop() {
        let mut ps = players(2);
        assert_eq!(penalize_it(&mut ps), None);
        assert!(ps.iter().all(|p| p.score == 0));
    }

    #[test]
    fn test_find_winner_uses_threshold() {
        let mut ps = players(2);
        ps[1].score = 9;
        assert_eq!(find_winner(&ps, 10), None);
        ps[1].score = 10;
        assert_eq!(find_winner(&ps, 10), Some(PlayerId(2)));
    }

    #[test]
    fn test_snapshot_keys_every_member() {
        let mut ps = players(2);
        ps[0].is_it = true;
        let snap = snapshot(&ps);
        assert_eq!(snap.len(), 2);
        assert!(snap[&PlayerId(1)].is_it);
        assert!(!snap[&PlayerId(2)].is_it);
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(Trigger::Collision.to_string(), "collision");
        assert_eq!(Trigger::Timeout.to_string(), "timeout");
    }
}
