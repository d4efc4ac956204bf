//! Fire-once cancelable deadlines for Tagrush room actors.
//!
//! A room needs two timers: the game-start delay and the round-failure
//! timeout. Both are "fire once, maybe cancel first, never fire twice".
//! [`Deadline`] models exactly that as a plain field on the actor, so
//! there is no spawned task to abort and no flag to check after waking.
//!
//! # Integration
//!
//! The deadline sits inside the room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = receiver.recv() => { /* handle commands */ }
//!         _ = round_timer.expired() => { /* round failed */ }
//!     }
//! }
//! ```
//!
//! A disarmed deadline pends forever, so a canceled timer can never win
//! the `select!`. Arming again replaces the previous deadline, so at most
//! one expiry is ever outstanding per `Deadline`.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Wake-ups later than this are reported as a backlog warning.
const LATE_WARN_THRESHOLD: Duration = Duration::from_millis(100);

/// Information about a deadline that fired, returned by [`Deadline::expired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    /// Generation of the arm that fired. Increases by one on every
    /// [`Deadline::arm`], so callers can tell which arming they observed.
    pub generation: u64,
    /// How long after the scheduled instant the owner actually woke up.
    pub late_by: Duration,
}

/// A single fire-once timer that can be armed, re-armed, and canceled.
#[derive(Debug)]
pub struct Deadline {
    label: &'static str,
    at: Option<Instant>,
    generation: u64,
}

impl Deadline {
    /// Creates a disarmed deadline. `label` only appears in logs.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            at: None,
            generation: 0,
        }
    }

    /// Arms the deadline to fire `after` from now, replacing any pending
    /// deadline. Returns the new generation.
    pub fn arm(&mut self, after: Duration) -> u64 {
        let replaced = self.at.is_some();
        self.generation += 1;
        self.at = Some(Instant::now() + after);
        debug!(
            timer = self.label,
            generation = self.generation,
            after_ms = after.as_millis() as u64,
            replaced,
            "deadline armed"
        );
        self.generation
    }

    /// Disarms the deadline. Returns `true` if one was pending.
    ///
    /// Idempotent.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.at.take().is_some();
        if was_armed {
            debug!(
                timer = self.label,
                generation = self.generation,
                "deadline canceled"
            );
        }
        was_armed
    }

    /// Whether an expiry is pending.
    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Time left until expiry, or `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Waits until the deadline fires, then disarms it.
    ///
    /// Pends forever while disarmed. Cancel-safe: dropping the future
    /// before it completes leaves the deadline armed and unchanged.
    pub async fn expired(&mut self) -> Expiry {
        let Some(at) = self.at else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(at).await;

        self.at = None;
        let late_by = Instant::now().saturating_duration_since(at);
        if late_by > LATE_WARN_THRESHOLD {
            warn!(
                timer = self.label,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "deadline fired late"
            );
        }
        trace!(timer = self.label, generation = self.generation, "deadline fired");

        Expiry {
            generation: self.generation,
            late_by,
        }
    }
}
