//! Integration tests for `Deadline`.
//!
//! Uses `start_paused = true` so Tokio auto-advances the clock whenever
//! the runtime is idle, making the 5 s / 20 s game timers instant.

use std::time::Duration;

use tagrush_timer::Deadline;
use tokio::time::Instant;

// =========================================================================
// Arming and firing
// =========================================================================

#[test]
fn test_new_deadline_is_disarmed() {
    let d = Deadline::new("round");
    assert!(!d.is_armed());
    assert_eq!(d.remaining(), None);
}

#[test]
fn test_first_arm_is_generation_one() {
    let mut d = Deadline::new("round");
    assert_eq!(d.arm(Duration::from_secs(1)), 1);
    assert_eq!(d.arm(Duration::from_secs(1)), 2);
}

#[tokio::test(start_paused = true)]
async fn test_armed_deadline_fires_after_duration() {
    let mut d = Deadline::new("start");
    let started = Instant::now();
    let generation = d.arm(Duration::from_secs(5));

    let expiry = d.expired().await;
    assert_eq!(expiry.generation, generation);
    assert!(expiry.late_by < Duration::from_millis(5));
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(!d.is_armed(), "fired deadline must disarm itself");
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_deadline_never_fires() {
    let mut d = Deadline::new("round");
    let result = tokio::time::timeout(Duration::from_secs(60), d.expired()).await;
    assert!(result.is_err(), "disarmed deadline should pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_fires_only_once() {
    let mut d = Deadline::new("round");
    d.arm(Duration::from_secs(1));
    d.expired().await;

    let again = tokio::time::timeout(Duration::from_secs(60), d.expired()).await;
    assert!(again.is_err(), "a deadline fires once per arm");
}

// =========================================================================
// Cancel and re-arm
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_firing() {
    let mut d = Deadline::new("round");
    d.arm(Duration::from_secs(20));
    assert!(d.cancel());
    assert!(!d.is_armed());

    let result = tokio::time::timeout(Duration::from_secs(60), d.expired()).await;
    assert!(result.is_err());
}

#[test]
fn test_cancel_is_idempotent() {
    let mut d = Deadline::new("round");
    assert!(!d.cancel());
    assert!(!d.cancel());
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_pending_deadline() {
    let mut d = Deadline::new("round");
    let first = d.arm(Duration::from_secs(20));
    tokio::time::advance(Duration::from_secs(15)).await;
    let second = d.arm(Duration::from_secs(20));
    assert_eq!(second, first + 1);

    // The first arm would have fired 5 s from here; it must not.
    let early = tokio::time::timeout(Duration::from_secs(10), d.expired()).await;
    assert!(early.is_err(), "replaced deadline must not fire");

    let expiry = d.expired().await;
    assert_eq!(expiry.generation, second);
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down() {
    let mut d = Deadline::new("start");
    d.arm(Duration::from_secs(5));
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(d.remaining(), Some(Duration::from_secs(3)));
}

// =========================================================================
// Integration: select! loop pattern (mirrors the room actor)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_rearm_from_branch() {
    let mut round = Deadline::new("round");
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    round.arm(Duration::from_secs(20));

    tokio::spawn(async move {
        // Three full timeouts, then stop.
        tokio::time::sleep(Duration::from_secs(65)).await;
        tx.send("stop").await.ok();
    });

    let mut fired = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            expiry = round.expired() => {
                fired += 1;
                assert_eq!(expiry.generation, fired);
                round.arm(Duration::from_secs(20));
            }
        }
    }

    assert_eq!(fired, 3);
}

#[tokio::test(start_paused = true)]
async fn test_two_deadlines_are_independent() {
    let mut start = Deadline::new("start");
    let mut round = Deadline::new("round");
    start.arm(Duration::from_secs(5));
    round.arm(Duration::from_secs(20));

    let first = tokio::select! {
        _ = start.expired() => "start",
        _ = round.expired() => "round",
    };
    assert_eq!(first, "start");
    assert!(round.is_armed());
    let left = round.remaining().unwrap();
    assert!(left > Duration::from_secs(14) && left <= Duration::from_secs(15));
}
