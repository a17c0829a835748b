//! Time sources for the cycle controller.
//!
//! Two notions of time are kept apart:
//! - monotonic milliseconds, used for countdown math and immune to wall-clock
//!   adjustments;
//! - local wall-clock time, used only to stamp session records and decide
//!   which calendar day "today" is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Duration, Local};

/// Source of "now" injected into the controller.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin. Never decreases.
    fn monotonic_ms(&self) -> u64;

    /// Current local wall-clock time.
    fn wall_now(&self) -> DateTime<Local>;
}

/// Real clock backed by [`Instant`] and [`Local::now`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn wall_now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Hand-driven clock for deterministic tests and simulations.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// pass another to the controller.
#[derive(Debug, Clone)]
pub struct ManualClock {
    monotonic: Arc<AtomicU64>,
    wall: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    /// Start at monotonic time zero and the given wall-clock time.
    pub fn new(wall: DateTime<Local>) -> Self {
        Self {
            monotonic: Arc::new(AtomicU64::new(0)),
            wall: Arc::new(Mutex::new(wall)),
        }
    }

    /// Move both time lines forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.monotonic.fetch_add(ms, Ordering::SeqCst);
        if let Ok(mut wall) = self.wall.lock() {
            *wall += Duration::milliseconds(ms as i64);
        }
    }

    /// Jump the wall clock without touching monotonic time.
    pub fn set_wall(&self, wall: DateTime<Local>) {
        if let Ok(mut current) = self.wall.lock() {
            *current = wall;
        }
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.monotonic.load(Ordering::SeqCst)
    }

    fn wall_now(&self) -> DateTime<Local> {
        match self.wall.lock() {
            Ok(wall) => *wall,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
