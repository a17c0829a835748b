//! Timer engine implementation.
//!
//! The engine is an anchor-based countdown. It owns no thread and no clock:
//! every command takes the current monotonic time, and the host scheduler is
//! responsible for delivering ticks.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused -> Running)* -> Completed
//! ```
//!
//! ## Tick scheduling
//!
//! Whenever the engine wants another tick it hands out a [`TickToken`]. At most
//! one token is outstanding. Pausing, resetting or restarting invalidates the
//! token *before* touching any other field, so a tick that was already queued
//! by the host comes back as [`Tick::Stale`] and cannot resurrect a paused
//! countdown.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(1_500_000);
//! let token = engine.start(1_500_000, clock.monotonic_ms());
//! // later, from the host scheduler:
//! match engine.tick(token, clock.monotonic_ms()) { .. }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::InvalidOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Handle for the single scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(u64);

/// Outcome of delivering a tick to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The token was cancelled or the engine is not running. Nothing changed.
    Stale,
    /// Still counting down; `next` is the newly scheduled tick.
    Running {
        remaining_ms: u64,
        total_ms: u64,
        next: TickToken,
    },
    /// The countdown reached zero. Reported exactly once per start/resume.
    Completed { total_ms: u64 },
}

/// Remaining time for a countdown of `total_ms` anchored at `anchor_ms`.
///
/// `max(0, total - (now - anchor))`. An anchor in the future (after a
/// suspension adjustment) counts as zero elapsed time.
pub fn remaining_at(total_ms: u64, anchor_ms: u64, now_ms: u64) -> u64 {
    total_ms.saturating_sub(now_ms.saturating_sub(anchor_ms))
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    state: TimerState,
    total_ms: u64,
    /// Last computed remaining time. Authoritative while not running.
    remaining_ms: u64,
    /// Monotonic time the countdown is measured from. Set only while running.
    anchor_ms: Option<u64>,
    pending: Option<TickToken>,
    generation: u64,
}

impl TimerEngine {
    /// Create an idle engine loaded with a full `total_ms` countdown.
    pub fn new(total_ms: u64) -> Self {
        Self {
            state: TimerState::Idle,
            total_ms,
            remaining_ms: total_ms,
            anchor_ms: None,
            pending: None,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    /// Remaining time as of the last command or tick.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn anchor_ms(&self) -> Option<u64> {
        self.anchor_ms
    }

    pub fn pending_tick(&self) -> Option<TickToken> {
        self.pending
    }

    /// Remaining time at `now_ms` without mutating the engine.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        match (self.state, self.anchor_ms) {
            (TimerState::Running, Some(anchor)) => remaining_at(self.total_ms, anchor, now_ms),
            _ => self.remaining_ms,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh countdown of `total_ms`.
    pub fn start(&mut self, total_ms: u64, now_ms: u64) -> TickToken {
        self.cancel();
        self.total_ms = total_ms;
        self.remaining_ms = total_ms;
        self.anchor_ms = Some(now_ms);
        self.state = TimerState::Running;
        self.schedule()
    }

    /// Continue a countdown with `remaining_ms` left, preserving elapsed time.
    pub fn resume(&mut self, total_ms: u64, remaining_ms: u64, now_ms: u64) -> TickToken {
        self.cancel();
        let remaining_ms = remaining_ms.min(total_ms);
        let elapsed = total_ms - remaining_ms;
        self.total_ms = total_ms;
        self.remaining_ms = remaining_ms;
        self.anchor_ms = Some(now_ms.saturating_sub(elapsed));
        self.state = TimerState::Running;
        self.schedule()
    }

    /// Freeze the countdown. Returns the captured remaining time.
    pub fn pause(&mut self, now_ms: u64) -> Result<u64, InvalidOperation> {
        if self.state != TimerState::Running {
            return Err(InvalidOperation::NotRunning);
        }
        self.cancel();
        self.remaining_ms = self.remaining_at(now_ms);
        self.anchor_ms = None;
        self.state = TimerState::Paused;
        Ok(self.remaining_ms)
    }

    /// Drop any progress and reload a full `total_ms` countdown.
    pub fn reset(&mut self, total_ms: u64) {
        self.cancel();
        self.total_ms = total_ms;
        self.remaining_ms = total_ms;
        self.anchor_ms = None;
        self.state = TimerState::Idle;
    }

    /// Deliver a scheduled tick.
    pub fn tick(&mut self, token: TickToken, now_ms: u64) -> Tick {
        if self.state != TimerState::Running || self.pending != Some(token) {
            return Tick::Stale;
        }
        self.pending = None;
        self.remaining_ms = self.remaining_at(now_ms);
        if self.remaining_ms == 0 {
            self.anchor_ms = None;
            self.state = TimerState::Completed;
            return Tick::Completed {
                total_ms: self.total_ms,
            };
        }
        Tick::Running {
            remaining_ms: self.remaining_ms,
            total_ms: self.total_ms,
            next: self.schedule(),
        }
    }

    /// Shift the anchor forward by time during which ticks were withheld, so
    /// that suspended time does not count against the countdown.
    ///
    /// Returns `false` (and does nothing) unless the engine is running.
    pub fn adjust_for_suspension(&mut self, hidden_ms: u64) -> bool {
        match (self.state, self.anchor_ms.as_mut()) {
            (TimerState::Running, Some(anchor)) => {
                *anchor = anchor.saturating_add(hidden_ms);
                true
            }
            _ => false,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn cancel(&mut self) {
        self.pending = None;
        self.generation = self.generation.wrapping_add(1);
    }

    fn schedule(&mut self) -> TickToken {
        self.generation = self.generation.wrapping_add(1);
        let token = TickToken(self.generation);
        self.pending = Some(token);
        token
    }
}
