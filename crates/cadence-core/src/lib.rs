//! # Cadence Core Library
//!
//! Core logic for the Cadence work/break timer. Front ends (the `cadence` CLI,
//! or any other host) drive it through commands and render the events it emits.
//!
//! ## Architecture
//!
//! - **Timer Engine**: an anchor-based countdown. `remaining` is recomputed
//!   from `(total, anchor, now)` on every tick, so withheld or late ticks never
//!   accumulate error
//! - **Cycle Controller**: `Work -> Short Break -> ... -> Long Break` state machine
//!   owning the engine
//! - **Storage**: a key-value contract (SQLite or in-memory) holding the session
//!   log, tasks and durations as JSON, plus TOML front-end preferences
//! - **Stats**: today/total/streak aggregation over the session log
//!
//! ## Key Components
//!
//! - [`Pomodoro`]: the assembled core, one method per front-end command
//! - [`CycleController`] / [`TimerEngine`]: the scheduling engine
//! - [`SessionStore`], [`TaskLedger`], [`StatsEngine`]
//! - [`Clock`]: injected time source

pub mod clock;
pub mod error;
pub mod events;
pub mod pomodoro;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, InvalidOperation, PersistenceError, ValidationError};
pub use events::{Event, EventSink, NullSink};
pub use pomodoro::Pomodoro;
pub use stats::{Stats, StatsEngine};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, SessionRecord, SessionStore};
pub use task::{Task, TaskLedger};
pub use timer::{
    CycleController, CycleState, DurationConfig, SessionType, StartOutcome, TimerEngine, TimerState,
};
