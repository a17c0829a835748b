mod cycle;
mod engine;
mod schedule;

pub use cycle::{
    CycleController, CyclePosition, CycleState, CycleTick, DurationChange, StartOutcome, Transition,
};
pub use engine::{remaining_at, Tick, TickToken, TimerEngine, TimerState};
pub use schedule::{
    format_remaining, DurationConfig, SessionType, MAX_DURATION_MIN, MIN_DURATION_MIN,
    SESSIONS_PER_CYCLE,
};
