use serde::{Deserialize, Serialize};

use crate::stats::Stats;
use crate::storage::SessionRecord;
use crate::timer::{CycleState, SessionType};

/// Every observable change in the core produces an Event.
/// Front ends render them; nothing in the core depends on how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// One per delivered tick while running.
    Tick { remaining_ms: u64, total_ms: u64 },
    /// start/pause/resume/reset/skip/stop/complete.
    StateChanged { state: CycleState },
    /// Natural completions only, never skips.
    SessionCompleted { record: SessionRecord },
    StatsChanged { stats: Stats },
    /// A break was entered by completion; the host may start it.
    BreakAutoStartEligible { session_type: SessionType },
    /// A write or read failed; in-memory state is still authoritative.
    PersistenceWarning { key: Option<String>, message: String },
}

/// Receiver of core events, called synchronously in emission order.
pub trait EventSink {
    fn emit(&mut self, event: &Event);
}

impl<F: FnMut(&Event)> EventSink for F {
    fn emit(&mut self, event: &Event) {
        self(event)
    }
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

impl EventSink for std::sync::mpsc::Sender<Event> {
    fn emit(&mut self, event: &Event) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.send(event.clone());
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &Event) {}
}
