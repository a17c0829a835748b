pub mod config;
pub mod stats;
pub mod task;
pub mod timer;

use std::rc::Rc;

use cadence_core::{Database, Event, EventSink, Pomodoro, SystemClock};

/// Open the core against the on-disk store.
pub fn open_app<S: EventSink>(sink: S) -> Result<Pomodoro<SystemClock, S>, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(Pomodoro::open(Rc::new(db), SystemClock::new(), sink))
}

/// Sink for one-shot commands: only persistence warnings are worth showing.
pub fn warning_sink() -> impl FnMut(&Event) {
    |event: &Event| {
        if let Event::PersistenceWarning { message, .. } = event {
            eprintln!("warning: {message}");
        }
    }
}
