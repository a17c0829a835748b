//! The assembled core: cycle controller, session log, task ledger and stats,
//! driven by an injected clock and reporting through an event sink.
//!
//! Each public command maps to one front-end action (`start_timer`,
//! `add_task`, ...). The host owns the tick schedule: it polls
//! [`Pomodoro::pending_tick`] and hands the token back to [`Pomodoro::tick`].

use std::rc::Rc;

use chrono::{NaiveDate, Utc};

use crate::clock::Clock;
use crate::error::{PersistenceError, Result};
use crate::events::{Event, EventSink};
use crate::stats::{Stats, StatsEngine};
use crate::storage::kv::{load_or_default, save_json, KeyValueStore, DURATIONS_KEY};
use crate::storage::{SessionRecord, SessionStore};
use crate::task::{Task, TaskLedger};
use crate::timer::{
    CycleController, CycleState, CycleTick, DurationChange, DurationConfig, SessionType,
    StartOutcome, TickToken, Transition,
};

pub struct Pomodoro<C: Clock, S: EventSink> {
    clock: C,
    kv: Rc<dyn KeyValueStore>,
    cycle: CycleController,
    sessions: SessionStore,
    tasks: TaskLedger,
    stats: Stats,
    sink: S,
}

impl<C: Clock, S: EventSink> Pomodoro<C, S> {
    /// Load persisted state from `kv` and start at `Work(1)`.
    ///
    /// Unreadable data falls back to defaults; each fallback is reported as a
    /// [`Event::PersistenceWarning`] on `sink`.
    pub fn open(kv: Rc<dyn KeyValueStore>, clock: C, sink: S) -> Self {
        let (durations, mut warnings) = load_durations(kv.as_ref());
        let sessions = SessionStore::load(kv.clone());
        let tasks = TaskLedger::load(kv.clone());
        let mut app = Self {
            clock,
            kv,
            cycle: CycleController::new(durations),
            sessions,
            tasks,
            stats: Stats::default(),
            sink,
        };
        app.stats = app.compute_stats();
        warnings.extend(app.sessions.take_warnings());
        warnings.extend(app.tasks.take_warnings());
        for warning in warnings {
            app.emit_warning(warning);
        }
        app
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CycleState {
        self.cycle.state_at(self.clock.monotonic_ms())
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn durations(&self) -> DurationConfig {
        self.cycle.durations()
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.tasks.active_task()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn pending_tick(&self) -> Option<TickToken> {
        self.cycle.pending_tick()
    }

    pub fn auto_start_eligible(&self) -> bool {
        self.cycle.auto_start_eligible()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.wall_now().date_naive()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ── Task commands ────────────────────────────────────────────────

    pub fn add_task(&mut self, text: &str) -> Result<Task> {
        let task = self
            .tasks
            .add(text, self.clock.wall_now().with_timezone(&Utc))?;
        self.flush_warnings();
        Ok(task)
    }

    pub fn edit_task(&mut self, id: &str, text: &str) -> Result<bool> {
        let found = self.tasks.edit(id, text)?;
        self.flush_warnings();
        Ok(found)
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let deleted = self.tasks.delete(id);
        self.flush_warnings();
        if deleted {
            self.refresh_stats();
        }
        deleted
    }

    pub fn toggle_task_complete(&mut self, id: &str) -> Option<bool> {
        let completed = self.tasks.toggle_complete(id);
        self.flush_warnings();
        if completed.is_some() {
            self.refresh_stats();
        }
        completed
    }

    /// Toggle the active task. Rejected while the timer is running.
    pub fn select_task(&mut self, id: &str) -> Result<Option<String>> {
        let running = self.cycle.is_running();
        let active = self.tasks.select(id, running)?.map(str::to_string);
        self.flush_warnings();
        Ok(active)
    }

    // ── Timer commands ───────────────────────────────────────────────

    /// Start or resume; pauses instead when already running.
    pub fn start_timer(&mut self) -> StartOutcome {
        let outcome = self.cycle.start(self.clock.monotonic_ms());
        tracing::debug!(?outcome, "start requested");
        self.emit_state();
        outcome
    }

    /// Returns the remaining time captured at the pause.
    pub fn pause_timer(&mut self) -> Result<u64> {
        let remaining = self.cycle.pause(self.clock.monotonic_ms())?;
        self.emit_state();
        Ok(remaining)
    }

    pub fn reset_timer(&mut self) {
        self.cycle.reset();
        self.emit_state();
    }

    /// Move on without recording the current session.
    pub fn skip_session(&mut self) -> Transition {
        let transition = self.cycle.skip();
        tracing::info!(from = ?transition.from.session_type, "session skipped");
        self.emit_state();
        transition
    }

    pub fn stop_timer(&mut self) {
        self.cycle.stop();
        self.emit_state();
    }

    /// Persist new session lengths and hand them to the controller.
    pub fn save_duration_config(&mut self, durations: DurationConfig) -> Result<DurationChange> {
        durations.validate()?;
        if let Err(e) = save_json(self.kv.as_ref(), DURATIONS_KEY, &durations) {
            self.emit_warning(e);
        }
        let change = self.cycle.set_durations(durations);
        if change == DurationChange::Applied {
            self.emit_state();
        }
        Ok(change)
    }

    /// Erase the session log. Confirming with the user is the caller's job.
    pub fn clear_history(&mut self) {
        self.sessions.clear();
        tracing::info!("session history cleared");
        self.flush_warnings();
        self.refresh_stats();
    }

    // ── Host scheduling ──────────────────────────────────────────────

    /// Deliver the tick identified by `token`. Stale tokens are ignored.
    ///
    /// Returns the record when this tick completed a session.
    pub fn tick(&mut self, token: TickToken) -> Option<SessionRecord> {
        match self.cycle.tick(token, self.clock.monotonic_ms()) {
            CycleTick::Stale => None,
            CycleTick::Running {
                remaining_ms,
                total_ms,
            } => {
                self.sink.emit(&Event::Tick {
                    remaining_ms,
                    total_ms,
                });
                None
            }
            CycleTick::Finished { position, total_ms } => {
                self.sink.emit(&Event::Tick {
                    remaining_ms: 0,
                    total_ms,
                });
                Some(self.complete(position.session_type, total_ms))
            }
        }
    }

    /// Deliver the currently scheduled tick, if any.
    pub fn tick_pending(&mut self) -> Option<SessionRecord> {
        let token = self.cycle.pending_tick()?;
        self.tick(token)
    }

    /// The host stopped delivering ticks.
    pub fn host_hidden(&mut self) {
        self.cycle.host_hidden(self.clock.monotonic_ms());
    }

    /// The host resumed delivering ticks; hidden time is excluded.
    pub fn host_visible(&mut self) -> Option<u64> {
        let hidden = self.cycle.host_visible(self.clock.monotonic_ms());
        if let Some(hidden_ms) = hidden {
            tracing::debug!(hidden_ms, "excluded suspended time from countdown");
        }
        hidden
    }

    /// Retroactive report that ticks were withheld for `hidden_ms`.
    pub fn adjust_for_suspension(&mut self, hidden_ms: u64) -> bool {
        self.cycle.adjust_for_suspension(hidden_ms)
    }

    /// Recompute statistics and publish them if they changed.
    pub fn refresh_stats(&mut self) {
        let stats = self.compute_stats();
        if stats != self.stats {
            self.stats = stats;
            self.sink.emit(&Event::StatsChanged {
                stats: self.stats.clone(),
            });
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self, session_type: SessionType, total_ms: u64) -> SessionRecord {
        let record = SessionRecord::completed(
            session_type,
            total_ms,
            self.clock.wall_now(),
            self.tasks.active_task(),
        );
        self.sessions.append(record.clone());
        if let Some(task_id) = &record.task_id {
            self.tasks.record_work_session(task_id);
        }
        tracing::info!(
            session_type = ?record.session_type,
            minutes = record.duration_minutes,
            task = record.task_name.as_deref().unwrap_or("-"),
            "session completed"
        );

        let transition = self.cycle.complete();
        self.sink.emit(&Event::SessionCompleted {
            record: record.clone(),
        });
        self.emit_state();
        if transition.auto_start_eligible {
            self.sink.emit(&Event::BreakAutoStartEligible {
                session_type: transition.to.session_type,
            });
        }
        self.flush_warnings();
        self.refresh_stats();
        record
    }

    fn compute_stats(&self) -> Stats {
        let mut stats = StatsEngine::compute(self.sessions.all(), self.today());
        stats.tasks_completed = self.tasks.completed_count() as u64;
        stats
    }

    fn emit_state(&mut self) {
        let state = self.state();
        self.sink.emit(&Event::StateChanged { state });
    }

    fn flush_warnings(&mut self) {
        let mut warnings = self.sessions.take_warnings();
        warnings.extend(self.tasks.take_warnings());
        for warning in warnings {
            self.emit_warning(warning);
        }
    }

    fn emit_warning(&mut self, warning: PersistenceError) {
        tracing::warn!(error = %warning, "persistence failure");
        self.sink.emit(&Event::PersistenceWarning {
            key: warning.key().map(str::to_string),
            message: warning.to_string(),
        });
    }
}

fn load_durations(kv: &dyn KeyValueStore) -> (DurationConfig, Vec<PersistenceError>) {
    let (durations, warning) = load_or_default::<DurationConfig>(kv, DURATIONS_KEY);
    match durations.validate() {
        Ok(()) => (durations, warning.into_iter().collect()),
        Err(e) => (
            DurationConfig::default(),
            vec![PersistenceError::ReadFailed {
                key: DURATIONS_KEY.to_string(),
                message: e.to_string(),
            }],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Local, TimeZone};

    fn setup() -> (ManualClock, Rc<MemoryStore>, Pomodoro<ManualClock, Vec<Event>>) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap());
        let kv = Rc::new(MemoryStore::new());
        let app = Pomodoro::open(kv.clone(), clock.clone(), Vec::new());
        (clock, kv, app)
    }

    fn run_to_completion(clock: &ManualClock, app: &mut Pomodoro<ManualClock, Vec<Event>>) -> Option<SessionRecord> {
        app.start_timer();
        clock.advance(app.state().total_duration_ms);
        app.tick_pending()
    }

    #[test]
    fn completion_records_and_credits_task() {
        let (clock, _, mut app) = setup();
        let task = app.add_task("write report").unwrap();
        app.select_task(&task.id).unwrap();

        let record = run_to_completion(&clock, &mut app).expect("session completed");
        assert_eq!(record.session_type, SessionType::Work);
        assert_eq!(record.task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(app.sessions().len(), 1);
        assert_eq!(app.tasks()[0].sessions_spent, 1);
        assert_eq!(app.stats().total_sessions, 1);
        assert_eq!(app.state().session_type, SessionType::ShortBreak);

        let events = app.sink();
        assert!(events.iter().any(|e| matches!(e, Event::SessionCompleted { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            Event::BreakAutoStartEligible { session_type: SessionType::ShortBreak }
        )));
        assert!(events.iter().any(|e| matches!(e, Event::StatsChanged { stats } if stats.total_sessions == 1)));
    }

    #[test]
    fn break_completion_does_not_credit_task() {
        let (clock, _, mut app) = setup();
        let task = app.add_task("a").unwrap();
        app.select_task(&task.id).unwrap();
        run_to_completion(&clock, &mut app);
        let record = run_to_completion(&clock, &mut app).unwrap();
        assert_eq!(record.session_type, SessionType::ShortBreak);
        assert!(record.task_id.is_none());
        assert_eq!(app.tasks()[0].sessions_spent, 1);
        assert_eq!(app.stats().total_sessions, 1);
    }

    #[test]
    fn skip_never_records() {
        let (clock, _, mut app) = setup();
        app.start_timer();
        clock.advance(60_000);
        app.tick_pending();
        app.skip_session();
        assert!(app.sessions().is_empty());
        assert!(!app.sink().iter().any(|e| matches!(e, Event::SessionCompleted { .. })));
        assert_eq!(app.state().session_type, SessionType::ShortBreak);
        assert!(!app.auto_start_eligible());
    }

    #[test]
    fn select_is_locked_while_running() {
        let (_, _, mut app) = setup();
        let task = app.add_task("a").unwrap();
        app.start_timer();
        assert!(matches!(
            app.select_task(&task.id),
            Err(crate::error::CoreError::InvalidOperation(_))
        ));
        app.pause_timer().unwrap();
        assert_eq!(app.select_task(&task.id).unwrap(), Some(task.id));
    }

    #[test]
    fn pause_while_idle_is_invalid() {
        let (_, _, mut app) = setup();
        assert!(app.pause_timer().is_err());
        assert!(app.sink().is_empty());
    }

    #[test]
    fn stale_tick_after_pause_does_not_resume() {
        let (clock, _, mut app) = setup();
        app.start_timer();
        let token = app.pending_tick().unwrap();
        clock.advance(10_000);
        app.pause_timer().unwrap();
        clock.advance(10_000);
        assert!(app.tick(token).is_none());
        let state = app.state();
        assert!(state.paused);
        assert_eq!(state.remaining_ms, 1_490_000);
    }

    #[test]
    fn durations_persist_and_reject_bad_input() {
        let (clock, kv, mut app) = setup();
        let bad = DurationConfig {
            work_minutes: 0,
            short_break_minutes: 5,
            long_break_minutes: 15,
        };
        assert!(app.save_duration_config(bad).is_err());
        assert_eq!(app.durations(), DurationConfig::default());

        let cfg = DurationConfig::new(50, 10, 20).unwrap();
        assert_eq!(app.save_duration_config(cfg).unwrap(), DurationChange::Applied);
        assert_eq!(app.state().remaining_ms, 3_000_000);

        let reopened = Pomodoro::open(kv, clock, Vec::new());
        assert_eq!(reopened.durations(), cfg);
    }

    #[test]
    fn out_of_range_stored_durations_fall_back() {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap());
        let kv = Rc::new(MemoryStore::new());
        kv.insert_raw(DURATIONS_KEY, r#"{"workMinutes":90,"shortBreakMinutes":5,"longBreakMinutes":15}"#);
        let app = Pomodoro::open(kv, clock, Vec::new());
        assert_eq!(app.durations(), DurationConfig::default());
        assert!(matches!(app.sink()[0], Event::PersistenceWarning { .. }));
    }

    #[test]
    fn write_failures_surface_as_warnings() {
        let (clock, kv, mut app) = setup();
        kv.reject_writes(true);
        let record = run_to_completion(&clock, &mut app);
        assert!(record.is_some());
        assert_eq!(app.sessions().len(), 1);
        assert!(app.sink().iter().any(|e| matches!(
            e,
            Event::PersistenceWarning { key: Some(k), .. } if k == "cadence.sessions"
        )));
    }

    #[test]
    fn clear_history_resets_stats() {
        let (clock, _, mut app) = setup();
        run_to_completion(&clock, &mut app);
        assert_eq!(app.stats().total_sessions, 1);
        app.clear_history();
        assert_eq!(app.stats().total_sessions, 0);
        assert!(app.sessions().is_empty());
    }

    #[test]
    fn toggling_tasks_updates_completed_count() {
        let (_, _, mut app) = setup();
        let task = app.add_task("a").unwrap();
        app.toggle_task_complete(&task.id);
        assert_eq!(app.stats().tasks_completed, 1);
        app.delete_task(&task.id);
        assert_eq!(app.stats().tasks_completed, 0);
    }

    #[test]
    fn visibility_gap_is_excluded() {
        let (clock, _, mut app) = setup();
        app.start_timer();
        clock.advance(60_000);
        app.host_hidden();
        clock.advance(600_000);
        assert_eq!(app.host_visible(), Some(600_000));
        assert_eq!(app.state().remaining_ms, 1_440_000);
    }

    #[test]
    fn remaining_never_rises_across_hide_and_show() {
        let (clock, _, mut app) = setup();
        app.start_timer();
        app.host_hidden();
        let mut last = app.state().remaining_ms;
        for _ in 0..3 {
            clock.advance(60_000);
            assert_eq!(app.tick_pending(), None);
            let now = app.state().remaining_ms;
            assert!(now <= last, "remaining rose from {last} to {now}");
            last = now;
        }
        clock.advance(1_000);
        assert_eq!(app.host_visible(), Some(181_000));
        assert!(app.state().remaining_ms <= last);

        clock.advance(1_000);
        app.tick_pending();
        assert_eq!(app.state().remaining_ms, 1_499_000);
        assert!(app
            .sink()
            .iter()
            .all(|e| !matches!(e, Event::Tick { remaining_ms, .. } if *remaining_ms < 1_499_000)));
    }

    #[test]
    fn long_hide_does_not_complete_a_session() {
        let (clock, _, mut app) = setup();
        app.start_timer();
        app.host_hidden();
        clock.advance(2 * 60 * 60 * 1000);
        assert_eq!(app.tick_pending(), None);
        assert!(app.sessions().is_empty());
        assert_eq!(app.state().session_type, SessionType::Work);
        assert_eq!(app.state().remaining_ms, 1_500_000);
    }

    #[test]
    fn tasks_are_stamped_by_the_clock() {
        let (clock, _, mut app) = setup();
        clock.advance(90_000);
        let task = app.add_task("a").unwrap();
        let expected = Local.with_ymd_and_hms(2024, 1, 3, 9, 1, 30).unwrap();
        assert_eq!(task.created_at, expected.with_timezone(&Utc));
    }
}
