//! Integration tests for the full work/break cycle.
//!
//! Drives the assembled core with a manual clock through complete cycles,
//! checking the session log, task credit and statistics along the way.

use std::rc::Rc;

use cadence_core::timer::CyclePosition;
use cadence_core::{
    Database, DurationConfig, Event, ManualClock, MemoryStore, Pomodoro, SessionType,
};
use chrono::{Duration, Local, TimeZone};

fn clock() -> ManualClock {
    ManualClock::new(Local.with_ymd_and_hms(2024, 1, 3, 8, 0, 0).unwrap())
}

fn finish_current(clock: &ManualClock, app: &mut Pomodoro<ManualClock, Vec<Event>>) {
    app.start_timer();
    // Several ticks, then one late tick that overshoots the end.
    for _ in 0..3 {
        clock.advance(1_000);
        app.tick_pending();
    }
    clock.advance(app.state().total_duration_ms);
    assert!(app.tick_pending().is_some(), "session should complete");
}

#[test]
fn test_full_cycle_records_every_session() {
    let clock = clock();
    let mut app = Pomodoro::open(Rc::new(MemoryStore::new()), clock.clone(), Vec::new());

    let mut positions = vec![app.state()];
    for _ in 0..8 {
        finish_current(&clock, &mut app);
        positions.push(app.state());
    }

    let types: Vec<_> = positions.iter().map(|s| (s.session_type, s.session_count)).collect();
    assert_eq!(
        types,
        vec![
            (SessionType::Work, 1),
            (SessionType::ShortBreak, 1),
            (SessionType::Work, 2),
            (SessionType::ShortBreak, 2),
            (SessionType::Work, 3),
            (SessionType::ShortBreak, 3),
            (SessionType::Work, 4),
            (SessionType::LongBreak, 4),
            (SessionType::Work, 1),
        ]
    );

    assert_eq!(app.sessions().len(), 8);
    assert_eq!(app.stats().total_sessions, 4);
    assert_eq!(app.stats().sessions_today, 4);
    assert_eq!(app.stats().focus_minutes_today, 100.0);
    assert_eq!(app.stats().streak_days, 1);

    let latest = app.sessions().all().next().unwrap();
    assert_eq!(latest.session_type, SessionType::LongBreak);
    assert_eq!(latest.duration_minutes, 15.0);
}

#[test]
fn test_completed_work_session_bound_to_task() {
    let clock = clock();
    let mut app = Pomodoro::open(Rc::new(MemoryStore::new()), clock.clone(), Vec::new());
    let task = app.add_task("write report").unwrap();
    app.select_task(&task.id).unwrap();
    let before = app.stats().total_sessions;

    finish_current(&clock, &mut app);

    let records: Vec<_> = app.sessions().all().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session_type, SessionType::Work);
    assert_eq!(records[0].task_id.as_deref(), Some(task.id.as_str()));
    assert_eq!(records[0].task_name.as_deref(), Some("write report"));
    assert_eq!(app.tasks()[0].sessions_spent, 1);
    assert_eq!(app.stats().total_sessions, before + 1);

    // Renaming the task later does not rewrite history.
    app.edit_task(&task.id, "renamed").unwrap();
    let record = app.sessions().all().next().unwrap();
    assert_eq!(record.task_name.as_deref(), Some("write report"));
}

#[test]
fn test_skips_are_not_recorded() {
    let clock = clock();
    let mut app = Pomodoro::open(Rc::new(MemoryStore::new()), clock.clone(), Vec::new());
    for _ in 0..8 {
        app.start_timer();
        clock.advance(30_000);
        app.tick_pending();
        app.skip_session();
    }
    assert_eq!(app.state().session_type, SessionType::Work);
    assert_eq!(app.state().session_count, 1);
    assert!(app.sessions().is_empty());
    assert_eq!(app.stats().total_sessions, 0);
}

#[test]
fn test_long_suspension_completes_in_one_jump() {
    let clock = clock();
    let mut app = Pomodoro::open(Rc::new(MemoryStore::new()), clock.clone(), Vec::new());
    app.start_timer();
    clock.advance(3 * 60 * 60 * 1000);
    let record = app.tick_pending().expect("completed after the gap");
    assert_eq!(record.duration_minutes, 25.0);

    let ticks: Vec<_> = app
        .sink()
        .iter()
        .filter(|e| matches!(e, Event::Tick { .. }))
        .collect();
    assert_eq!(ticks.len(), 1);
    assert_eq!(app.pending_tick(), None);
}

#[test]
fn test_pause_resume_matches_uninterrupted_trajectory() {
    let clock = clock();
    let mut app = Pomodoro::open(Rc::new(MemoryStore::new()), clock.clone(), Vec::new());
    app.start_timer();
    clock.advance(500_000);
    assert_eq!(app.pause_timer().unwrap(), 1_000_000);
    clock.advance(7_200_000);
    app.start_timer();
    assert_eq!(app.state().remaining_ms, 1_000_000);
    clock.advance(250_000);
    assert_eq!(app.state().remaining_ms, 750_000);
}

#[test]
fn test_stop_discards_progress() {
    let clock = clock();
    let mut app = Pomodoro::open(Rc::new(MemoryStore::new()), clock.clone(), Vec::new());
    finish_current(&clock, &mut app);
    app.start_timer();
    clock.advance(100_000);
    app.stop_timer();
    let state = app.state();
    assert_eq!(
        CyclePosition {
            session_type: state.session_type,
            session_count: state.session_count
        },
        CyclePosition::initial()
    );
    assert!(!state.running && !state.paused);
    assert_eq!(state.remaining_ms, 1_500_000);
    assert_eq!(app.sessions().len(), 1);
}

#[test]
fn test_streak_spans_days() {
    let clock = clock();
    let mut app = Pomodoro::open(Rc::new(MemoryStore::new()), clock.clone(), Vec::new());
    for _ in 0..3 {
        finish_current(&clock, &mut app);
        app.stop_timer();
        clock.advance(Duration::days(1).num_milliseconds() as u64);
    }
    // Three consecutive days with work; "today" is now the day after the last.
    app.refresh_stats();
    assert_eq!(app.stats().streak_days, 3);
    assert_eq!(app.stats().sessions_today, 0);

    clock.advance(Duration::days(1).num_milliseconds() as u64);
    app.refresh_stats();
    assert_eq!(app.stats().streak_days, 0);
}

#[test]
fn test_state_survives_restart_except_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.db");
    let clock = clock();
    let task_id = {
        let db = Database::open_at(&path).unwrap();
        let mut app = Pomodoro::open(Rc::new(db), clock.clone(), Vec::new());
        app.save_duration_config(DurationConfig::new(1, 1, 1).unwrap())
            .unwrap();
        let task = app.add_task("persisted").unwrap();
        app.select_task(&task.id).unwrap();
        finish_current(&clock, &mut app);
        assert_eq!(app.state().session_type, SessionType::ShortBreak);
        task.id
    };

    let db = Database::open_at(&path).unwrap();
    let app = Pomodoro::open(Rc::new(db), clock, Vec::new());
    assert_eq!(app.durations(), DurationConfig::new(1, 1, 1).unwrap());
    assert_eq!(app.active_task().map(|t| t.id.as_str()), Some(task_id.as_str()));
    assert_eq!(app.tasks()[0].sessions_spent, 1);
    assert_eq!(app.sessions().len(), 1);
    assert_eq!(app.stats().total_sessions, 1);
    // The cycle itself always restarts at Work(1).
    assert_eq!(app.state().session_type, SessionType::Work);
    assert_eq!(app.state().session_count, 1);
    assert!(app.sink().is_empty());
}
