//! Work/break cycle controller.
//!
//! Sequences `Work(1) -> ShortBreak(1) -> Work(2) -> ... -> Work(4) -> LongBreak(4) -> Work(1)`
//! and owns the single [`TimerEngine`] for the current position. Like the
//! engine, the controller takes monotonic time as an argument; the caller owns
//! the clock.

use serde::{Deserialize, Serialize};

use super::engine::{Tick, TickToken, TimerEngine, TimerState};
use super::schedule::{DurationConfig, SessionType, SESSIONS_PER_CYCLE};
use crate::error::InvalidOperation;

/// Where the controller is in the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclePosition {
    pub session_type: SessionType,
    /// Always within `1..=4`.
    pub session_count: u8,
}

impl CyclePosition {
    pub const fn initial() -> Self {
        Self {
            session_type: SessionType::Work,
            session_count: 1,
        }
    }

    /// The position entered when this one finishes or is skipped.
    pub fn next(self) -> Self {
        match self.session_type {
            SessionType::Work if self.session_count >= SESSIONS_PER_CYCLE => Self {
                session_type: SessionType::LongBreak,
                session_count: self.session_count,
            },
            SessionType::Work => Self {
                session_type: SessionType::ShortBreak,
                session_count: self.session_count,
            },
            SessionType::ShortBreak => Self {
                session_type: SessionType::Work,
                session_count: (self.session_count + 1).min(SESSIONS_PER_CYCLE),
            },
            SessionType::LongBreak => Self::initial(),
        }
    }
}

impl Default for CyclePosition {
    fn default() -> Self {
        Self::initial()
    }
}

/// Snapshot of the cycle, published on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleState {
    pub session_type: SessionType,
    pub session_count: u8,
    pub total_duration_ms: u64,
    pub remaining_ms: u64,
    pub running: bool,
    pub paused: bool,
    pub anchor_timestamp: Option<u64>,
}

impl CycleState {
    /// 0.0 .. 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        if self.total_duration_ms == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_ms as f64 / self.total_duration_ms as f64)
    }

    /// e.g. `Session 2/4`.
    pub fn session_label(&self) -> String {
        format!("Session {}/{}", self.session_count, SESSIONS_PER_CYCLE)
    }
}

/// Result of `start()`, which toggles when already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(TickToken),
    Resumed(TickToken),
    Paused { remaining_ms: u64 },
}

/// Result of delivering a tick to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTick {
    Stale,
    Running { remaining_ms: u64, total_ms: u64 },
    /// The countdown for `position` reached zero. The caller records the
    /// session and then calls [`CycleController::complete`].
    Finished {
        position: CyclePosition,
        total_ms: u64,
    },
}

/// A move from one position to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CyclePosition,
    pub to: CyclePosition,
    /// Set when the new position is a break entered by natural completion.
    pub auto_start_eligible: bool,
}

/// Outcome of a duration change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationChange {
    /// Applied immediately; the timer was re-initialized.
    Applied,
    /// Timer is running; applied at the next reset or state entry.
    Pending,
}

#[derive(Debug, Clone)]
pub struct CycleController {
    position: CyclePosition,
    engine: TimerEngine,
    durations: DurationConfig,
    pending_durations: Option<DurationConfig>,
    hidden_at: Option<u64>,
    auto_start_eligible: bool,
}

impl CycleController {
    /// Start at `Work(1)` with an idle, full-length timer.
    pub fn new(durations: DurationConfig) -> Self {
        let position = CyclePosition::initial();
        Self {
            position,
            engine: TimerEngine::new(durations.duration_ms(position.session_type)),
            durations,
            pending_durations: None,
            hidden_at: None,
            auto_start_eligible: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn position(&self) -> CyclePosition {
        self.position
    }

    pub fn session_type(&self) -> SessionType {
        self.position.session_type
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn timer_state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn durations(&self) -> DurationConfig {
        self.durations
    }

    pub fn pending_durations(&self) -> Option<DurationConfig> {
        self.pending_durations
    }

    pub fn pending_tick(&self) -> Option<TickToken> {
        self.engine.pending_tick()
    }

    pub fn auto_start_eligible(&self) -> bool {
        self.auto_start_eligible
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden_at.is_some()
    }

    /// Snapshot with `remaining_ms` evaluated at `now_ms`. While the host is
    /// hidden the countdown reads as frozen at the moment it was hidden.
    pub fn state_at(&self, now_ms: u64) -> CycleState {
        let at = self.hidden_at.map_or(now_ms, |hidden_at| hidden_at.min(now_ms));
        CycleState {
            session_type: self.position.session_type,
            session_count: self.position.session_count,
            total_duration_ms: self.engine.total_ms(),
            remaining_ms: self.engine.remaining_at(at),
            running: self.engine.is_running(),
            paused: self.engine.is_paused(),
            anchor_timestamp: self.engine.anchor_ms(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start, resume, or (when already running) pause.
    pub fn start(&mut self, now_ms: u64) -> StartOutcome {
        self.auto_start_eligible = false;
        match self.engine.state() {
            TimerState::Running => StartOutcome::Paused {
                remaining_ms: self.pause_engine(now_ms),
            },
            TimerState::Paused => {
                let token =
                    self.engine
                        .resume(self.engine.total_ms(), self.engine.remaining_ms(), now_ms);
                StartOutcome::Resumed(token)
            }
            TimerState::Idle | TimerState::Completed => {
                let total = self.durations.duration_ms(self.position.session_type);
                StartOutcome::Started(self.engine.start(total, now_ms))
            }
        }
    }

    pub fn pause(&mut self, now_ms: u64) -> Result<u64, InvalidOperation> {
        if !self.engine.is_running() {
            return Err(InvalidOperation::NotRunning);
        }
        Ok(self.pause_engine(now_ms))
    }

    /// Reload the full duration of the current position, keeping the position.
    pub fn reset(&mut self) {
        self.hidden_at = None;
        self.auto_start_eligible = false;
        self.apply_pending_durations();
        self.reload_engine();
    }

    /// Move to the next position without finishing the current one.
    pub fn skip(&mut self) -> Transition {
        self.advance(false)
    }

    /// Abandon everything and return to `Work(1)`.
    pub fn stop(&mut self) {
        self.hidden_at = None;
        self.auto_start_eligible = false;
        self.apply_pending_durations();
        self.position = CyclePosition::initial();
        self.reload_engine();
        tracing::debug!("cycle stopped");
    }

    /// Deliver a scheduled tick.
    ///
    /// Ticks are withheld while the host is hidden: the token stays pending
    /// and the tick reads as stale.
    pub fn tick(&mut self, token: TickToken, now_ms: u64) -> CycleTick {
        if self.hidden_at.is_some() {
            return CycleTick::Stale;
        }
        match self.engine.tick(token, now_ms) {
            Tick::Stale => CycleTick::Stale,
            Tick::Running {
                remaining_ms,
                total_ms,
                ..
            } => CycleTick::Running {
                remaining_ms,
                total_ms,
            },
            Tick::Completed { total_ms } => CycleTick::Finished {
                position: self.position,
                total_ms,
            },
        }
    }

    /// Transition after a natural completion has been recorded.
    pub fn complete(&mut self) -> Transition {
        self.advance(true)
    }

    /// Change session lengths. Applied now unless a countdown is running.
    pub fn set_durations(&mut self, durations: DurationConfig) -> DurationChange {
        if self.engine.is_running() {
            self.pending_durations = Some(durations);
            return DurationChange::Pending;
        }
        self.pending_durations = None;
        self.durations = durations;
        self.reload_engine();
        DurationChange::Applied
    }

    /// The host stopped delivering ticks (e.g. the process was backgrounded).
    pub fn host_hidden(&mut self, now_ms: u64) {
        if self.engine.is_running() {
            self.hidden_at = Some(now_ms);
        }
    }

    /// The host resumed delivering ticks. Returns the hidden span that was
    /// excluded from the countdown, if any.
    pub fn host_visible(&mut self, now_ms: u64) -> Option<u64> {
        let hidden_at = self.hidden_at.take()?;
        let hidden = now_ms.saturating_sub(hidden_at);
        self.adjust_for_suspension(hidden).then_some(hidden)
    }

    /// Exclude `hidden_ms` of withheld ticks from the running countdown.
    pub fn adjust_for_suspension(&mut self, hidden_ms: u64) -> bool {
        self.engine.adjust_for_suspension(hidden_ms)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn pause_engine(&mut self, now_ms: u64) -> u64 {
        // Hidden time never counts, so a pause while hidden lands at the
        // moment the host went away.
        let at = self.hidden_at.take().map_or(now_ms, |hidden_at| hidden_at.min(now_ms));
        // Only reachable while running.
        self.engine.pause(at).unwrap_or(self.engine.remaining_ms())
    }

    fn advance(&mut self, completed: bool) -> Transition {
        self.hidden_at = None;
        let from = self.position;
        let to = from.next();
        self.position = to;
        self.apply_pending_durations();
        self.reload_engine();
        self.auto_start_eligible = completed && to.session_type.is_break();
        tracing::debug!(
            from = ?from.session_type,
            to = ?to.session_type,
            session_count = to.session_count,
            completed,
            "cycle advanced"
        );
        Transition {
            from,
            to,
            auto_start_eligible: self.auto_start_eligible,
        }
    }

    fn apply_pending_durations(&mut self) {
        if let Some(durations) = self.pending_durations.take() {
            self.durations = durations;
        }
    }

    fn reload_engine(&mut self) {
        let total = self.durations.duration_ms(self.position.session_type);
        self.engine.reset(total);
    }
}

impl Default for CycleController {
    fn default() -> Self {
        Self::new(DurationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(session_type: SessionType, session_count: u8) -> CyclePosition {
        CyclePosition {
            session_type,
            session_count,
        }
    }

    #[test]
    fn transition_table() {
        for n in 1..=3 {
            assert_eq!(pos(SessionType::Work, n).next(), pos(SessionType::ShortBreak, n));
            assert_eq!(pos(SessionType::ShortBreak, n).next(), pos(SessionType::Work, n + 1));
        }
        assert_eq!(pos(SessionType::Work, 4).next(), pos(SessionType::LongBreak, 4));
        assert_eq!(pos(SessionType::LongBreak, 4).next(), pos(SessionType::Work, 1));
    }

    #[test]
    fn four_rounds_return_to_start() {
        let mut controller = CycleController::default();
        let mut seen = vec![controller.position()];
        for _ in 0..8 {
            controller.skip();
            seen.push(controller.position());
        }
        assert_eq!(controller.position(), CyclePosition::initial());
        assert!(seen.iter().all(|p| (1..=4).contains(&p.session_count)));
        assert_eq!(seen[7], pos(SessionType::LongBreak, 4));
    }

    #[test]
    fn start_toggles_to_pause() {
        let mut controller = CycleController::default();
        assert!(matches!(controller.start(0), StartOutcome::Started(_)));
        assert_eq!(
            controller.start(60_000),
            StartOutcome::Paused {
                remaining_ms: 1_440_000
            }
        );
        let state = controller.state_at(90_000);
        assert!(state.paused && !state.running);
        assert_eq!(state.remaining_ms, 1_440_000);
        assert!(matches!(controller.start(100_000), StartOutcome::Resumed(_)));
        assert_eq!(controller.state_at(160_000).remaining_ms, 1_380_000);
    }

    #[test]
    fn pause_when_idle_is_rejected() {
        let mut controller = CycleController::default();
        assert_eq!(controller.pause(0), Err(InvalidOperation::NotRunning));
    }

    #[test]
    fn reset_keeps_position() {
        let mut controller = CycleController::default();
        controller.skip();
        controller.start(0);
        controller.reset();
        let state = controller.state_at(10_000);
        assert_eq!(state.session_type, SessionType::ShortBreak);
        assert_eq!(state.session_count, 1);
        assert_eq!(state.remaining_ms, 300_000);
        assert!(!state.running && !state.paused);
    }

    #[test]
    fn stop_returns_to_work_one() {
        let mut controller = CycleController::default();
        controller.skip();
        controller.skip();
        controller.start(0);
        let stale = controller.pending_tick().unwrap();
        controller.stop();
        assert_eq!(controller.position(), CyclePosition::initial());
        assert_eq!(controller.tick(stale, 5_000), CycleTick::Stale);
        assert_eq!(controller.state_at(5_000).remaining_ms, 1_500_000);
    }

    #[test]
    fn natural_completion_marks_breaks_eligible() {
        let mut controller = CycleController::default();
        let token = match controller.start(0) {
            StartOutcome::Started(t) => t,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(
            controller.tick(token, 1_500_000),
            CycleTick::Finished {
                position: CyclePosition::initial(),
                total_ms: 1_500_000
            }
        );
        let transition = controller.complete();
        assert!(transition.auto_start_eligible);
        assert_eq!(controller.session_type(), SessionType::ShortBreak);
        assert!(!controller.is_running());

        // Skipping into a break does not make it eligible.
        let mut skipped = CycleController::default();
        assert!(!skipped.skip().auto_start_eligible);
    }

    #[test]
    fn duration_change_while_running_is_deferred() {
        let mut controller = CycleController::default();
        controller.start(0);
        let shorter = DurationConfig::new(10, 2, 20).unwrap();
        assert_eq!(controller.set_durations(shorter), DurationChange::Pending);
        assert_eq!(controller.state_at(0).total_duration_ms, 1_500_000);
        controller.reset();
        assert_eq!(controller.durations(), shorter);
        assert_eq!(controller.state_at(0).total_duration_ms, 600_000);
    }

    #[test]
    fn duration_change_while_idle_applies_now() {
        let mut controller = CycleController::default();
        let longer = DurationConfig::new(50, 10, 30).unwrap();
        assert_eq!(controller.set_durations(longer), DurationChange::Applied);
        assert_eq!(controller.state_at(0).remaining_ms, 3_000_000);
    }

    #[test]
    fn hidden_time_is_excluded() {
        let mut controller = CycleController::default();
        controller.start(0);
        controller.host_hidden(100_000);
        assert_eq!(controller.host_visible(400_000), Some(300_000));
        assert_eq!(controller.state_at(400_000).remaining_ms, 1_400_000);
        assert_eq!(controller.host_visible(500_000), None);
    }

    #[test]
    fn ticks_are_withheld_while_hidden() {
        let mut controller = CycleController::default();
        controller.start(0);
        controller.host_hidden(60_000);
        let token = controller.pending_tick().unwrap();
        assert_eq!(controller.tick(token, 120_000), CycleTick::Stale);
        assert_eq!(controller.pending_tick(), Some(token));
        assert_eq!(controller.state_at(120_000).remaining_ms, 1_440_000);

        assert_eq!(controller.host_visible(121_000), Some(61_000));
        assert_eq!(controller.state_at(121_000).remaining_ms, 1_440_000);
        assert_eq!(
            controller.tick(token, 122_000),
            CycleTick::Running {
                remaining_ms: 1_439_000,
                total_ms: 1_500_000
            }
        );
    }

    #[test]
    fn hidden_session_never_completes() {
        let mut controller = CycleController::default();
        controller.start(0);
        controller.host_hidden(1_000);
        let token = controller.pending_tick().unwrap();
        assert_eq!(controller.tick(token, 10_000_000), CycleTick::Stale);
        assert_eq!(controller.position(), CyclePosition::initial());
        assert_eq!(
            controller.pause(10_000_000),
            Ok(1_499_000),
            "pausing while hidden excludes the hidden span"
        );
        assert!(!controller.is_hidden());
    }

    #[test]
    fn state_label_and_progress() {
        let controller = CycleController::default();
        let state = controller.state_at(0);
        assert_eq!(state.session_label(), "Session 1/4");
        assert_eq!(state.progress(), 0.0);
    }
}
