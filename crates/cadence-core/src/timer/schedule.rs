use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Shortest accepted session length in minutes.
pub const MIN_DURATION_MIN: u32 = 1;
/// Longest accepted session length in minutes.
pub const MAX_DURATION_MIN: u32 = 60;
/// Work sessions per cycle; the last one is followed by a long break.
pub const SESSIONS_PER_CYCLE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::Work => "Work",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }
}

/// Session lengths in minutes, each within `[1, 60]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationConfig {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl DurationConfig {
    /// Build a validated config. Out-of-range values are rejected, never clamped.
    pub fn new(
        work_minutes: u32,
        short_break_minutes: u32,
        long_break_minutes: u32,
    ) -> Result<Self, ValidationError> {
        let cfg = Self {
            work_minutes,
            short_break_minutes,
            long_break_minutes,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse raw user input, e.g. form fields or CLI arguments.
    pub fn parse(work: &str, short_break: &str, long_break: &str) -> Result<Self, ValidationError> {
        Self::new(
            parse_minutes("workMinutes", work)?,
            parse_minutes("shortBreakMinutes", short_break)?,
            parse_minutes("longBreakMinutes", long_break)?,
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("workMinutes", self.work_minutes as i64)?;
        check_range("shortBreakMinutes", self.short_break_minutes as i64)?;
        check_range("longBreakMinutes", self.long_break_minutes as i64)?;
        Ok(())
    }

    pub fn minutes_for(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Work => self.work_minutes,
            SessionType::ShortBreak => self.short_break_minutes,
            SessionType::LongBreak => self.long_break_minutes,
        }
    }

    /// Get the session length in milliseconds.
    pub fn duration_ms(&self, session_type: SessionType) -> u64 {
        (self.minutes_for(session_type) as u64)
            .saturating_mul(60)
            .saturating_mul(1000)
    }
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
        }
    }
}

fn parse_minutes(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    let value: i64 = raw.trim().parse().map_err(|_| ValidationError::NotANumber {
        field,
        value: raw.to_string(),
    })?;
    check_range(field, value)?;
    Ok(value as u32)
}

fn check_range(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value < MIN_DURATION_MIN as i64 || value > MAX_DURATION_MIN as i64 {
        return Err(ValidationError::DurationOutOfRange {
            field,
            value,
            min: MIN_DURATION_MIN,
            max: MAX_DURATION_MIN,
        });
    }
    Ok(())
}

/// Render a countdown as `MM:SS`, rounding partial seconds up.
pub fn format_remaining(ms: u64) -> String {
    let total_secs = ms.div_ceil(1000);
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_25_5_15() {
        let cfg = DurationConfig::default();
        assert_eq!(cfg.work_minutes, 25);
        assert_eq!(cfg.short_break_minutes, 5);
        assert_eq!(cfg.long_break_minutes, 15);
        assert_eq!(cfg.duration_ms(SessionType::Work), 1_500_000);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(DurationConfig::new(1, 1, 1).is_ok());
        assert!(DurationConfig::new(60, 60, 60).is_ok());
        assert!(matches!(
            DurationConfig::new(0, 5, 15),
            Err(ValidationError::DurationOutOfRange { field: "workMinutes", value: 0, .. })
        ));
        assert!(DurationConfig::new(25, 61, 15).is_err());
    }

    #[test]
    fn parse_rejects_non_numeric_input() {
        assert!(matches!(
            DurationConfig::parse("abc", "5", "15"),
            Err(ValidationError::NotANumber { field: "workMinutes", .. })
        ));
        assert!(DurationConfig::parse("2.5", "5", "15").is_err());
        assert!(matches!(
            DurationConfig::parse("25", "-3", "15"),
            Err(ValidationError::DurationOutOfRange { value: -3, .. })
        ));
        assert_eq!(
            DurationConfig::parse(" 30 ", "10", "20").unwrap(),
            DurationConfig::new(30, 10, 20).unwrap()
        );
    }

    #[test]
    fn format_rounds_up_partial_seconds() {
        assert_eq!(format_remaining(1_500_000), "25:00");
        assert_eq!(format_remaining(59_001), "01:00");
        assert_eq!(format_remaining(1), "00:01");
        assert_eq!(format_remaining(0), "00:00");
    }

    #[test]
    fn serde_uses_kebab_case_session_types() {
        let json = serde_json::to_string(&SessionType::ShortBreak).unwrap();
        assert_eq!(json, "\"short-break\"");
    }
}
