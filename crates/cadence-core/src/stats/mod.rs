//! Statistics over the session log.
//!
//! Everything here is a pure function of the records and the local calendar
//! date considered "today". Only work sessions count.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub sessions_today: u64,
    pub focus_minutes_today: f64,
    pub total_sessions: u64,
    pub total_focus_minutes: f64,
    /// Consecutive days, ending today or yesterday, with a work session.
    pub streak_days: u32,
    pub tasks_completed: u64,
}

pub struct StatsEngine;

impl StatsEngine {
    /// Aggregate `records` as seen on `today`.
    ///
    /// `tasks_completed` is left at zero; it comes from the task ledger.
    pub fn compute<'a, I>(records: I, today: NaiveDate) -> Stats
    where
        I: IntoIterator<Item = &'a SessionRecord>,
    {
        let mut stats = Stats::default();
        let mut dates = Vec::new();
        for record in records.into_iter().filter(|r| r.is_work()) {
            stats.total_sessions += 1;
            stats.total_focus_minutes += record.duration_minutes;
            if record.date == today {
                stats.sessions_today += 1;
                stats.focus_minutes_today += record.duration_minutes;
            }
            dates.push(record.date);
        }
        stats.streak_days = streak_days(dates, today);
        stats
    }
}

/// Length of the run of consecutive calendar days ending at the most recent
/// date, provided that date is `today` or the day before. Zero otherwise.
pub fn streak_days<I>(dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let Some(&latest) = dates.first() else {
        return 0;
    };
    if latest != today && Some(latest) != today.pred_opt() {
        return 0;
    }

    let mut streak = 1;
    let mut accepted = latest;
    for &date in &dates[1..] {
        if accepted.pred_opt() != Some(date) {
            break;
        }
        streak += 1;
        accepted = date;
    }
    streak
}
