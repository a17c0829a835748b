//! Append-only log of completed sessions, most recent first.

use std::rc::Rc;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kv::{load_or_default, save_json, KeyValueStore, SESSIONS_KEY};
use crate::error::PersistenceError;
use crate::task::Task;
use crate::timer::SessionType;

/// A session that ran to completion. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    /// Local calendar date at completion.
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: f64,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Snapshot of the active task; only ever set on work sessions.
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
}

impl SessionRecord {
    /// Build the record for a session of `total_ms` that ended at `ended_at`.
    ///
    /// `task` is ignored for breaks.
    pub fn completed(
        session_type: SessionType,
        total_ms: u64,
        ended_at: DateTime<Local>,
        task: Option<&Task>,
    ) -> Self {
        let task = task.filter(|_| session_type == SessionType::Work);
        let end_time = ended_at.with_timezone(&Utc);
        Self {
            id: Uuid::new_v4().to_string(),
            date: ended_at.date_naive(),
            start_time: end_time - Duration::milliseconds(total_ms as i64),
            end_time,
            duration_minutes: total_ms as f64 / 60_000.0,
            session_type,
            task_id: task.map(|t| t.id.clone()),
            task_name: task.map(|t| t.text.clone()),
        }
    }

    pub fn is_work(&self) -> bool {
        self.session_type == SessionType::Work
    }
}

pub struct SessionStore {
    records: Vec<SessionRecord>,
    kv: Rc<dyn KeyValueStore>,
    warnings: Vec<PersistenceError>,
}

impl SessionStore {
    /// Load the log from `kv`. Unreadable data yields an empty log and a warning.
    pub fn load(kv: Rc<dyn KeyValueStore>) -> Self {
        let (records, warning) = load_or_default::<Vec<SessionRecord>>(kv.as_ref(), SESSIONS_KEY);
        Self {
            records,
            kv,
            warnings: warning.into_iter().collect(),
        }
    }

    /// Prepend `record` and persist the log.
    ///
    /// The in-memory log is updated even if the write fails; the failure is
    /// kept for [`take_warnings`](Self::take_warnings).
    pub fn append(&mut self, record: SessionRecord) {
        self.records.insert(0, record);
        self.persist();
    }

    /// Records, most recent first. Call again to restart.
    pub fn all(&self) -> impl Iterator<Item = &SessionRecord> + Clone + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record, in memory and on disk. Irreversible.
    pub fn clear(&mut self) {
        self.records.clear();
        if let Err(e) = self.kv.remove(SESSIONS_KEY) {
            self.warn(e);
        }
    }

    /// Records grouped by calendar date, preserving most-recent-first order.
    pub fn grouped_by_date(&self) -> Vec<(NaiveDate, Vec<&SessionRecord>)> {
        let mut groups: Vec<(NaiveDate, Vec<&SessionRecord>)> = Vec::new();
        for record in &self.records {
            match groups.iter_mut().find(|(date, _)| *date == record.date) {
                Some((_, group)) => group.push(record),
                None => groups.push((record.date, vec![record])),
            }
        }
        groups
    }

    /// Persistence failures since the last call.
    pub fn take_warnings(&mut self) -> Vec<PersistenceError> {
        std::mem::take(&mut self.warnings)
    }

    fn persist(&mut self) {
        if let Err(e) = save_json(self.kv.as_ref(), SESSIONS_KEY, &self.records) {
            self.warn(e);
        }
    }

    fn warn(&mut self, e: PersistenceError) {
        tracing::warn!(error = %e, "session log not persisted");
        self.warnings.push(e);
    }
}

/// Heading for a history group: `Today`, `Yesterday`, or e.g. `Mon, Jan 1`.
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else {
        date.format("%a, %b %-d").to_string()
    }
}
