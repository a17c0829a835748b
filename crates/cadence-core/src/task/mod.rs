//! Tasks and the active-task selection.
//!
//! The ledger keeps tasks newest first and at most one active task, which is
//! credited when a work session completes. Every mutation is written through
//! to the key-value store immediately.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InvalidOperation, PersistenceError, ValidationError};
use crate::storage::kv::{load_or_default, save_json, KeyValueStore, ACTIVE_TASK_KEY, TASKS_KEY};

/// Longest accepted task text, in characters, after trimming.
pub const MAX_TASK_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub sessions_spent: u32,
    pub created_at: DateTime<Utc>,
}

/// Trim `text` and check its length.
pub fn validate_text(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTaskText);
    }
    let len = trimmed.chars().count();
    if len > MAX_TASK_LEN {
        return Err(ValidationError::TaskTextTooLong {
            len,
            max: MAX_TASK_LEN,
        });
    }
    Ok(trimmed.to_string())
}

pub struct TaskLedger {
    tasks: Vec<Task>,
    active: Option<String>,
    kv: Rc<dyn KeyValueStore>,
    warnings: Vec<PersistenceError>,
}

impl TaskLedger {
    /// Load tasks and the active selection. Unreadable data falls back to an
    /// empty list / no selection and is reported through `take_warnings`.
    pub fn load(kv: Rc<dyn KeyValueStore>) -> Self {
        let (tasks, tasks_warning) = load_or_default::<Vec<Task>>(kv.as_ref(), TASKS_KEY);
        let (active, active_warning) = load_or_default::<Option<String>>(kv.as_ref(), ACTIVE_TASK_KEY);
        let mut ledger = Self {
            tasks,
            active,
            kv,
            warnings: tasks_warning.into_iter().chain(active_warning).collect(),
        };
        if ledger.active_task().is_none() && ledger.active.is_some() {
            tracing::debug!("dropping selection of a task that no longer exists");
            ledger.active = None;
        }
        ledger
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Tasks, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a task stamped `created_at` and put it at the top of the list.
    pub fn add(&mut self, text: &str, created_at: DateTime<Utc>) -> Result<Task, ValidationError> {
        let text = validate_text(text)?;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            text,
            completed: false,
            sessions_spent: 0,
            created_at,
        };
        self.tasks.insert(0, task.clone());
        self.persist_tasks();
        Ok(task)
    }

    /// Replace a task's text. Returns `Ok(false)` if the task does not exist.
    pub fn edit(&mut self, id: &str, text: &str) -> Result<bool, ValidationError> {
        let text = validate_text(text)?;
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        task.text = text;
        self.persist_tasks();
        Ok(true)
    }

    /// Flip the completed flag. Returns the new value, or `None` if not found.
    pub fn toggle_complete(&mut self, id: &str) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist_tasks();
        Some(completed)
    }

    /// Remove a task, clearing the selection if it was active.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        self.tasks.remove(index);
        if self.active.as_deref() == Some(id) {
            self.active = None;
            self.persist_active();
        }
        self.persist_tasks();
        true
    }

    /// Toggle the active task. Locked while a countdown is running.
    ///
    /// Selecting the active task deselects it; an unknown id changes nothing.
    /// Returns the resulting active id.
    pub fn select(&mut self, id: &str, timer_running: bool) -> Result<Option<&str>, InvalidOperation> {
        if timer_running {
            return Err(InvalidOperation::TaskSelectionLocked);
        }
        if self.get(id).is_some() {
            self.active = if self.active.as_deref() == Some(id) {
                None
            } else {
                Some(id.to_string())
            };
            self.persist_active();
        }
        Ok(self.active.as_deref())
    }

    /// Credit one completed work session to `task_id`.
    pub fn record_work_session(&mut self, task_id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        task.sessions_spent += 1;
        self.persist_tasks();
        true
    }

    /// Persistence failures since the last call.
    pub fn take_warnings(&mut self) -> Vec<PersistenceError> {
        std::mem::take(&mut self.warnings)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn persist_tasks(&mut self) {
        if let Err(e) = save_json(self.kv.as_ref(), TASKS_KEY, &self.tasks) {
            tracing::warn!(error = %e, "tasks not persisted");
            self.warnings.push(e);
        }
    }

    fn persist_active(&mut self) {
        if let Err(e) = save_json(self.kv.as_ref(), ACTIVE_TASK_KEY, &self.active) {
            tracing::warn!(error = %e, "active task not persisted");
            self.warnings.push(e);
        }
    }
}
