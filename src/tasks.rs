//! Owner-scoped task collection.
//!
//! A [`TaskStore`] holds the task list of exactly one owner at a time and
//! re-persists the whole list under `tasks_<owner>` after every mutation.
//! Loading runs an ownership repair pass: records owned by someone else are
//! dropped, records with no owner are stamped with the loading owner, and the
//! repaired list is written straight back.

use crate::auth::SessionManager;
use crate::clock::Clock;
use crate::models::{FilterMode, Task, TaskCounts, TaskId};
use crate::storage::{KvStore, LEGACY_TASKS_KEY, Stored, tasks_key};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Default upper bound on task text length, in characters.
pub const DEFAULT_MAX_TASK_LENGTH: usize = 500;

/// What happened while loading an owner's list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records kept
    pub loaded: usize,
    /// Records dropped (foreign owner or unreadable)
    pub dropped: usize,
    /// Records that had no owner and were stamped
    pub stamped: usize,
    /// Records adopted from the legacy unscoped list
    pub migrated: usize,
}

impl LoadReport {
    fn changed(&self) -> bool {
        self.dropped > 0 || self.stamped > 0 || self.migrated > 0
    }
}

/// A task record as it may appear in storage, including legacy shapes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: Value,
    #[serde(default)]
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "userId")]
    owner_id: Option<Value>,
}

/// Ids and owners were numbers in older data.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_id(value: &Value) -> Option<TaskId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// The task list of the active owner.
pub struct TaskStore {
    store: Arc<KvStore>,
    clock: Arc<dyn Clock>,
    owner: Option<String>,
    tasks: Vec<Task>,
    max_length: usize,
    last_id: TaskId,
    unsaved: bool,
}

impl TaskStore {
    /// Create an empty store; nothing is loaded until [`TaskStore::load`].
    pub fn new(store: Arc<KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            owner: None,
            tasks: Vec::new(),
            max_length: DEFAULT_MAX_TASK_LENGTH,
            last_id: 0,
            unsaved: false,
        }
    }

    /// Cap task text at `max` characters.
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = max;
        self
    }

    /// Owner whose list is loaded.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Load the list of the session's active subject.
    pub fn load_active(&mut self, session: &SessionManager) -> Result<LoadReport> {
        let owner = session.active_subject().ok_or(Error::NotAuthenticated)?;
        Ok(self.load(owner))
    }

    /// Replace the in-memory list with `owner_id`'s persisted list.
    pub fn load(&mut self, owner_id: &str) -> LoadReport {
        let key = tasks_key(owner_id);
        let mut report = LoadReport::default();
        let mut legacy_rest = None;

        let raw = match self.store.get_stored(&key) {
            Stored::Enveloped(envelope) => envelope.value,
            Stored::Legacy(value) => value,
            Stored::Absent => {
                let (adopted, others) = self.split_legacy(owner_id);
                report.migrated = adopted.len();
                if !adopted.is_empty() {
                    legacy_rest = Some(others);
                }
                Value::Array(adopted)
            }
        };

        let records = match raw {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            _ => {
                tracing::warn!(key = %key, "Task list is not an array, ignoring");
                Vec::new()
            }
        };

        let now = self.clock.now();
        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            let stored: StoredTask = match serde_json::from_value(record) {
                Ok(stored) => stored,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Dropping unreadable task record");
                    report.dropped += 1;
                    continue;
                }
            };

            let owner = stored.owner_id.as_ref().and_then(value_to_string);
            if let Some(owner) = owner.as_deref().filter(|o| *o != owner_id) {
                tracing::warn!(key = %key, owner, "Dropping task owned by another identity");
                report.dropped += 1;
                continue;
            }

            let (Some(id), text) = (value_to_id(&stored.id), stored.text.trim()) else {
                report.dropped += 1;
                continue;
            };
            if text.is_empty() {
                report.dropped += 1;
                continue;
            }
            if owner.is_none() {
                report.stamped += 1;
            }

            tasks.push(Task {
                id,
                text: text.to_string(),
                completed: stored.completed,
                created_at: stored
                    .created_at
                    .or_else(|| DateTime::from_timestamp_millis(id))
                    .unwrap_or(now),
                owner_id: owner_id.to_string(),
            });
        }

        report.loaded = tasks.len();
        self.last_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        self.tasks = tasks;
        self.owner = Some(owner_id.to_string());
        self.unsaved = false;

        if report.changed() {
            tracing::info!(
                owner = owner_id,
                loaded = report.loaded,
                dropped = report.dropped,
                stamped = report.stamped,
                migrated = report.migrated,
                "Repaired task list"
            );
            match self.save() {
                Ok(()) => {
                    if let Some(others) = legacy_rest {
                        self.retire_legacy(&others);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Task list kept in memory only");
                }
            }
        }

        report
    }

    /// Split the legacy unscoped list into this owner's records and the rest.
    ///
    /// Nothing is written here: the legacy key only shrinks once the scoped
    /// copy has been saved (see [`TaskStore::retire_legacy`]).
    fn split_legacy(&self, owner_id: &str) -> (Vec<Value>, Vec<Value>) {
        let Some(Value::Array(records)) = self.store.get::<Value>(LEGACY_TASKS_KEY) else {
            return (Vec::new(), Vec::new());
        };

        let (mine, others): (Vec<Value>, Vec<Value>) =
            records.into_iter().partition(|record| {
                let owner = record
                    .get("ownerId")
                    .or_else(|| record.get("userId"))
                    .and_then(value_to_string);
                owner.is_none_or(|o| o == owner_id)
            });

        if !mine.is_empty() {
            tracing::info!(
                owner = owner_id,
                count = mine.len(),
                "Migrating legacy task list"
            );
        }
        (mine, others)
    }

    /// Leave only `others` in the legacy list, removing the key once empty.
    fn retire_legacy(&self, others: &[Value]) {
        if others.is_empty() {
            self.store.remove(LEGACY_TASKS_KEY);
        } else {
            self.store.set(LEGACY_TASKS_KEY, &others);
        }
    }

    /// Write the whole list of the loaded owner.
    ///
    /// Fails with `StorageWriteFailure` when the adapter could not write;
    /// the in-memory list is kept and the caller may retry.
    pub fn save(&mut self) -> Result<()> {
        let Some(owner) = self.owner.as_deref() else {
            return Ok(());
        };
        if self.store.set(&tasks_key(owner), &self.tasks) {
            self.unsaved = false;
            Ok(())
        } else {
            self.unsaved = true;
            Err(Error::StorageWriteFailure(format!(
                "could not save tasks for {}",
                owner
            )))
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Task list kept in memory only");
        }
    }

    /// Whether the last write failed and the list differs from storage.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    fn next_id(&mut self) -> TaskId {
        let candidate = self.clock.now().timestamp_millis();
        let id = if candidate > self.last_id {
            candidate
        } else {
            self.last_id + 1
        };
        self.last_id = id;
        id
    }

    /// Add a task for `owner_id`, switching to that owner's list if needed.
    pub fn add(&mut self, owner_id: &str, text: &str) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyText);
        }
        let length = text.chars().count();
        if length > self.max_length {
            return Err(Error::InvalidInput(format!(
                "Task text is too long ({} characters, at most {})",
                length, self.max_length
            )));
        }

        if self.owner.as_deref() != Some(owner_id) {
            self.load(owner_id);
        }

        let task = Task {
            id: self.next_id(),
            text: text.to_string(),
            completed: false,
            created_at: self.clock.now(),
            owner_id: owner_id.to_string(),
        };
        tracing::debug!(owner = owner_id, id = task.id, "Added task");
        self.tasks.push(task.clone());
        self.persist();
        Ok(task)
    }

    /// Flip the completed flag of `task_id`.
    pub fn toggle(&mut self, task_id: TaskId) -> Result<Task> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;
        task.completed = !task.completed;
        let task = task.clone();
        self.persist();
        Ok(task)
    }

    /// Delete `task_id`.
    pub fn remove(&mut self, task_id: TaskId) -> Result<()> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;
        self.tasks.remove(index);
        self.persist();
        Ok(())
    }

    /// Delete every completed task; returns how many went.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Tasks shown under `mode`, in insertion order.
    pub fn filter(&self, mode: FilterMode) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| mode.matches(t))
            .cloned()
            .collect()
    }

    /// Look up a task by id.
    pub fn get(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Totals over the loaded list.
    pub fn counts(&self) -> TaskCounts {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        TaskCounts {
            total: self.tasks.len(),
            active: self.tasks.len() - completed,
            completed,
        }
    }
}
