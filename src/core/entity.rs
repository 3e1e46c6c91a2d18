//! # Task identity and record.
//!
//! A [`TaskRecord`] is one row of the ledger: identity, grouping name, the
//! callable target, the arguments captured at creation, the opaque progress
//! checkpoint, and lifecycle timestamps. The registry owns these; callables
//! and external drivers only see clones.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::tasks::Target;

/// Opaque unique task identifier. Generated at creation, never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero id. Useful as a placeholder in examples and messages;
    /// the registry never allocates it.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

/// One unit of work and its recorded progress history.
///
/// `target` is `None` only for records restored from a snapshot whose name
/// had no binding — possible solely for finished tasks, which can never run
/// again.
#[derive(Clone, Debug)]
pub struct TaskRecord {
    /// Unique identifier.
    pub id: TaskId,
    /// Logical grouping key (shared by tasks created from the same target).
    pub name: String,
    /// Callable to invoke on resume. Runtime-only; not persisted.
    pub target: Option<Target>,
    /// Arguments captured at creation; replayed unchanged on every resume.
    pub args: Value,
    /// Opaque checkpoint payload; `None` until the first update.
    pub progress: Option<Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last progress update, attempt start, or reclamation time.
    pub updated_at: DateTime<Utc>,
    /// Completion time; set exactly once, by `finish`.
    pub completed_at: Option<DateTime<Utc>>,
    /// True while the task is claimable or in flight.
    pub active: bool,
    /// Number of invocations started for this task.
    pub attempts: u32,
    /// Whether the protocol captures progress and completion automatically.
    pub auto_update: bool,
}

impl TaskRecord {
    pub(crate) fn new(
        id: TaskId,
        name: String,
        target: Target,
        args: Value,
        auto_update: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            target: Some(target),
            args,
            progress: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            active: true,
            attempts: 0,
            auto_update,
        }
    }

    /// True once `finish` has run.
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}
