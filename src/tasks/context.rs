//! # Per-invocation context handed to the callable.
//!
//! A [`TaskContext`] carries what the original decorator passed as keyword
//! arguments: the task id, the last persisted progress, and the arguments
//! captured at creation. It also exposes the manual-mode registry handles
//! (`update` / `fail` / `finish`) for callables that manage their own
//! lifecycle.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::{Registry, TaskId};
use crate::error::RegistryError;

/// Invocation context for one attempt of one task.
///
/// Cheap to clone; clones refer to the same task and registry.
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    args: Value,
    progress: Option<Value>,
    registry: Arc<Registry>,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        args: Value,
        progress: Option<Value>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            id,
            args,
            progress,
            registry,
        }
    }

    /// The id of the task being run.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The arguments captured when the task was created.
    ///
    /// Replayed unchanged on every resume; the callable derives everything
    /// attempt-specific from [`TaskContext::progress`].
    pub fn args(&self) -> &Value {
        &self.args
    }

    /// The last persisted progress, or `None` on the first attempt.
    pub fn progress(&self) -> Option<&Value> {
        self.progress.as_ref()
    }

    /// Persists a progress checkpoint for this task.
    ///
    /// Only needed in manual mode; with auto-update the protocol persists
    /// returned and yielded values itself.
    pub fn update(&self, progress: Value) -> Result<(), RegistryError> {
        self.registry.update(self.id, progress)
    }

    /// Records a failure checkpoint, leaving the task active for a retry.
    pub fn fail(&self, progress: Value) -> Result<(), RegistryError> {
        self.registry.fail(self.id, progress)
    }

    /// Marks this task completed.
    pub fn finish(&self) -> Result<(), RegistryError> {
        self.registry.finish(self.id)
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("args", &self.args)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}
