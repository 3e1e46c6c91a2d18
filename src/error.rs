//! Error types used by the taskledger registry and invocation protocol.
//!
//! This module defines three error enums:
//!
//! - [`RegistryError`] — an operation referenced a task the registry cannot
//!   mutate (absent, or already terminal).
//! - [`TaskError`] — errors surfaced by task invocations, including the
//!   designed retryable [`TaskError::Failure`] signal.
//! - [`SnapshotError`] — persistence blobs that cannot be decoded, rebound,
//!   or trusted.
//!
//! The types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics and utilities such as [`TaskError::is_retryable`].

use serde_json::Value;
use thiserror::Error;

use crate::core::TaskId;

/// # Errors produced by registry operations.
///
/// These are caller errors, reported and recoverable — never fatal to the
/// registry itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The operation referenced a task id that does not exist.
    #[error("unknown task {id}")]
    UnknownTask {
        /// The id that was not found.
        id: TaskId,
    },

    /// The operation attempted to mutate a task that already finished.
    ///
    /// Completion happens exactly once; a second `finish`, or a progress
    /// update after completion, is a caller error.
    #[error("task {id} already finished")]
    AlreadyFinished {
        /// The terminal task's id.
        id: TaskId,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskledger::{RegistryError, TaskId};
    ///
    /// let err = RegistryError::UnknownTask { id: TaskId::nil() };
    /// assert_eq!(err.as_label(), "unknown_task");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::UnknownTask { .. } => "unknown_task",
            RegistryError::AlreadyFinished { .. } => "already_finished",
        }
    }
}

/// # Errors produced by task invocations.
///
/// [`TaskError::Failure`] is the *designed* outcome of a retryable attempt:
/// it carries the progress payload to checkpoint, and `run`'s caller decides
/// whether and when to retry. Anything else is a bug in the callable (or a
/// registry misuse) and propagates with no state mutation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The attempt failed at a known checkpoint; retry later from `progress`.
    #[error("attempt failed, checkpoint recorded")]
    Failure {
        /// Progress payload to persist for the next attempt.
        progress: Value,
    },

    /// Non-recoverable error (should not be retried).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// A registry operation performed on behalf of the invocation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl TaskError {
    /// Creates a [`TaskError::Failure`] carrying the given progress payload.
    pub fn failure(progress: impl Into<Value>) -> Self {
        TaskError::Failure {
            progress: progress.into(),
        }
    }

    /// Creates a [`TaskError::Fatal`] with the given message.
    pub fn fatal(error: impl Into<String>) -> Self {
        TaskError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskledger::TaskError;
    ///
    /// let err = TaskError::failure(3);
    /// assert_eq!(err.as_label(), "task_failure");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Failure { .. } => "task_failure",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Registry(_) => "task_registry",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Failure { progress } => format!("failure at checkpoint {progress}"),
            TaskError::Fatal { error } => format!("fatal: {error}"),
            TaskError::Registry(err) => err.to_string(),
        }
    }

    /// Indicates whether the error is safe to retry.
    ///
    /// Returns `true` only for [`TaskError::Failure`] — the designed
    /// retryable signal.
    ///
    /// # Example
    /// ```
    /// use taskledger::TaskError;
    ///
    /// assert!(TaskError::failure("checkpoint").is_retryable());
    /// assert!(!TaskError::fatal("boom").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Failure { .. })
    }
}

/// # Errors produced by saving or restoring ledger state.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The blob could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A restored task has no registered target for its name.
    #[error("no target bound for task name {name:?}")]
    UnboundTarget {
        /// Task name missing from the rebinding set.
        name: String,
    },

    /// The blob violates the free-list/entity-map consistency invariant.
    #[error("corrupt snapshot: {reason}")]
    Corrupt {
        /// What exactly failed validation.
        reason: String,
    },
}

impl SnapshotError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SnapshotError::Codec(_) => "snapshot_codec",
            SnapshotError::UnboundTarget { .. } => "snapshot_unbound_target",
            SnapshotError::Corrupt { .. } => "snapshot_corrupt",
        }
    }
}
