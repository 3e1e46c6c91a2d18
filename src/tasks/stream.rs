//! # Run results and the phase-stream driver.
//!
//! [`RunOutcome`] is what [`Ledger::run`](crate::Ledger::run) returns to the
//! caller. For multi-phase tasks it wraps the callable's sequence in a
//! [`PhaseStream`]: the driver that persists each produced value *before*
//! yielding it onward and finishes the task when the sequence is exhausted.
//!
//! A [`TaskError::Failure`] item checkpoints its payload, surfaces the error
//! to the consumer, and ends the stream; any other error ends the stream
//! with no registry mutation, leaving the last checkpoint intact for a clean
//! retry.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use serde_json::Value;

use crate::core::{Registry, TaskId};
use crate::error::TaskError;
use crate::tasks::outcome::PhaseSource;

/// Result of one `run` call, as seen by the external driver loop.
pub enum RunOutcome {
    /// The callable returned a single value.
    Value(Value),

    /// The callable produced a phase sequence; pull it to make progress.
    Stream(PhaseStream),
}

impl RunOutcome {
    /// Consumes the outcome, returning the single-shot value if that is what
    /// it holds.
    pub fn into_value(self) -> Option<Value> {
        match self {
            RunOutcome::Value(value) => Some(value),
            RunOutcome::Stream(_) => None,
        }
    }

    /// Consumes the outcome, returning the phase stream if that is what it
    /// holds.
    pub fn into_stream(self) -> Option<PhaseStream> {
        match self {
            RunOutcome::Value(_) => None,
            RunOutcome::Stream(stream) => Some(stream),
        }
    }
}

impl fmt::Debug for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Value(value) => f.debug_tuple("Value").field(value).finish(),
            RunOutcome::Stream(stream) => stream.fmt(f),
        }
    }
}

/// Driver over a multi-phase callable's sequence.
///
/// Each `Ok` value is persisted as the task's progress before it reaches the
/// consumer, so an abandoned stream resumes from the last value actually
/// delivered. Exhaustion finishes the task (auto-update mode). The stream is
/// fused: after an error or exhaustion it only yields `None`.
pub struct PhaseStream {
    inner: PhaseSource,
    registry: Arc<Registry>,
    id: TaskId,
    auto_update: bool,
    done: bool,
}

impl PhaseStream {
    pub(crate) fn new(
        inner: PhaseSource,
        registry: Arc<Registry>,
        id: TaskId,
        auto_update: bool,
    ) -> Self {
        Self {
            inner,
            registry,
            id,
            auto_update,
            done: false,
        }
    }

    /// The id of the task this stream advances.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Pulls the remaining values into a vector, stopping at the first error.
    pub async fn drain(mut self) -> Result<Vec<Value>, TaskError> {
        let mut values = Vec::new();
        while let Some(item) = self.next().await {
            values.push(item?);
        }
        Ok(values)
    }
}

impl Stream for PhaseStream {
    type Item = Result<Value, TaskError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match futures::ready!(this.inner.poll_next_unpin(cx)) {
            Some(Ok(value)) => {
                // Persist before delivery: a consumer that stops here can
                // still resume from this value.
                if this.auto_update && !this.registry.is_complete(this.id) {
                    if let Err(err) = this.registry.update(this.id, value.clone()) {
                        this.done = true;
                        return Poll::Ready(Some(Err(err.into())));
                    }
                }
                Poll::Ready(Some(Ok(value)))
            }
            Some(Err(TaskError::Failure { progress })) => {
                this.done = true;
                if this.auto_update {
                    if let Err(err) = this.registry.update(this.id, progress.clone()) {
                        return Poll::Ready(Some(Err(err.into())));
                    }
                }
                Poll::Ready(Some(Err(TaskError::Failure { progress })))
            }
            Some(Err(err)) => {
                this.done = true;
                Poll::Ready(Some(Err(err)))
            }
            None => {
                this.done = true;
                if this.auto_update && !this.registry.is_complete(this.id) {
                    if let Err(err) = this.registry.finish(this.id) {
                        return Poll::Ready(Some(Err(err.into())));
                    }
                }
                Poll::Ready(None)
            }
        }
    }
}

impl fmt::Debug for PhaseStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseStream")
            .field("task", &self.id)
            .field("auto_update", &self.auto_update)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
