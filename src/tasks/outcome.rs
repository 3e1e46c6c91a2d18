//! # What a callable hands back to the protocol.
//!
//! An [`Outcome`] distinguishes the two callable styles:
//!
//! - [`Outcome::Done`] — single-shot: one value, produced once. Under
//!   auto-update, returning is completion.
//! - [`Outcome::Phased`] — multi-phase: a lazy, finite sequence of progress
//!   values. The callable rebuilds the sequence from its last checkpoint on
//!   every resume; the protocol persists each value before delivering it and
//!   finishes the task when the sequence ends.
//!
//! The values themselves are opaque to the registry — only the callable
//! interprets them.

use std::fmt;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use crate::error::TaskError;

/// Lazy sequence of phase values, as produced by a multi-phase callable.
pub type PhaseSource = BoxStream<'static, Result<Value, TaskError>>;

/// Result of one callable invocation.
pub enum Outcome {
    /// Single-shot result value.
    Done(Value),

    /// Multi-phase sequence of progress values.
    Phased(PhaseSource),
}

impl Outcome {
    /// Wraps a single-shot result value.
    pub fn done(value: impl Into<Value>) -> Self {
        Outcome::Done(value.into())
    }

    /// Wraps a lazily produced phase sequence.
    pub fn phased<S>(source: S) -> Self
    where
        S: futures::Stream<Item = Result<Value, TaskError>> + Send + 'static,
    {
        Outcome::Phased(source.boxed())
    }

    /// Wraps an already-computed list of phase values.
    ///
    /// Convenient for callables whose remaining phases are cheap to lay out
    /// up front; the protocol still pulls and checkpoints them one at a time.
    pub fn phases<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Outcome::Phased(stream::iter(values.into_iter().map(Ok)).boxed())
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done(value) => f.debug_tuple("Done").field(value).finish(),
            Outcome::Phased(_) => f.write_str("Phased(..)"),
        }
    }
}
