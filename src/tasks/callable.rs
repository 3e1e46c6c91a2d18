//! # Callable target traits.
//!
//! A task's target is either a free function ([`Callable`]) or a method on a
//! live owner object ([`MethodHost`]). The two variants differ in what state
//! they see on resume:
//!
//! - a `Callable` owns its captured environment, fixed at wrap time;
//! - a `MethodHost` is consulted *by name* on every run, so the invocation
//!   observes the owner's current state rather than a snapshot.
//!
//! Both are invoked with a [`TaskContext`] carrying the task id, the original
//! arguments, and the last persisted progress.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::context::TaskContext;
use crate::tasks::outcome::Outcome;

/// Shared handle to a free-function target.
pub type CallableRef = Arc<dyn Callable>;

/// Shared handle to a bound-method owner.
pub type HostRef = Arc<dyn MethodHost>;

/// # A free function or closure usable as a task target.
///
/// Implementors return an [`Outcome`]: a single value for one-shot work, or a
/// lazy phase sequence for multi-phase work. A retryable failure is reported
/// by returning [`TaskError::Failure`] with the checkpoint payload; any other
/// error propagates to the caller untouched.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskledger::{Callable, Outcome, TaskContext, TaskError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Callable for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn call(&self, ctx: TaskContext) -> Result<Outcome, TaskError> {
///         let attempt = ctx.progress().and_then(|p| p.as_u64()).unwrap_or(0);
///         Ok(Outcome::done(attempt + 1))
///     }
/// }
/// ```
#[async_trait]
pub trait Callable: Send + Sync + 'static {
    /// Returns a stable, human-readable target name.
    ///
    /// Used as the task's grouping name unless overridden at wrap time.
    fn name(&self) -> &str;

    /// Executes one attempt with the given invocation context.
    async fn call(&self, ctx: TaskContext) -> Result<Outcome, TaskError>;
}

/// # An owner object whose methods are task targets.
///
/// The registry stores the owner handle plus a method *name*; dispatch
/// happens on every run against the owner's current state (late binding).
/// An attribute changed between a failed attempt and its retry is therefore
/// visible to the retry.
///
/// Implementors should return [`TaskError::Fatal`] for method names they do
/// not recognize.
#[async_trait]
pub trait MethodHost: Send + Sync + 'static {
    /// Invokes the named method with the given invocation context.
    async fn dispatch(&self, method: &str, ctx: TaskContext) -> Result<Outcome, TaskError>;
}
