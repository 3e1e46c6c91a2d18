//! # Closure-backed task target (`TaskFn`).
//!
//! [`TaskFn`] wraps a closure `F: Fn(TaskContext) -> Fut`, producing a fresh
//! future per invocation. Each attempt owns its own state; resumption context
//! arrives through the [`TaskContext`], not through hidden mutation between
//! attempts. Shared state, when needed, belongs behind an explicit `Arc`
//! inside the closure — or behind a [`MethodHost`](crate::MethodHost) when
//! late binding is the point.
//!
//! ## Example
//! ```
//! use taskledger::{Outcome, TaskContext, TaskError, TaskFn, Target};
//!
//! let target = Target::func(TaskFn::new("worker", |ctx: TaskContext| async move {
//!     match ctx.progress() {
//!         None => Err(TaskError::failure("started")),
//!         Some(_) => Ok(Outcome::done("done")),
//!     }
//! }));
//!
//! assert_eq!(target.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::callable::Callable;
use crate::tasks::context::TaskContext;
use crate::tasks::outcome::Outcome;

/// Function-backed task target.
///
/// Wraps a closure that *creates* a new future per attempt.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed target.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need an `Arc` handle.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the target and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Callable for TaskFn<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<Outcome, TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: TaskContext) -> Result<Outcome, TaskError> {
        (self.f)(ctx).await
    }
}
