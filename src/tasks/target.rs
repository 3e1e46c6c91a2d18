//! # Tagged union over the two callable variants.
//!
//! [`Target`] is what the registry stores for a task and what the protocol
//! invokes on every run. The variant decides the resume semantics:
//!
//! - [`Target::Func`] — environment fixed when the target was built;
//! - [`Target::Method`] — the owner is held behind a shared handle and the
//!   method is re-dispatched by name against its *current* state each run.

use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;
use crate::tasks::callable::{Callable, CallableRef, HostRef};
use crate::tasks::context::TaskContext;
use crate::tasks::outcome::Outcome;

/// Reference to the callable a task invokes on resume.
#[derive(Clone)]
pub enum Target {
    /// A free function or closure.
    Func(CallableRef),

    /// A method on a live owner object, resolved by name at run time.
    Method {
        /// The owning object.
        host: HostRef,
        /// Method name the owner dispatches on.
        method: Arc<str>,
    },
}

impl Target {
    /// Wraps a free function or closure target.
    pub fn func(callable: impl Callable) -> Self {
        Target::Func(Arc::new(callable))
    }

    /// Wraps a bound method: owner handle plus the method name passed to
    /// [`MethodHost::dispatch`](crate::MethodHost::dispatch).
    pub fn method(host: HostRef, method: impl Into<Arc<str>>) -> Self {
        Target::Method {
            host,
            method: method.into(),
        }
    }

    /// Returns the default task name for this target: the callable's own
    /// name, or the method name for bound methods.
    pub fn name(&self) -> &str {
        match self {
            Target::Func(callable) => callable.name(),
            Target::Method { method, .. } => method,
        }
    }

    /// Invokes the target with the given context.
    ///
    /// Method targets dispatch against the owner's current state, not a
    /// snapshot taken at wrap time.
    pub(crate) async fn invoke(&self, ctx: TaskContext) -> Result<Outcome, TaskError> {
        match self {
            Target::Func(callable) => callable.call(ctx).await,
            Target::Method { host, method } => host.dispatch(method, ctx).await,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Func(callable) => f.debug_tuple("Func").field(&callable.name()).finish(),
            Target::Method { method, .. } => f.debug_struct("Method").field("method", method).finish(),
        }
    }
}
