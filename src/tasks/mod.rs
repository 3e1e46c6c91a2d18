//! # Callable abstractions and the invocation protocol surface.
//!
//! This module provides the types a task author touches:
//! - [`Callable`] - trait for free-function/closure targets
//! - [`MethodHost`] - trait for objects exposing methods as targets
//! - [`Target`] - tagged union over the two callable variants
//! - [`TaskFn`] - closure-backed [`Callable`] implementation
//! - [`TaskSpec`] - wrap-time options (name override, manual mode)
//! - [`TaskContext`] - per-invocation handle passed to the callable
//! - [`Outcome`] / [`RunOutcome`] / [`PhaseStream`] - invocation results

mod callable;
mod context;
mod outcome;
mod spec;
mod stream;
mod target;
mod task_fn;

pub use callable::{Callable, CallableRef, HostRef, MethodHost};
pub use context::TaskContext;
pub use outcome::{Outcome, PhaseSource};
pub use spec::TaskSpec;
pub use stream::{PhaseStream, RunOutcome};
pub use target::Target;
pub use task_fn::TaskFn;
