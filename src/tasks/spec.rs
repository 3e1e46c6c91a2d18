//! # Wrap-time task specification.
//!
//! Defines [`TaskSpec`], the bundle handed to
//! [`Ledger::submit`](crate::Ledger::submit): the target plus the options
//! that were decorator arguments in spirit — a name override and the
//! auto-update switch.
//!
//! ## Rules
//! - The name defaults to the target's own name.
//! - `auto_update` defaults to on: returning a value completes the task and
//!   phase values are checkpointed as they are produced. [`TaskSpec::manual`]
//!   turns all automatic capture off; the callable then drives
//!   `update`/`fail`/`finish` itself through its [`TaskContext`](crate::TaskContext).

use std::borrow::Cow;

use crate::tasks::target::Target;

/// Specification for registering a unit of work.
///
/// ## Example
/// ```
/// use taskledger::{Outcome, TaskContext, TaskError, TaskFn, TaskSpec, Target};
///
/// let target = Target::func(TaskFn::new("sync_volume", |ctx: TaskContext| async move {
///     Ok::<_, TaskError>(Outcome::done(ctx.args().clone()))
/// }));
///
/// let spec = TaskSpec::new(target).with_name("volume-maintenance");
/// assert_eq!(spec.name(), "volume-maintenance");
/// assert!(spec.auto_update());
/// ```
#[derive(Clone, Debug)]
pub struct TaskSpec {
    target: Target,
    name: Option<Cow<'static, str>>,
    auto_update: bool,
}

impl TaskSpec {
    /// Creates a spec for the given target with default options.
    pub fn new(target: Target) -> Self {
        Self {
            target,
            name: None,
            auto_update: true,
        }
    }

    /// Overrides the task's grouping name.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Disables automatic progress capture and completion.
    ///
    /// For callables whose "done" condition is not "returned a value" —
    /// e.g. returning a sentinel on failure while staying active.
    pub fn manual(mut self) -> Self {
        self.auto_update = false;
        self
    }

    /// Sets the auto-update switch explicitly.
    pub fn with_auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }

    /// Returns the effective task name (override, or the target's name).
    pub fn name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => self.target.name(),
        }
    }

    /// Returns whether automatic progress capture is enabled.
    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    /// Returns a reference to the target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Splits the spec into the pieces the registry stores.
    pub(crate) fn into_parts(self) -> (String, Target, bool) {
        let name = match &self.name {
            Some(name) => name.to_string(),
            None => self.target.name().to_string(),
        };
        (name, self.target, self.auto_update)
    }
}
