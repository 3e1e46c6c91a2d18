//! # Task registry and lease index.
//!
//! The [`Registry`] owns every [`TaskRecord`] plus the derived indices:
//! ids grouped by name, and the free lists (global and per-name) of tasks
//! reclaimed by `timeout` and awaiting a `claim`.
//!
//! ## Rules
//! - All indices live in one `State` behind one lock, mutated under a single
//!   write guard — they can never diverge, and `claim`'s pop-and-remove is
//!   indivisible (at most one claimant per id).
//! - An id is in the free lists iff its task is active and unclaimed.
//! - `finish` happens exactly once; a finished task accepts no further
//!   progress updates.
//! - Timestamps come from the injected [`Clock`].
//!
//! The registry never interprets `progress` — that belongs to the callable.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::core::entity::{TaskId, TaskRecord};
use crate::error::RegistryError;
use crate::tasks::Target;

/// Everything the registry tracks, guarded as one unit.
#[derive(Default)]
pub(crate) struct State {
    pub(crate) tasks: HashMap<TaskId, TaskRecord>,
    pub(crate) ids_by_name: HashMap<String, Vec<TaskId>>,
    pub(crate) free: Vec<TaskId>,
    pub(crate) free_by_name: HashMap<String, Vec<TaskId>>,
}

/// Data cloned out of a record at the start of one invocation.
#[derive(Debug)]
pub(crate) struct Attempt {
    pub(crate) number: u32,
    pub(crate) target: Target,
    pub(crate) args: Value,
    pub(crate) progress: Option<Value>,
    pub(crate) auto_update: bool,
}

/// Single-writer ledger of task records and their lease index.
pub struct Registry {
    state: RwLock<State>,
    clock: Clock,
}

impl Registry {
    /// Creates an empty registry timestamping with the given clock.
    pub fn new(clock: Clock) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(State::default()),
            clock,
        })
    }

    /// Allocates a new task record and indexes it by id and name.
    pub fn create(&self, name: &str, target: Target, args: Value, auto_update: bool) -> TaskId {
        let now = self.clock.now();
        let id = TaskId::generate();
        let record = TaskRecord::new(id, name.to_string(), target, args, auto_update, now);

        let mut guard = self.state.write();
        let state = &mut *guard;
        state.tasks.insert(id, record);
        state
            .ids_by_name
            .entry(name.to_string())
            .or_default()
            .push(id);
        debug!(task = %id, name, "task created");
        id
    }

    /// Looks up a task by id.
    pub fn get(&self, id: TaskId) -> Option<TaskRecord> {
        self.state.read().tasks.get(&id).cloned()
    }

    /// True if the task exists.
    pub fn exists(&self, id: TaskId) -> bool {
        self.state.read().tasks.contains_key(&id)
    }

    /// True if the task exists and is active. Unknown ids are `false`, not
    /// errors, so polling loops stay simple.
    pub fn is_active(&self, id: TaskId) -> bool {
        self.state
            .read()
            .tasks
            .get(&id)
            .map(|record| record.active)
            .unwrap_or(false)
    }

    /// True if the task exists and has finished. Unknown ids are `false`.
    pub fn is_complete(&self, id: TaskId) -> bool {
        self.state
            .read()
            .tasks
            .get(&id)
            .map(TaskRecord::is_complete)
            .unwrap_or(false)
    }

    /// Sets the task's progress and bumps `updated_at`.
    pub fn update(&self, id: TaskId, progress: Value) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let record = Self::mutable_record(&mut guard, id)?;
        record.progress = Some(progress);
        record.updated_at = now;
        Ok(())
    }

    /// Records a failure checkpoint: same persistence as [`Registry::update`],
    /// and the task stays active for a later retry.
    pub fn fail(&self, id: TaskId, progress: Value) -> Result<(), RegistryError> {
        self.update(id, progress)?;
        debug!(task = %id, "failure checkpoint recorded");
        Ok(())
    }

    /// Marks the task completed. Exactly once: a second call is a caller
    /// error.
    pub fn finish(&self, id: TaskId) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let name = {
            let record = match state.tasks.get_mut(&id) {
                Some(record) => record,
                None => return Err(RegistryError::UnknownTask { id }),
            };
            if record.is_complete() {
                return Err(RegistryError::AlreadyFinished { id });
            }
            record.completed_at = Some(now);
            record.updated_at = now;
            record.active = false;
            record.name.clone()
        };

        // A finished task must not stay claimable.
        state.free.retain(|free_id| *free_id != id);
        if let Some(list) = state.free_by_name.get_mut(&name) {
            list.retain(|free_id| *free_id != id);
        }
        debug!(task = %id, "task finished");
        Ok(())
    }

    /// Frees active tasks whose `updated_at` precedes `cutoff`, optionally
    /// restricted to one name. Returns the number reclaimed.
    ///
    /// Freed tasks get a fresh `updated_at`, so an immediate second call with
    /// the same cutoff reclaims nothing.
    pub fn timeout(&self, cutoff: DateTime<Utc>, name: Option<&str>) -> usize {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let candidates: Vec<TaskId> = match name {
            Some(name) => state.ids_by_name.get(name).cloned().unwrap_or_default(),
            None => state.tasks.keys().copied().collect(),
        };

        let mut freed = 0;
        for id in candidates {
            let record = match state.tasks.get_mut(&id) {
                Some(record) => record,
                None => continue,
            };
            if !record.active || record.updated_at >= cutoff {
                continue;
            }
            if state.free.contains(&id) {
                continue;
            }
            record.updated_at = now;
            let name_key = record.name.clone();
            state.free.push(id);
            state.free_by_name.entry(name_key).or_default().push(id);
            freed += 1;
        }
        if freed > 0 {
            debug!(count = freed, "reclaimed stale tasks");
        }
        freed
    }

    /// Pops one claimable id, optionally restricted to a name, removing it
    /// from both free lists in one indivisible step. `None` when nothing is
    /// claimable.
    pub fn claim(&self, name: Option<&str>) -> Option<TaskId> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let id = match name {
            Some(name) => {
                let id = state.free_by_name.get_mut(name)?.pop()?;
                state.free.retain(|free_id| *free_id != id);
                id
            }
            None => {
                let id = state.free.pop()?;
                let name = state.tasks.get(&id).map(|record| record.name.clone());
                if let Some(name) = name {
                    if let Some(list) = state.free_by_name.get_mut(&name) {
                        list.retain(|free_id| *free_id != id);
                    }
                }
                id
            }
        };
        trace!(task = %id, "task claimed");
        Some(id)
    }

    /// Returns the sorted list of known task names.
    pub fn names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state.ids_by_name.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of tasks in the registry.
    pub fn len(&self) -> usize {
        self.state.read().tasks.len()
    }

    /// True if the registry holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.state.read().tasks.is_empty()
    }

    /// Starts one invocation: bumps `updated_at` and the attempt counter,
    /// and clones out what the protocol needs to call the target.
    pub(crate) fn begin_attempt(&self, id: TaskId) -> Result<Attempt, RegistryError> {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let record = Self::mutable_record(&mut guard, id)?;

        let target = match record.target.clone() {
            Some(target) => target,
            // Only restored, already-finished records lack a target; those
            // were rejected just above.
            None => return Err(RegistryError::AlreadyFinished { id }),
        };
        record.updated_at = now;
        record.attempts += 1;
        Ok(Attempt {
            number: record.attempts,
            target,
            args: record.args.clone(),
            progress: record.progress.clone(),
            auto_update: record.auto_update,
        })
    }

    pub(crate) fn clock(&self) -> &Clock {
        &self.clock
    }

    pub(crate) fn replace_state(&self, state: State) {
        *self.state.write() = state;
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.state.read())
    }

    /// Fetches a record for mutation, rejecting unknown and terminal tasks.
    fn mutable_record<'a>(
        guard: &'a mut parking_lot::RwLockWriteGuard<'_, State>,
        id: TaskId,
    ) -> Result<&'a mut TaskRecord, RegistryError> {
        let record = guard
            .tasks
            .get_mut(&id)
            .ok_or(RegistryError::UnknownTask { id })?;
        if record.is_complete() {
            return Err(RegistryError::AlreadyFinished { id });
        }
        Ok(record)
    }
}
