//! # Persistence adapter: whole-state snapshots.
//!
//! A [`Snapshot`] captures the registry's entity map, the per-name index,
//! and both free lists as one serializable blob. Restoring reproduces the
//! exact state at save time, timestamps included; the clock stays
//! independent of the blob, so deterministic replay re-applies its override
//! after `load`.
//!
//! Callable targets cannot be serialized. They re-attach at load time by
//! task *name* through a [`TargetSet`]: every restored, still-runnable task
//! must have a binding for its name, while finished tasks restore unbound
//! (they can never run again). Restore also validates the lease-index
//! invariant — every free-list id must reference an existing, active,
//! unfinished record — and rejects blobs that violate it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use chrono::{DateTime, Utc};

use crate::core::entity::{TaskId, TaskRecord};
use crate::core::registry::{Registry, State};
use crate::error::SnapshotError;
use crate::tasks::Target;

/// Serializable copy of the registry state.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    tasks: Vec<SavedTask>,
    ids_by_name: HashMap<String, Vec<TaskId>>,
    free: Vec<TaskId>,
    free_by_name: HashMap<String, Vec<TaskId>>,
}

/// One persisted task record — everything but the live target.
#[derive(Debug, Serialize, Deserialize)]
struct SavedTask {
    id: TaskId,
    name: String,
    args: Value,
    progress: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    active: bool,
    attempts: u32,
    auto_update: bool,
}

impl Snapshot {
    /// Encodes the snapshot as a self-contained blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a blob produced by [`Snapshot::to_bytes`].
    pub fn from_bytes(blob: &[u8]) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_slice(blob)?)
    }

    pub(crate) fn capture(registry: &Registry) -> Self {
        registry.with_state(|state| Snapshot {
            tasks: state.tasks.values().map(SavedTask::from_record).collect(),
            ids_by_name: state.ids_by_name.clone(),
            free: state.free.clone(),
            free_by_name: state.free_by_name.clone(),
        })
    }

    pub(crate) fn install(
        self,
        registry: &Registry,
        targets: &TargetSet,
    ) -> Result<(), SnapshotError> {
        let mut tasks = HashMap::with_capacity(self.tasks.len());
        for saved in self.tasks {
            let target = match targets.get(&saved.name) {
                Some(target) => Some(target.clone()),
                None if saved.completed_at.is_some() => None,
                None => {
                    return Err(SnapshotError::UnboundTarget { name: saved.name });
                }
            };
            tasks.insert(saved.id, saved.into_record(target));
        }

        let state = State {
            tasks,
            ids_by_name: self.ids_by_name,
            free: self.free,
            free_by_name: self.free_by_name,
        };
        validate(&state)?;
        registry.replace_state(state);
        Ok(())
    }
}

impl SavedTask {
    fn from_record(record: &TaskRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            args: record.args.clone(),
            progress: record.progress.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            completed_at: record.completed_at,
            active: record.active,
            attempts: record.attempts,
            auto_update: record.auto_update,
        }
    }

    fn into_record(self, target: Option<Target>) -> TaskRecord {
        TaskRecord {
            id: self.id,
            name: self.name,
            target,
            args: self.args,
            progress: self.progress,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
            active: self.active,
            attempts: self.attempts,
            auto_update: self.auto_update,
        }
    }
}

/// Checks the lease-index consistency invariant on a restored state.
fn validate(state: &State) -> Result<(), SnapshotError> {
    let corrupt = |reason: String| Err(SnapshotError::Corrupt { reason });

    for (name, ids) in &state.ids_by_name {
        for id in ids {
            if !state.tasks.contains_key(id) {
                return corrupt(format!("name index {name:?} references missing task {id}"));
            }
        }
    }

    for id in &state.free {
        let Some(record) = state.tasks.get(id) else {
            return corrupt(format!("free list references missing task {id}"));
        };
        if !record.active || record.is_complete() {
            return corrupt(format!("free list references non-claimable task {id}"));
        }
        let mirrored = state
            .free_by_name
            .get(&record.name)
            .is_some_and(|list| list.contains(id));
        if !mirrored {
            return corrupt(format!("free task {id} missing from its name free list"));
        }
    }

    for (name, ids) in &state.free_by_name {
        for id in ids {
            if !state.free.contains(id) {
                return corrupt(format!("name free list {name:?} has task {id} not globally free"));
            }
        }
    }
    Ok(())
}

/// Name-to-target bindings used to re-attach callables at load time.
///
/// The registry persists records by task *name*; a `TargetSet` is the load
/// side of that contract, mapping each name back to a live [`Target`].
#[derive(Clone, Default)]
pub struct TargetSet {
    targets: HashMap<String, Target>,
}

impl TargetSet {
    /// Creates an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, builder-style.
    pub fn bind(mut self, name: impl Into<String>, target: Target) -> Self {
        self.targets.insert(name.into(), target);
        self
    }

    /// Adds a binding in place.
    pub fn insert(&mut self, name: impl Into<String>, target: Target) {
        self.targets.insert(name.into(), target);
    }

    /// Looks up the target bound to a name.
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    use crate::clock::Clock;
    use crate::error::TaskError;
    use crate::tasks::{Outcome, TaskContext, TaskFn};

    fn noop_target() -> Target {
        Target::func(TaskFn::new("noop", |_ctx: TaskContext| async {
            Ok::<_, TaskError>(Outcome::done(Value::Null))
        }))
    }

    fn fixed_clock() -> Clock {
        let clock = Clock::new();
        clock.set_override(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        clock
    }

    #[test]
    fn test_roundtrip_preserves_records_and_indices() {
        let clock = fixed_clock();
        let registry = Registry::new(clock.clone());
        let id = registry.create("noop", noop_target(), json!({"n": 1}), true);
        registry.update(id, json!(3)).unwrap();
        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(registry.timeout(clock.now() - chrono::Duration::seconds(30), None), 1);

        let blob = Snapshot::capture(&registry).to_bytes().unwrap();

        let restored = Registry::new(fixed_clock());
        let bindings = TargetSet::new().bind("noop", noop_target());
        Snapshot::from_bytes(&blob)
            .unwrap()
            .install(&restored, &bindings)
            .unwrap();

        let record = restored.get(id).unwrap();
        assert_eq!(record.progress, Some(json!(3)));
        assert_eq!(record.args, json!({"n": 1}));
        assert!(record.active);
        assert!(record.target.is_some());
        // The freed entry survived the roundtrip.
        assert_eq!(restored.claim(Some("noop")), Some(id));
    }

    #[test]
    fn test_unbound_target_rejected_for_runnable_task() {
        let registry = Registry::new(fixed_clock());
        registry.create("noop", noop_target(), Value::Null, true);
        let snapshot = Snapshot::capture(&registry);

        let restored = Registry::new(fixed_clock());
        let err = snapshot.install(&restored, &TargetSet::new()).unwrap_err();
        assert!(matches!(err, SnapshotError::UnboundTarget { name } if name == "noop"));
    }

    #[test]
    fn test_finished_task_restores_without_binding() {
        let registry = Registry::new(fixed_clock());
        let id = registry.create("noop", noop_target(), Value::Null, true);
        registry.finish(id).unwrap();
        let snapshot = Snapshot::capture(&registry);

        let restored = Registry::new(fixed_clock());
        snapshot.install(&restored, &TargetSet::new()).unwrap();
        assert!(restored.is_complete(id));
        assert!(restored.get(id).unwrap().target.is_none());
    }

    #[test]
    fn test_free_list_pointing_at_missing_task_is_corrupt() {
        let registry = Registry::new(fixed_clock());
        let id = registry.create("noop", noop_target(), Value::Null, true);
        let mut snapshot = Snapshot::capture(&registry);
        snapshot.free.push(TaskId::generate());
        snapshot
            .free_by_name
            .entry("noop".to_string())
            .or_default()
            .push(id);

        let restored = Registry::new(fixed_clock());
        let bindings = TargetSet::new().bind("noop", noop_target());
        let err = snapshot.install(&restored, &bindings).unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { .. }));
    }

    #[test]
    fn test_mismatched_free_lists_are_corrupt() {
        let registry = Registry::new(fixed_clock());
        let id = registry.create("noop", noop_target(), Value::Null, true);
        let mut snapshot = Snapshot::capture(&registry);
        // Globally free but absent from the name-scoped mirror.
        snapshot.free.push(id);

        let restored = Registry::new(fixed_clock());
        let bindings = TargetSet::new().bind("noop", noop_target());
        let err = snapshot.install(&restored, &bindings).unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { .. }));
    }

    #[test]
    fn test_garbage_blob_is_a_codec_error() {
        let err = Snapshot::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Codec(_)));
    }
}
