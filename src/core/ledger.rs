//! # Ledger: the create-or-resume facade.
//!
//! The [`Ledger`] owns the shared [`Registry`] and [`Clock`] and implements
//! the invocation protocol on top of them:
//!
//! - [`Ledger::submit`] — the create path: register a record, then perform
//!   the first invocation with no progress;
//! - [`Ledger::run`] — the resume path: re-invoke the stored target with the
//!   original arguments and the last checkpoint;
//! - [`Ledger::timeout`] / [`Ledger::claim`] / [`Ledger::reap`] — the
//!   reclamation cycle for abandoned work;
//! - [`Ledger::save`] / [`Ledger::load`] — whole-state persistence.
//!
//! ## Outcome handling
//! With auto-update on (the default), a returned value is persisted and the
//! task finished — returning normally *is* completion. A phased outcome is
//! wrapped in a [`PhaseStream`] that checkpoints each value before
//! delivering it and finishes on exhaustion. A [`TaskError::Failure`]
//! checkpoints its payload, leaves the task active, and still reaches the
//! caller — retry policy belongs to the external driver loop, never to the
//! protocol. Any other error propagates with no state mutation at all, so
//! the next `run` is a clean retry from the last checkpoint.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::clock::Clock;
use crate::core::config::LedgerConfig;
use crate::core::entity::{TaskId, TaskRecord};
use crate::core::registry::Registry;
use crate::core::snapshot::{Snapshot, TargetSet};
use crate::error::{RegistryError, SnapshotError, TaskError};
use crate::tasks::{Outcome, PhaseStream, RunOutcome, TaskContext, TaskSpec};

/// Result of registering and first-running a task.
///
/// The id is handed back even when the first attempt fails, so the caller
/// can always retry later.
#[derive(Debug)]
pub struct Submission {
    /// Id of the newly created task.
    pub id: TaskId,
    /// Outcome of the first invocation.
    pub first: Result<RunOutcome, TaskError>,
}

/// Single-process registry of resumable, retryable units of work.
pub struct Ledger {
    registry: Arc<Registry>,
    clock: Clock,
    cfg: LedgerConfig,
}

impl Ledger {
    /// Creates a ledger with its own system-time clock.
    pub fn new(cfg: LedgerConfig) -> Self {
        Self::with_clock(cfg, Clock::new())
    }

    /// Creates a ledger timestamping through the given clock handle.
    pub fn with_clock(cfg: LedgerConfig, clock: Clock) -> Self {
        Self {
            registry: Registry::new(clock.clone()),
            clock,
            cfg,
        }
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The clock used for all timestamping. Override it through this handle
    /// for deterministic tests.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Registers a new task and performs its first invocation with
    /// `progress = None`.
    pub async fn submit(&self, spec: TaskSpec, args: Value) -> Submission {
        let (name, target, auto_update) = spec.into_parts();
        let id = self.registry.create(&name, target, args, auto_update);
        let first = self.run(id).await;
        Submission { id, first }
    }

    /// Re-invokes the task with its original arguments and last checkpoint.
    ///
    /// Errors with [`RegistryError::UnknownTask`] for absent ids and
    /// [`RegistryError::AlreadyFinished`] for terminal tasks (both through
    /// [`TaskError::Registry`]).
    pub async fn run(&self, id: TaskId) -> Result<RunOutcome, TaskError> {
        let attempt = self.registry.begin_attempt(id)?;
        debug!(task = %id, attempt = attempt.number, "running task");

        let ctx = TaskContext::new(
            id,
            attempt.args,
            attempt.progress,
            Arc::clone(&self.registry),
        );

        match attempt.target.invoke(ctx).await {
            Ok(Outcome::Done(value)) => {
                if attempt.auto_update && !self.registry.is_complete(id) {
                    self.registry.update(id, value.clone())?;
                    self.registry.finish(id)?;
                }
                Ok(RunOutcome::Value(value))
            }
            Ok(Outcome::Phased(source)) => Ok(RunOutcome::Stream(PhaseStream::new(
                source,
                Arc::clone(&self.registry),
                id,
                attempt.auto_update,
            ))),
            Err(TaskError::Failure { progress }) => {
                if attempt.auto_update {
                    self.registry.fail(id, progress.clone())?;
                }
                Err(TaskError::Failure { progress })
            }
            // Unexpected errors leave progress and active untouched: the
            // next run is a clean retry from the last checkpoint.
            Err(err) => Err(err),
        }
    }

    /// Looks up a task record.
    pub fn get(&self, id: TaskId) -> Option<TaskRecord> {
        self.registry.get(id)
    }

    /// True if the task exists.
    pub fn exists(&self, id: TaskId) -> bool {
        self.registry.exists(id)
    }

    /// True if the task exists and is active.
    pub fn is_active(&self, id: TaskId) -> bool {
        self.registry.is_active(id)
    }

    /// True if the task exists and has finished.
    pub fn is_complete(&self, id: TaskId) -> bool {
        self.registry.is_complete(id)
    }

    /// Persists a progress checkpoint.
    pub fn update(&self, id: TaskId, progress: Value) -> Result<(), RegistryError> {
        self.registry.update(id, progress)
    }

    /// Records a failure checkpoint, leaving the task active.
    pub fn fail(&self, id: TaskId, progress: Value) -> Result<(), RegistryError> {
        self.registry.fail(id, progress)
    }

    /// Marks a task completed.
    pub fn finish(&self, id: TaskId) -> Result<(), RegistryError> {
        self.registry.finish(id)
    }

    /// Pops one claimable id, optionally name-scoped.
    pub fn claim(&self, name: Option<&str>) -> Option<TaskId> {
        self.registry.claim(name)
    }

    /// Frees active tasks last updated before `cutoff`; returns the count.
    pub fn timeout(&self, cutoff: DateTime<Utc>, name: Option<&str>) -> usize {
        self.registry.timeout(cutoff, name)
    }

    /// Frees tasks older than the configured `stale_after`, as of now.
    pub fn reap(&self, name: Option<&str>) -> usize {
        match self.cfg.stale_cutoff(self.clock.now()) {
            Some(cutoff) => self.registry.timeout(cutoff, name),
            None => 0,
        }
    }

    /// Captures the whole registry state as a blob.
    pub fn save(&self) -> Result<Vec<u8>, SnapshotError> {
        Snapshot::capture(&self.registry).to_bytes()
    }

    /// Restores the state captured by [`Ledger::save`], re-attaching targets
    /// by task name.
    pub fn load(&self, blob: &[u8], targets: &TargetSet) -> Result<(), SnapshotError> {
        Snapshot::from_bytes(blob)?.install(&self.registry, targets)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use futures::StreamExt;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::tasks::{MethodHost, Target, TaskFn};

    fn fixed_ledger() -> (Ledger, DateTime<Utc>) {
        let clock = Clock::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        clock.set_override(t0);
        (Ledger::with_clock(LedgerConfig::default(), clock), t0)
    }

    /// Finishes on the first call, echoing the task id.
    fn finish_spec() -> TaskSpec {
        TaskSpec::new(Target::func(TaskFn::new("finish", |ctx: TaskContext| async move {
            Ok::<_, TaskError>(Outcome::done(ctx.id().to_string()))
        })))
    }

    /// Fails the first call with a checkpoint, echoes the args on the retry.
    fn retry_spec() -> TaskSpec {
        TaskSpec::new(Target::func(TaskFn::new("retry", |ctx: TaskContext| async move {
            match ctx.progress() {
                None => Err(TaskError::failure("fail")),
                Some(_) => Ok(Outcome::done(ctx.args().clone())),
            }
        })))
    }

    /// Manual-mode variant: sentinel return instead of an error.
    fn manual_retry_spec() -> TaskSpec {
        TaskSpec::new(Target::func(TaskFn::new(
            "manual_retry",
            |ctx: TaskContext| async move {
                match ctx.progress() {
                    None => {
                        ctx.fail(json!("fail"))?;
                        Ok::<_, TaskError>(Outcome::done(json!("fail")))
                    }
                    Some(_) => {
                        ctx.finish()?;
                        Ok(Outcome::done(ctx.args().clone()))
                    }
                }
            },
        )))
        .manual()
    }

    /// Yields `count` integers, resuming after the last checkpointed one.
    fn counter_spec() -> TaskSpec {
        TaskSpec::new(Target::func(TaskFn::new("counter", |ctx: TaskContext| async move {
            let count = ctx.args()["count"].as_u64().unwrap_or(0);
            let start = match ctx.progress().and_then(Value::as_u64) {
                Some(done) => done + 1,
                None => 0,
            };
            Ok::<_, TaskError>(Outcome::phases((start..count).map(Value::from)))
        })))
    }

    struct ValueHolder {
        value: Mutex<i64>,
    }

    #[async_trait]
    impl MethodHost for ValueHolder {
        async fn dispatch(&self, method: &str, ctx: TaskContext) -> Result<Outcome, TaskError> {
            match method {
                "retry_value" => {
                    if ctx.progress().is_none() {
                        return Err(TaskError::failure("fail"));
                    }
                    Ok(Outcome::done(*self.value.lock()))
                }
                other => Err(TaskError::fatal(format!("unknown method {other}"))),
            }
        }
    }

    #[tokio::test]
    async fn test_finish_task() {
        let (ledger, _) = fixed_ledger();
        let submission = ledger.submit(finish_spec(), Value::Null).await;
        let value = submission.first.unwrap().into_value().unwrap();

        assert_eq!(value, json!(submission.id.to_string()));
        assert!(ledger.exists(submission.id));
        assert!(ledger.is_complete(submission.id));
        assert!(!ledger.is_active(submission.id));
        // Auto-update persisted the returned value as final progress.
        assert_eq!(ledger.get(submission.id).unwrap().progress, Some(value));
    }

    #[tokio::test]
    async fn test_change_task_name() {
        let (ledger, _) = fixed_ledger();
        let spec = finish_spec().with_name("another_name");
        let submission = ledger.submit(spec, Value::Null).await;

        assert!(ledger.is_complete(submission.id));
        assert_eq!(ledger.get(submission.id).unwrap().name, "another_name");
    }

    #[tokio::test]
    async fn test_retry_task() {
        let (ledger, _) = fixed_ledger();
        let args = json!([1, 2]);
        let submission = ledger.submit(retry_spec(), args.clone()).await;
        let id = submission.id;

        // First attempt: the designed failure reaches the caller and the
        // checkpoint is persisted; the task stays active.
        let err = submission.first.unwrap_err();
        assert!(matches!(err, TaskError::Failure { .. }));
        assert!(err.is_retryable());
        assert!(!ledger.is_complete(id));
        assert!(ledger.is_active(id));
        assert_eq!(ledger.get(id).unwrap().progress, Some(json!("fail")));

        // Second attempt resumes from the checkpoint and completes, with the
        // original arguments replayed unchanged.
        let value = ledger.run(id).await.unwrap().into_value().unwrap();
        assert_eq!(value, args);
        assert!(ledger.is_complete(id));
    }

    #[tokio::test]
    async fn test_failure_progress_payload_is_persisted() {
        let (ledger, _) = fixed_ledger();
        let spec = TaskSpec::new(Target::func(TaskFn::new("longfail", |ctx: TaskContext| async move {
            match ctx.progress().and_then(Value::as_i64) {
                None => Err(TaskError::failure(5)),
                Some(checkpoint) => Ok(Outcome::done(checkpoint)),
            }
        })));
        let submission = ledger.submit(spec, json!([1, 2])).await;
        let id = submission.id;

        assert!(submission.first.is_err());
        assert_eq!(ledger.get(id).unwrap().progress, Some(json!(5)));
        assert!(ledger.is_active(id));

        let value = ledger.run(id).await.unwrap().into_value().unwrap();
        assert_eq!(value, json!(5));
        assert!(ledger.is_complete(id));
    }

    #[tokio::test]
    async fn test_manual_retry_task() {
        let (ledger, _) = fixed_ledger();
        let args = json!({"disk": "vda"});
        let submission = ledger.submit(manual_retry_spec(), args.clone()).await;
        let id = submission.id;

        // Sentinel return: no error, no auto-completion.
        let value = submission.first.unwrap().into_value().unwrap();
        assert_eq!(value, json!("fail"));
        assert!(!ledger.is_complete(id));
        assert!(ledger.is_active(id));
        assert_eq!(ledger.get(id).unwrap().progress, Some(json!("fail")));

        let value = ledger.run(id).await.unwrap().into_value().unwrap();
        assert_eq!(value, args);
        assert!(ledger.is_complete(id));
    }

    #[tokio::test]
    async fn test_explicit_finish_under_auto_update_is_not_an_error() {
        let (ledger, _) = fixed_ledger();
        let spec = TaskSpec::new(Target::func(TaskFn::new("self_finisher", |ctx: TaskContext| async move {
            ctx.finish()?;
            Ok::<_, TaskError>(Outcome::done("done"))
        })));
        let submission = ledger.submit(spec, Value::Null).await;

        assert_eq!(submission.first.unwrap().into_value(), Some(json!("done")));
        assert!(ledger.is_complete(submission.id));
    }

    #[tokio::test]
    async fn test_fatal_error_leaves_state_untouched() {
        let (ledger, _) = fixed_ledger();
        let spec = TaskSpec::new(Target::func(TaskFn::new("buggy", |ctx: TaskContext| async move {
            match ctx.progress() {
                None => Err(TaskError::fatal("unrelated bug")),
                Some(_) => Ok(Outcome::done("recovered")),
            }
        })));
        let submission = ledger.submit(spec, Value::Null).await;
        let id = submission.id;

        let err = submission.first.unwrap_err();
        assert!(matches!(err, TaskError::Fatal { .. }));
        assert!(!err.is_retryable());

        let record = ledger.get(id).unwrap();
        assert!(record.progress.is_none());
        assert!(record.active);
        assert!(!ledger.is_complete(id));
    }

    #[tokio::test]
    async fn test_run_unknown_and_finished_ids() {
        let (ledger, _) = fixed_ledger();
        let err = ledger.run(TaskId::generate()).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::Registry(RegistryError::UnknownTask { .. })
        ));

        let submission = ledger.submit(finish_spec(), Value::Null).await;
        let err = ledger.run(submission.id).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::Registry(RegistryError::AlreadyFinished { .. })
        ));
    }

    #[tokio::test]
    async fn test_generator_retry_task() {
        let (ledger, _) = fixed_ledger();
        let spec = TaskSpec::new(Target::func(TaskFn::new("gen_retry", |ctx: TaskContext| async move {
            let phases: Vec<Value> = match ctx.progress() {
                None => vec![json!("fail")],
                Some(_) => Vec::new(),
            };
            Ok::<_, TaskError>(Outcome::phases(phases))
        })));
        let submission = ledger.submit(spec, Value::Null).await;
        let id = submission.id;

        let mut stream = submission.first.unwrap().into_stream().unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), json!("fail"));
        // Abandoned before exhaustion: still active.
        drop(stream);
        assert!(!ledger.is_complete(id));

        let mut stream = ledger.run(id).await.unwrap().into_stream().unwrap();
        assert!(stream.next().await.is_none());
        assert!(ledger.is_complete(id));
    }

    #[tokio::test]
    async fn test_phased_restart_consistency() {
        let (ledger, _) = fixed_ledger();
        let args = json!({"count": 10});

        // Interrupted: five values, drop, resume for the rest.
        let submission = ledger.submit(counter_spec(), args.clone()).await;
        let id = submission.id;
        let mut produced: Vec<Value> = Vec::new();
        let mut stream = submission.first.unwrap().into_stream().unwrap();
        for _ in 0..5 {
            produced.push(stream.next().await.unwrap().unwrap());
        }
        drop(stream);
        assert!(!ledger.is_complete(id));
        assert_eq!(ledger.get(id).unwrap().progress, Some(json!(4)));

        let stream = ledger.run(id).await.unwrap().into_stream().unwrap();
        produced.extend(stream.drain().await.unwrap());
        assert!(ledger.is_complete(id));

        // Uninterrupted run with the same arguments.
        let submission = ledger.submit(counter_spec(), args).await;
        let uninterrupted = submission.first.unwrap().into_stream().unwrap();
        assert_eq!(produced, uninterrupted.drain().await.unwrap());
    }

    #[tokio::test]
    async fn test_phase_values_checkpoint_before_delivery() {
        let (ledger, _) = fixed_ledger();
        let submission = ledger.submit(counter_spec(), json!({"count": 3})).await;
        let id = submission.id;

        let mut stream = submission.first.unwrap().into_stream().unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), json!(0));
        assert_eq!(ledger.get(id).unwrap().progress, Some(json!(0)));
        assert_eq!(stream.next().await.unwrap().unwrap(), json!(1));
        assert_eq!(ledger.get(id).unwrap().progress, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_phased_failure_checkpoints_and_ends_stream() {
        let (ledger, _) = fixed_ledger();
        let spec = TaskSpec::new(Target::func(TaskFn::new("flaky_phases", |ctx: TaskContext| async move {
            let resumed = ctx.progress().is_some();
            let source = futures::stream::iter(vec![
                Ok(json!({"phase": 1})),
                if resumed {
                    Ok(json!({"phase": 2}))
                } else {
                    Err(TaskError::failure(json!({"phase": 1})))
                },
            ]);
            Ok::<_, TaskError>(Outcome::phased(source))
        })));
        let submission = ledger.submit(spec, Value::Null).await;
        let id = submission.id;

        let mut stream = submission.first.unwrap().into_stream().unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), json!({"phase": 1}));
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.is_retryable());
        // Fused after the failure.
        assert!(stream.next().await.is_none());
        assert!(!ledger.is_complete(id));
        assert_eq!(ledger.get(id).unwrap().progress, Some(json!({"phase": 1})));

        let stream = ledger.run(id).await.unwrap().into_stream().unwrap();
        assert_eq!(
            stream.drain().await.unwrap(),
            vec![json!({"phase": 1}), json!({"phase": 2})]
        );
        assert!(ledger.is_complete(id));
    }

    #[tokio::test]
    async fn test_bound_method_retry() {
        let (ledger, _) = fixed_ledger();
        let holder = Arc::new(ValueHolder {
            value: Mutex::new(42),
        });
        let spec = TaskSpec::new(Target::method(holder.clone(), "retry_value"));
        let submission = ledger.submit(spec, Value::Null).await;
        let id = submission.id;

        assert!(submission.first.is_err());
        assert!(!ledger.is_complete(id));

        let value = ledger.run(id).await.unwrap().into_value().unwrap();
        assert_eq!(value, json!(42));
        assert!(ledger.is_complete(id));
    }

    #[tokio::test]
    async fn test_bound_method_sees_current_owner_state() {
        let (ledger, _) = fixed_ledger();
        let holder = Arc::new(ValueHolder {
            value: Mutex::new(42),
        });
        let spec = TaskSpec::new(Target::method(holder.clone(), "retry_value"));
        let submission = ledger.submit(spec, Value::Null).await;

        // The owner changes between the failed attempt and the retry; the
        // retry must observe the new state, not a wrap-time snapshot.
        *holder.value.lock() = 69;
        let value = ledger.run(submission.id).await.unwrap().into_value().unwrap();
        assert_eq!(value, json!(69));
    }

    #[tokio::test]
    async fn test_bound_method_unknown_name_is_fatal() {
        let (ledger, _) = fixed_ledger();
        let holder = Arc::new(ValueHolder {
            value: Mutex::new(0),
        });
        let spec = TaskSpec::new(Target::method(holder, "no_such_method"));
        let submission = ledger.submit(spec, Value::Null).await;
        assert!(matches!(submission.first.unwrap_err(), TaskError::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_retry_replays_original_args() {
        let (ledger, _) = fixed_ledger();
        let args = json!([75, "arbitrary", {"more": 7.5}]);
        let submission = ledger.submit(retry_spec(), args.clone()).await;
        assert!(submission.first.is_err());

        let value = ledger.run(submission.id).await.unwrap().into_value().unwrap();
        assert_eq!(value, args);
    }

    #[tokio::test]
    async fn test_attempts_count_invocations() {
        let (ledger, _) = fixed_ledger();
        let submission = ledger.submit(retry_spec(), Value::Null).await;
        assert_eq!(ledger.get(submission.id).unwrap().attempts, 1);

        let _ = ledger.run(submission.id).await;
        assert_eq!(ledger.get(submission.id).unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_rerun_old_tasks() {
        let (ledger, _) = fixed_ledger();
        let clock = ledger.clock().clone();

        let first = ledger.submit(retry_spec(), Value::Null).await;
        let second = ledger.submit(retry_spec(), Value::Null).await;
        clock.advance(Duration::seconds(60));
        let third = ledger.submit(retry_spec(), Value::Null).await;

        assert!(!ledger.is_complete(first.id));
        // Re-running the first task refreshes it (and completes it here).
        ledger.run(first.id).await.unwrap();

        let cutoff = clock.now() - Duration::seconds(30);
        assert_eq!(ledger.timeout(cutoff, None), 1);

        let claimed = ledger.claim(None).unwrap();
        assert_eq!(claimed, second.id);
        assert_eq!(ledger.claim(None), None);

        ledger.run(claimed).await.unwrap();
        assert!(ledger.is_complete(second.id));
        assert!(!ledger.is_complete(third.id));
    }

    #[tokio::test]
    async fn test_name_scoped_timeout_and_claim() {
        let (ledger, t0) = fixed_ledger();
        let clock = ledger.clock().clone();

        let spec = || retry_spec().with_name("batch");
        let a = ledger.submit(spec(), Value::Null).await;
        let b = ledger.submit(spec(), Value::Null).await;
        clock.advance(Duration::seconds(60));
        let c = ledger.submit(spec(), Value::Null).await;

        // One of the two t0 tasks got refreshed by a re-run.
        ledger.run(a.id).await.unwrap();

        assert_eq!(ledger.timeout(t0 + Duration::seconds(31), Some("batch")), 1);
        assert_eq!(ledger.claim(Some("batch")), Some(b.id));
        assert_eq!(ledger.claim(Some("batch")), None);
        assert!(!ledger.is_complete(c.id));
    }

    #[tokio::test]
    async fn test_reap_uses_configured_staleness() {
        let clock = Clock::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        clock.set_override(t0);
        let ledger = Ledger::with_clock(
            LedgerConfig {
                stale_after: std::time::Duration::from_secs(30),
            },
            clock.clone(),
        );

        let submission = ledger.submit(retry_spec(), Value::Null).await;
        assert_eq!(ledger.reap(None), 0);

        clock.advance(Duration::seconds(31));
        assert_eq!(ledger.reap(None), 1);
        assert_eq!(ledger.claim(None), Some(submission.id));
    }

    #[tokio::test]
    async fn test_reap_disabled_by_zero_staleness() {
        let clock = Clock::new();
        clock.set_override(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let ledger = Ledger::with_clock(
            LedgerConfig {
                stale_after: std::time::Duration::ZERO,
            },
            clock.clone(),
        );

        ledger.submit(retry_spec(), Value::Null).await;
        clock.advance(Duration::days(365));
        assert_eq!(ledger.reap(None), 0);
    }

    #[tokio::test]
    async fn test_stored_tasks_resume_after_load() {
        let (ledger, _) = fixed_ledger();
        let args = json!({"count": 10});
        let submission = ledger.submit(counter_spec(), args).await;
        let id = submission.id;

        let mut total = 0u64;
        let mut stream = submission.first.unwrap().into_stream().unwrap();
        for _ in 0..5 {
            total += stream.next().await.unwrap().unwrap().as_u64().unwrap();
        }
        drop(stream);

        let blob = ledger.save().unwrap();

        let (restored, _) = fixed_ledger();
        let bindings = TargetSet::new().bind("counter", counter_spec().target().clone());
        restored.load(&blob, &bindings).unwrap();
        assert!(!restored.is_complete(id));
        assert_eq!(restored.get(id).unwrap().progress, Some(json!(4)));

        let stream = restored.run(id).await.unwrap().into_stream().unwrap();
        for value in stream.drain().await.unwrap() {
            total += value.as_u64().unwrap();
        }
        assert!(restored.is_complete(id));
        assert_eq!(total, (0..10).sum::<u64>());
    }

    #[tokio::test]
    async fn test_stored_bound_method_rebinds_to_changed_owner() {
        let (ledger, _) = fixed_ledger();
        let holder = Arc::new(ValueHolder {
            value: Mutex::new(42),
        });
        let spec =
            TaskSpec::new(Target::method(holder.clone(), "retry_value")).with_name("retry_value");
        let submission = ledger.submit(spec, Value::Null).await;
        let id = submission.id;
        assert!(submission.first.is_err());

        let blob = ledger.save().unwrap();

        let (restored, _) = fixed_ledger();
        *holder.value.lock() = 69;
        let bindings = TargetSet::new().bind("retry_value", Target::method(holder, "retry_value"));
        restored.load(&blob, &bindings).unwrap();

        let value = restored.run(id).await.unwrap().into_value().unwrap();
        assert_eq!(value, json!(69));
        assert!(restored.is_complete(id));
    }

    #[tokio::test]
    async fn test_free_list_survives_save_load() {
        let (ledger, _) = fixed_ledger();
        let clock = ledger.clock().clone();
        let submission = ledger.submit(retry_spec(), Value::Null).await;

        clock.advance(Duration::seconds(60));
        assert_eq!(ledger.timeout(clock.now() - Duration::seconds(30), None), 1);

        let blob = ledger.save().unwrap();
        let (restored, _) = fixed_ledger();
        let bindings = TargetSet::new().bind("retry", retry_spec().target().clone());
        restored.load(&blob, &bindings).unwrap();

        assert_eq!(restored.claim(None), Some(submission.id));
        assert_eq!(restored.claim(None), None);
    }
}
