//! # taskledger
//!
//! **Taskledger** is a single-process registry that turns ordinary callables
//! into resumable, retryable units of work.
//!
//! A task records its own progress: after a failure or interruption it is
//! re-invoked with its original arguments and the last checkpoint, and
//! continues instead of restarting. Abandoned in-flight work is detected by
//! elapsed time since the last progress update and reclaimed through a
//! `timeout` + `claim` cycle driven by the caller's own loop or worker pool.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   TaskSpec (target + options)
//!        │ submit(args)                    run(id)
//!        ▼                                    │
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Ledger (create-or-resume protocol)                          │
//! │  - Clock (injectable, overridable time source)               │
//! │  - Registry (records by id, ids by name, free lists)         │
//! └──────┬──────────────────────┬────────────────────────┬───────┘
//!        ▼                      ▼                        ▼
//!   Target::Func           Target::Method          timeout(cutoff)
//!   (closure, env          (owner handle +         claim(name)
//!    fixed at wrap)         late-bound name)       (lease index)
//!        │                      │
//!        └── call(ctx) ─────────┘
//!                │
//!                ▼
//!   Outcome::Done(value)  ──► update + finish       (auto-update)
//!   Outcome::Phased(seq)  ──► PhaseStream: update each value
//!                             before delivery, finish on end
//!   Err(Failure{progress}) ─► checkpoint persisted, task stays
//!                             active, error surfaced to caller
//! ```
//!
//! ### Lifecycle
//! ```text
//! submit(spec, args)
//!   ├─► Registry::create  (id, name, args, timestamps, active)
//!   └─► first invocation  (progress = None)
//!
//! loop (external driver):
//!   ├─► run(id) → Ok(value)            task finished
//!   │          → Ok(stream)            pull phases, checkpointed as produced
//!   │          → Err(Failure{p})       checkpoint p persisted, retry later
//!   │          → Err(other)            state untouched, clean retry
//!   │
//!   ├─► timeout(now - stale) → n       stale active tasks become claimable
//!   └─► claim(name) → Some(id)         hand to a runner, run(id) again
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                     |
//! |-------------------|--------------------------------------------------------------|----------------------------------------|
//! | **Targets**       | Free functions and late-bound methods as resumable tasks.    | [`Callable`], [`MethodHost`], [`Target`], [`TaskFn`] |
//! | **Protocol**      | Create-or-resume, auto checkpointing, manual mode.           | [`Ledger`], [`TaskSpec`], [`TaskContext`] |
//! | **Phases**        | Lazy multi-phase sequences with restart consistency.         | [`Outcome`], [`RunOutcome`], [`PhaseStream`] |
//! | **Reclamation**   | Stale-task detection and at-most-one-claimant leasing.       | [`Ledger::timeout`], [`Ledger::claim`] |
//! | **Persistence**   | Whole-state snapshots with name-based target rebinding.      | [`Snapshot`], [`TargetSet`]            |
//! | **Errors**        | Typed errors; `Failure` is the designed retryable signal.    | [`TaskError`], [`RegistryError`], [`SnapshotError`] |
//! | **Time**          | Injectable clock with override/advance for tests.            | [`Clock`]                              |
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use taskledger::{Ledger, Outcome, TaskContext, TaskError, TaskFn, TaskSpec, Target};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = Ledger::default();
//!
//!     // Fails once with a checkpoint, then succeeds from it.
//!     let target = Target::func(TaskFn::new("copy_image", |ctx: TaskContext| async move {
//!         match ctx.progress() {
//!             None => Err(TaskError::failure(json!({"bytes_done": 1024}))),
//!             Some(checkpoint) => Ok(Outcome::done(checkpoint.clone())),
//!         }
//!     }));
//!
//!     let submission = ledger.submit(TaskSpec::new(target), json!({"image": "vm-17"})).await;
//!     assert!(submission.first.is_err()); // designed failure, checkpoint saved
//!
//!     let value = ledger.run(submission.id).await?.into_value().unwrap();
//!     assert_eq!(value, json!({"bytes_done": 1024}));
//!     assert!(ledger.is_complete(submission.id));
//!     Ok(())
//! }
//! ```
//!
//! The registry is single-writer by design: drive `run`, `timeout`, and
//! `claim` from one control loop, or wrap the ledger in your own mutual
//! exclusion when sharing it across threads.

mod clock;
mod core;
mod error;
mod tasks;

// ---- Public re-exports ----

pub use clock::Clock;
pub use core::{Ledger, LedgerConfig, Registry, Snapshot, Submission, TargetSet, TaskId, TaskRecord};
pub use error::{RegistryError, SnapshotError, TaskError};
pub use tasks::{
    Callable, CallableRef, HostRef, MethodHost, Outcome, PhaseSource, PhaseStream, RunOutcome,
    Target, TaskContext, TaskFn, TaskSpec,
};
