//! A fleet of flaky single-shot tasks pushed to completion through
//! timeout + claim cycles.
//!
//! Each action fails most of the time, checkpointing its attempt count. The
//! driver loop reclaims everything stale and re-runs claimed tasks until the
//! whole fleet has finished.
//!
//! Run with: `cargo run --example longfail`

use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};
use taskledger::{Ledger, Outcome, TaskContext, TaskError, TaskFn, TaskSpec, Target};

fn long_action() -> Target {
    Target::func(TaskFn::new("long_action", |ctx: TaskContext| async move {
        let number = ctx.args()["number"].as_u64().unwrap_or(0);
        let tries = ctx.progress().and_then(Value::as_u64).unwrap_or(0) + 1;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let roll: u32 = rand::thread_rng().gen_range(1..=10);
        if roll > 3 {
            println!("action {number} failed (attempt {tries})");
            return Err(TaskError::failure(tries));
        }
        println!("action {number} succeeded after {tries} tries");
        Ok(Outcome::done(tries))
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ledger = Ledger::default();

    let mut ids = Vec::new();
    for number in 0..10 {
        let spec = TaskSpec::new(long_action());
        let submission = ledger.submit(spec, json!({ "number": number })).await;
        ids.push(submission.id);
    }

    while !ids.iter().all(|id| ledger.is_complete(*id)) {
        ledger.timeout(ledger.clock().now(), None);
        while let Some(id) = ledger.claim(None) {
            let _ = ledger.run(id).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for id in &ids {
        if let Some(record) = ledger.get(*id) {
            println!("task {} finished after {} attempts", record.id, record.attempts);
        }
    }
}
