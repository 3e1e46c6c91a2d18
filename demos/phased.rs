//! One three-phase task whose phases fail at random, re-run until every
//! phase has completed.
//!
//! The checkpoint carries the number of completed phases; each resume
//! rebuilds the remaining sequence from it, so phases already done are never
//! repeated.
//!
//! Run with: `cargo run --example phased`

use futures::StreamExt;
use rand::Rng;
use serde_json::{json, Value};
use taskledger::{Ledger, Outcome, RunOutcome, TaskContext, TaskError, TaskFn, TaskSpec, Target};

fn unstable_action() -> Target {
    Target::func(TaskFn::new("unstable_action", |ctx: TaskContext| async move {
        let start = ctx
            .progress()
            .and_then(|progress| progress["phase"].as_u64())
            .unwrap_or(0);

        let source = futures::stream::iter(start..3).map(|phase| {
            // Later phases are shakier than the first.
            let fail_over = match phase {
                0 => 10,
                1 => 5,
                _ => 9,
            };
            let roll: u32 = rand::thread_rng().gen_range(1..=10);
            if roll > fail_over {
                Err(TaskError::failure(json!({ "phase": phase })))
            } else {
                Ok(json!({ "phase": phase + 1 }))
            }
        });
        Ok::<_, TaskError>(Outcome::phased(source))
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ledger = Ledger::default();
    let submission = ledger.submit(TaskSpec::new(unstable_action()), Value::Null).await;
    let id = submission.id;

    let mut outcome = submission.first;
    loop {
        match outcome {
            Ok(RunOutcome::Stream(mut stream)) => {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(progress) => println!("phase {} complete", progress["phase"]),
                        Err(err) => println!("attempt failed: {}", err.as_message()),
                    }
                }
            }
            Ok(RunOutcome::Value(_)) => {}
            Err(err) => println!("attempt failed: {}", err.as_message()),
        }
        if ledger.is_complete(id) {
            break;
        }
        outcome = ledger.run(id).await;
    }
    println!("task completed");
}
