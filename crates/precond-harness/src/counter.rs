// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! Retrying counter driver.
//!
//! Demonstrates that the standard optimistic-concurrency pattern (read,
//! compute, write-if-unchanged, retry on conflict) converges to a correct
//! aggregate under contention: M concurrent incrementers starting from 0
//! must leave exactly M behind, with no increment lost or duplicated.

use bytes::Bytes;
use precond_core::config::CounterConfig;
use precond_core::types::{ETag, Precondition, ScenarioResult};
use precond_core::{Error, Result};
use precond_store::{ObjectStore, StoreFactory};
use tracing::{debug, info};

/// Key used by the orchestrated counter run.
pub const COUNTER_KEY: &str = "test-counter";

const SCENARIO_NAME: &str = "Read-modify-write pattern";

/// A successful increment: the transition observed and the attempts taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// Counter value the worker read.
    pub from: u64,
    /// Counter value the worker wrote.
    pub to: u64,
    /// Read-write cycles used, including the successful one.
    pub attempts: u32,
}

/// Worker state between transitions.
enum Step {
    Read,
    Write { value: u64, etag: ETag },
}

/// Increment the counter at `key` once, retrying on precondition conflicts
/// up to `max_attempts` read-write cycles.
///
/// # Errors
///
/// Returns `RetriesExhausted` when the attempt budget runs out. Any error
/// other than a precondition conflict aborts immediately; those are not
/// retryable conditions.
pub async fn increment_with_retry<S: ObjectStore>(
    store: &S,
    key: &str,
    max_attempts: u32,
) -> Result<IncrementOutcome> {
    let mut attempts = 0u32;
    let mut step = Step::Read;

    loop {
        match step {
            Step::Read => {
                if attempts >= max_attempts {
                    return Err(Error::RetriesExhausted { key: key.to_string(), attempts });
                }
                attempts += 1;

                let (body, etag) = store.get(key).await?;
                let value = parse_counter(key, &body)?;
                step = Step::Write { value, etag };
            }
            Step::Write { value, etag } => {
                let body = Bytes::from((value + 1).to_string().into_bytes());
                match store.put(key, body, &Precondition::IfMatch(etag)).await {
                    Ok(_) => return Ok(IncrementOutcome { from: value, to: value + 1, attempts }),
                    Err(err) if err.is_precondition_failed() => {
                        debug!(key, attempt = attempts, "conflict, re-reading");
                        step = Step::Read;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }
}

fn parse_counter(key: &str, body: &[u8]) -> Result<u64> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| Error::Store(format!("counter body at {key} is not a number")))
}

/// Seed the counter with `"0"`, run the configured number of concurrent
/// incrementers (each on its own store handle), and verify the final value.
pub async fn run_counter<F: StoreFactory>(
    factory: &F,
    config: &CounterConfig,
    key: &str,
) -> ScenarioResult {
    let store = match factory.connect() {
        Ok(store) => store,
        Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
    };

    if let Err(err) = store.put(key, Bytes::from_static(b"0"), &Precondition::None).await {
        return ScenarioResult::inconclusive(SCENARIO_NAME, &err);
    }

    info!(key, workers = config.workers, "running concurrent incrementers");

    let mut handles = Vec::new();
    for worker_id in 0..config.workers {
        let worker_store = match factory.connect() {
            Ok(store) => store,
            Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
        };
        let key = key.to_string();
        let max_attempts = config.max_attempts;

        handles.push(tokio::spawn(async move {
            let result = increment_with_retry(&worker_store, &key, max_attempts).await;
            (worker_id, result)
        }));
    }

    let mut lines = Vec::new();
    let mut exhausted = 0u32;
    let mut inconclusive = 0u32;
    let mut succeeded = 0u32;

    for handle in handles {
        match handle.await {
            Ok((worker_id, Ok(outcome))) => {
                succeeded += 1;
                lines.push(format!(
                    "Incrementer-{worker_id}: {} -> {} (attempt {})",
                    outcome.from, outcome.to, outcome.attempts
                ));
            }
            Ok((worker_id, Err(err))) => {
                match err {
                    Error::RetriesExhausted { .. } => exhausted += 1,
                    _ => inconclusive += 1,
                }
                lines.push(format!("Incrementer-{worker_id}: FAILED ({err})"));
            }
            Err(err) => {
                inconclusive += 1;
                lines.push(format!("incrementer task failed to complete: {err}"));
            }
        }
    }

    let expected = u64::from(config.workers);
    let final_value = match store.get(key).await {
        Ok((body, _)) => match parse_counter(key, &body) {
            Ok(value) => value,
            Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
        },
        Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
    };
    lines.push(format!("final counter value: {final_value} (expected {expected})"));

    if inconclusive > 0 {
        lines.push(format!("inconclusive: {inconclusive} workers hit non-precondition errors"));
        ScenarioResult::fail(SCENARIO_NAME, lines.join("\n"))
    } else if exhausted > 0 {
        // Distinct from both success and precondition failure: the retry
        // budget was not enough to get every increment through.
        lines.push(format!("retries exhausted for {exhausted} of {} workers", config.workers));
        ScenarioResult::fail(SCENARIO_NAME, lines.join("\n"))
    } else if succeeded == config.workers && final_value == expected {
        ScenarioResult::pass(SCENARIO_NAME, lines.join("\n"))
    } else {
        lines.push(format!(
            "increments lost or duplicated: {succeeded} workers succeeded but counter reads {final_value}"
        ));
        ScenarioResult::fail(SCENARIO_NAME, lines.join("\n"))
    }
}
