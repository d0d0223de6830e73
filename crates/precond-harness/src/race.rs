// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! Concurrency race driver.
//!
//! Proves that the store evaluates preconditions atomically rather than
//! check-then-act with a window for interleaving: N writers share one
//! starting ETag, and the store itself must serialize them down to a single
//! winner.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use precond_core::config::RaceConfig;
use precond_core::types::{Precondition, ScenarioResult};
use precond_store::{ObjectStore, StoreFactory};
use rand::Rng;
use tracing::{debug, info};

/// Key used by the orchestrated race.
pub const RACE_KEY: &str = "test-race-condition";

const SCENARIO_NAME: &str = "Optimistic locking race";

/// Shared tally of writer outcomes.
///
/// Exclusively owned by one race; writer tasks update it behind a mutex
/// held only for the update itself, never across a store call. Once every
/// writer has joined, the tally is read-only.
#[derive(Debug, Clone, Default)]
pub struct RaceTally {
    /// Writers that observed `Applied`.
    pub success_count: u32,
    /// Writers that observed a rejection.
    pub failure_count: u32,
    /// Rejection reason codes, in completion order.
    pub failures: Vec<String>,
    /// Body written by the winning writer, if any.
    pub winner_body: Option<String>,
}

/// Run one conditional-write race and classify the outcome.
///
/// Each writer runs on its own store handle from the factory, so client-side
/// serialization can never stand in for store-side atomicity.
pub async fn run_race<F: StoreFactory>(
    factory: &F,
    config: &RaceConfig,
    key: &str,
) -> ScenarioResult {
    let store = match factory.connect() {
        Ok(store) => store,
        Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
    };

    // Known starting state shared by every writer.
    let e0 = match store
        .put(key, Bytes::from_static(b"Initial value: 0"), &Precondition::None)
        .await
    {
        Ok(etag) => etag,
        Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
    };

    info!(key, writers = config.writers, etag = %e0, "launching concurrent writers");

    let tally = Arc::new(Mutex::new(RaceTally::default()));
    let mut handles = Vec::new();
    let mut lines = Vec::new();
    {
        let mut rng = rand::thread_rng();
        for writer_id in 0..config.writers {
            let writer_store = match factory.connect() {
                Ok(store) => store,
                Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
            };
            let delay = Duration::from_millis(rng.gen_range(0..=config.jitter_ms));
            let key = key.to_string();
            let e0 = e0.clone();
            let tally = Arc::clone(&tally);

            handles.push(tokio::spawn(async move {
                // Widen the interleaving window so writers genuinely arrive
                // at the store concurrently.
                tokio::time::sleep(delay).await;

                let body = format!("Written by writer-{writer_id}");
                let result = writer_store
                    .put(&key, Bytes::from(body.clone().into_bytes()), &Precondition::IfMatch(e0))
                    .await;

                let line = match &result {
                    Ok(_) => format!("Writer-{writer_id}: SUCCESS"),
                    Err(err) => format!("Writer-{writer_id}: FAILED ({})", err.reason_code()),
                };

                let mut tally = tally.lock().expect("race tally lock poisoned");
                match result {
                    Ok(_) => {
                        tally.success_count += 1;
                        tally.winner_body = Some(body);
                    }
                    Err(err) => {
                        tally.failure_count += 1;
                        tally.failures.push(err.reason_code().to_string());
                    }
                }
                line
            }));
        }
    }

    for handle in handles {
        match handle.await {
            Ok(line) => {
                debug!("{line}");
                lines.push(line);
            }
            Err(err) => lines.push(format!("writer task failed to complete: {err}")),
        }
    }

    // Copy the tally out of the lock; it is read-only from here on, and the
    // guard must not live across the verification reads below.
    let tally = tally.lock().expect("race tally lock poisoned").clone();
    classify(&store, config.writers, key, &tally, &lines).await
}

async fn classify<S: ObjectStore>(
    store: &S,
    writers: u32,
    key: &str,
    tally: &RaceTally,
    lines: &[String],
) -> ScenarioResult {
    let mut detail = lines.to_vec();
    detail.push(format!(
        "{} succeeded, {} failed out of {writers} writers",
        tally.success_count, tally.failure_count
    ));

    // A writer that neither applied nor hit the precondition leaves the race
    // inconclusive: the count no longer says anything about atomicity.
    if tally.success_count + tally.failure_count != writers
        || tally.failures.iter().any(|reason| reason != "PreconditionFailed")
    {
        detail.push("inconclusive: not every writer resolved to Applied or PreconditionFailed".to_string());
        return ScenarioResult::fail(SCENARIO_NAME, detail.join("\n"));
    }

    if tally.success_count > 1 {
        detail.push(format!(
            "lost update: {} writers observed Applied for the same ETag",
            tally.success_count
        ));
        return ScenarioResult::fail(SCENARIO_NAME, detail.join("\n"));
    }

    if tally.success_count == 0 {
        // Every writer was rejected. That is not exclusivity at work; it
        // suggests the store refuses conditional writes outright.
        detail.push(
            "no writer succeeded; store may not support conditional writes".to_string(),
        );
        return ScenarioResult::fail(SCENARIO_NAME, detail.join("\n"));
    }

    // Exactly one winner: the store, not the harness, must have serialized
    // the race, so the final content is exactly the winner's payload.
    let (body, _) = match store.get(key).await {
        Ok(read) => read,
        Err(err) => return ScenarioResult::inconclusive(SCENARIO_NAME, &err),
    };

    match &tally.winner_body {
        Some(winner) if body.as_ref() == winner.as_bytes() => {
            detail.push(format!("final content is the winner's payload: {winner:?}"));
            ScenarioResult::pass(SCENARIO_NAME, detail.join("\n"))
        }
        _ => {
            detail.push("final content does not match the winning writer's payload".to_string());
            ScenarioResult::fail(SCENARIO_NAME, detail.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use precond_store::MemoryStore;

    use super::*;

    fn config(writers: u32) -> RaceConfig {
        RaceConfig { writers, jitter_ms: 5 }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_exclusivity_against_reference_store() {
        let store = MemoryStore::new();
        let result = run_race(&store, &config(5), "test-race-condition").await;
        assert!(result.passed, "{}", result.detail);
        assert!(result.detail.contains("1 succeeded, 4 failed out of 5 writers"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_final_content_is_a_candidate_body() {
        let store = MemoryStore::new();
        let result = run_race(&store, &config(5), "test-race-content").await;
        assert!(result.passed, "{}", result.detail);

        let (body, _) = store.get("test-race-content").await.expect("get");
        let content = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(content.starts_with("Written by writer-"), "unexpected content: {content}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_with_two_writers() {
        let store = MemoryStore::new();
        let result = run_race(&store, &config(2), "test-race-two").await;
        assert!(result.passed, "{}", result.detail);
        assert!(result.detail.contains("1 succeeded, 1 failed out of 2 writers"));
    }
}
