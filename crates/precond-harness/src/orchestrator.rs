// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! Run sequencing: readiness, cleanup, scenarios, drivers, summary.

use std::time::Duration;

use precond_core::config::{CleanupConfig, Config, ReadinessConfig};
use precond_core::types::RunSummary;
use precond_core::{Error, Result};
use precond_store::{ObjectStore, StoreFactory};
use tracing::{debug, info, warn};

use crate::counter::{self, COUNTER_KEY};
use crate::race::{self, RACE_KEY};
use crate::scenario;

/// Execute a full verification run.
///
/// Scenario failures are recorded in the returned summary; only conditions
/// that prevent the run from happening at all (no handle, store never
/// ready) surface as `Err`.
///
/// # Errors
///
/// Returns an error if the store cannot be reached within the readiness
/// budget or a handle cannot be constructed.
pub async fn run<F: StoreFactory>(factory: &F, config: &Config) -> Result<RunSummary> {
    let store = factory.connect()?;

    wait_ready(&store, &config.readiness).await?;
    cleanup(&store, &config.cleanup).await;

    let mut summary = RunSummary::default();

    for scenario in scenario::canonical_scenarios() {
        let result = scenario::run_scenario(&store, scenario).await;
        info!(name = %result.name, passed = result.passed, "scenario finished");
        summary.record(result);
    }

    let result = race::run_race(factory, &config.race, RACE_KEY).await;
    info!(name = %result.name, passed = result.passed, "scenario finished");
    summary.record(result);

    let result = counter::run_counter(factory, &config.counter, COUNTER_KEY).await;
    info!(name = %result.name, passed = result.passed, "scenario finished");
    summary.record(result);

    Ok(summary)
}

/// Poll `head_bucket` until the store answers or the budget runs out.
/// Exhaustion is fatal to the whole run.
async fn wait_ready<S: ObjectStore>(store: &S, config: &ReadinessConfig) -> Result<()> {
    for attempt in 1..=config.attempts {
        match store.head_bucket().await {
            Ok(()) => {
                info!(attempt, "store is ready");
                return Ok(());
            }
            Err(err) => debug!(attempt, error = %err, "store not ready yet"),
        }
        if attempt < config.attempts {
            tokio::time::sleep(Duration::from_millis(config.interval_ms)).await;
        }
    }

    Err(Error::Store(format!(
        "store not ready after {} attempts; cannot run",
        config.attempts
    )))
}

/// Delete leftovers from prior runs. Best-effort: failures are warnings.
async fn cleanup<S: ObjectStore>(store: &S, config: &CleanupConfig) {
    let keys = match store.list(&config.prefix).await {
        Ok(keys) => keys,
        Err(err) => {
            warn!(prefix = %config.prefix, error = %err, "cleanup listing failed");
            return;
        }
    };

    for key in keys {
        match store.delete(&key).await {
            Ok(()) => info!(key = %key, "deleted leftover object"),
            Err(err) => warn!(key = %key, error = %err, "cleanup delete failed"),
        }
    }
}
