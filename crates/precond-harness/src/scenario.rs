// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! Single-writer conditional-write scenarios.

use bytes::Bytes;
use precond_core::types::{ETag, Precondition, Rejection, ScenarioResult, WriteOutcome};
use precond_store::ObjectStore;
use tracing::info;

/// Object state to establish before the write under test.
#[derive(Debug, Clone)]
pub enum Setup {
    /// Ensure no object exists at the key.
    Absent,
    /// Seed the key with the given body (unconditional write).
    Seed(Bytes),
}

/// How to derive the precondition for the write under test.
///
/// `IfMatchSeeded` cannot be resolved until setup has run, because it
/// references the ETag the seed write produced.
#[derive(Debug, Clone)]
pub enum WriteRule {
    /// `If-None-Match: *`.
    IfNoneMatchAny,
    /// `If-Match` with the ETag returned by the seed write.
    IfMatchSeeded,
    /// `If-Match` with a fixed (typically deliberately wrong) ETag.
    IfMatchLiteral(ETag),
}

/// Expected outcome class for the write under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// The write must apply.
    Applied,
    /// The store must reject the write with a precondition failure.
    PreconditionFailed,
}

impl Expectation {
    fn class(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::PreconditionFailed => "Rejected(PreconditionFailed)",
        }
    }
}

/// One conditional-write scenario: setup, write attempt, expectation.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Scenario name as printed in the report.
    pub name: &'static str,
    /// Object key; scenarios use disjoint keys so they run independently.
    pub key: &'static str,
    /// State to establish before the write.
    pub setup: Setup,
    /// Body of the write under test.
    pub body: Bytes,
    /// Precondition rule for the write under test.
    pub rule: WriteRule,
    /// Expected outcome class.
    pub expect: Expectation,
}

/// The four canonical scenarios, in execution order.
#[must_use]
pub fn canonical_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "If-None-Match create new",
            key: "test-if-none-match-new",
            setup: Setup::Absent,
            body: Bytes::from_static(b"Created with If-None-Match"),
            rule: WriteRule::IfNoneMatchAny,
            expect: Expectation::Applied,
        },
        Scenario {
            name: "If-None-Match exists",
            key: "test-if-none-match-exists",
            setup: Setup::Seed(Bytes::from_static(b"Original content")),
            body: Bytes::from_static(b"This should not be written"),
            rule: WriteRule::IfNoneMatchAny,
            expect: Expectation::PreconditionFailed,
        },
        Scenario {
            name: "If-Match correct ETag",
            key: "test-if-match-correct",
            setup: Setup::Seed(Bytes::from_static(b"Version 1")),
            body: Bytes::from_static(b"Version 2"),
            rule: WriteRule::IfMatchSeeded,
            expect: Expectation::Applied,
        },
        Scenario {
            name: "If-Match wrong ETag",
            key: "test-if-match-wrong",
            setup: Setup::Seed(Bytes::from_static(b"Original content")),
            body: Bytes::from_static(b"This should not be written"),
            rule: WriteRule::IfMatchLiteral(ETag::new("\"wrongetag12345\"")),
            expect: Expectation::PreconditionFailed,
        },
    ]
}

/// Execute one scenario and classify the result.
///
/// A store error unrelated to precondition evaluation fails the scenario as
/// inconclusive no matter what was expected: it means the harness could not
/// draw a conclusion, not that the store is correct or incorrect.
pub async fn run_scenario<S: ObjectStore>(store: &S, scenario: Scenario) -> ScenarioResult {
    info!(name = scenario.name, key = scenario.key, "running scenario");

    // Reset the key so the scenario starts from known state.
    if let Err(err) = store.delete(scenario.key).await {
        return ScenarioResult::inconclusive(scenario.name, &err);
    }

    // Establish the pre-write state.
    let pre_state = match &scenario.setup {
        Setup::Absent => None,
        Setup::Seed(body) => {
            match store.put(scenario.key, body.clone(), &Precondition::None).await {
                Ok(etag) => Some((body.clone(), etag)),
                Err(err) => return ScenarioResult::inconclusive(scenario.name, &err),
            }
        }
    };

    let precondition = match &scenario.rule {
        WriteRule::IfNoneMatchAny => Precondition::IfNoneMatchAny,
        WriteRule::IfMatchLiteral(etag) => Precondition::IfMatch(etag.clone()),
        WriteRule::IfMatchSeeded => match &pre_state {
            Some((_, etag)) => Precondition::IfMatch(etag.clone()),
            None => {
                return ScenarioResult::fail(
                    scenario.name,
                    "scenario bug: If-Match rule requires a seeded object",
                )
            }
        },
    };

    let outcome = WriteOutcome::from_put_result(
        store.put(scenario.key, scenario.body.clone(), &precondition).await,
    );

    let verdict = format!(
        "{} with {}: expected {}, observed {}",
        scenario.key,
        precondition,
        scenario.expect.class(),
        outcome.class()
    );

    match (scenario.expect, &outcome) {
        // A non-precondition error is inconclusive regardless of expectation.
        (_, WriteOutcome::Rejected(Rejection::Other(detail))) => ScenarioResult::fail(
            scenario.name,
            format!("inconclusive: {verdict} ({detail})"),
        ),

        (Expectation::Applied, WriteOutcome::Applied(new_etag)) => {
            verify_applied(store, &scenario, pre_state.as_ref(), new_etag, &verdict).await
        }

        (Expectation::PreconditionFailed, WriteOutcome::Rejected(Rejection::PreconditionFailed)) => {
            verify_unchanged(store, &scenario, pre_state.as_ref(), &verdict).await
        }

        _ => ScenarioResult::fail(scenario.name, verdict),
    }
}

/// An applied write must be durably visible: the read-back content equals
/// the written body, and when the write replaced a seeded version the ETag
/// must have moved (an unchanged ETag after a content change is a validator
/// collision, a correctness violation in its own right).
async fn verify_applied<S: ObjectStore>(
    store: &S,
    scenario: &Scenario,
    pre_state: Option<&(Bytes, ETag)>,
    new_etag: &ETag,
    verdict: &str,
) -> ScenarioResult {
    let (body, _) = match store.get(scenario.key).await {
        Ok(read) => read,
        Err(err) => return ScenarioResult::inconclusive(scenario.name, &err),
    };

    if body != scenario.body {
        return ScenarioResult::fail(
            scenario.name,
            format!("{verdict}; read-back content does not match the written body"),
        );
    }

    if let Some((_, seeded_etag)) = pre_state {
        if seeded_etag == new_etag {
            return ScenarioResult::fail(
                scenario.name,
                format!("{verdict}; mutation returned the seeded ETag {seeded_etag} again"),
            );
        }
    }

    ScenarioResult::pass(scenario.name, verdict)
}

/// A rejected write must have zero effect: body and ETag both unchanged
/// (or the key still absent when nothing was seeded).
async fn verify_unchanged<S: ObjectStore>(
    store: &S,
    scenario: &Scenario,
    pre_state: Option<&(Bytes, ETag)>,
    verdict: &str,
) -> ScenarioResult {
    match (pre_state, store.get(scenario.key).await) {
        (Some((seeded_body, seeded_etag)), Ok((body, etag))) => {
            if body == *seeded_body && etag == *seeded_etag {
                ScenarioResult::pass(scenario.name, format!("{verdict}; content preserved"))
            } else {
                ScenarioResult::fail(
                    scenario.name,
                    format!("{verdict}; rejected write still modified the object"),
                )
            }
        }
        (None, Err(err)) if err.is_not_found() => {
            ScenarioResult::pass(scenario.name, format!("{verdict}; key still absent"))
        }
        (None, Ok(_)) => ScenarioResult::fail(
            scenario.name,
            format!("{verdict}; rejected write created the object"),
        ),
        (_, Err(err)) => ScenarioResult::inconclusive(scenario.name, &err),
    }
}

#[cfg(test)]
mod tests {
    use precond_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_canonical_scenarios_pass_against_reference_store() {
        let store = MemoryStore::new();
        for scenario in canonical_scenarios() {
            let result = run_scenario(&store, scenario).await;
            assert!(result.passed, "{}: {}", result.name, result.detail);
        }
    }

    #[tokio::test]
    async fn test_create_scenario_passes_despite_leftover_object() {
        let store = MemoryStore::new();
        // Leftover from an aborted prior run; the runner resets the key.
        store
            .put(
                "test-if-none-match-new",
                Bytes::from_static(b"stale"),
                &Precondition::None,
            )
            .await
            .expect("seed leftover");

        let scenario = canonical_scenarios().remove(0);
        let result = run_scenario(&store, scenario).await;
        assert!(result.passed, "{}", result.detail);
    }

    #[tokio::test]
    async fn test_detail_reports_expected_vs_observed() {
        let store = MemoryStore::new();
        let result = run_scenario(&store, canonical_scenarios().remove(1)).await;
        assert!(result.detail.contains("expected Rejected(PreconditionFailed)"));
        assert!(result.detail.contains("observed Rejected(PreconditionFailed)"));
    }

    /// A store that strips preconditions, i.e. always applies writes.
    struct UnconditionalStore(MemoryStore);

    #[async_trait::async_trait]
    impl ObjectStore for UnconditionalStore {
        async fn put(
            &self,
            key: &str,
            body: Bytes,
            _precondition: &Precondition,
        ) -> precond_core::Result<ETag> {
            self.0.put(key, body, &Precondition::None).await
        }

        async fn get(&self, key: &str) -> precond_core::Result<(Bytes, ETag)> {
            self.0.get(key).await
        }

        async fn delete(&self, key: &str) -> precond_core::Result<()> {
            self.0.delete(key).await
        }

        async fn list(&self, prefix: &str) -> precond_core::Result<Vec<String>> {
            self.0.list(prefix).await
        }

        async fn head_bucket(&self) -> precond_core::Result<()> {
            self.0.head_bucket().await
        }
    }

    #[tokio::test]
    async fn test_conflict_scenarios_fail_when_store_ignores_preconditions() {
        let store = UnconditionalStore(MemoryStore::new());
        let scenarios = canonical_scenarios();

        // The two conflict scenarios must catch the lost update.
        for scenario in scenarios.into_iter().filter(|s| {
            matches!(s.expect, Expectation::PreconditionFailed)
        }) {
            let result = run_scenario(&store, scenario).await;
            assert!(!result.passed, "{} should fail: {}", result.name, result.detail);
            assert!(result.detail.contains("observed Applied"));
        }
    }
}
