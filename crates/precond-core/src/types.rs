// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! Common types used throughout precond.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An S3 ETag value.
///
/// ETags are opaque strong validators for the exact byte content of an
/// object version. The harness preserves the store's token verbatim,
/// including surrounding quotes, and only ever compares for equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ETag(String);

impl ETag {
    /// Creates a new ETag from a string value.
    ///
    /// The value should be quoted (e.g., `"d41d8cd98f00b204e9800998ecf8427e"`).
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Creates an ETag from an MD5 content hash (single-part upload form).
    #[must_use]
    pub fn from_md5(hash: &[u8; 16]) -> Self {
        Self(format!("\"{}\"", hex::encode(hash)))
    }

    /// Returns the ETag value as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ETag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ETag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ETag {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A constraint on current object state that gates whether a write applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write.
    None,
    /// Write succeeds only if no object currently exists at the key
    /// (`If-None-Match: *`).
    IfNoneMatchAny,
    /// Write succeeds only if the object's current ETag equals the given
    /// one; fails if the object does not exist (`If-Match`).
    IfMatch(ETag),
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "unconditional"),
            Self::IfNoneMatchAny => write!(f, "If-None-Match: *"),
            Self::IfMatch(etag) => write!(f, "If-Match: {etag}"),
        }
    }
}

/// Why a conditional write was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The store evaluated the precondition and refused the write.
    PreconditionFailed,
    /// Transport/auth/server failure unrelated to the precondition. The
    /// harness cannot draw a conclusion from this.
    Other(String),
}

/// Classified outcome of a conditional write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write applied; the store returned the new version's ETag.
    Applied(ETag),
    /// The write did not apply.
    Rejected(Rejection),
}

impl WriteOutcome {
    /// Classifies the result of an `ObjectStore::put` call.
    #[must_use]
    pub fn from_put_result(result: Result<ETag>) -> Self {
        match result {
            Ok(etag) => Self::Applied(etag),
            Err(err) if err.is_precondition_failed() => {
                Self::Rejected(Rejection::PreconditionFailed)
            }
            Err(err) => Self::Rejected(Rejection::Other(err.to_string())),
        }
    }

    /// Short class label for report lines.
    #[must_use]
    pub const fn class(&self) -> &'static str {
        match self {
            Self::Applied(_) => "Applied",
            Self::Rejected(Rejection::PreconditionFailed) => "Rejected(PreconditionFailed)",
            Self::Rejected(Rejection::Other(_)) => "Rejected(OtherError)",
        }
    }
}

/// Result of one scenario or driver run. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario name.
    pub name: String,
    /// Whether the observed behavior matched the expectation.
    pub passed: bool,
    /// Human-readable detail (expected vs. observed, per-writer lines).
    pub detail: String,
}

impl ScenarioResult {
    /// Records a passing result.
    #[must_use]
    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { name: name.into(), passed: true, detail: detail.into() }
    }

    /// Records a failing result.
    #[must_use]
    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { name: name.into(), passed: false, detail: detail.into() }
    }

    /// Records an inconclusive failure from a non-precondition store error.
    #[must_use]
    pub fn inconclusive(name: impl Into<String>, err: &Error) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: format!("inconclusive: {err}"),
        }
    }
}

/// Aggregate of all scenario results for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Results in execution order.
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    /// Appends a result.
    pub fn record(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    /// Number of passing scenarios.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Number of failing scenarios.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// True iff every scenario passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}
