// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for precond with the store-response taxonomy.

use std::time::Duration;

use thiserror::Error;

/// A specialized `Result` type for precond operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a store.
///
/// The first two variants are *expected* negative-path signals, not harness
/// defects: a conditional write that the store refuses reports
/// `PreconditionFailed`, and reading an absent object reports `NotFound`.
/// Everything else means the harness could not draw a conclusion from the
/// request it issued.
#[derive(Debug, Error)]
pub enum Error {
    /// The store rejected a conditional write (HTTP 412-equivalent).
    #[error("precondition failed for key {key}")]
    PreconditionFailed {
        /// The object key the write targeted.
        key: String,
    },

    /// The requested object does not exist.
    #[error("no such key: {key}")]
    NotFound {
        /// The object key that was requested.
        key: String,
    },

    /// A store call neither applied nor was rejected within the timeout.
    #[error("{op} timed out after {after:?}")]
    Timeout {
        /// The store operation that timed out.
        op: &'static str,
        /// How long the harness waited.
        after: Duration,
    },

    /// A read-modify-write loop used up its attempt budget.
    #[error("retries exhausted for key {key} after {attempts} attempts")]
    RetriesExhausted {
        /// The contended object key.
        key: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport, auth, or unexpected server error.
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Returns true if this is a precondition rejection.
    #[must_use]
    pub const fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }

    /// Returns true if this is an absent-object read.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error says nothing about the store's
    /// conditional-write correctness.
    ///
    /// Inconclusive errors always fail the scenario under test, regardless
    /// of what the scenario expected.
    #[must_use]
    pub const fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Store(_))
    }

    /// Short reason code for tallies and report lines.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::PreconditionFailed { .. } => "PreconditionFailed",
            Self::NotFound { .. } => "NotFound",
            Self::Timeout { .. } => "Timeout",
            Self::RetriesExhausted { .. } => "RetriesExhausted",
            Self::Config(_) => "Config",
            Self::Store(_) => "StoreError",
        }
    }
}
