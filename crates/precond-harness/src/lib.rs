//! Verification drivers for conditional-write semantics.
//!
//! The harness proves three things about a store, in increasing order of
//! strength: single-writer preconditions behave as advertised (scenario
//! runner), preconditions are evaluated atomically under concurrent writers
//! (race driver), and optimistic read-modify-write converges under
//! contention (counter driver). The orchestrator sequences them and
//! aggregates a summary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod counter;
pub mod orchestrator;
pub mod race;
pub mod report;
pub mod scenario;

pub use orchestrator::run;
