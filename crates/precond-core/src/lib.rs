//! Core types and utilities for the precond verification harness.
//!
//! This crate provides the building blocks shared by every precond component:
//! - Configuration management
//! - The error taxonomy used to classify store responses
//! - Common data types (ETag, preconditions, scenario results)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::{ETag, Precondition, Rejection, ScenarioResult, WriteOutcome};
