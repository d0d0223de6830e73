//! Object-store access for the precond verification harness.
//!
//! The harness never talks to a backend directly: it drives the
//! [`ObjectStore`] trait, scoped to one bucket, and mints independent
//! per-writer handles through [`StoreFactory`]. Two implementations are
//! provided: [`S3Store`] for any S3-compatible endpoint, and
//! [`MemoryStore`], an in-memory reference backend with genuinely atomic
//! precondition evaluation, used by the harness's own test suite.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod memory;
pub mod s3;
mod store;

pub use memory::MemoryStore;
pub use s3::{S3Store, S3StoreFactory};
pub use store::{ObjectStore, StoreFactory};
