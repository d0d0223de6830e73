//! Store trait definitions.

use async_trait::async_trait;
use bytes::Bytes;
use precond_core::types::{ETag, Precondition};
use precond_core::Result;

/// A bucket-scoped handle to an object store.
///
/// All operations are async and every implementation must surface
/// precondition violations as [`precond_core::Error::PreconditionFailed`],
/// distinguishable from every other error class; the harness's verdicts
/// depend on that distinction.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Write an object, gated by the given precondition.
    ///
    /// Returns the ETag of the newly written version.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` if the store refused the write,
    /// `Timeout` if the call did not resolve in time, or `Store` for any
    /// other failure.
    async fn put(&self, key: &str, body: Bytes, precondition: &Precondition) -> Result<ETag>;

    /// Read an object's content and current ETag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no object exists at the key.
    async fn get(&self, key: &str) -> Result<(Bytes, ETag)>;

    /// Delete an object. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport or server failures.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys under a prefix. Used only for cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be retrieved.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check that the bucket is reachable. Used only for readiness polling.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket cannot be reached.
    async fn head_bucket(&self) -> Result<()>;
}

/// Mints independent store handles.
///
/// Concurrent writers in the race and counter drivers must not share a
/// client handle, so client-side serialization can never masquerade as
/// store-side atomicity. Each writer task calls [`StoreFactory::connect`]
/// for a handle of its own.
pub trait StoreFactory: Send + Sync {
    /// The handle type this factory produces.
    type Store: ObjectStore;

    /// Create a fresh, independent handle.
    ///
    /// # Errors
    ///
    /// Returns an error if a handle cannot be constructed.
    fn connect(&self) -> Result<Self::Store>;
}
