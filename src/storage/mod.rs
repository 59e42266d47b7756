//! Durable object storage for archive batches
//!
//! The archival engine only appends objects here and the search engine
//! only reads them, so backends need no locking. The trait keeps
//! S3-style remote stores pluggable; the CLI ships with a filesystem
//! backend.

mod fs;

pub use fs::*;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for object storage backends
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write an object. Overwrites any existing object at the path.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read an object's full contents
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Check whether an object exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<bool>;
}
