//! Remote object store
//!
//! The transport contract the core consumes, a Backblaze B2 implementation,
//! and the budgeted page cursor the aggregator drives.

pub mod b2;
pub mod errors;
pub mod lister;
pub mod types;

use async_trait::async_trait;

use crate::vault::Credential;

pub use b2::B2Store;
pub use errors::RemoteError;
pub use lister::{PageCursor, RemoteLister, TraversalBudget, TraversalOutcome};
pub use types::{BucketDescriptor, ObjectPage, RemoteObject};

/// Transport operations against a remote object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check a credential and return the buckets it can see
    async fn validate_credential(
        &self,
        credential: &Credential,
    ) -> Result<Vec<BucketDescriptor>, RemoteError>;

    /// Buckets visible to a credential
    async fn list_buckets(
        &self,
        credential: &Credential,
    ) -> Result<Vec<BucketDescriptor>, RemoteError>;

    /// One page of objects, resuming from `continuation` when given
    async fn list_objects_page(
        &self,
        bucket: &BucketDescriptor,
        prefix: Option<&str>,
        credential: &Credential,
        continuation: Option<&str>,
        page_size: u32,
    ) -> Result<ObjectPage, RemoteError>;

    /// Permanently delete an object
    async fn delete_object(
        &self,
        bucket: &BucketDescriptor,
        key: &str,
        credential: &Credential,
    ) -> Result<(), RemoteError>;
}
