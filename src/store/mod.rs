//! Durable key-value persistence for session keys and subscriptions.
//!
//! Two independent per-user tables sit behind one [`RecordStore`] trait so the
//! coordinator and registries never care whether records live in JSON files
//! ([`json_file::JsonFileStore`]) or in memory ([`memory::MemoryStore`], used
//! by tests and ephemeral deployments).

pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{SessionKeyRecord, SubscriptionRecord};

/// Errors surfaced by a record store.
///
/// These are upstream failures from the caller's point of view: the request
/// itself was fine, the persistence layer was not.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read/write failed
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded
    #[error("storage encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable mapping store for the two record kinds, keyed by user id.
///
/// Implementations must give read-your-writes consistency per user: a `put`
/// followed by a `get` for the same user observes the written record. Cross
/// user isolation is not required here; the registries layer per-user mutual
/// exclusion on top.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_session_key(&self, user_id: &str)
        -> Result<Option<SessionKeyRecord>, StoreError>;

    async fn put_session_key(&self, record: SessionKeyRecord) -> Result<(), StoreError>;

    async fn delete_session_key(&self, user_id: &str) -> Result<(), StoreError>;

    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    async fn put_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError>;

    async fn delete_subscription(&self, user_id: &str) -> Result<(), StoreError>;
}
