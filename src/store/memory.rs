//! In-memory record store.
//!
//! Backs tests and ephemeral deployments; implements the same contract as the
//! file store with plain maps under async read/write locks.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError};
use crate::types::{SessionKeyRecord, SubscriptionRecord};

/// Non-durable record store keeping both tables in process memory.
#[derive(Default)]
pub struct MemoryStore {
    session_keys: RwLock<HashMap<String, SessionKeyRecord>>,
    subscriptions: RwLock<HashMap<String, SubscriptionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_session_key(
        &self,
        user_id: &str,
    ) -> Result<Option<SessionKeyRecord>, StoreError> {
        Ok(self.session_keys.read().await.get(user_id).cloned())
    }

    async fn put_session_key(&self, record: SessionKeyRecord) -> Result<(), StoreError> {
        self.session_keys
            .write()
            .await
            .insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn delete_session_key(&self, user_id: &str) -> Result<(), StoreError> {
        self.session_keys.write().await.remove(user_id);
        Ok(())
    }

    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self.subscriptions.read().await.get(user_id).cloned())
    }

    async fn put_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        self.subscriptions
            .write()
            .await
            .insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn delete_subscription(&self, user_id: &str) -> Result<(), StoreError> {
        self.subscriptions.write().await.remove(user_id);
        Ok(())
    }
}
