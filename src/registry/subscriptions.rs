//! Subscription registry: billing state bound to an installed session key.

use chrono::Utc;
use std::sync::Arc;

use super::RegistryError;
use crate::store::RecordStore;
use crate::types::{SubscriptionRecord, SubscriptionStatus};

/// Registry owning [`SubscriptionRecord`]s, zero or one per user.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    store: Arc<dyn RecordStore>,
}

impl SubscriptionRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<SubscriptionRecord>, RegistryError> {
        Ok(self.store.get_subscription(user_id).await?)
    }

    /// Fully replace the record for the user, stamping `updated_at`.
    ///
    /// Only called after on-chain installation succeeded; the coordinator
    /// never writes a subscription speculatively.
    pub async fn upsert(&self, mut record: SubscriptionRecord) -> Result<(), RegistryError> {
        record.updated_at = Utc::now();
        self.store.put_subscription(record).await?;
        Ok(())
    }

    /// Set the billing status. Silent no-op when no record exists: pause and
    /// resume are only reachable from states where a record is expected, and
    /// callers must not rely on an error signal here.
    pub async fn set_status(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
    ) -> Result<(), RegistryError> {
        let Some(mut record) = self.store.get_subscription(user_id).await? else {
            tracing::debug!(user_id, ?status, "Status change for absent subscription ignored");
            return Ok(());
        };
        record.status = status;
        record.updated_at = Utc::now();
        self.store.put_subscription(record).await?;
        tracing::info!(user_id, ?status, "Subscription status updated");
        Ok(())
    }

    /// Delete the record. Idempotent.
    pub async fn cancel(&self, user_id: &str) -> Result<(), RegistryError> {
        self.store.delete_subscription(user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new(Arc::new(MemoryStore::new()))
    }

    fn record(user_id: &str, status: SubscriptionStatus) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: user_id.to_string(),
            account_address: "0x1111111111111111111111111111111111111111".to_string(),
            status,
            session_key: "0x2222222222222222222222222222222222222222".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_stamps_updated_at() {
        let registry = registry();
        let stale = Utc::now() - chrono::Duration::days(1);
        let mut rec = record("u1", SubscriptionStatus::Active);
        rec.updated_at = stale;

        registry.upsert(rec).await.unwrap();
        let loaded = registry.get("u1").await.unwrap().unwrap();
        assert!(loaded.updated_at > stale);
    }

    #[tokio::test]
    async fn test_set_status_on_absent_record_is_noop() {
        let registry = registry();
        registry
            .set_status("ghost", SubscriptionStatus::Paused)
            .await
            .unwrap();
        assert!(registry.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pause_resume_roundtrip() {
        let registry = registry();
        registry
            .upsert(record("u1", SubscriptionStatus::Active))
            .await
            .unwrap();
        let before = registry.get("u1").await.unwrap().unwrap();

        registry
            .set_status("u1", SubscriptionStatus::Paused)
            .await
            .unwrap();
        let paused = registry.get("u1").await.unwrap().unwrap();
        assert_eq!(paused.status, SubscriptionStatus::Paused);

        registry
            .set_status("u1", SubscriptionStatus::Active)
            .await
            .unwrap();
        let resumed = registry.get("u1").await.unwrap().unwrap();
        assert_eq!(resumed.status, SubscriptionStatus::Active);
        assert_eq!(resumed.session_key, before.session_key);
        assert!(resumed.updated_at >= paused.updated_at);
        assert!(paused.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let registry = registry();
        registry
            .upsert(record("u1", SubscriptionStatus::Active))
            .await
            .unwrap();

        registry.cancel("u1").await.unwrap();
        assert!(registry.get("u1").await.unwrap().is_none());
        registry.cancel("u1").await.unwrap();
    }
}
