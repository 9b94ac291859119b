//! Session key registry: issuance and installation state.
//!
//! Issuance is idempotent per user and safe under concurrency: every
//! read-modify-write runs under a per-user async mutex, so two racing
//! `issue` calls for the same new user serialize and the second one observes
//! the record the first one persisted.

use alloy::hex;
use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::RegistryError;
use crate::store::RecordStore;
use crate::types::{SessionKeyRecord, SessionKeyStatus};

/// Registry owning [`SessionKeyRecord`]s, at most one per user.
#[derive(Clone)]
pub struct SessionKeyRegistry {
    store: Arc<dyn RecordStore>,
    // Per-user write locks; entries are created lazily and never removed.
    // The table only grows with distinct user ids, which is acceptable for
    // the expected cardinality.
    user_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SessionKeyRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            user_locks: Arc::new(DashMap::new()),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Issue a delegated key for `user_id`, scoped to `account_address`.
    ///
    /// If a non-revoked record already exists, its stored public key is
    /// returned unchanged and nothing is generated or mutated. Otherwise
    /// fresh key material is generated, persisted as `pending`, and the new
    /// public address returned. Concurrent calls for the same user never
    /// produce two distinct keys.
    pub async fn issue(
        &self,
        user_id: &str,
        account_address: &str,
    ) -> Result<String, RegistryError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.get_session_key(user_id).await? {
            if existing.status != SessionKeyStatus::Revoked {
                tracing::debug!(user_id, public_key = %existing.public_key, "Reusing existing session key");
                return Ok(existing.public_key);
            }
            // A revoked record only lingers when a cancel was interrupted
            // between revoke and remove. Reusing it would hand out a key
            // that can never be installed again, so replace it.
            tracing::warn!(user_id, "Replacing leftover revoked session key");
            self.store.delete_session_key(user_id).await?;
        }

        let signer = PrivateKeySigner::random();
        let public_key = signer.address().to_checksum(None);
        let private_key = hex::encode_prefixed(signer.to_bytes());

        let now = Utc::now();
        let record = SessionKeyRecord {
            user_id: user_id.to_string(),
            account_address: account_address.to_string(),
            public_key: public_key.clone(),
            private_key,
            status: SessionKeyStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.store.put_session_key(record).await?;

        tracing::info!(user_id, public_key = %public_key, "Issued new session key");
        Ok(public_key)
    }

    /// Read-only lookup.
    pub async fn get(&self, user_id: &str) -> Result<Option<SessionKeyRecord>, RegistryError> {
        Ok(self.store.get_session_key(user_id).await?)
    }

    /// Transition `pending -> installed` after on-chain authorization.
    ///
    /// Idempotent when the key is already `installed` (networked clients
    /// retry confirms). Fails with `NotFound` when no record exists and
    /// `InvalidTransition` when the key was revoked.
    pub async fn mark_installed(&self, user_id: &str) -> Result<(), RegistryError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut record = self
            .store
            .get_session_key(user_id)
            .await?
            .ok_or(RegistryError::NotFound)?;

        match record.status {
            SessionKeyStatus::Installed => Ok(()),
            SessionKeyStatus::Revoked => Err(RegistryError::InvalidTransition {
                from: SessionKeyStatus::Revoked,
                to: SessionKeyStatus::Installed,
            }),
            SessionKeyStatus::Pending => {
                record.status = SessionKeyStatus::Installed;
                record.updated_at = Utc::now();
                self.store.put_session_key(record).await?;
                tracing::info!(user_id, "Session key installed");
                Ok(())
            }
        }
    }

    /// Transition any state to `revoked`. No-op when no record exists, so
    /// cancellation stays idempotent.
    pub async fn mark_revoked(&self, user_id: &str) -> Result<(), RegistryError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let Some(mut record) = self.store.get_session_key(user_id).await? else {
            return Ok(());
        };
        record.status = SessionKeyStatus::Revoked;
        record.updated_at = Utc::now();
        self.store.put_session_key(record).await?;
        tracing::info!(user_id, "Session key revoked");
        Ok(())
    }

    /// Delete the record. Callers decide the revoke-vs-delete policy; the
    /// coordinator revokes first so a crash between the two writes leaves a
    /// terminal record rather than a live one.
    pub async fn remove(&self, user_id: &str) -> Result<(), RegistryError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.store.delete_session_key(user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use alloy::primitives::Address;

    const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";

    fn registry() -> SessionKeyRegistry {
        SessionKeyRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_issue_is_idempotent() {
        let registry = registry();
        let first = registry.issue("u1", ACCOUNT).await.unwrap();
        let second = registry.issue("u1", ACCOUNT).await.unwrap();
        let third = registry.issue("u1", ACCOUNT).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);

        let record = registry.get("u1").await.unwrap().unwrap();
        assert_eq!(record.public_key, first);
        assert_eq!(record.status, SessionKeyStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_issue_yields_one_key() {
        let registry = registry();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.issue("u1", ACCOUNT).await.unwrap()
            }));
        }

        let mut keys = Vec::new();
        for handle in handles {
            keys.push(handle.await.unwrap());
        }
        keys.dedup();
        assert_eq!(keys.len(), 1, "all concurrent calls must agree on one key");

        let record = registry.get("u1").await.unwrap().unwrap();
        assert_eq!(record.public_key, keys[0]);
    }

    #[tokio::test]
    async fn test_issue_after_revoke_generates_fresh_key() {
        let registry = registry();
        let first = registry.issue("u1", ACCOUNT).await.unwrap();
        registry.mark_revoked("u1").await.unwrap();

        // A revoked record can linger when a cancel crashed between revoke
        // and remove; re-issuing must replace it, not resurrect it.
        let second = registry.issue("u1", ACCOUNT).await.unwrap();
        assert_ne!(first, second);

        let record = registry.get("u1").await.unwrap().unwrap();
        assert_eq!(record.status, SessionKeyStatus::Pending);
        assert_eq!(record.public_key, second);

        // The replacement key is installable again.
        registry.mark_installed("u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_users_get_distinct_keys() {
        let registry = registry();
        let k1 = registry.issue("u1", ACCOUNT).await.unwrap();
        let k2 = registry.issue("u2", ACCOUNT).await.unwrap();
        assert_ne!(k1, k2);
    }

    #[tokio::test]
    async fn test_mark_installed_transitions() {
        let registry = registry();

        // No record yet
        assert!(matches!(
            registry.mark_installed("u1").await,
            Err(RegistryError::NotFound)
        ));

        registry.issue("u1", ACCOUNT).await.unwrap();
        registry.mark_installed("u1").await.unwrap();
        let record = registry.get("u1").await.unwrap().unwrap();
        assert_eq!(record.status, SessionKeyStatus::Installed);

        // Idempotent re-confirm
        registry.mark_installed("u1").await.unwrap();
        let record = registry.get("u1").await.unwrap().unwrap();
        assert_eq!(record.status, SessionKeyStatus::Installed);

        // Revoked keys cannot be re-installed
        registry.mark_revoked("u1").await.unwrap();
        assert!(matches!(
            registry.mark_installed("u1").await,
            Err(RegistryError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_revoke_and_remove_are_lenient() {
        let registry = registry();
        registry.mark_revoked("ghost").await.unwrap();
        registry.remove("ghost").await.unwrap();

        registry.issue("u1", ACCOUNT).await.unwrap();
        registry.remove("u1").await.unwrap();
        assert!(registry.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issued_key_is_checksummed_and_parseable() {
        let registry = registry();
        let key = registry.issue("u1", ACCOUNT).await.unwrap();
        let parsed: Address = key.parse().expect("issued key must be a valid address");
        assert_eq!(parsed.to_checksum(None), key);
    }
}
