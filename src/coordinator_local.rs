//! Local coordinator implementation.
//!
//! Enforces the cross-registry invariants of the two-state-machine model
//! (session key state x subscription state):
//!
//! - a subscription is only ever created after an install confirmation, so an
//!   `active`/`paused` subscription always references an `installed` key;
//! - `confirm_install` never regresses an installed key and is idempotent on
//!   client retries;
//! - address checks compare case-insensitively against the stored canonical
//!   (EIP-55) form and fail without mutating anything;
//! - cancellation is terminal: subscription deleted, key revoked then
//!   deleted. A later issuance starts a fresh key/subscription pair.

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{CoordinatorConfig, ModulesConfig, PolicyConfig};
use crate::coordinator::{Coordinator, CoordinatorError};
use crate::install_payload::{build_install_data, HookPolicy, InstallData};
use crate::registry::session_keys::SessionKeyRegistry;
use crate::registry::subscriptions::SubscriptionRegistry;
use crate::store::RecordStore;
use crate::types::{
    CancelRequest, CancelResponse, CheckRequest, CheckResponse, ConfirmInstallRequest,
    ConfirmInstallResponse, CreateSessionRequest, CreateSessionResponse, InstallDataRequest,
    PauseRequest, PauseResponse, SessionKeyInfoRequest, SessionKeyInfoResponse, SessionKeyStatus,
    SubscriptionRecord, SubscriptionStatus,
};

/// Coordinator backed by local registries over an injected record store.
pub struct CoordinatorLocal {
    session_keys: SessionKeyRegistry,
    subscriptions: SubscriptionRegistry,
    policy: PolicyConfig,
    modules: ModulesConfig,
    // Serializes the multi-write sequences (issue, confirm, pause, cancel)
    // per user. The registry-internal locks only cover single operations;
    // "active subscription implies installed key" needs the whole sequence
    // to be exclusive against other writers for the same user. Always
    // acquired before any registry lock, never the other way around.
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CoordinatorLocal {
    pub fn new(store: Arc<dyn RecordStore>, config: &CoordinatorConfig) -> Self {
        Self {
            session_keys: SessionKeyRegistry::new(store.clone()),
            subscriptions: SubscriptionRegistry::new(store),
            policy: config.policy.clone(),
            modules: config.modules.clone(),
            user_locks: DashMap::new(),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Resolve the configured policy with `valid_until` stamped at call time.
    ///
    /// `valid_until` is clamped to the uint48 ceiling the hook's ABI field
    /// carries, so an oversized configured horizon degrades to "valid as far
    /// as the field can express" instead of panicking at encode time.
    fn policy_now(&self) -> HookPolicy {
        const MAX_UINT48: u64 = (1 << 48) - 1;

        let now = Utc::now().timestamp().max(0) as u64;
        HookPolicy {
            hook_entity_id: self.policy.hook_entity_id,
            merchant: self.policy.merchant,
            token: self.policy.token,
            max_per_period: self.policy.max_per_period,
            period_secs: self.policy.period_secs,
            valid_until: now
                .saturating_add(self.policy.validity_horizon_secs)
                .min(MAX_UINT48),
            paused: self.policy.paused,
        }
    }
}

/// Require a present, non-blank string field.
fn require<'a>(
    field: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, CoordinatorError> {
    match field.as_deref() {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CoordinatorError::Validation(name)),
    }
}

/// Require a field that must parse as an EVM address. Parsing is what makes
/// later comparisons case-insensitive.
fn require_address(
    field: &Option<String>,
    name: &'static str,
) -> Result<Address, CoordinatorError> {
    require(field, name)?
        .parse::<Address>()
        .map_err(|_| CoordinatorError::Validation(name))
}

/// Compare a stored canonical address against a caller-supplied one.
fn stored_address(stored: &str, what: &'static str) -> Result<Address, CoordinatorError> {
    // A stored record holding an unparseable address means the store was
    // tampered with or corrupted; surface it as a mismatch, not a panic.
    stored
        .parse::<Address>()
        .map_err(|_| CoordinatorError::AddressMismatch(what))
}

#[async_trait]
impl Coordinator for CoordinatorLocal {
    type Error = CoordinatorError;

    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, CoordinatorError> {
        let user_id = require(&request.user_id, "userId")?;
        let account = require_address(&request.account_address, "accountAddress")?;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let session_key_address = self
            .session_keys
            .issue(user_id, &account.to_checksum(None))
            .await?;

        Ok(CreateSessionResponse {
            session_key_address,
        })
    }

    async fn install_data(
        &self,
        request: &InstallDataRequest,
    ) -> Result<InstallData, CoordinatorError> {
        let user_id = require(&request.user_id, "userId")?;
        let supplied_key = require_address(&request.session_key_address, "sessionKeyAddress")?;
        let supplied_account = require_address(&request.account_address, "accountAddress")?;

        let record = self
            .session_keys
            .get(user_id)
            .await?
            .ok_or(CoordinatorError::NotFound("session key"))?;

        if stored_address(&record.public_key, "session key")? != supplied_key {
            return Err(CoordinatorError::AddressMismatch("session key"));
        }
        if stored_address(&record.account_address, "account")? != supplied_account {
            return Err(CoordinatorError::AddressMismatch("account"));
        }

        let policy = self.policy_now();
        Ok(build_install_data(&self.modules, &policy, supplied_key))
    }

    async fn confirm_install(
        &self,
        request: &ConfirmInstallRequest,
    ) -> Result<ConfirmInstallResponse, CoordinatorError> {
        let user_id = require(&request.user_id, "userId")?;
        let supplied_key = require_address(&request.session_key, "sessionKey")?;
        require_address(&request.account_address, "accountAddress")?;

        // Hold the user lock across the whole read-install-upsert sequence
        // so a concurrent cancel cannot slip between the key installation
        // and the subscription write.
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let record = self
            .session_keys
            .get(user_id)
            .await?
            .ok_or(CoordinatorError::NotFound("session key"))?;

        if stored_address(&record.public_key, "session key")? != supplied_key {
            return Err(CoordinatorError::AddressMismatch("session key"));
        }

        // Retried confirm for an already-live pair is a no-op success; in
        // particular it must not flip a paused subscription back to active.
        if record.status == SessionKeyStatus::Installed
            && self.subscriptions.get(user_id).await?.is_some()
        {
            return Ok(ConfirmInstallResponse {
                ok: true,
                tx_hash: request.tx_hash.clone(),
            });
        }

        self.session_keys.mark_installed(user_id).await?;

        // Only now that the key is installed does a subscription come into
        // existence; the record reuses the stored canonical addresses rather
        // than whatever casing the client sent.
        self.subscriptions
            .upsert(SubscriptionRecord {
                user_id: user_id.to_string(),
                account_address: record.account_address.clone(),
                status: SubscriptionStatus::Active,
                session_key: record.public_key.clone(),
                updated_at: Utc::now(),
            })
            .await?;

        tracing::info!(user_id, tx_hash = ?request.tx_hash, "Subscription activated");
        Ok(ConfirmInstallResponse {
            ok: true,
            tx_hash: request.tx_hash.clone(),
        })
    }

    async fn check(&self, request: &CheckRequest) -> Result<CheckResponse, CoordinatorError> {
        let user_id = require(&request.user_id, "userId")?;
        let subscription = self.subscriptions.get(user_id).await?;

        Ok(CheckResponse {
            has_subscription: subscription.is_some(),
            is_active: subscription
                .as_ref()
                .is_some_and(|s| s.status == SubscriptionStatus::Active),
            is_paused: subscription
                .as_ref()
                .is_some_and(|s| s.status == SubscriptionStatus::Paused),
            session_key: subscription.map(|s| s.session_key),
        })
    }

    async fn set_paused(&self, request: &PauseRequest) -> Result<PauseResponse, CoordinatorError> {
        let user_id = require(&request.user_id, "userId")?;
        let paused = request
            .paused
            .ok_or(CoordinatorError::Validation("paused"))?;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let status = if paused {
            SubscriptionStatus::Paused
        } else {
            SubscriptionStatus::Active
        };
        self.subscriptions.set_status(user_id, status).await?;

        Ok(PauseResponse { ok: true })
    }

    async fn cancel(&self, request: &CancelRequest) -> Result<CancelResponse, CoordinatorError> {
        let user_id = require(&request.user_id, "userId")?;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        // Revoke before delete: a crash between the writes leaves a terminal
        // key record rather than a live one pointing at no subscription.
        self.subscriptions.cancel(user_id).await?;
        self.session_keys.mark_revoked(user_id).await?;
        self.session_keys.remove(user_id).await?;

        tracing::info!(user_id, tx_hash = ?request.tx_hash, "Subscription cancelled");
        Ok(CancelResponse {
            ok: true,
            tx_hash: request.tx_hash.clone(),
        })
    }

    async fn session_key_info(
        &self,
        request: &SessionKeyInfoRequest,
    ) -> Result<SessionKeyInfoResponse, CoordinatorError> {
        let user_id = require(&request.user_id, "userId")?;

        let record = self
            .session_keys
            .get(user_id)
            .await?
            .ok_or(CoordinatorError::NotFound("session key"))?;

        Ok(SessionKeyInfoResponse {
            session_key_address: record.public_key,
            validation_entity_id: self.modules.validation_entity_id,
            account_address: record.account_address,
            status: record.status,
            updated_at: record.updated_at,
        })
    }
}
