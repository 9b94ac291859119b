//! Wire types and persisted records for the subscription coordinator.
//!
//! Every request/response struct here mirrors the JSON shapes consumed and
//! produced by the HTTP API (camelCase fields, `userId` keyed). The persisted
//! records are what the [`crate::store::RecordStore`] implementations write to
//! disk; they intentionally use the same camelCase field names so the on-disk
//! JSON stays human-inspectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a delegated session key.
///
/// `pending` keys have been generated server-side but not yet authorized
/// on-chain. `installed` keys are live validators on the user's smart account.
/// `revoked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKeyStatus {
    Pending,
    Installed,
    Revoked,
}

/// Billing state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Paused,
    Inactive,
}

/// Persisted session-key record, one per user.
///
/// `private_key` is the raw signing material and must never cross the HTTP
/// boundary; only the store sees the full record. The custom [`std::fmt::Debug`]
/// impl redacts it so structured logs cannot leak it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeyRecord {
    pub user_id: String,
    /// Smart account the key is scoped to. Immutable once set.
    pub account_address: String,
    /// EIP-55 checksummed address of the delegated signer.
    pub public_key: String,
    /// Raw hex-encoded private key. Secret at rest; see DESIGN.md on custody.
    pub private_key: String,
    pub status: SessionKeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for SessionKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyRecord")
            .field("user_id", &self.user_id)
            .field("account_address", &self.account_address)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Persisted subscription record, zero or one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub user_id: String,
    /// Must equal the bound session key's `account_address`.
    pub account_address: String,
    pub status: SubscriptionStatus,
    /// Public address of the bound session key.
    pub session_key: String,
    pub updated_at: DateTime<Utc>,
}

// ---------- HTTP request/response shapes ----------

/// `POST /subscription/create-session` request body.
///
/// Fields are optional so that missing-field validation happens in the
/// coordinator (a structured `ValidationError`) instead of a serde reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub account_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_key_address: String,
}

/// `POST /subscription/install-data` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallDataRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_key_address: Option<String>,
    #[serde(default)]
    pub account_address: Option<String>,
}

/// `POST /subscription/confirm-install` request body.
///
/// `tx_hash` is the client-side transaction reference for the installation;
/// it is echoed back but not verified against the chain here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmInstallRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(default)]
    pub account_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmInstallResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// `POST /subscription/check` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub has_subscription: bool,
    pub is_active: bool,
    pub is_paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

/// `POST /subscription/pause` request body. `paused: false` resumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub paused: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseResponse {
    pub ok: bool,
}

/// `POST /subscription/cancel` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// `POST /subscription/session-key` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeyInfoRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Public view of a session key. Never includes private material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeyInfoResponse {
    pub session_key_address: String,
    pub validation_entity_id: u32,
    pub account_address: String,
    pub status: SessionKeyStatus,
    pub updated_at: DateTime<Utc>,
}

/// Generic error body returned by all endpoints on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_record_json_shape() {
        let rec = SessionKeyRecord {
            user_id: "u1".to_string(),
            account_address: "0xAAA".to_string(),
            public_key: "0xBBB".to_string(),
            private_key: "0xsecret".to_string(),
            status: SessionKeyStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["accountAddress"], "0xAAA");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn debug_redacts_private_key() {
        let rec = SessionKeyRecord {
            user_id: "u1".to_string(),
            account_address: "0xAAA".to_string(),
            public_key: "0xBBB".to_string(),
            private_key: "0xdeadbeef".to_string(),
            status: SessionKeyStatus::Installed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let rendered = format!("{rec:?}");
        assert!(!rendered.contains("0xdeadbeef"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let req: CreateSessionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.user_id.is_none());
        assert!(req.account_address.is_none());

        let req: PauseRequest =
            serde_json::from_str(r#"{"userId": "u1"}"#).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert!(req.paused.is_none());
    }

    #[test]
    fn status_serde_roundtrip() {
        let json = serde_json::to_string(&SubscriptionStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
        let parsed: SubscriptionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SubscriptionStatus::Paused);
    }
}
