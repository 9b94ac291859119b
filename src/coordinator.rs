//! Lifecycle coordinator interface.
//!
//! One method per external checkpoint of the session-key / subscription
//! handshake. The concrete implementation lives in
//! [`crate::coordinator_local::CoordinatorLocal`]; the trait keeps the HTTP
//! layer generic so tests can drive handlers against a stub.

use async_trait::async_trait;

use crate::install_payload::InstallData;
use crate::registry::RegistryError;
use crate::store::StoreError;
use crate::types::{
    CancelRequest, CancelResponse, CheckRequest, CheckResponse, ConfirmInstallRequest,
    ConfirmInstallResponse, CreateSessionRequest, CreateSessionResponse, InstallDataRequest,
    PauseRequest, PauseResponse, SessionKeyInfoRequest, SessionKeyInfoResponse,
};

/// Error taxonomy for coordinator operations.
///
/// Every variant is recoverable at the caller's discretion; none of them
/// leaves partial state behind. Retries belong to the client, which may take
/// arbitrarily long between checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// A required field is missing or malformed. Rejected before any lookup.
    #[error("missing or invalid field: {0}")]
    Validation(&'static str),

    /// No session key or subscription on file for this operation.
    #[error("{0} not found for user")]
    NotFound(&'static str),

    /// A supplied address disagrees with the stored canonical one. Guards
    /// against a client installing or confirming against state it does not
    /// own.
    #[error("{0} address mismatch")]
    AddressMismatch(&'static str),

    /// The requested lifecycle transition is not allowed from the current
    /// state (e.g. confirming a revoked key).
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The persistence layer failed; safe to retry.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl From<RegistryError> for CoordinatorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => CoordinatorError::NotFound("session key"),
            RegistryError::InvalidTransition { .. } => {
                CoordinatorError::InvalidTransition(err.to_string())
            }
            RegistryError::Store(e) => CoordinatorError::Storage(e),
        }
    }
}

/// The four-checkpoint handshake plus the read and lifecycle operations.
///
/// Triggered synchronously per call; the on-chain installation between
/// `install_data` and `confirm_install` happens client-side and may take an
/// unbounded amount of time — no server state blocks on it.
#[async_trait]
pub trait Coordinator: Send + Sync {
    type Error;

    /// Checkpoint 1: issue (or idempotently return) the delegated key.
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, Self::Error>;

    /// Checkpoint 2: build the installation payload for a pending key.
    /// Read-only.
    async fn install_data(
        &self,
        request: &InstallDataRequest,
    ) -> Result<InstallData, Self::Error>;

    /// Checkpoint 3: record that the client's install transaction landed.
    /// Installs the key and activates the subscription; idempotent on retry.
    async fn confirm_install(
        &self,
        request: &ConfirmInstallRequest,
    ) -> Result<ConfirmInstallResponse, Self::Error>;

    /// Read the subscription's billing flags.
    async fn check(&self, request: &CheckRequest) -> Result<CheckResponse, Self::Error>;

    /// Pause (`paused: true`) or resume (`paused: false`) billing.
    async fn set_paused(&self, request: &PauseRequest) -> Result<PauseResponse, Self::Error>;

    /// Tear down the subscription and revoke the key. Idempotent, terminal.
    async fn cancel(&self, request: &CancelRequest) -> Result<CancelResponse, Self::Error>;

    /// Public view of the session key; never exposes private material.
    async fn session_key_info(
        &self,
        request: &SessionKeyInfoRequest,
    ) -> Result<SessionKeyInfoResponse, Self::Error>;
}
