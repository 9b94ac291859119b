//! Record registries owning the two coupled lifecycles.
//!
//! [`session_keys::SessionKeyRegistry`] owns delegated-key issuance and
//! installation state; [`subscriptions::SubscriptionRegistry`] owns billing
//! state. Cross-registry invariants are enforced one layer up by the
//! coordinator.

pub mod session_keys;
pub mod subscriptions;

use thiserror::Error;

use crate::store::StoreError;
use crate::types::SessionKeyStatus;

/// Errors raised by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No record on file for the user
    #[error("no session key found for user")]
    NotFound,

    /// Requested status change is not allowed from the current state
    #[error("invalid session key transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionKeyStatus,
        to: SessionKeyStatus,
    },

    /// Persistence layer failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
