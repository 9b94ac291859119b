//! HTTP endpoints for the subscription **coordinator**.
//!
//! These are the server-side checkpoints of the session-key handshake. The
//! client calls them in order — create-session, install-data, (submits the
//! install transaction itself), confirm-install — and then drives pause,
//! resume, and cancel through the remaining routes.
//!
//! Each endpoint consumes and produces the camelCase JSON payloads defined in
//! [`crate::types`], matching the shapes the web client already speaks.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{extract::State, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use crate::coordinator::{Coordinator, CoordinatorError};
use crate::types::{
    CancelRequest, CheckRequest, ConfirmInstallRequest, CreateSessionRequest, ErrorResponse,
    InstallDataRequest, PauseRequest, SessionKeyInfoRequest,
};

pub fn routes<C>() -> Router<Arc<C>>
where
    C: Coordinator<Error = CoordinatorError> + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .route("/subscription/create-session", post(post_create_session::<C>))
        .route("/subscription/install-data", post(post_install_data::<C>))
        .route("/subscription/confirm-install", post(post_confirm_install::<C>))
        .route("/subscription/check", post(post_check::<C>))
        .route("/subscription/pause", post(post_pause::<C>))
        .route("/subscription/cancel", post(post_cancel::<C>))
        .route("/subscription/session-key", post(post_session_key::<C>))
}

/// `GET /`: Returns a simple greeting message from the coordinator.
#[instrument(skip_all)]
pub async fn get_root() -> impl IntoResponse {
    let pkg_name = env!("CARGO_PKG_NAME");
    (StatusCode::OK, format!("Hello from {pkg_name}!"))
}

#[instrument(skip_all)]
pub async fn get_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `POST /subscription/create-session`: Checkpoint 1 — issue a delegated key.
///
/// Idempotent per user: re-posting returns the already-issued key address.
#[instrument(skip_all)]
pub async fn post_create_session<C>(
    State(coordinator): State<Arc<C>>,
    Json(body): Json<CreateSessionRequest>,
) -> impl IntoResponse
where
    C: Coordinator<Error = CoordinatorError>,
{
    match coordinator.create_session(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::warn!(error = ?error, "Session key issuance failed");
            error.into_response()
        }
    }
}

/// `POST /subscription/install-data`: Checkpoint 2 — build the module
/// installation payload for the user's pending key.
///
/// Read-only; the client submits the returned payload on-chain itself.
#[instrument(skip_all)]
pub async fn post_install_data<C>(
    State(coordinator): State<Arc<C>>,
    Json(body): Json<InstallDataRequest>,
) -> impl IntoResponse
where
    C: Coordinator<Error = CoordinatorError>,
{
    match coordinator.install_data(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::warn!(error = ?error, "Install payload request failed");
            error.into_response()
        }
    }
}

/// `POST /subscription/confirm-install`: Checkpoint 3 — the client reports
/// that the installation transaction landed; the key becomes `installed` and
/// the subscription goes `active`.
#[instrument(skip_all)]
pub async fn post_confirm_install<C>(
    State(coordinator): State<Arc<C>>,
    Json(body): Json<ConfirmInstallRequest>,
) -> impl IntoResponse
where
    C: Coordinator<Error = CoordinatorError>,
{
    match coordinator.confirm_install(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::warn!(error = ?error, "Install confirmation failed");
            error.into_response()
        }
    }
}

/// `POST /subscription/check`: Read the subscription's billing flags.
#[instrument(skip_all)]
pub async fn post_check<C>(
    State(coordinator): State<Arc<C>>,
    Json(body): Json<CheckRequest>,
) -> impl IntoResponse
where
    C: Coordinator<Error = CoordinatorError>,
{
    match coordinator.check(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// `POST /subscription/pause`: Pause or resume billing (`paused` flag).
#[instrument(skip_all)]
pub async fn post_pause<C>(
    State(coordinator): State<Arc<C>>,
    Json(body): Json<PauseRequest>,
) -> impl IntoResponse
where
    C: Coordinator<Error = CoordinatorError>,
{
    match coordinator.set_paused(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::warn!(error = ?error, "Pause/resume failed");
            error.into_response()
        }
    }
}

/// `POST /subscription/cancel`: Tear down the subscription and revoke the
/// key. Idempotent; cancellation is terminal.
#[instrument(skip_all)]
pub async fn post_cancel<C>(
    State(coordinator): State<Arc<C>>,
    Json(body): Json<CancelRequest>,
) -> impl IntoResponse
where
    C: Coordinator<Error = CoordinatorError>,
{
    match coordinator.cancel(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            tracing::warn!(error = ?error, "Cancellation failed");
            error.into_response()
        }
    }
}

/// `POST /subscription/session-key`: Public view of the user's session key.
/// Never returns private key material.
#[instrument(skip_all)]
pub async fn post_session_key<C>(
    State(coordinator): State<Arc<C>>,
    Json(body): Json<SessionKeyInfoRequest>,
) -> impl IntoResponse
where
    C: Coordinator<Error = CoordinatorError>,
{
    match coordinator.session_key_info(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error.into_response(),
    }
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoordinatorError::Validation(_) | CoordinatorError::AddressMismatch(_) => {
                StatusCode::BAD_REQUEST
            }
            CoordinatorError::NotFound(_) => StatusCode::NOT_FOUND,
            CoordinatorError::InvalidTransition(_) => StatusCode::CONFLICT,
            CoordinatorError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        fn status_of(error: CoordinatorError) -> StatusCode {
            error.into_response().status()
        }

        assert_eq!(
            status_of(CoordinatorError::Validation("userId")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoordinatorError::AddressMismatch("account")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoordinatorError::NotFound("session key")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoordinatorError::InvalidTransition("revoked".to_string())),
            StatusCode::CONFLICT
        );
    }
}
