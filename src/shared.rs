use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::battle::BattleService;
use crate::catalog::CatalogService;
use crate::event::EventBus;
use crate::pull::PullService;
use crate::wallet::WalletRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub pulls: Arc<PullService>,
    pub battles: Arc<BattleService>,
    pub wallet: Arc<dyn WalletRepository + Send + Sync>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogService>,
        pulls: Arc<PullService>,
        battles: Arc<BattleService>,
        wallet: Arc<dyn WalletRepository + Send + Sync>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            pulls,
            battles,
            wallet,
            event_bus,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed box or card pool. Unrecoverable, surfaced to the operator.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation invalid for the entity's current state. Not retried.
    #[error("State error: {0}")]
    State(String),

    /// Race lost to a capacity limit (lobby full).
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// Coin balance too low for the requested debit.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// External collaborator timed out. Safe for the caller to retry.
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Stable error code exposed to clients, independent of the message text.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration_error",
            AppError::State(_) => "state_error",
            AppError::Capacity(_) => "capacity_error",
            AppError::InsufficientFunds(_) => "insufficient_funds",
            AppError::Transient(_) => "transient_error",
            AppError::Database(_) => "database_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::State(msg) => (StatusCode::CONFLICT, msg),
            AppError::Capacity(msg) => (StatusCode::CONFLICT, msg),
            AppError::InsufficientFunds(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::Transient(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
