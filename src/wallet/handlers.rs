use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::shared::{AppError, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: i64,
}

/// HTTP handler for fetching a user's coin balance
///
/// GET /wallet/:user_id
#[instrument(name = "get_balance", skip(state))]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state.wallet.balance(&user_id).await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

/// HTTP handler for crediting coins to a user
///
/// POST /wallet/:user_id/deposit
#[instrument(name = "deposit", skip(state))]
pub async fn deposit(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state.wallet.credit(&user_id, request.amount).await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}
