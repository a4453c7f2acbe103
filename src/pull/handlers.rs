use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::models::PullModel;
use super::types::{OpenPackRequest, SellPullRequest, SellPullResponse};
use crate::shared::{AppError, AppState};

/// HTTP handler for opening a pack
///
/// POST /packs/open
#[instrument(name = "open_pack", skip(state, request))]
pub async fn open_pack(
    State(state): State<AppState>,
    Json(request): Json<OpenPackRequest>,
) -> Result<Json<Vec<PullModel>>, AppError> {
    info!(user_id = %request.user_id, box_id = %request.box_id, "Opening pack");

    let pulls = state
        .pulls
        .open_pack(&request.user_id, &request.box_id)
        .await?;

    Ok(Json(pulls))
}

/// HTTP handler for selling a pull back for coins
///
/// POST /pulls/:pull_id/sell
#[instrument(name = "sell_pull", skip(state, request))]
pub async fn sell_pull(
    State(state): State<AppState>,
    Path(pull_id): Path<String>,
    Json(request): Json<SellPullRequest>,
) -> Result<Json<SellPullResponse>, AppError> {
    let balance = state.pulls.sell_pull(&request.user_id, &pull_id).await?;
    Ok(Json(SellPullResponse { balance }))
}

/// HTTP handler for listing a user's pulls
///
/// GET /pulls/:user_id
#[instrument(name = "list_pulls", skip(state))]
pub async fn list_pulls(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PullModel>>, AppError> {
    let pulls = state.pulls.list_pulls(&user_id).await?;
    Ok(Json(pulls))
}
