use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use super::models::BattleModel;
use super::types::{
    BattleCreateRequest, BattleDetailsResponse, JoinBattleRequest, ReadyRequest,
};
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a new battle
///
/// POST /battles
#[instrument(name = "create_battle", skip(state, request))]
pub async fn create_battle(
    State(state): State<AppState>,
    Json(request): Json<BattleCreateRequest>,
) -> Result<Json<BattleModel>, AppError> {
    info!(box_id = %request.box_id, mode = %request.mode, "Creating battle");

    let battle = state.battles.create_battle(request).await?;
    Ok(Json(battle))
}

/// HTTP handler for listing joinable battles
///
/// GET /battles
#[instrument(name = "list_battles", skip(state))]
pub async fn list_battles(
    State(state): State<AppState>,
) -> Result<Json<Vec<BattleModel>>, AppError> {
    let battles = state.battles.list_open_battles().await?;
    Ok(Json(battles))
}

/// HTTP handler for fetching a battle with participants and pulls
///
/// GET /battles/:battle_id
#[instrument(name = "get_battle", skip(state))]
pub async fn get_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
) -> Result<Json<BattleDetailsResponse>, AppError> {
    let details = state.battles.get_details(&battle_id).await?;
    Ok(Json(details.into()))
}

/// HTTP handler for joining a battle
///
/// POST /battles/:battle_id/join
#[instrument(name = "join_battle", skip(state, request))]
pub async fn join_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    Json(request): Json<JoinBattleRequest>,
) -> Result<Json<BattleModel>, AppError> {
    let battle = state.battles.join(&battle_id, &request.user_id).await?;
    Ok(Json(battle))
}

/// HTTP handler for flagging a participant ready
///
/// POST /battles/:battle_id/ready
#[instrument(name = "mark_ready", skip(state, request))]
pub async fn mark_ready(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    Json(request): Json<ReadyRequest>,
) -> Result<StatusCode, AppError> {
    state
        .battles
        .mark_ready(&battle_id, &request.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// HTTP handler for starting a full, ready battle
///
/// POST /battles/:battle_id/start
#[instrument(name = "start_battle", skip(state))]
pub async fn start_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
) -> Result<Json<BattleDetailsResponse>, AppError> {
    state.battles.start(&battle_id).await?;
    let details = state.battles.get_details(&battle_id).await?;
    Ok(Json(details.into()))
}

/// HTTP handler for cancelling a waiting battle
///
/// POST /battles/:battle_id/cancel
#[instrument(name = "cancel_battle", skip(state))]
pub async fn cancel_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.battles.cancel(&battle_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// HTTP handler for deleting a completed or cancelled battle
///
/// DELETE /battles/:battle_id
#[instrument(name = "delete_battle", skip(state))]
pub async fn delete_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.battles.delete_battle(&battle_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
