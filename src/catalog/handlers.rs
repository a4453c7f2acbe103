use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::types::{AddCardRequest, BoxCreateRequest, BoxResponse};
use crate::catalog::models::CardModel;
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a new box
///
/// POST /boxes
#[instrument(name = "create_box", skip(state, request))]
pub async fn create_box(
    State(state): State<AppState>,
    Json(request): Json<BoxCreateRequest>,
) -> Result<Json<BoxResponse>, AppError> {
    let box_model = state.catalog.create_box(request).await?;

    info!(box_id = %box_model.id, "Box created via API");
    Ok(Json(box_model.into()))
}

/// HTTP handler for adding a card to a box's pool
///
/// POST /boxes/:box_id/cards
#[instrument(name = "add_card", skip(state, request))]
pub async fn add_card(
    State(state): State<AppState>,
    Path(box_id): Path<String>,
    Json(request): Json<AddCardRequest>,
) -> Result<Json<CardModel>, AppError> {
    let card = state.catalog.add_card(&box_id, request).await?;
    Ok(Json(card))
}

/// HTTP handler for listing active boxes
///
/// GET /boxes
#[instrument(name = "list_boxes", skip(state))]
pub async fn list_boxes(
    State(state): State<AppState>,
) -> Result<Json<Vec<BoxResponse>>, AppError> {
    let boxes = state.catalog.list_boxes().await?;
    Ok(Json(boxes.into_iter().map(Into::into).collect()))
}

/// HTTP handler for fetching one box with its card pool
///
/// GET /boxes/:box_id
#[instrument(name = "get_box", skip(state))]
pub async fn get_box(
    State(state): State<AppState>,
    Path(box_id): Path<String>,
) -> Result<Json<crate::catalog::models::BoxSnapshot>, AppError> {
    let snapshot = state.catalog.get_snapshot(&box_id).await?;
    Ok(Json(snapshot))
}
