use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    models::{BoxModel, BoxSnapshot, CardModel},
    repository::BoxRepository,
    types::{AddCardRequest, BoxCreateRequest},
};
use crate::cache::{CacheConfig, TtlCache};
use crate::shared::AppError;

/// Service for box catalog business logic
///
/// Gameplay reads go through a TTL-bounded cache; catalog mutations
/// invalidate the affected entry so future draws see the new pool.
pub struct CatalogService {
    repository: Arc<dyn BoxRepository + Send + Sync>,
    snapshots: TtlCache<String, BoxSnapshot>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn BoxRepository + Send + Sync>, cache: CacheConfig) -> Self {
        Self {
            repository,
            snapshots: TtlCache::new(cache),
        }
    }

    #[instrument(skip(self))]
    pub async fn create_box(&self, request: BoxCreateRequest) -> Result<BoxModel, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::BadRequest("Box name cannot be empty".to_string()));
        }
        if request.cards_per_pack == 0 {
            return Err(AppError::BadRequest(
                "Box must contain at least one card per pack".to_string(),
            ));
        }
        if request.price < 0 {
            return Err(AppError::BadRequest(
                "Box price cannot be negative".to_string(),
            ));
        }

        let box_model = BoxModel::new(request.name, request.cards_per_pack, request.price);
        self.repository.create_box(&box_model).await?;

        info!(box_id = %box_model.id, name = %box_model.name, "Box created");
        Ok(box_model)
    }

    #[instrument(skip(self))]
    pub async fn add_card(&self, box_id: &str, request: AddCardRequest) -> Result<CardModel, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::BadRequest("Card name cannot be empty".to_string()));
        }
        if !request.pull_rate.is_finite() || request.pull_rate < 0.0 {
            return Err(AppError::BadRequest(
                "Card pull rate must be a non-negative finite number".to_string(),
            ));
        }
        if request.coin_value < 0 {
            return Err(AppError::BadRequest(
                "Card coin value cannot be negative".to_string(),
            ));
        }

        let card = CardModel::new(
            box_id.to_string(),
            request.name,
            request.rarity,
            request.pull_rate,
            request.coin_value,
        );
        self.repository.add_card(&card).await?;
        self.snapshots.invalidate(&box_id.to_string());

        info!(box_id = %box_id, card_id = %card.id, "Card added to box");
        Ok(card)
    }

    /// Box plus pool in creation order, cached for gameplay reads
    #[instrument(skip(self))]
    pub async fn get_snapshot(&self, box_id: &str) -> Result<BoxSnapshot, AppError> {
        if let Some(snapshot) = self.snapshots.get(&box_id.to_string()) {
            debug!(box_id = %box_id, "Box snapshot served from cache");
            return Ok(snapshot);
        }

        let info = self
            .repository
            .get_box(box_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Box not found".to_string()))?;
        let cards = self.repository.get_cards(box_id).await?;

        let snapshot = BoxSnapshot { info, cards };
        self.snapshots.insert(box_id.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    pub async fn list_boxes(&self) -> Result<Vec<BoxModel>, AppError> {
        self.repository.list_active_boxes().await
    }

    #[instrument(skip(self))]
    pub async fn deactivate_box(&self, box_id: &str) -> Result<(), AppError> {
        self.repository.set_box_active(box_id, false).await?;
        self.snapshots.invalidate(&box_id.to_string());
        info!(box_id = %box_id, "Box deactivated");
        Ok(())
    }
}
