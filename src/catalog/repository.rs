use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{BoxModel, CardModel};
use crate::shared::AppError;

/// Trait for box catalog repository operations
///
/// `get_cards` must return cards in creation order; the pull engine relies
/// on a deterministic pool order for reproducible seeded draws.
#[async_trait]
pub trait BoxRepository {
    async fn create_box(&self, box_model: &BoxModel) -> Result<(), AppError>;
    async fn get_box(&self, box_id: &str) -> Result<Option<BoxModel>, AppError>;
    async fn list_active_boxes(&self) -> Result<Vec<BoxModel>, AppError>;
    async fn add_card(&self, card: &CardModel) -> Result<(), AppError>;
    async fn get_cards(&self, box_id: &str) -> Result<Vec<CardModel>, AppError>;
    async fn set_box_active(&self, box_id: &str, is_active: bool) -> Result<(), AppError>;
}

/// In-memory implementation of BoxRepository for development and testing
pub struct InMemoryBoxRepository {
    boxes: Mutex<HashMap<String, BoxModel>>,
    /// box_id -> cards in creation order
    cards: Mutex<HashMap<String, Vec<CardModel>>>,
}

impl Default for InMemoryBoxRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBoxRepository {
    pub fn new() -> Self {
        Self {
            boxes: Mutex::new(HashMap::new()),
            cards: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BoxRepository for InMemoryBoxRepository {
    #[instrument(skip(self, box_model))]
    async fn create_box(&self, box_model: &BoxModel) -> Result<(), AppError> {
        debug!(box_id = %box_model.id, name = %box_model.name, "Creating box in memory");

        let mut boxes = self.boxes.lock().unwrap();
        if boxes.contains_key(&box_model.id) {
            warn!(box_id = %box_model.id, "Box already exists in memory");
            return Err(AppError::Database("Box already exists".to_string()));
        }
        boxes.insert(box_model.id.clone(), box_model.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_box(&self, box_id: &str) -> Result<Option<BoxModel>, AppError> {
        let boxes = self.boxes.lock().unwrap();
        Ok(boxes.get(box_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_active_boxes(&self) -> Result<Vec<BoxModel>, AppError> {
        let boxes = self.boxes.lock().unwrap();
        let mut active: Vec<BoxModel> = boxes.values().filter(|b| b.is_active).cloned().collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(active)
    }

    #[instrument(skip(self, card))]
    async fn add_card(&self, card: &CardModel) -> Result<(), AppError> {
        debug!(box_id = %card.box_id, card_id = %card.id, "Adding card to box in memory");

        let boxes = self.boxes.lock().unwrap();
        if !boxes.contains_key(&card.box_id) {
            warn!(box_id = %card.box_id, "Box not found for card");
            return Err(AppError::NotFound("Box not found".to_string()));
        }
        drop(boxes);

        let mut cards = self.cards.lock().unwrap();
        cards
            .entry(card.box_id.clone())
            .or_default()
            .push(card.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_cards(&self, box_id: &str) -> Result<Vec<CardModel>, AppError> {
        let cards = self.cards.lock().unwrap();
        Ok(cards.get(box_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn set_box_active(&self, box_id: &str, is_active: bool) -> Result<(), AppError> {
        let mut boxes = self.boxes.lock().unwrap();
        match boxes.get_mut(box_id) {
            Some(box_model) => {
                box_model.is_active = is_active;
                Ok(())
            }
            None => {
                warn!(box_id = %box_id, "Box not found for activation change");
                Err(AppError::NotFound("Box not found".to_string()))
            }
        }
    }
}
