use serde::{Deserialize, Serialize};

/// Request payload for creating a new box
#[derive(Debug, Deserialize)]
pub struct BoxCreateRequest {
    pub name: String,
    pub cards_per_pack: u32,
    pub price: i64,
}

/// Request payload for adding a card to a box's pool
#[derive(Debug, Deserialize)]
pub struct AddCardRequest {
    pub name: String,
    pub rarity: String,
    pub pull_rate: f64,
    pub coin_value: i64,
}

/// Response for box information
#[derive(Debug, Serialize, Deserialize)]
pub struct BoxResponse {
    pub id: String,
    pub name: String,
    pub cards_per_pack: u32,
    pub price: i64,
    pub is_active: bool,
}

impl From<super::models::BoxModel> for BoxResponse {
    fn from(model: super::models::BoxModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            cards_per_pack: model.cards_per_pack,
            price: model.price,
            is_active: model.is_active,
        }
    }
}
