use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::catalog::models::CardModel;

/// Database model for a single card-draw outcome owned by a user
///
/// Card attributes are snapshotted at draw time; later edits to the card
/// never change what a user already pulled.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PullModel {
    pub id: String,
    pub user_id: String,
    pub box_id: String,
    pub card_id: String,
    pub card_name: String,
    pub rarity: String,
    /// Coin value at draw time, in minor units
    pub coin_value: i64,
    pub pulled_at: DateTime<Utc>,
}

impl PullModel {
    pub fn from_draw(user_id: &str, card: &CardModel) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            box_id: card.box_id.clone(),
            card_id: card.id.clone(),
            card_name: card.name.clone(),
            rarity: card.rarity.clone(),
            coin_value: card.coin_value,
            pulled_at: Utc::now(),
        }
    }
}
