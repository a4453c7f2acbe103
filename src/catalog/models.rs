use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for boxes
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BoxModel {
    pub id: String,
    pub name: String,
    pub cards_per_pack: u32,
    /// Price in coin minor units
    pub price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl BoxModel {
    pub fn new(name: String, cards_per_pack: u32, price: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            cards_per_pack,
            price,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Database model for cards. A card belongs to exactly one box.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CardModel {
    pub id: String,
    pub box_id: String,
    pub name: String,
    pub rarity: String,
    /// Relative draw weight within the box; weights need not sum to 1.
    pub pull_rate: f64,
    /// Coin value in minor units, snapshotted onto pulls at draw time
    pub coin_value: i64,
    pub created_at: DateTime<Utc>,
}

impl CardModel {
    pub fn new(box_id: String, name: String, rarity: String, pull_rate: f64, coin_value: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            box_id,
            name,
            rarity,
            pull_rate,
            coin_value,
            created_at: Utc::now(),
        }
    }
}

/// A box together with its card pool, in card creation order.
///
/// The pool order is what makes a seeded draw sequence reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxSnapshot {
    pub info: BoxModel,
    pub cards: Vec<CardModel>,
}
