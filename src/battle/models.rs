use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::pull::models::PullModel;

/// Battle lifecycle states
///
/// WAITING -> IN_PROGRESS -> FINISHED, or WAITING -> CANCELLED.
/// Transitions are one-directional; no state is re-enterable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleStatus {
    Waiting,
    InProgress,
    Finished,
    Cancelled,
}

impl BattleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BattleStatus::Finished | BattleStatus::Cancelled)
    }
}

/// How the pot is awarded at settlement
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleMode {
    /// Highest total value takes the pot
    Normal,
    /// Lowest total value takes the pot
    UpsideDown,
    /// Pot split proportionally to totals
    Jackpot,
    /// Pot split proportionally to totals
    Share,
}

/// Database model for a battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleModel {
    pub id: String,
    pub box_id: String,
    pub mode: BattleMode,
    pub status: BattleStatus,
    pub max_participants: u32,
    /// Entry fee in coin minor units
    pub entry_fee: i64,
    /// Sum of collected entry fees, in coin minor units
    pub total_prize: i64,
    pub rounds: u32,
    pub winner_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the lobby fills; drives the auto-start grace period
    pub full_at: Option<DateTime<Utc>>,
}

impl BattleModel {
    pub fn new(
        box_id: String,
        mode: BattleMode,
        max_participants: u32,
        entry_fee: i64,
        rounds: u32,
    ) -> Self {
        let battle_id = petname::Petnames::default().generate_one(2, "");

        Self {
            id: battle_id,
            box_id,
            mode,
            status: BattleStatus::Waiting,
            max_participants,
            entry_fee,
            total_prize: 0,
            rounds,
            winner_user_id: None,
            created_at: Utc::now(),
            full_at: None,
        }
    }
}

/// Database model for a battle participant
///
/// Participants are a historical record; they are never deleted once
/// created, even after the battle completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantModel {
    pub battle_id: String,
    pub user_id: String,
    pub is_ready: bool,
    /// Running sum of this participant's pulled card values
    pub total_value: i64,
    pub joined_at: DateTime<Utc>,
}

impl ParticipantModel {
    pub fn new(battle_id: String, user_id: String) -> Self {
        Self {
            battle_id,
            user_id,
            is_ready: false,
            total_value: 0,
            joined_at: Utc::now(),
        }
    }
}

/// Database model for one card draw within one round of a battle
///
/// `coin_value` is snapshotted from the card at draw time so the battle
/// history stays accurate if the card is later edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattlePullModel {
    pub battle_id: String,
    pub user_id: String,
    pub round: u32,
    pub pull_id: String,
    pub card_name: String,
    pub coin_value: i64,
    pub pulled_at: DateTime<Utc>,
}

impl BattlePullModel {
    pub fn from_pull(battle_id: &str, round: u32, pull: &PullModel) -> Self {
        Self {
            battle_id: battle_id.to_string(),
            user_id: pull.user_id.clone(),
            round,
            pull_id: pull.id.clone(),
            card_name: pull.card_name.clone(),
            coin_value: pull.coin_value,
            pulled_at: pull.pulled_at,
        }
    }
}
