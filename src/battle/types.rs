use serde::{Deserialize, Serialize};

use super::models::{BattleMode, BattlePullModel, BattleStatus};
use super::service::BattleDetails;

/// Request payload for creating a new battle
#[derive(Debug, Deserialize)]
pub struct BattleCreateRequest {
    pub box_id: String,
    pub mode: BattleMode,
    pub max_participants: u32,
    pub entry_fee: i64,
    pub rounds: u32,
}

/// Request payload for joining a battle
#[derive(Debug, Deserialize)]
pub struct JoinBattleRequest {
    pub user_id: String,
}

/// Request payload for flagging readiness
#[derive(Debug, Deserialize)]
pub struct ReadyRequest {
    pub user_id: String,
}

/// Response for battle information
#[derive(Debug, Serialize, Deserialize)]
pub struct BattleResponse {
    pub id: String,
    pub box_id: String,
    pub mode: BattleMode,
    pub status: BattleStatus,
    pub max_participants: u32,
    pub entry_fee: i64,
    pub total_prize: i64,
    pub rounds: u32,
    pub winner_user_id: Option<String>,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantView {
    pub user_id: String,
    pub is_ready: bool,
    pub total_value: i64,
}

/// Full battle view including recorded pulls
#[derive(Debug, Serialize, Deserialize)]
pub struct BattleDetailsResponse {
    #[serde(flatten)]
    pub battle: BattleResponse,
    pub pulls: Vec<BattlePullModel>,
}

impl From<BattleDetails> for BattleDetailsResponse {
    fn from(details: BattleDetails) -> Self {
        let battle = BattleResponse {
            id: details.battle.id,
            box_id: details.battle.box_id,
            mode: details.battle.mode,
            status: details.battle.status,
            max_participants: details.battle.max_participants,
            entry_fee: details.battle.entry_fee,
            total_prize: details.battle.total_prize,
            rounds: details.battle.rounds,
            winner_user_id: details.battle.winner_user_id,
            participants: details
                .participants
                .into_iter()
                .map(|p| ParticipantView {
                    user_id: p.user_id,
                    is_ready: p.is_ready,
                    total_value: p.total_value,
                })
                .collect(),
        };

        Self {
            battle,
            pulls: details.pulls,
        }
    }
}
