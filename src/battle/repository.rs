use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::models::{BattleModel, BattlePullModel, BattleStatus, ParticipantModel};
use crate::shared::AppError;

/// Result of attempting to join a battle
#[derive(Debug, Clone)]
pub enum JoinBattleResult {
    /// Slot reserved; returns the participant and updated battle
    Joined {
        participant: ParticipantModel,
        battle: BattleModel,
    },
    /// Battle is at max_participants
    BattleFull,
    /// User already holds a slot in this battle
    AlreadyJoined,
    /// Battle is not in WAITING state
    InvalidState(BattleStatus),
    /// Battle does not exist
    NotFound,
}

/// Trait for battle repository operations
///
/// The join, transition, and round-recording operations are the atomicity
/// units of the battle flow: each must apply entirely or not at all, and
/// concurrent calls must serialize at the data layer.
#[async_trait]
pub trait BattleRepository {
    async fn create_battle(&self, battle: &BattleModel) -> Result<(), AppError>;
    async fn get_battle(&self, battle_id: &str) -> Result<Option<BattleModel>, AppError>;
    async fn list_battles_by_status(
        &self,
        status: BattleStatus,
    ) -> Result<Vec<BattleModel>, AppError>;
    async fn get_participants(&self, battle_id: &str)
        -> Result<Vec<ParticipantModel>, AppError>;

    /// Atomically reserves a participant slot: checks WAITING state,
    /// capacity, and duplicates, inserts the participant, adds the entry
    /// fee to the pot, and stamps `full_at` when the last slot fills.
    async fn try_join(&self, battle_id: &str, user_id: &str)
        -> Result<JoinBattleResult, AppError>;

    /// Releases a slot reserved by `try_join` (used when the entry-fee
    /// debit fails after reservation). Only valid while WAITING.
    async fn release_slot(&self, battle_id: &str, user_id: &str) -> Result<(), AppError>;

    async fn set_ready(&self, battle_id: &str, user_id: &str) -> Result<(), AppError>;

    /// Compare-and-set WAITING -> IN_PROGRESS. Returns false if the battle
    /// was not WAITING; exactly one concurrent caller can observe true.
    async fn try_start(&self, battle_id: &str) -> Result<bool, AppError>;

    /// Compare-and-set WAITING -> CANCELLED. Same exclusivity as `try_start`.
    async fn try_cancel(&self, battle_id: &str) -> Result<bool, AppError>;

    /// Compare-and-set IN_PROGRESS -> FINISHED, recording the winner.
    /// Exactly one concurrent caller can observe true; that caller is the
    /// only one allowed to pay out.
    async fn try_finish(&self, battle_id: &str, winner: Option<&str>) -> Result<bool, AppError>;

    /// Durably records all of a round's pulls and folds their values into
    /// the participants' running totals, as one atomic append. Pulls for
    /// round N are fully visible before any pull of round N+1 exists.
    async fn record_round_pulls(
        &self,
        battle_id: &str,
        round: u32,
        pulls: &[BattlePullModel],
    ) -> Result<(), AppError>;

    async fn get_battle_pulls(&self, battle_id: &str)
        -> Result<Vec<BattlePullModel>, AppError>;

    /// Administrative deletion; permitted only from terminal states.
    async fn delete_battle(&self, battle_id: &str) -> Result<(), AppError>;
}

#[derive(Default)]
struct BattleStore {
    battles: HashMap<String, BattleModel>,
    /// battle_id -> participants in join order
    participants: HashMap<String, Vec<ParticipantModel>>,
    /// battle_id -> pulls in recording order
    pulls: HashMap<String, Vec<BattlePullModel>>,
}

/// In-memory implementation of BattleRepository for development and testing
///
/// A single lock over the whole store is what makes the multi-entity
/// operations (join + pot accrual, round append + total update) atomic.
pub struct InMemoryBattleRepository {
    store: Mutex<BattleStore>,
}

impl Default for InMemoryBattleRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBattleRepository {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(BattleStore::default()),
        }
    }
}

#[async_trait]
impl BattleRepository for InMemoryBattleRepository {
    #[instrument(skip(self, battle))]
    async fn create_battle(&self, battle: &BattleModel) -> Result<(), AppError> {
        debug!(battle_id = %battle.id, box_id = %battle.box_id, "Creating battle in memory");

        let mut store = self.store.lock().unwrap();
        if store.battles.contains_key(&battle.id) {
            warn!(battle_id = %battle.id, "Battle already exists in memory");
            return Err(AppError::Database("Battle already exists".to_string()));
        }
        store.battles.insert(battle.id.clone(), battle.clone());
        store.participants.insert(battle.id.clone(), Vec::new());
        store.pulls.insert(battle.id.clone(), Vec::new());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_battle(&self, battle_id: &str) -> Result<Option<BattleModel>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.battles.get(battle_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_battles_by_status(
        &self,
        status: BattleStatus,
    ) -> Result<Vec<BattleModel>, AppError> {
        let store = self.store.lock().unwrap();
        let mut battles: Vec<BattleModel> = store
            .battles
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect();
        battles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(battles)
    }

    #[instrument(skip(self))]
    async fn get_participants(
        &self,
        battle_id: &str,
    ) -> Result<Vec<ParticipantModel>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.participants.get(battle_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn try_join(
        &self,
        battle_id: &str,
        user_id: &str,
    ) -> Result<JoinBattleResult, AppError> {
        let mut store = self.store.lock().unwrap();

        let battle = match store.battles.get(battle_id) {
            Some(battle) => battle.clone(),
            None => return Ok(JoinBattleResult::NotFound),
        };

        if battle.status != BattleStatus::Waiting {
            debug!(battle_id = %battle_id, status = %battle.status, "Join refused: wrong state");
            return Ok(JoinBattleResult::InvalidState(battle.status));
        }

        let participants = store.participants.entry(battle_id.to_string()).or_default();
        if participants.iter().any(|p| p.user_id == user_id) {
            return Ok(JoinBattleResult::AlreadyJoined);
        }
        if participants.len() as u32 >= battle.max_participants {
            debug!(battle_id = %battle_id, count = participants.len(), "Join refused: battle full");
            return Ok(JoinBattleResult::BattleFull);
        }

        let participant = ParticipantModel::new(battle_id.to_string(), user_id.to_string());
        participants.push(participant.clone());
        let now_full = participants.len() as u32 == battle.max_participants;

        let battle = store
            .battles
            .get_mut(battle_id)
            .ok_or(AppError::Internal)?;
        battle.total_prize += battle.entry_fee;
        if now_full {
            battle.full_at = Some(Utc::now());
        }
        let updated = battle.clone();

        info!(
            battle_id = %battle_id,
            user_id = %user_id,
            now_full = now_full,
            "Participant slot reserved"
        );

        Ok(JoinBattleResult::Joined {
            participant,
            battle: updated,
        })
    }

    #[instrument(skip(self))]
    async fn release_slot(&self, battle_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();

        let battle = store
            .battles
            .get(battle_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;
        if battle.status != BattleStatus::Waiting {
            return Err(AppError::State(
                "Cannot release a slot once the battle has left WAITING".to_string(),
            ));
        }

        let participants = store.participants.entry(battle_id.to_string()).or_default();
        let before = participants.len();
        participants.retain(|p| p.user_id != user_id);
        if participants.len() == before {
            return Err(AppError::NotFound("Participant not found".to_string()));
        }

        let battle = store
            .battles
            .get_mut(battle_id)
            .ok_or(AppError::Internal)?;
        battle.total_prize -= battle.entry_fee;
        battle.full_at = None;

        debug!(battle_id = %battle_id, user_id = %user_id, "Participant slot released");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_ready(&self, battle_id: &str, user_id: &str) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();

        let battle = store
            .battles
            .get(battle_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;
        if battle.status != BattleStatus::Waiting {
            return Err(AppError::State(format!(
                "Cannot ready up in {} battle",
                battle.status
            )));
        }

        let participants = store.participants.entry(battle_id.to_string()).or_default();
        match participants.iter_mut().find(|p| p.user_id == user_id) {
            Some(participant) => {
                participant.is_ready = true;
                Ok(())
            }
            None => Err(AppError::NotFound("Participant not found".to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn try_start(&self, battle_id: &str) -> Result<bool, AppError> {
        self.compare_and_set(battle_id, BattleStatus::Waiting, BattleStatus::InProgress, None)
    }

    #[instrument(skip(self))]
    async fn try_cancel(&self, battle_id: &str) -> Result<bool, AppError> {
        self.compare_and_set(battle_id, BattleStatus::Waiting, BattleStatus::Cancelled, None)
    }

    #[instrument(skip(self))]
    async fn try_finish(&self, battle_id: &str, winner: Option<&str>) -> Result<bool, AppError> {
        self.compare_and_set(
            battle_id,
            BattleStatus::InProgress,
            BattleStatus::Finished,
            winner,
        )
    }

    #[instrument(skip(self, pulls))]
    async fn record_round_pulls(
        &self,
        battle_id: &str,
        round: u32,
        pulls: &[BattlePullModel],
    ) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();

        if !store.battles.contains_key(battle_id) {
            return Err(AppError::NotFound("Battle not found".to_string()));
        }

        {
            let participants = store.participants.entry(battle_id.to_string()).or_default();
            for pull in pulls {
                let participant = participants
                    .iter_mut()
                    .find(|p| p.user_id == pull.user_id)
                    .ok_or_else(|| {
                        AppError::Database(format!(
                            "Battle pull for unknown participant {}",
                            pull.user_id
                        ))
                    })?;
                participant.total_value += pull.coin_value;
            }
        }

        store
            .pulls
            .entry(battle_id.to_string())
            .or_default()
            .extend(pulls.iter().cloned());

        debug!(battle_id = %battle_id, round = round, count = pulls.len(), "Round pulls recorded");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_battle_pulls(
        &self,
        battle_id: &str,
    ) -> Result<Vec<BattlePullModel>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.pulls.get(battle_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn delete_battle(&self, battle_id: &str) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();

        let battle = store
            .battles
            .get(battle_id)
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;
        if !battle.status.is_terminal() {
            return Err(AppError::State(format!(
                "Cannot delete a {} battle",
                battle.status
            )));
        }

        store.battles.remove(battle_id);
        store.participants.remove(battle_id);
        store.pulls.remove(battle_id);

        info!(battle_id = %battle_id, "Battle deleted");
        Ok(())
    }
}

impl InMemoryBattleRepository {
    fn compare_and_set(
        &self,
        battle_id: &str,
        from: BattleStatus,
        to: BattleStatus,
        winner: Option<&str>,
    ) -> Result<bool, AppError> {
        let mut store = self.store.lock().unwrap();

        let battle = store
            .battles
            .get_mut(battle_id)
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;

        if battle.status != from {
            debug!(
                battle_id = %battle_id,
                current = %battle.status,
                expected = %from,
                "Status transition lost"
            );
            return Ok(false);
        }

        battle.status = to;
        if let Some(winner) = winner {
            battle.winner_user_id = Some(winner.to_string());
        }

        info!(battle_id = %battle_id, from = %from, to = %to, "Battle status transitioned");
        Ok(true)
    }
}
