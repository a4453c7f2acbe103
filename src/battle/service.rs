use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{
    models::{BattleModel, BattlePullModel, BattleStatus, ParticipantModel},
    repository::{BattleRepository, JoinBattleResult},
    settlement::{self, Settlement, Standing},
    types::BattleCreateRequest,
};
use crate::catalog::CatalogService;
use crate::event::{BattleEvent, EventBus};
use crate::pull::{engine, PullService};
use crate::shared::AppError;
use crate::wallet::WalletRepository;

/// A battle with its participants and recorded pulls
#[derive(Debug, Clone)]
pub struct BattleDetails {
    pub battle: BattleModel,
    pub participants: Vec<ParticipantModel>,
    pub pulls: Vec<BattlePullModel>,
}

/// Service coordinating the battle lifecycle: lobby, rounds, settlement
pub struct BattleService {
    repository: Arc<dyn BattleRepository + Send + Sync>,
    catalog: Arc<CatalogService>,
    pulls: Arc<PullService>,
    wallet: Arc<dyn WalletRepository + Send + Sync>,
    event_bus: EventBus,
    /// How long a full lobby may wait before auto-start forces it
    grace_period: Duration,
}

impl BattleService {
    pub fn new(
        repository: Arc<dyn BattleRepository + Send + Sync>,
        catalog: Arc<CatalogService>,
        pulls: Arc<PullService>,
        wallet: Arc<dyn WalletRepository + Send + Sync>,
        event_bus: EventBus,
        grace_period: Duration,
    ) -> Self {
        Self {
            repository,
            catalog,
            pulls,
            wallet,
            event_bus,
            grace_period,
        }
    }

    /// Creates a WAITING battle against an active, drawable box
    #[instrument(skip(self, request))]
    pub async fn create_battle(&self, request: BattleCreateRequest) -> Result<BattleModel, AppError> {
        if request.max_participants < 2 {
            return Err(AppError::BadRequest(
                "A battle needs at least 2 participants".to_string(),
            ));
        }
        if request.rounds == 0 {
            return Err(AppError::BadRequest(
                "A battle needs at least 1 round".to_string(),
            ));
        }
        if request.entry_fee < 0 {
            return Err(AppError::BadRequest(
                "Entry fee cannot be negative".to_string(),
            ));
        }

        let snapshot = self.catalog.get_snapshot(&request.box_id).await?;
        if !snapshot.info.is_active {
            return Err(AppError::State("Box is not active".to_string()));
        }
        // An unopenable pool must fail at creation, not mid-battle
        engine::validate_pool(&snapshot.cards)?;

        let battle = BattleModel::new(
            request.box_id,
            request.mode,
            request.max_participants,
            request.entry_fee,
            request.rounds,
        );
        self.repository.create_battle(&battle).await?;

        self.event_bus
            .emit(BattleEvent::BattleCreated {
                battle_id: battle.id.clone(),
                box_id: battle.box_id.clone(),
                max_participants: battle.max_participants,
                entry_fee: battle.entry_fee,
            })
            .await;

        info!(battle_id = %battle.id, mode = %battle.mode, "Battle created");
        Ok(battle)
    }

    /// Joins a user into a WAITING battle, debiting the entry fee.
    ///
    /// The slot is reserved atomically first so concurrent joins can never
    /// overfill the lobby; if the debit then fails the slot is released.
    #[instrument(skip(self))]
    pub async fn join(&self, battle_id: &str, user_id: &str) -> Result<BattleModel, AppError> {
        let result = self.repository.try_join(battle_id, user_id).await?;

        match result {
            JoinBattleResult::Joined { battle, .. } => {
                if let Err(debit_error) = self.wallet.try_debit(user_id, battle.entry_fee).await {
                    if let Err(release_error) =
                        self.repository.release_slot(battle_id, user_id).await
                    {
                        warn!(
                            battle_id = %battle_id,
                            user_id = %user_id,
                            error = %release_error,
                            "Failed to release slot after refused debit"
                        );
                    }
                    return Err(debit_error);
                }

                let participant_count =
                    self.repository.get_participants(battle_id).await?.len() as u32;
                self.event_bus
                    .emit(BattleEvent::ParticipantJoined {
                        battle_id: battle_id.to_string(),
                        user_id: user_id.to_string(),
                        participant_count,
                    })
                    .await;

                info!(battle_id = %battle_id, user_id = %user_id, "User joined battle");
                Ok(battle)
            }
            JoinBattleResult::BattleFull => {
                Err(AppError::Capacity("Battle lobby is full".to_string()))
            }
            JoinBattleResult::AlreadyJoined => Err(AppError::State(
                "User already joined this battle".to_string(),
            )),
            JoinBattleResult::InvalidState(status) => Err(AppError::State(format!(
                "Cannot join a {} battle",
                status
            ))),
            JoinBattleResult::NotFound => {
                Err(AppError::NotFound("Battle not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn mark_ready(&self, battle_id: &str, user_id: &str) -> Result<(), AppError> {
        self.repository.set_ready(battle_id, user_id).await?;

        self.event_bus
            .emit(BattleEvent::ParticipantReady {
                battle_id: battle_id.to_string(),
                user_id: user_id.to_string(),
            })
            .await;

        Ok(())
    }

    /// Cancels a WAITING battle and refunds every participant's entry fee.
    ///
    /// The WAITING -> CANCELLED transition is the gate: once it wins,
    /// refunds are applied exactly once even if cancel is retried.
    #[instrument(skip(self))]
    pub async fn cancel(&self, battle_id: &str) -> Result<(), AppError> {
        let battle = self
            .repository
            .get_battle(battle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;

        if !self.repository.try_cancel(battle_id).await? {
            return Err(AppError::State(
                "Only a WAITING battle can be cancelled".to_string(),
            ));
        }

        let participants = self.repository.get_participants(battle_id).await?;
        for participant in &participants {
            if let Err(e) = self
                .wallet
                .credit(&participant.user_id, battle.entry_fee)
                .await
            {
                warn!(
                    battle_id = %battle_id,
                    user_id = %participant.user_id,
                    error = %e,
                    "Entry fee refund failed"
                );
            }
        }

        self.event_bus
            .emit(BattleEvent::BattleCancelled {
                battle_id: battle_id.to_string(),
            })
            .await;

        info!(
            battle_id = %battle_id,
            refunded = participants.len(),
            "Battle cancelled"
        );
        Ok(())
    }

    /// Starts a full lobby and runs it to settlement.
    ///
    /// Preconditions: WAITING, lobby full, and either every participant is
    /// ready or the grace period since the lobby filled has elapsed. The
    /// WAITING -> IN_PROGRESS transition is exclusive, so a concurrent
    /// start loses cleanly. Each round's pulls are durably recorded before
    /// the next round begins; a client polling mid-battle sees a
    /// consistent prefix of rounds, never a gap.
    #[instrument(skip(self))]
    pub async fn start(&self, battle_id: &str) -> Result<Settlement, AppError> {
        let battle = self
            .repository
            .get_battle(battle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;
        if battle.status != BattleStatus::Waiting {
            return Err(AppError::State(format!(
                "Cannot start a {} battle",
                battle.status
            )));
        }

        let participants = self.repository.get_participants(battle_id).await?;
        if (participants.len() as u32) < battle.max_participants {
            return Err(AppError::State("Battle lobby is not full".to_string()));
        }

        let all_ready = participants.iter().all(|p| p.is_ready);
        let grace_elapsed = battle
            .full_at
            .map(|full_at| {
                Utc::now()
                    .signed_duration_since(full_at)
                    .to_std()
                    .map_or(false, |elapsed| elapsed >= self.grace_period)
            })
            .unwrap_or(false);
        if !all_ready && !grace_elapsed {
            return Err(AppError::State(
                "Participants are not ready and the grace period has not elapsed".to_string(),
            ));
        }

        if !self.repository.try_start(battle_id).await? {
            return Err(AppError::State(
                "Battle is no longer waiting to start".to_string(),
            ));
        }

        self.event_bus
            .emit(BattleEvent::BattleStarted {
                battle_id: battle_id.to_string(),
                participants: participants.iter().map(|p| p.user_id.clone()).collect(),
            })
            .await;

        let snapshot = self.catalog.get_snapshot(&battle.box_id).await?;

        for round in 1..=battle.rounds {
            let mut round_pulls = Vec::with_capacity(participants.len());
            for participant in &participants {
                let pull = self
                    .pulls
                    .draw_for_battle(&participant.user_id, &snapshot)
                    .await
                    .map_err(|e| {
                        warn!(
                            battle_id = %battle_id,
                            round = round,
                            user_id = %participant.user_id,
                            error = %e,
                            "Battle draw failed"
                        );
                        e
                    })?;
                round_pulls.push(BattlePullModel::from_pull(battle_id, round, &pull));
            }

            self.repository
                .record_round_pulls(battle_id, round, &round_pulls)
                .await?;

            let totals = self
                .repository
                .get_participants(battle_id)
                .await?
                .into_iter()
                .map(|p| (p.user_id, p.total_value))
                .collect();
            self.event_bus
                .emit(BattleEvent::RoundCompleted {
                    battle_id: battle_id.to_string(),
                    round,
                    totals,
                })
                .await;
        }

        self.resolve(battle_id).await
    }

    /// Settles an IN_PROGRESS battle whose rounds are all recorded.
    ///
    /// The IN_PROGRESS -> FINISHED transition is exclusive: exactly one of
    /// any number of concurrent resolvers wins it, and only the winner
    /// applies credits. A retry after the transition sees FINISHED and
    /// fails with a state error, so the pot can never be paid twice.
    #[instrument(skip(self))]
    pub async fn resolve(&self, battle_id: &str) -> Result<Settlement, AppError> {
        let battle = self
            .repository
            .get_battle(battle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;
        if battle.status != BattleStatus::InProgress {
            return Err(AppError::State(format!(
                "Cannot settle a {} battle",
                battle.status
            )));
        }

        let participants = self.repository.get_participants(battle_id).await?;
        let pulls = self.repository.get_battle_pulls(battle_id).await?;
        let expected = participants.len() * battle.rounds as usize;
        if pulls.len() != expected {
            return Err(AppError::State(format!(
                "Battle has {} of {} pulls recorded",
                pulls.len(),
                expected
            )));
        }

        let standings: Vec<Standing> = participants
            .iter()
            .map(|p| Standing {
                user_id: p.user_id.clone(),
                total_value: p.total_value,
                joined_at: p.joined_at,
            })
            .collect();
        let settlement = settlement::settle(battle.mode, battle.total_prize, &standings)?;

        if !self
            .repository
            .try_finish(battle_id, settlement.winner.as_deref())
            .await?
        {
            return Err(AppError::State("Battle already settled".to_string()));
        }

        for (user_id, amount) in &settlement.payouts {
            if *amount > 0 {
                self.wallet.credit(user_id, *amount).await?;
            }
        }

        self.event_bus
            .emit(BattleEvent::BattleFinished {
                battle_id: battle_id.to_string(),
                winner: settlement.winner.clone(),
                payouts: settlement.payouts.clone(),
            })
            .await;

        info!(
            battle_id = %battle_id,
            winner = settlement.winner.as_deref().unwrap_or("-"),
            pot = battle.total_prize,
            "Battle settled"
        );
        Ok(settlement)
    }

    /// Force-starts every full lobby that has waited out the grace period.
    ///
    /// Idempotent: battles it already started are no longer WAITING and
    /// drop out of the scan. One battle's failure never aborts the rest.
    #[instrument(skip(self))]
    pub async fn auto_start(&self) -> Result<usize, AppError> {
        let waiting = self
            .repository
            .list_battles_by_status(BattleStatus::Waiting)
            .await?;

        let mut started = 0;
        for battle in waiting {
            let eligible = battle
                .full_at
                .map(|full_at| {
                    Utc::now()
                        .signed_duration_since(full_at)
                        .to_std()
                        .map_or(false, |elapsed| elapsed >= self.grace_period)
                })
                .unwrap_or(false);
            if !eligible {
                continue;
            }

            match self.start(&battle.id).await {
                Ok(_) => {
                    started += 1;
                    info!(battle_id = %battle.id, "Battle auto-started");
                }
                Err(e) => {
                    warn!(battle_id = %battle.id, error = %e, "Auto-start failed for battle");
                }
            }
        }

        Ok(started)
    }

    #[instrument(skip(self))]
    pub async fn get_details(&self, battle_id: &str) -> Result<BattleDetails, AppError> {
        let battle = self
            .repository
            .get_battle(battle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Battle not found".to_string()))?;
        let participants = self.repository.get_participants(battle_id).await?;
        let pulls = self.repository.get_battle_pulls(battle_id).await?;

        Ok(BattleDetails {
            battle,
            participants,
            pulls,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_open_battles(&self) -> Result<Vec<BattleModel>, AppError> {
        self.repository
            .list_battles_by_status(BattleStatus::Waiting)
            .await
    }

    /// Administrative deletion; the repository enforces terminal state
    #[instrument(skip(self))]
    pub async fn delete_battle(&self, battle_id: &str) -> Result<(), AppError> {
        self.repository.delete_battle(battle_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::models::BattleMode;
    use crate::battle::repository::InMemoryBattleRepository;
    use crate::cache::CacheConfig;
    use crate::catalog::repository::InMemoryBoxRepository;
    use crate::catalog::types::{AddCardRequest, BoxCreateRequest};
    use crate::pull::repository::InMemoryPullRepository;
    use crate::wallet::InMemoryWalletRepository;
    use futures::future::join_all;

    struct Fixture {
        repository: Arc<InMemoryBattleRepository>,
        wallet: Arc<InMemoryWalletRepository>,
        service: Arc<BattleService>,
        event_bus: EventBus,
        box_id: String,
    }

    /// Battle service over a one-card box (value 10), so totals are
    /// deterministic without pinning RNG outcomes.
    async fn fixture(grace_period: Duration, balances: Vec<(&str, i64)>) -> Fixture {
        let catalog = Arc::new(CatalogService::new(
            Arc::new(InMemoryBoxRepository::new()),
            CacheConfig::default(),
        ));
        let wallet = Arc::new(InMemoryWalletRepository::with_balances(balances));
        let pull_repository = Arc::new(InMemoryPullRepository::new());
        let repository = Arc::new(InMemoryBattleRepository::new());
        let event_bus = EventBus::new();

        let pulls = Arc::new(PullService::with_seed(
            catalog.clone(),
            pull_repository,
            wallet.clone(),
            7,
        ));
        let service = Arc::new(BattleService::new(
            repository.clone(),
            catalog.clone(),
            pulls,
            wallet.clone(),
            event_bus.clone(),
            grace_period,
        ));

        let box_model = catalog
            .create_box(BoxCreateRequest {
                name: "battle-box".to_string(),
                cards_per_pack: 1,
                price: 100,
            })
            .await
            .unwrap();
        catalog
            .add_card(
                &box_model.id,
                AddCardRequest {
                    name: "the-card".to_string(),
                    rarity: "common".to_string(),
                    pull_rate: 1.0,
                    coin_value: 10,
                },
            )
            .await
            .unwrap();

        Fixture {
            repository,
            wallet,
            service,
            event_bus,
            box_id: box_model.id,
        }
    }

    fn battle_request(box_id: &str, mode: BattleMode) -> BattleCreateRequest {
        BattleCreateRequest {
            box_id: box_id.to_string(),
            mode,
            max_participants: 2,
            entry_fee: 100,
            rounds: 1,
        }
    }

    #[tokio::test]
    async fn test_full_battle_flow_normal_mode() {
        let fx = fixture(
            Duration::from_secs(30 * 60),
            vec![("alice", 500), ("bob", 500)],
        )
        .await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();

        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();
        assert_eq!(fx.wallet.balance("alice").await.unwrap(), 400);
        assert_eq!(fx.wallet.balance("bob").await.unwrap(), 400);

        fx.service.mark_ready(&battle.id, "alice").await.unwrap();
        fx.service.mark_ready(&battle.id, "bob").await.unwrap();

        let settlement = fx.service.start(&battle.id).await.unwrap();

        // Single-card box: both totals are 10, the tie goes to alice (first joiner)
        assert_eq!(settlement.winner.as_deref(), Some("alice"));
        assert_eq!(fx.wallet.balance("alice").await.unwrap(), 600);
        assert_eq!(fx.wallet.balance("bob").await.unwrap(), 400);

        let details = fx.service.get_details(&battle.id).await.unwrap();
        assert_eq!(details.battle.status, BattleStatus::Finished);
        assert_eq!(details.battle.winner_user_id.as_deref(), Some("alice"));
        // participants x rounds pulls recorded
        assert_eq!(details.pulls.len(), 2);
        assert!(details.participants.iter().all(|p| p.total_value == 10));
    }

    #[tokio::test]
    async fn test_share_mode_splits_pot_equally_on_equal_totals() {
        let fx = fixture(
            Duration::from_secs(30 * 60),
            vec![("alice", 500), ("bob", 500)],
        )
        .await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Share))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();
        fx.service.mark_ready(&battle.id, "alice").await.unwrap();
        fx.service.mark_ready(&battle.id, "bob").await.unwrap();

        let settlement = fx.service.start(&battle.id).await.unwrap();

        assert_eq!(settlement.winner, None);
        let distributed: i64 = settlement.payouts.iter().map(|(_, a)| a).sum();
        assert_eq!(distributed, 200);
        // Equal totals -> equal halves; everyone ends where they started
        assert_eq!(fx.wallet.balance("alice").await.unwrap(), 500);
        assert_eq!(fx.wallet.balance("bob").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_join_without_funds_releases_slot() {
        let fx = fixture(Duration::from_secs(30 * 60), vec![("rich", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();

        let result = fx.service.join(&battle.id, "broke").await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::InsufficientFunds(_)
        ));

        // The reserved slot was released and the pot left untouched
        let details = fx.service.get_details(&battle.id).await.unwrap();
        assert!(details.participants.is_empty());
        assert_eq!(details.battle.total_prize, 0);

        // The slot is usable by someone who can pay
        fx.service.join(&battle.id, "rich").await.unwrap();
    }

    #[tokio::test]
    async fn test_join_full_battle_is_capacity_error() {
        let fx = fixture(
            Duration::from_secs(30 * 60),
            vec![("alice", 500), ("bob", 500), ("carol", 500)],
        )
        .await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();

        let result = fx.service.join(&battle.id, "carol").await;
        assert!(matches!(result.unwrap_err(), AppError::Capacity(_)));
        assert_eq!(fx.wallet.balance("carol").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_concurrent_joins_admit_exactly_capacity() {
        let funded: Vec<(String, i64)> = (0..8).map(|i| (format!("user-{}", i), 500)).collect();
        let fx = fixture(
            Duration::from_secs(30 * 60),
            funded.iter().map(|(u, b)| (u.as_str(), *b)).collect(),
        )
        .await;

        let battle = fx
            .service
            .create_battle(BattleCreateRequest {
                box_id: fx.box_id.clone(),
                mode: BattleMode::Normal,
                max_participants: 4,
                entry_fee: 100,
                rounds: 1,
            })
            .await
            .unwrap();

        let handles = (0..8)
            .map(|i| {
                let service = Arc::clone(&fx.service);
                let battle_id = battle.id.clone();
                tokio::spawn(async move { service.join(&battle_id, &format!("user-{}", i)).await })
            })
            .collect::<Vec<_>>();

        let results = join_all(handles).await;
        let successes = results
            .iter()
            .filter(|r| r.as_ref().unwrap().is_ok())
            .count();

        assert_eq!(successes, 4);
        let details = fx.service.get_details(&battle.id).await.unwrap();
        assert_eq!(details.participants.len(), 4);
        assert_eq!(details.battle.total_prize, 400);
    }

    #[tokio::test]
    async fn test_cancel_refunds_all_participants() {
        let fx = fixture(
            Duration::from_secs(30 * 60),
            vec![("alice", 500), ("bob", 500)],
        )
        .await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();

        fx.service.cancel(&battle.id).await.unwrap();

        assert_eq!(fx.wallet.balance("alice").await.unwrap(), 500);
        assert_eq!(fx.wallet.balance("bob").await.unwrap(), 500);

        let details = fx.service.get_details(&battle.id).await.unwrap();
        assert_eq!(details.battle.status, BattleStatus::Cancelled);

        // A second cancel must not refund again
        let result = fx.service.cancel(&battle.id).await;
        assert!(matches!(result.unwrap_err(), AppError::State(_)));
        assert_eq!(fx.wallet.balance("alice").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_cancel_refused_once_in_progress() {
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500), ("bob", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();
        fx.service.start(&battle.id).await.unwrap();

        let result = fx.service.cancel(&battle.id).await;
        assert!(matches!(result.unwrap_err(), AppError::State(_)));
    }

    #[tokio::test]
    async fn test_start_requires_full_lobby() {
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();

        let result = fx.service.start(&battle.id).await;
        assert!(matches!(result.unwrap_err(), AppError::State(_)));
    }

    #[tokio::test]
    async fn test_start_requires_ready_or_grace() {
        let fx = fixture(
            Duration::from_secs(30 * 60),
            vec![("alice", 500), ("bob", 500)],
        )
        .await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();
        // Nobody is ready and the 30-minute grace has not elapsed
        let result = fx.service.start(&battle.id).await;
        assert!(matches!(result.unwrap_err(), AppError::State(_)));
    }

    #[tokio::test]
    async fn test_auto_start_picks_up_expired_full_lobby() {
        // Zero grace: a full lobby is immediately eligible
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500), ("bob", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();

        let started = fx.service.auto_start().await.unwrap();
        assert_eq!(started, 1);

        let details = fx.service.get_details(&battle.id).await.unwrap();
        assert_eq!(details.battle.status, BattleStatus::Finished);

        // Nothing left to start; the scan is idempotent
        assert_eq!(fx.service.auto_start().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_auto_start_skips_unfilled_lobbies() {
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();

        assert_eq!(fx.service.auto_start().await.unwrap(), 0);
        let details = fx.service.get_details(&battle.id).await.unwrap();
        assert_eq!(details.battle.status, BattleStatus::Waiting);
    }

    #[tokio::test]
    async fn test_resolve_is_not_repeatable() {
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500), ("bob", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();
        fx.service.start(&battle.id).await.unwrap();

        let alice_after = fx.wallet.balance("alice").await.unwrap();

        let result = fx.service.resolve(&battle.id).await;
        assert!(matches!(result.unwrap_err(), AppError::State(_)));
        assert_eq!(fx.wallet.balance("alice").await.unwrap(), alice_after);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_pay_out_once() {
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500), ("bob", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();

        // Drive the battle to IN_PROGRESS with rounds recorded, without
        // letting start() settle it
        assert!(fx.repository.try_start(&battle.id).await.unwrap());
        let pulls = vec![
            recorded_pull(&battle.id, "alice", 50),
            recorded_pull(&battle.id, "bob", 200),
        ];
        fx.repository
            .record_round_pulls(&battle.id, 1, &pulls)
            .await
            .unwrap();

        let handles = (0..2)
            .map(|_| {
                let service = Arc::clone(&fx.service);
                let battle_id = battle.id.clone();
                tokio::spawn(async move { service.resolve(&battle_id).await })
            })
            .collect::<Vec<_>>();

        let results = join_all(handles).await;
        let outcomes: Vec<Result<Settlement, AppError>> =
            results.into_iter().map(|r| r.unwrap()).collect();
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        let state_errors = outcomes
            .iter()
            .filter(|r| matches!(r, Err(AppError::State(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(state_errors, 1);

        // Bob pulled higher; the 200-coin pot was paid exactly once
        assert_eq!(fx.wallet.balance("bob").await.unwrap(), 600);
        assert_eq!(fx.wallet.balance("alice").await.unwrap(), 400);
    }

    #[tokio::test]
    async fn test_battle_events_are_emitted() {
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500), ("bob", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();
        let mut receiver = fx.event_bus.subscribe(&battle.id).await;

        fx.service.join(&battle.id, "alice").await.unwrap();
        fx.service.join(&battle.id, "bob").await.unwrap();
        fx.service.start(&battle.id).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            seen.push(event.event_type());
        }

        assert_eq!(
            seen,
            vec![
                "participant_joined",
                "participant_joined",
                "battle_started",
                "round_completed",
                "battle_finished",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_battle_rejects_undrawable_box() {
        let fx = fixture(Duration::from_secs(0), vec![]).await;

        // A box with no cards cannot host a battle
        let empty_box = fx
            .service
            .catalog
            .create_box(BoxCreateRequest {
                name: "empty".to_string(),
                cards_per_pack: 1,
                price: 100,
            })
            .await
            .unwrap();

        let result = fx
            .service
            .create_battle(battle_request(&empty_box.id, BattleMode::Normal))
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_delete_battle_only_when_terminal() {
        let fx = fixture(Duration::from_secs(0), vec![("alice", 500), ("bob", 500)]).await;

        let battle = fx
            .service
            .create_battle(battle_request(&fx.box_id, BattleMode::Normal))
            .await
            .unwrap();

        let result = fx.service.delete_battle(&battle.id).await;
        assert!(matches!(result.unwrap_err(), AppError::State(_)));

        fx.service.cancel(&battle.id).await.unwrap();
        fx.service.delete_battle(&battle.id).await.unwrap();
    }

    fn recorded_pull(battle_id: &str, user_id: &str, coin_value: i64) -> BattlePullModel {
        BattlePullModel {
            battle_id: battle_id.to_string(),
            user_id: user_id.to_string(),
            round: 1,
            pull_id: uuid::Uuid::new_v4().to_string(),
            card_name: "card".to_string(),
            coin_value,
            pulled_at: Utc::now(),
        }
    }
}
