use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

use super::{engine, models::PullModel, repository::PullRepository};
use crate::catalog::models::BoxSnapshot;
use crate::catalog::CatalogService;
use crate::shared::AppError;
use crate::wallet::WalletRepository;

/// Service for opening packs and managing the pulls they produce
///
/// The RNG is owned by the service so that tests can seed it; draws never
/// hold the RNG lock across an await.
pub struct PullService {
    catalog: Arc<CatalogService>,
    repository: Arc<dyn PullRepository + Send + Sync>,
    wallet: Arc<dyn WalletRepository + Send + Sync>,
    rng: Mutex<StdRng>,
}

impl PullService {
    pub fn new(
        catalog: Arc<CatalogService>,
        repository: Arc<dyn PullRepository + Send + Sync>,
        wallet: Arc<dyn WalletRepository + Send + Sync>,
    ) -> Self {
        Self {
            catalog,
            repository,
            wallet,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic variant for tests
    pub fn with_seed(
        catalog: Arc<CatalogService>,
        repository: Arc<dyn PullRepository + Send + Sync>,
        wallet: Arc<dyn WalletRepository + Send + Sync>,
        seed: u64,
    ) -> Self {
        Self {
            catalog,
            repository,
            wallet,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Opens one pack of a box for a user.
    ///
    /// Debits the box price, performs `cards_per_pack` independent draws,
    /// and persists every pull before the outcome is reported. If
    /// persistence fails partway, the debit is compensated and the
    /// operation fails as a whole; a card is never reported without a
    /// durable record behind it.
    #[instrument(skip(self))]
    pub async fn open_pack(&self, user_id: &str, box_id: &str) -> Result<Vec<PullModel>, AppError> {
        let snapshot = self.catalog.get_snapshot(box_id).await?;
        if !snapshot.info.is_active {
            return Err(AppError::State("Box is not active".to_string()));
        }

        // Validate the pool before taking any money
        let drawn = self.draw_many(&snapshot, snapshot.info.cards_per_pack)?;

        self.wallet.try_debit(user_id, snapshot.info.price).await?;

        let pulls: Vec<PullModel> = drawn
            .iter()
            .map(|card| PullModel::from_draw(user_id, card))
            .collect();

        for pull in &pulls {
            if let Err(e) = self.repository.create_pull(pull).await {
                warn!(
                    user_id = %user_id,
                    box_id = %box_id,
                    error = %e,
                    "Pull persistence failed, compensating pack debit"
                );
                self.wallet.credit(user_id, snapshot.info.price).await?;
                return Err(e);
            }
        }

        info!(
            user_id = %user_id,
            box_id = %box_id,
            pulls = pulls.len(),
            "Pack opened"
        );
        Ok(pulls)
    }

    /// One draw against an already-paid-for battle box.
    ///
    /// Used by the battle aggregator: the entry fee covers the packs, so
    /// no debit happens here, but the pull is persisted before it is
    /// handed back for battle recording.
    #[instrument(skip(self, snapshot))]
    pub async fn draw_for_battle(
        &self,
        user_id: &str,
        snapshot: &BoxSnapshot,
    ) -> Result<PullModel, AppError> {
        let drawn = self.draw_many(snapshot, 1)?;
        let pull = PullModel::from_draw(user_id, &drawn[0]);
        self.repository.create_pull(&pull).await?;
        Ok(pull)
    }

    /// Sells a pull back for its snapshotted coin value.
    ///
    /// The pull is consumed atomically; selling the same pull twice fails
    /// with NotFound and credits nothing.
    #[instrument(skip(self))]
    pub async fn sell_pull(&self, user_id: &str, pull_id: &str) -> Result<i64, AppError> {
        let pull = self
            .repository
            .take_pull(pull_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pull not found".to_string()))?;

        let balance = self.wallet.credit(user_id, pull.coin_value).await?;

        info!(
            user_id = %user_id,
            pull_id = %pull_id,
            credited = pull.coin_value,
            "Pull sold"
        );
        Ok(balance)
    }

    #[instrument(skip(self))]
    pub async fn list_pulls(&self, user_id: &str) -> Result<Vec<PullModel>, AppError> {
        self.repository.list_pulls_for_user(user_id).await
    }

    /// Performs `count` draws while holding the RNG lock, cloning the
    /// selected cards out so the lock never spans an await.
    fn draw_many(
        &self,
        snapshot: &BoxSnapshot,
        count: u32,
    ) -> Result<Vec<crate::catalog::models::CardModel>, AppError> {
        let mut rng = self.rng.lock().unwrap();
        let mut drawn = Vec::with_capacity(count as usize);
        for _ in 0..count {
            drawn.push(engine::draw_card(&snapshot.cards, &mut *rng)?.clone());
        }
        Ok(drawn)
    }
}
