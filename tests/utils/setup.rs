use std::sync::Arc;
use std::time::Duration;

use packattack::battle::repository::InMemoryBattleRepository;
use packattack::battle::BattleService;
use packattack::cache::CacheConfig;
use packattack::catalog::repository::InMemoryBoxRepository;
use packattack::catalog::types::{AddCardRequest, BoxCreateRequest};
use packattack::catalog::CatalogService;
use packattack::event::EventBus;
use packattack::pull::repository::InMemoryPullRepository;
use packattack::pull::PullService;
use packattack::wallet::InMemoryWalletRepository;

/// Fully wired in-memory application for integration tests
pub struct TestApp {
    pub catalog: Arc<CatalogService>,
    pub pulls: Arc<PullService>,
    pub battles: Arc<BattleService>,
    pub wallet: Arc<InMemoryWalletRepository>,
    pub battle_repository: Arc<InMemoryBattleRepository>,
    pub event_bus: EventBus,
}

/// Builds the service graph the way main() does, with a seeded RNG and a
/// configurable auto-start grace period.
pub fn test_app(seed: u64, grace_period: Duration, balances: Vec<(&str, i64)>) -> TestApp {
    let catalog = Arc::new(CatalogService::new(
        Arc::new(InMemoryBoxRepository::new()),
        CacheConfig::default(),
    ));
    let wallet = Arc::new(InMemoryWalletRepository::with_balances(balances));
    let battle_repository = Arc::new(InMemoryBattleRepository::new());
    let event_bus = EventBus::new();

    let pulls = Arc::new(PullService::with_seed(
        catalog.clone(),
        Arc::new(InMemoryPullRepository::new()),
        wallet.clone(),
        seed,
    ));
    let battles = Arc::new(BattleService::new(
        battle_repository.clone(),
        catalog.clone(),
        pulls.clone(),
        wallet.clone(),
        event_bus.clone(),
        grace_period,
    ));

    TestApp {
        catalog,
        pulls,
        battles,
        wallet,
        battle_repository,
        event_bus,
    }
}

/// Creates an active box with the given (name, pull_rate, coin_value)
/// pool and returns its id.
pub async fn seeded_box(
    app: &TestApp,
    cards_per_pack: u32,
    price: i64,
    cards: &[(&str, f64, i64)],
) -> String {
    let box_model = app
        .catalog
        .create_box(BoxCreateRequest {
            name: "test-box".to_string(),
            cards_per_pack,
            price,
        })
        .await
        .unwrap();

    for (name, pull_rate, coin_value) in cards {
        app.catalog
            .add_card(
                &box_model.id,
                AddCardRequest {
                    name: name.to_string(),
                    rarity: "common".to_string(),
                    pull_rate: *pull_rate,
                    coin_value: *coin_value,
                },
            )
            .await
            .unwrap();
    }

    box_model.id
}
