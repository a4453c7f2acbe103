mod battle;
mod cache;
mod catalog;
mod config;
mod event;
mod pull;
mod shared;
mod wallet;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battle::autostart_task::{start_auto_start_task, AutoStartConfig};
use battle::repository::InMemoryBattleRepository;
use battle::BattleService;
use cache::CacheConfig;
use catalog::repository::InMemoryBoxRepository;
use catalog::CatalogService;
use config::Config;
use event::EventBus;
use pull::repository::InMemoryPullRepository;
use pull::PullService;
use shared::AppState;
use wallet::{InMemoryWalletRepository, PostgresWalletRepository, WalletRepository};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "packattack=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pack Attack server");

    let config = Config::from_env().expect("Invalid configuration");

    // Repositories are in-memory by default; the wallet switches to
    // PostgreSQL when DATABASE_URL is set so balance atomicity holds
    // across processes.
    let wallet: Arc<dyn WalletRepository + Send + Sync> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url)
                .await
                .expect("Failed to connect to database");
            info!("Using PostgreSQL wallet repository");
            Arc::new(PostgresWalletRepository::new(pool))
        }
        None => {
            info!("Using in-memory wallet repository");
            Arc::new(InMemoryWalletRepository::new())
        }
    };

    let event_bus = EventBus::new();
    let catalog = Arc::new(CatalogService::new(
        Arc::new(InMemoryBoxRepository::new()),
        CacheConfig {
            ttl: config.box_cache_ttl,
            capacity: config.box_cache_capacity,
        },
    ));
    let pulls = Arc::new(PullService::new(
        catalog.clone(),
        Arc::new(InMemoryPullRepository::new()),
        wallet.clone(),
    ));
    let battles = Arc::new(BattleService::new(
        Arc::new(InMemoryBattleRepository::new()),
        catalog.clone(),
        pulls.clone(),
        wallet.clone(),
        event_bus.clone(),
        config.auto_start_grace,
    ));

    // The auto-start poller runs in-process; no cron, no HTTP self-call
    tokio::spawn(start_auto_start_task(
        battles.clone(),
        AutoStartConfig {
            poll_interval: config.auto_start_poll,
        },
    ));

    let app_state = AppState::new(catalog, pulls, battles, wallet, event_bus);

    let app = Router::new()
        .route("/boxes", post(catalog::handlers::create_box))
        .route("/boxes", get(catalog::handlers::list_boxes))
        .route("/boxes/:box_id", get(catalog::handlers::get_box))
        .route("/boxes/:box_id/cards", post(catalog::handlers::add_card))
        .route("/packs/open", post(pull::handlers::open_pack))
        .route("/pulls/:pull_id/sell", post(pull::handlers::sell_pull))
        .route("/pulls/:user_id", get(pull::handlers::list_pulls))
        .route("/wallet/:user_id", get(wallet::handlers::get_balance))
        .route("/wallet/:user_id/deposit", post(wallet::handlers::deposit))
        .route("/battles", post(battle::handlers::create_battle))
        .route("/battles", get(battle::handlers::list_battles))
        .route("/battles/:battle_id", get(battle::handlers::get_battle))
        .route(
            "/battles/:battle_id",
            delete(battle::handlers::delete_battle),
        )
        .route(
            "/battles/:battle_id/join",
            post(battle::handlers::join_battle),
        )
        .route(
            "/battles/:battle_id/ready",
            post(battle::handlers::mark_ready),
        )
        .route(
            "/battles/:battle_id/start",
            post(battle::handlers::start_battle),
        )
        .route(
            "/battles/:battle_id/cancel",
            post(battle::handlers::cancel_battle),
        )
        .route(
            "/battles/:battle_id/events",
            get(battle::stream::battle_events),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("Failed to bind listener");
    info!("Server running on http://localhost:{}", config.port);
    axum::serve(listener, app).await.expect("Server failed");
}
