// Library crate for the Pack Attack server
// This file exposes the public API for integration tests

pub mod battle;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod event;
pub mod pull;
pub mod shared;
pub mod wallet;

// Re-export commonly used types for easier access in tests
pub use battle::{BattleMode, BattleService, BattleStatus};
pub use catalog::CatalogService;
pub use config::Config;
pub use event::{BattleEvent, EventBus};
pub use pull::PullService;
pub use shared::AppError;
pub use wallet::WalletRepository;
