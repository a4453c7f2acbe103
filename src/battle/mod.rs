// Multiplayer battles: lobby, rounds of shared-box pulls, settlement

pub mod autostart_task;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod settlement;
pub mod stream;
pub mod types;

pub use models::{BattleModel, BattleMode, BattlePullModel, BattleStatus, ParticipantModel};
pub use service::BattleService;
