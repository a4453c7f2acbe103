// Pack opening: weighted card draws and the pulls they produce

pub mod engine;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use models::PullModel;
pub use service::PullService;
