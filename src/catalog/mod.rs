// Box catalog: purchasable boxes and their weighted card pools

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use models::{BoxModel, BoxSnapshot, CardModel};
pub use service::CatalogService;
