// Coin ledger: atomic balance operations only, never read-modify-write

pub mod handlers;
pub mod repository;

pub use repository::{InMemoryWalletRepository, PostgresWalletRepository, WalletRepository};
