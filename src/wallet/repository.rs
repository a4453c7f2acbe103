use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::shared::AppError;

/// Trait for coin ledger operations
///
/// Balances are non-negative i64 minor units. Implementations must make
/// `credit` and `try_debit` atomic: a debit either applies in full against
/// a sufficient balance or fails with `InsufficientFunds` leaving the
/// balance untouched. Callers never read a balance to compute a write.
#[async_trait]
pub trait WalletRepository {
    async fn balance(&self, user_id: &str) -> Result<i64, AppError>;
    async fn credit(&self, user_id: &str, amount: i64) -> Result<i64, AppError>;
    async fn try_debit(&self, user_id: &str, amount: i64) -> Result<i64, AppError>;
}

/// In-memory implementation of WalletRepository for development and testing
///
/// Unknown users have a balance of zero; crediting creates the account.
pub struct InMemoryWalletRepository {
    balances: Mutex<HashMap<String, i64>>,
}

impl Default for InMemoryWalletRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a repository with pre-funded accounts
    pub fn with_balances(balances: Vec<(&str, i64)>) -> Self {
        Self {
            balances: Mutex::new(
                balances
                    .into_iter()
                    .map(|(user, amount)| (user.to_string(), amount))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    #[instrument(skip(self))]
    async fn balance(&self, user_id: &str) -> Result<i64, AppError> {
        let balances = self.balances.lock().unwrap();
        Ok(balances.get(user_id).copied().unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn credit(&self, user_id: &str, amount: i64) -> Result<i64, AppError> {
        if amount < 0 {
            return Err(AppError::BadRequest(
                "Credit amount cannot be negative".to_string(),
            ));
        }

        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(user_id.to_string()).or_insert(0);
        *balance += amount;

        debug!(user_id = %user_id, amount = amount, balance = *balance, "Credited coins");
        Ok(*balance)
    }

    #[instrument(skip(self))]
    async fn try_debit(&self, user_id: &str, amount: i64) -> Result<i64, AppError> {
        if amount < 0 {
            return Err(AppError::BadRequest(
                "Debit amount cannot be negative".to_string(),
            ));
        }

        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(user_id.to_string()).or_insert(0);
        if *balance < amount {
            debug!(user_id = %user_id, amount = amount, balance = *balance, "Debit refused");
            return Err(AppError::InsufficientFunds(format!(
                "Balance {} is below required {}",
                *balance, amount
            )));
        }
        *balance -= amount;

        debug!(user_id = %user_id, amount = amount, balance = *balance, "Debited coins");
        Ok(*balance)
    }
}

/// PostgreSQL implementation of the coin ledger
///
/// The non-negative invariant lives in the conditional UPDATE itself, so
/// concurrent debits serialize at the row and can never drive a balance
/// below zero.
pub struct PostgresWalletRepository {
    pool: PgPool,
}

impl PostgresWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    #[instrument(skip(self))]
    async fn balance(&self, user_id: &str) -> Result<i64, AppError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, user_id = %user_id, "Failed to fetch balance");
                    AppError::Database(e.to_string())
                })?;

        Ok(balance.unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn credit(&self, user_id: &str, amount: i64) -> Result<i64, AppError> {
        if amount < 0 {
            return Err(AppError::BadRequest(
                "Credit amount cannot be negative".to_string(),
            ));
        }

        let balance: i64 = sqlx::query_scalar(
            "INSERT INTO wallets (user_id, balance) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET balance = wallets.balance + $2
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to credit coins");
            AppError::Database(e.to_string())
        })?;

        debug!(user_id = %user_id, amount = amount, balance = balance, "Credited coins");
        Ok(balance)
    }

    #[instrument(skip(self))]
    async fn try_debit(&self, user_id: &str, amount: i64) -> Result<i64, AppError> {
        if amount < 0 {
            return Err(AppError::BadRequest(
                "Debit amount cannot be negative".to_string(),
            ));
        }

        let balance: Option<i64> = sqlx::query_scalar(
            "UPDATE wallets SET balance = balance - $2
             WHERE user_id = $1 AND balance >= $2
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to debit coins");
            AppError::Database(e.to_string())
        })?;

        match balance {
            Some(balance) => {
                debug!(user_id = %user_id, amount = amount, balance = balance, "Debited coins");
                Ok(balance)
            }
            None => Err(AppError::InsufficientFunds(format!(
                "Balance below required {}",
                amount
            ))),
        }
    }
}
