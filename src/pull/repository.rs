use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::PullModel;
use crate::shared::AppError;

/// Trait for pull repository operations
#[async_trait]
pub trait PullRepository {
    async fn create_pull(&self, pull: &PullModel) -> Result<(), AppError>;
    async fn get_pull(&self, pull_id: &str) -> Result<Option<PullModel>, AppError>;
    async fn list_pulls_for_user(&self, user_id: &str) -> Result<Vec<PullModel>, AppError>;

    /// Atomically removes and returns a pull owned by the given user.
    ///
    /// This is the consume step of selling: a second concurrent take of
    /// the same pull must observe `None`, so a pull can be sold at most
    /// once.
    async fn take_pull(&self, pull_id: &str, user_id: &str)
        -> Result<Option<PullModel>, AppError>;
}

/// In-memory implementation of PullRepository for development and testing
pub struct InMemoryPullRepository {
    pulls: Mutex<HashMap<String, PullModel>>,
}

impl Default for InMemoryPullRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPullRepository {
    pub fn new() -> Self {
        Self {
            pulls: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PullRepository for InMemoryPullRepository {
    #[instrument(skip(self, pull))]
    async fn create_pull(&self, pull: &PullModel) -> Result<(), AppError> {
        debug!(pull_id = %pull.id, user_id = %pull.user_id, card = %pull.card_name, "Recording pull");

        let mut pulls = self.pulls.lock().unwrap();
        if pulls.contains_key(&pull.id) {
            warn!(pull_id = %pull.id, "Pull already exists in memory");
            return Err(AppError::Database("Pull already exists".to_string()));
        }
        pulls.insert(pull.id.clone(), pull.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_pull(&self, pull_id: &str) -> Result<Option<PullModel>, AppError> {
        let pulls = self.pulls.lock().unwrap();
        Ok(pulls.get(pull_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_pulls_for_user(&self, user_id: &str) -> Result<Vec<PullModel>, AppError> {
        let pulls = self.pulls.lock().unwrap();
        let mut owned: Vec<PullModel> = pulls
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.pulled_at.cmp(&b.pulled_at));
        Ok(owned)
    }

    #[instrument(skip(self))]
    async fn take_pull(
        &self,
        pull_id: &str,
        user_id: &str,
    ) -> Result<Option<PullModel>, AppError> {
        let mut pulls = self.pulls.lock().unwrap();

        let owner_matches = pulls.get(pull_id).map(|p| p.user_id == user_id);
        match owner_matches {
            Some(true) => Ok(pulls.remove(pull_id)),
            Some(false) => {
                warn!(pull_id = %pull_id, user_id = %user_id, "Pull owned by another user");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
