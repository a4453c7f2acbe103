use serde::{Deserialize, Serialize};

/// Request payload for opening a pack
#[derive(Debug, Deserialize)]
pub struct OpenPackRequest {
    pub user_id: String,
    pub box_id: String,
}

/// Request payload for selling a pull
#[derive(Debug, Deserialize)]
pub struct SellPullRequest {
    pub user_id: String,
}

/// Response after selling a pull
#[derive(Debug, Serialize, Deserialize)]
pub struct SellPullResponse {
    pub balance: i64,
}
