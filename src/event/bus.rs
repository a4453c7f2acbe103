use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::BattleEvent;

/// Event bus for distributing battle events throughout the application
///
/// Emission is fire-and-forget: a send with no receivers is not an error,
/// and no emitting operation is rolled back on delivery failure.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Battle-specific event channels: battle_id -> sender
    battle_channels: Arc<RwLock<HashMap<String, broadcast::Sender<BattleEvent>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            battle_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Emits an event to all subscribers of a specific battle
    pub async fn emit(&self, event: BattleEvent) {
        let battle_id = event.battle_id().to_string();
        let battle_channels = self.battle_channels.read().await;

        if let Some(sender) = battle_channels.get(&battle_id) {
            match sender.send(event) {
                Ok(receiver_count) => {
                    debug!(
                        battle_id = %battle_id,
                        receivers = receiver_count,
                        "Battle event emitted"
                    );
                }
                Err(_) => {
                    debug!(battle_id = %battle_id, "Battle event emitted with no receivers");
                }
            }
        } else {
            debug!(battle_id = %battle_id, "No battle channel found - creating one");
            drop(battle_channels);

            // Create battle channel if it doesn't exist
            let mut battle_channels = self.battle_channels.write().await;
            let (sender, _) = broadcast::channel(100);
            battle_channels.insert(battle_id.clone(), sender.clone());

            // Try to send again
            if sender.send(event).is_err() {
                debug!(battle_id = %battle_id, "Battle event sent to new channel with no receivers");
            }
        }
    }

    /// Subscribe to events for a specific battle
    pub async fn subscribe(&self, battle_id: &str) -> broadcast::Receiver<BattleEvent> {
        let battle_channels = self.battle_channels.read().await;

        if let Some(sender) = battle_channels.get(battle_id) {
            sender.subscribe()
        } else {
            debug!(battle_id = %battle_id, "Creating new battle channel for subscription");
            drop(battle_channels);

            // Create battle channel if it doesn't exist
            let mut battle_channels = self.battle_channels.write().await;
            let (sender, _) = broadcast::channel(100);
            let receiver = sender.subscribe();
            battle_channels.insert(battle_id.to_string(), sender);
            receiver
        }
    }
}
