use serde::{Deserialize, Serialize};

/// Events that can occur around a battle
///
/// Events represent facts about things that have already happened.
/// They are used to communicate state changes between different parts
/// of the system without tight coupling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BattleEvent {
    // Lobby lifecycle events
    /// A new battle lobby has been created
    BattleCreated {
        battle_id: String,
        box_id: String,
        max_participants: u32,
        entry_fee: i64,
    },

    /// A user has joined the battle lobby
    ParticipantJoined {
        battle_id: String,
        user_id: String,
        participant_count: u32,
    },

    /// A participant has flagged themselves ready
    ParticipantReady { battle_id: String, user_id: String },

    /// The battle was cancelled before starting; entry fees refunded
    BattleCancelled { battle_id: String },

    // Battle lifecycle events
    /// The battle has started (WAITING -> IN_PROGRESS)
    BattleStarted {
        battle_id: String,
        participants: Vec<String>,
    },

    /// All pulls for a round have been recorded
    RoundCompleted {
        battle_id: String,
        round: u32,
        totals: Vec<(String, i64)>, // (user_id, running total)
    },

    /// The battle has been settled and prizes paid
    BattleFinished {
        battle_id: String,
        winner: Option<String>,
        payouts: Vec<(String, i64)>, // (user_id, amount credited)
    },
}

impl BattleEvent {
    /// Get the battle_id associated with this event
    /// All events are battle-specific
    pub fn battle_id(&self) -> &str {
        match self {
            BattleEvent::BattleCreated { battle_id, .. } => battle_id,
            BattleEvent::ParticipantJoined { battle_id, .. } => battle_id,
            BattleEvent::ParticipantReady { battle_id, .. } => battle_id,
            BattleEvent::BattleCancelled { battle_id } => battle_id,
            BattleEvent::BattleStarted { battle_id, .. } => battle_id,
            BattleEvent::RoundCompleted { battle_id, .. } => battle_id,
            BattleEvent::BattleFinished { battle_id, .. } => battle_id,
        }
    }

    /// Get a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            BattleEvent::BattleCreated { .. } => "battle_created",
            BattleEvent::ParticipantJoined { .. } => "participant_joined",
            BattleEvent::ParticipantReady { .. } => "participant_ready",
            BattleEvent::BattleCancelled { .. } => "battle_cancelled",
            BattleEvent::BattleStarted { .. } => "battle_started",
            BattleEvent::RoundCompleted { .. } => "round_completed",
            BattleEvent::BattleFinished { .. } => "battle_finished",
        }
    }
}
