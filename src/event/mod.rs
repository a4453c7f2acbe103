// Event-driven architecture components
//
// Battle notifications flow through a broadcast bus so that delivery
// never couples to (or rolls back) the operation that emitted them.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::BattleEvent;

// Internal modules
mod bus;
mod events;
