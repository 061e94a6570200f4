//! The timebomb minigame: a per-channel single-active-bomb state machine
//! with a wire-cutting defusal puzzle, a rethrow mechanic, and a
//! sliding-window rate limiter on bomb creation.

mod art;
pub mod controller;
pub mod limiter;
pub mod session;
pub mod settings;

#[cfg(test)]
pub(crate) mod testkit;

pub use controller::GameController;
pub use limiter::{Admission, HistoryRecord, HistoryStore, MemoryHistoryStore, RateLimiter};
pub use session::{BombSession, BombState, TimerEvent};
pub use settings::{Settings, SettingsSource};
