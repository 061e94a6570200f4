pub mod effect;
pub mod host;
pub mod irc;
pub mod outcome;
pub mod types;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub use effect::Effect;
pub use host::{Directory, Scheduler, TimerHandle};
pub use outcome::{LimitKind, Outcome, Rejection, Reply};
pub use types::Channel;
