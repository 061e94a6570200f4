//! Host-collaborator traits. The engine depends on these seams instead
//! of a concrete transport, clock, or state store.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::Channel;
use crate::Error;

/// Handle for a pending timer. Cancelling a handle that already fired
/// or was never issued is a no-op, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Wall clock plus one-shot timer scheduling. `E` is the event payload
/// the host delivers back to the module when a timer fires.
pub trait Scheduler<E>: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Schedules `event` for delivery after `after`. Fails only when the
    /// timer backend itself is unavailable.
    fn schedule(&self, after: Duration, event: E) -> Result<TimerHandle, Error>;

    /// Best-effort cancellation; an already-queued event may still be
    /// delivered, so consumers must tolerate stale fires.
    fn cancel(&self, handle: TimerHandle);
}

/// Channel membership and identity lookups.
pub trait Directory: Send + Sync {
    /// The nick the bot itself is using.
    fn own_nick(&self) -> String;

    fn is_present(&self, channel: &Channel, nick: &str) -> bool;

    fn members(&self, channel: &Channel) -> Vec<String>;

    /// Stable per-identity token (conventionally `user@host`, lowercased)
    /// used for abuse counting. `None` when the nick cannot be resolved.
    /// This is a heuristic, not an authentication credential.
    fn fingerprint(&self, channel: &Channel, nick: &str) -> Option<String>;
}
