use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fusecore::{irc, Channel, Error, LimitKind};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// One successful bomb creation, as remembered for admission control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub at: DateTime<Utc>,
    /// Sender fingerprint (`user@host`), lowercased.
    pub sender: String,
    /// Victim nick, casefolded. Empty for the pre-check a random bomb
    /// runs before it has picked anyone.
    pub victim: String,
}

/// Durable storage for a channel's bomb history. The engine only needs
/// get/set of the ordered record list; the representation is the
/// store's business.
pub trait HistoryStore: Send + Sync {
    fn load(&self, channel: &Channel) -> Result<Vec<HistoryRecord>, Error>;
    fn save(&self, channel: &Channel, records: &[HistoryRecord]) -> Result<(), Error>;
}

/// Keeps history in process memory. The default store when nothing
/// durable is wired in, and the workhorse for tests.
#[derive(Default)]
pub struct MemoryHistoryStore {
    logs: DashMap<Channel, Vec<HistoryRecord>>,
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self, channel: &Channel) -> Result<Vec<HistoryRecord>, Error> {
        Ok(self
            .logs
            .get(channel)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    fn save(&self, channel: &Channel, records: &[HistoryRecord]) -> Result<(), Error> {
        self.logs.insert(channel.clone(), records.to_vec());
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied(LimitKind),
}

/// Sliding-window admission control over a channel's bomb history.
///
/// Store failures never take the game down: a failed load counts as an
/// empty window and a failed save is logged and dropped.
pub struct RateLimiter {
    store: Arc<dyn HistoryStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Decides whether `sender_fp` may bomb `victim` right now. Prunes
    /// aged-out records and persists the pruned log as a side effect.
    /// Appends nothing; call [`RateLimiter::record`] once the session is
    /// actually created.
    pub fn admit(
        &self,
        channel: &Channel,
        sender_fp: &str,
        victim: &str,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> Admission {
        let records = self.pruned(channel, settings, now);
        let window = settings.rate_limit_window;
        let fp = sender_fp.to_lowercase();
        let victim = irc::lower(victim);

        let total = records.len();
        let by_sender = records.iter().filter(|r| r.sender == fp).count();
        let on_victim = records.iter().filter(|r| r.victim == victim).count();
        log::debug!(
            "admission in {}: total={} sender={} victim={} over {}s",
            channel,
            total,
            by_sender,
            on_victim,
            window
        );

        // Each configured rate is events per hour; scale it to the
        // actual window. Denials are checked widest first.
        let allowance = |per_hour: f64| f64::from(window) * per_hour / 3600.0;
        if total as f64 > allowance(settings.rate_limit_total) {
            return Admission::Denied(LimitKind::Total);
        }
        if by_sender as f64 > allowance(settings.rate_limit_sender) {
            return Admission::Denied(LimitKind::Sender);
        }
        if on_victim as f64 > allowance(settings.rate_limit_victim) {
            return Admission::Denied(LimitKind::Victim);
        }
        Admission::Allowed
    }

    /// Appends one record. Called only after a session was installed.
    pub fn record(&self, channel: &Channel, sender_fp: &str, victim: &str, now: DateTime<Utc>) {
        let mut records = self.load_or_empty(channel);
        records.push(HistoryRecord {
            at: now,
            sender: sender_fp.to_lowercase(),
            victim: irc::lower(victim),
        });
        self.store_back(channel, &records);
    }

    fn pruned(&self, channel: &Channel, settings: &Settings, now: DateTime<Utc>) -> Vec<HistoryRecord> {
        let mut records = self.load_or_empty(channel);
        let window = chrono::Duration::seconds(i64::from(settings.rate_limit_window));
        records.retain(|r| r.at + window >= now);
        self.store_back(channel, &records);
        records
    }

    fn load_or_empty(&self, channel: &Channel) -> Vec<HistoryRecord> {
        match self.store.load(channel) {
            Ok(records) => records,
            Err(e) => {
                log::warn!(
                    "bomb history load failed for {}: {}; counting from empty",
                    channel,
                    e
                );
                Vec::new()
            }
        }
    }

    fn store_back(&self, channel: &Channel, records: &[HistoryRecord]) {
        if let Err(e) = self.store.save(channel, records) {
            log::warn!("bomb history save failed for {}: {}", channel, e);
        }
    }
}
