//! Live host collaborators: tokio-backed timers and the simulated
//! channel directory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fusecore::{irc, Channel, Directory, Error, Scheduler, TimerHandle};
use tokio::sync::mpsc::UnboundedSender;

/// Schedules one-shot tokio sleeps and funnels the fired events into the
/// main loop's channel.
pub struct TokioScheduler<E> {
    tx: UnboundedSender<E>,
    tasks: DashMap<u64, tokio::task::JoinHandle<()>>,
    next_id: AtomicU64,
}

impl<E> TokioScheduler<E> {
    pub fn new(tx: UnboundedSender<E>) -> Self {
        Self {
            tx,
            tasks: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<E: Send + 'static> Scheduler<E> for TokioScheduler<E> {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn schedule(&self, after: Duration, event: E) -> Result<TimerHandle, Error> {
        // Sweep out whatever already ran so the map stays small.
        self.tasks.retain(|_, task| !task.is_finished());

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The receiver only goes away at shutdown.
            let _ = tx.send(event);
        });
        self.tasks.insert(id, task);
        Ok(TimerHandle(id))
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some((_, task)) = self.tasks.remove(&handle.0) {
            task.abort();
        }
    }
}

/// Membership for the simulated channels, mutated by `join`/`part`
/// input lines and by rendered kicks.
pub struct SimDirectory {
    own: String,
    channels: DashMap<Channel, Vec<String>>,
}

impl SimDirectory {
    pub fn new(own: &str) -> Self {
        Self {
            own: own.to_string(),
            channels: DashMap::new(),
        }
    }

    pub fn join(&self, channel: &Channel, nick: &str) {
        let mut members = self.channels.entry(channel.clone()).or_default();
        if !members.iter().any(|m| irc::nick_eq(m, nick)) {
            members.push(nick.to_string());
        }
    }

    pub fn part(&self, channel: &Channel, nick: &str) {
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.retain(|m| !irc::nick_eq(m, nick));
        }
    }
}

impl Directory for SimDirectory {
    fn own_nick(&self) -> String {
        self.own.clone()
    }

    fn is_present(&self, channel: &Channel, nick: &str) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|members| members.iter().any(|m| irc::nick_eq(m, nick)))
    }

    fn members(&self, channel: &Channel) -> Vec<String> {
        self.channels
            .get(channel)
            .map(|members| members.value().clone())
            .unwrap_or_default()
    }

    fn fingerprint(&self, channel: &Channel, nick: &str) -> Option<String> {
        if self.is_present(channel, nick) {
            Some(format!("{}@sim.host", irc::lower(nick)))
        } else {
            None
        }
    }
}
