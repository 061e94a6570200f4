//! Mock collaborators shared by the in-crate tests: a hand-cranked
//! clock/scheduler, a scripted membership directory, and a fixed
//! settings source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fusecore::{irc, Channel, Directory, Effect, Error, Scheduler, TimerHandle};
use indexmap::IndexSet;

use crate::controller::GameController;
use crate::limiter::MemoryHistoryStore;
use crate::session::{BombSession, BombSetup, TimerEvent};
use crate::settings::{Settings, SettingsSource};

pub(crate) struct MockHost {
    now: Mutex<DateTime<Utc>>,
    pending: Mutex<Vec<(TimerHandle, DateTime<Utc>, TimerEvent)>>,
    next_id: AtomicU64,
    fail_next: AtomicBool,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            pending: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next_schedule(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Removes and returns the events whose due time has arrived.
    pub fn take_due(&self) -> Vec<TimerEvent> {
        let now = *self.now.lock().unwrap();
        let mut pending = self.pending.lock().unwrap();
        let (due, rest): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|(_, at, _)| *at <= now);
        *pending = rest;
        due.into_iter().map(|(_, _, event)| event).collect()
    }

    /// Advances the clock, then drains what came due.
    pub fn take_due_after(&self, delta: chrono::Duration) -> Vec<TimerEvent> {
        *self.now.lock().unwrap() += delta;
        self.take_due()
    }
}

impl Scheduler<TimerEvent> for MockHost {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn schedule(&self, after: Duration, event: TimerEvent) -> Result<TimerHandle, Error> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err("timer backend down".into());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let due = self.now() + chrono::Duration::from_std(after)?;
        self.pending
            .lock()
            .unwrap()
            .push((TimerHandle(id), due, event));
        Ok(TimerHandle(id))
    }

    fn cancel(&self, handle: TimerHandle) {
        self.pending
            .lock()
            .unwrap()
            .retain(|(h, _, _)| *h != handle);
    }
}

pub(crate) struct MockDirectory {
    own: String,
    members: Mutex<HashMap<Channel, Vec<String>>>,
}

impl MockDirectory {
    pub fn new(own: &str) -> Self {
        Self {
            own: own.to_string(),
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn join(&self, channel: &Channel, nick: &str) {
        let mut members = self.members.lock().unwrap();
        let list = members.entry(channel.clone()).or_default();
        if !list.iter().any(|m| irc::nick_eq(m, nick)) {
            list.push(nick.to_string());
        }
    }

    pub fn part(&self, channel: &Channel, nick: &str) {
        if let Some(list) = self.members.lock().unwrap().get_mut(channel) {
            list.retain(|m| !irc::nick_eq(m, nick));
        }
    }
}

impl Directory for MockDirectory {
    fn own_nick(&self) -> String {
        self.own.clone()
    }

    fn is_present(&self, channel: &Channel, nick: &str) -> bool {
        self.members
            .lock()
            .unwrap()
            .get(channel)
            .is_some_and(|list| list.iter().any(|m| irc::nick_eq(m, nick)))
    }

    fn members(&self, channel: &Channel) -> Vec<String> {
        self.members
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    fn fingerprint(&self, channel: &Channel, nick: &str) -> Option<String> {
        if self.is_present(channel, nick) {
            Some(format!("{}@test.host", irc::lower(nick)))
        } else {
            None
        }
    }
}

pub(crate) struct FixedSettings(pub Mutex<Settings>);

impl SettingsSource for FixedSettings {
    fn settings_for(&self, _channel: &Channel) -> Settings {
        self.0.lock().unwrap().clone()
    }
}

/// Builds a session directly, bypassing the controller, for state
/// machine tests.
pub(crate) fn setup_session(
    host: &MockHost,
    seq: &mut u64,
    victim: &str,
    sender: &str,
    wires: &[&str],
    safe: &str,
    fuse: u32,
) -> (BombSession, Vec<Effect>) {
    let setup = BombSetup {
        channel: Channel::new("#test"),
        victim: victim.to_string(),
        sender: sender.to_string(),
        wires: wires.iter().map(|s| s.to_string()).collect::<IndexSet<_>>(),
        safe_wire: safe.to_string(),
        fuse_secs: fuse,
        show_art: false,
        show_correct_wire: false,
        command_prefix: "!".to_string(),
    };
    BombSession::arm(setup, host, seq).unwrap()
}

pub(crate) struct Harness {
    pub host: Arc<MockHost>,
    pub dir: Arc<MockDirectory>,
    pub settings: Arc<FixedSettings>,
    pub store: Arc<MemoryHistoryStore>,
    pub game: GameController,
    pub chan: Channel,
}

/// A controller wired to mocks, with `#test` populated by the bot plus
/// alice, bob, and carl.
pub(crate) fn harness(tweak: impl FnOnce(&mut Settings)) -> Harness {
    let mut s = Settings {
        allow_bombs: true,
        ..Settings::default()
    };
    tweak(&mut s);
    let chan = Channel::new("#test");
    let host = Arc::new(MockHost::new());
    let dir = Arc::new(MockDirectory::new("fusebot"));
    for nick in ["fusebot", "alice", "bob", "carl"] {
        dir.join(&chan, nick);
    }
    let settings = Arc::new(FixedSettings(Mutex::new(s)));
    let store = Arc::new(MemoryHistoryStore::default());
    let game = GameController::new(dir.clone(), host.clone(), settings.clone(), store.clone())
        .with_seed(7);
    Harness {
        host,
        dir,
        settings,
        store,
        game,
        chan,
    }
}
