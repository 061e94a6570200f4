use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fusecore::{irc, Channel, Directory, Effect, Error, LimitKind, Rejection, Reply, Scheduler};
use indexmap::IndexSet;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::limiter::{Admission, HistoryStore, RateLimiter};
use crate::session::{BombSession, BombSetup, BombState, TimerEvent};
use crate::settings::{Settings, SettingsSource};

/// Everything one channel owns: its live (or settled) session, the
/// random-target memo, the timer sequence counter, and its RNG. All
/// access goes through one per-channel critical section, so two
/// concurrent creation requests can never both see "no live bomb".
struct ChannelState {
    session: Option<BombSession>,
    last_random_victim: Option<String>,
    timer_seq: u64,
    rng: StdRng,
}

/// Composes the rate limiter and the per-channel sessions, and routes
/// inbound events to whichever session they belong to.
pub struct GameController {
    directory: Arc<dyn Directory>,
    scheduler: Arc<dyn Scheduler<TimerEvent>>,
    settings: Arc<dyn SettingsSource>,
    limiter: RateLimiter,
    channels: DashMap<Channel, Mutex<ChannelState>>,
    /// nick -> last seen speaking, per channel. Feeds random targeting.
    activity: DashMap<Channel, HashMap<String, DateTime<Utc>>>,
    rng_seed: Option<u64>,
}

impl GameController {
    pub fn new(
        directory: Arc<dyn Directory>,
        scheduler: Arc<dyn Scheduler<TimerEvent>>,
        settings: Arc<dyn SettingsSource>,
        store: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            directory,
            scheduler,
            settings,
            limiter: RateLimiter::new(store),
            channels: DashMap::new(),
            activity: DashMap::new(),
            rng_seed: None,
        }
    }

    /// Seeds every channel's RNG, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Records that `nick` said something in `channel`.
    pub fn note_message(&self, channel: &Channel, nick: &str) {
        self.activity
            .entry(channel.clone())
            .or_default()
            .insert(nick.to_string(), self.scheduler.now());
    }

    /// Joins count as activity only when the channel says so.
    pub fn note_join(&self, channel: &Channel, nick: &str) {
        if self.settings.settings_for(channel).join_is_activity {
            self.note_message(channel, nick);
        }
    }

    /// Plants a bomb on a named target. `privileged` requesters skip the
    /// rate limiter and the requester-side eligibility checks.
    pub fn create_direct(
        &self,
        channel: &Channel,
        requester: &str,
        target: &str,
        privileged: bool,
    ) -> Result<Reply, Error> {
        let settings = self.settings.settings_for(channel);
        let now = self.scheduler.now();
        self.with_channel(channel, |state| {
            if let Some(reply) = self.check_channel_open(&settings, state) {
                return Ok(reply);
            }
            if irc::nick_eq(target, &self.directory.own_nick()) && !settings.allow_self_bombs {
                return Ok(not_eligible(
                    "You really expect me to bomb myself? Stuffing explosives down \
                     my own pants is not my idea of fun.",
                ));
            }
            let Some(victim) = self.resolve_member(channel, target) else {
                return Ok(not_eligible("Error: nick not found."));
            };
            if settings.is_excluded(&victim) {
                return Ok(not_eligible("Error: that nick can't be bombed."));
            }
            if !privileged {
                if let Some(reply) = self.check_requester(channel, requester, &settings) {
                    return Ok(reply);
                }
            }
            let Some(fp) = self.directory.fingerprint(channel, requester) else {
                return Ok(not_eligible(format!(
                    "You have to be in {} to plant a timebomb there.",
                    channel
                )));
            };
            let victim_key = irc::lower(&victim);
            if !privileged {
                if let Admission::Denied(kind) =
                    self.limiter.admit(channel, &fp, &victim_key, &settings, now)
                {
                    return Ok(rate_limited(kind));
                }
            }

            // Everything checked out; only now is any randomness drawn.
            let setup = draw_setup(
                &mut state.rng,
                &settings,
                (settings.min_time, settings.max_time),
                channel,
                victim,
                requester.to_string(),
            );
            self.limiter.record(channel, &fp, &victim_key, now);
            self.install(state, setup)
        })
    }

    /// Plants a bomb on a randomly chosen victim. With no explicit
    /// candidates the pool is derived from recent speakers, falling back
    /// to the whole member list when the pool degenerates.
    pub fn create_random(
        &self,
        channel: &Channel,
        requester: &str,
        candidates: &[String],
    ) -> Result<Reply, Error> {
        let settings = self.settings.settings_for(channel);
        let now = self.scheduler.now();
        self.with_channel(channel, |state| {
            if let Some(reply) = self.check_channel_open(&settings, state) {
                return Ok(reply);
            }
            if let Some(reply) = self.check_requester(channel, requester, &settings) {
                return Ok(reply);
            }
            let Some(fp) = self.directory.fingerprint(channel, requester) else {
                return Ok(not_eligible(format!(
                    "You have to be in {} to plant a timebomb there.",
                    channel
                )));
            };
            // The requester's own rates are checked up front, before any
            // victim is considered.
            if let Admission::Denied(kind) = self.limiter.admit(channel, &fp, "", &settings, now) {
                return Ok(rate_limited(kind));
            }

            let members = self.directory.members(channel);
            let mut pre_effects = Vec::new();
            let mut pool: Vec<String> = candidates
                .iter()
                .filter_map(|c| members.iter().find(|m| irc::nick_eq(m, c)).cloned())
                .collect();

            if settings.bomb_active_users {
                if pool.is_empty() {
                    pool = self.active_members(channel, &members, &fp, &settings, now);
                }
                if pool.len() == 1 && irc::nick_eq(&pool[0], requester) {
                    pool.clear();
                }
                if pool.is_empty() {
                    pre_effects.push(Effect::say(
                        channel,
                        "Well, nobody has said anything in a while, so I guess I'll \
                         just pick someone at random.",
                    ));
                    pool = members.clone();
                } else if pool.len() == 2 {
                    pre_effects.push(Effect::say(
                        channel,
                        "Well, it's just been the two of you talking lately, so I'll \
                         bomb someone at random.",
                    ));
                    pool = members.clone();
                }
            } else if pool.is_empty() {
                pool = members.clone();
            }

            let own = self.directory.own_nick();
            if !settings.allow_self_bombs {
                pool.retain(|n| !irc::nick_eq(n, &own));
            }
            let last = state.last_random_victim.clone();
            let eligible: Vec<String> = pool
                .into_iter()
                .filter(|v| {
                    !last.as_deref().is_some_and(|l| irc::nick_eq(l, v))
                        && !settings.is_random_excluded(v)
                        && !settings.is_excluded(v)
                        && matches!(
                            self.limiter.admit(channel, &fp, &irc::lower(v), &settings, now),
                            Admission::Allowed
                        )
                })
                .collect();
            if eligible.is_empty() {
                return Ok(Reply {
                    outcome: not_eligible(
                        "I couldn't find anyone suitable to bomb. Maybe everyone here \
                         is excluded from being bombed or has been bombed too recently.",
                    )
                    .outcome,
                    effects: pre_effects,
                });
            }

            let victim = eligible[state.rng.gen_range(0..eligible.len())].clone();
            state.last_random_victim = Some(victim.clone());
            let setup = draw_setup(
                &mut state.rng,
                &settings,
                (settings.min_random_time, settings.max_random_time),
                channel,
                victim.clone(),
                requester.to_string(),
            );
            self.limiter.record(channel, &fp, &irc::lower(&victim), now);
            let reply = self.install(state, setup)?;
            let mut effects = pre_effects;
            effects.extend(reply.effects);
            Ok(Reply {
                outcome: reply.outcome,
                effects,
            })
        })
    }

    /// A wire-cut attempt from the channel. Only the victim (or a
    /// privileged override) may cut, and not while the bomb is
    /// mid-flight from a rethrow. No live bomb means no reply at all.
    pub fn cut_wire(
        &self,
        channel: &Channel,
        by: &str,
        color: &str,
        privileged: bool,
    ) -> Result<Reply, Error> {
        let own = self.directory.own_nick();
        self.with_channel(channel, |state| {
            let ChannelState {
                session,
                timer_seq,
                rng,
                ..
            } = state;
            let Some(sess) = session.as_mut() else {
                return Ok(Reply::ok());
            };
            if !sess.is_live() || sess.state() == BombState::Thrown {
                return Ok(Reply::ok());
            }
            if !irc::nick_eq(by, sess.victim()) && !privileged {
                return Ok(Reply::rejected(Rejection::PermissionDenied {
                    message: "You can't cut the wire on someone else's bomb!".to_string(),
                }));
            }
            sess.cut_wire(color, &own, rng, self.scheduler.as_ref(), timer_seq)
        })
    }

    /// DUCK! Silent no-op unless a thrown bomb is heading for `by`.
    pub fn dodge(&self, channel: &Channel, by: &str) -> Reply {
        self.with_channel(channel, |state| match state.session.as_mut() {
            Some(sess) => sess.dodge(by, self.scheduler.as_ref()),
            None => Reply::ok(),
        })
    }

    /// Privileged: pull the live bomb's deadline up to now. Unlike the
    /// player commands this reports a missing session.
    pub fn force_detonate(&self, channel: &Channel) -> Result<Reply, Error> {
        self.with_channel(channel, |state| {
            let ChannelState {
                session, timer_seq, ..
            } = state;
            match session.as_mut() {
                Some(sess) if sess.is_live() => {
                    sess.force_detonate(self.scheduler.as_ref(), timer_seq)
                }
                _ => {
                    log::debug!("force-detonate in {} with no live bomb", channel);
                    Ok(Reply::not_found())
                }
            }
        })
    }

    /// Privileged: settle the live bomb without an explosion, subject to
    /// the victim-may-not-save-themselves rule.
    pub fn force_defuse(&self, channel: &Channel, by: &str, privileged: bool) -> Reply {
        self.with_channel(channel, |state| match state.session.as_mut() {
            Some(sess) if sess.is_live() => sess.force_defuse(by, privileged, self.scheduler.as_ref()),
            _ => Reply::not_found(),
        })
    }

    /// Entry point for host timer fires.
    pub fn on_timer(&self, event: TimerEvent) -> Vec<Effect> {
        match event {
            TimerEvent::Deadline { channel, seq } => self.with_channel(&channel, |state| {
                let Some(sess) = state.session.as_mut() else {
                    return Vec::new();
                };
                // A fire that lost the race against a cancel or a
                // reschedule must do nothing.
                if !sess.is_live() || !sess.deadline_matches(seq) {
                    return Vec::new();
                }
                sess.detonate(self.scheduler.as_ref())
            }),
            TimerEvent::Reinvite { channel, nick } => {
                if self.directory.is_present(&channel, &nick) {
                    Vec::new()
                } else {
                    vec![Effect::invite(&channel, nick)]
                }
            }
        }
    }

    /// Read-only peek at the channel's current session, if any.
    pub fn inspect<T>(&self, channel: &Channel, f: impl FnOnce(Option<&BombSession>) -> T) -> T {
        self.with_channel(channel, |state| f(state.session.as_ref()))
    }

    fn with_channel<T>(&self, channel: &Channel, f: impl FnOnce(&mut ChannelState) -> T) -> T {
        let entry = self
            .channels
            .entry(channel.clone())
            .or_insert_with(|| {
                Mutex::new(ChannelState {
                    session: None,
                    last_random_victim: None,
                    timer_seq: 0,
                    rng: match self.rng_seed {
                        Some(seed) => StdRng::seed_from_u64(seed),
                        None => StdRng::from_entropy(),
                    },
                })
            });
        let mut guard = entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Feature flag and single-live-session checks shared by both
    /// creation paths.
    fn check_channel_open(&self, settings: &Settings, state: &ChannelState) -> Option<Reply> {
        if !settings.allow_bombs {
            return Some(not_eligible("Timebombs are not allowed in this channel."));
        }
        if let Some(sess) = &state.session {
            if sess.is_live() {
                return Some(Reply::rejected(Rejection::AlreadyActive {
                    message: format!(
                        "There is already an active bomb, in {}'s pants!",
                        sess.victim()
                    ),
                }));
            }
        }
        None
    }

    /// Requester-side eligibility: not excluded, actually present.
    fn check_requester(
        &self,
        channel: &Channel,
        requester: &str,
        settings: &Settings,
    ) -> Option<Reply> {
        if settings.is_excluded(requester) {
            return Some(not_eligible(
                "You can't bomb anyone because you're excluded from being bombed.",
            ));
        }
        if !self.directory.is_present(channel, requester) {
            return Some(not_eligible(format!(
                "You have to be in {} to plant a timebomb there.",
                channel
            )));
        }
        None
    }

    /// Members who spoke within the idle cutoff and would pass admission.
    fn active_members(
        &self,
        channel: &Channel,
        members: &[String],
        fp: &str,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let cutoff = chrono::Duration::minutes(i64::from(settings.idle_time_mins));
        let Some(times) = self.activity.get(channel) else {
            return Vec::new();
        };
        let mut active = Vec::new();
        for (nick, at) in times.iter() {
            if now - *at >= cutoff {
                continue;
            }
            let Some(member) = members.iter().find(|m| irc::nick_eq(m, nick)) else {
                continue;
            };
            if matches!(
                self.limiter
                    .admit(channel, fp, &irc::lower(member), settings, now),
                Admission::Allowed
            ) {
                active.push(member.clone());
            }
        }
        active
    }

    fn resolve_member(&self, channel: &Channel, nick: &str) -> Option<String> {
        self.directory
            .members(channel)
            .into_iter()
            .find(|m| irc::nick_eq(m, nick))
    }

    /// Installs a freshly drawn bomb as the channel's live session and,
    /// when the bot itself is the victim, plays it out immediately.
    fn install(&self, state: &mut ChannelState, setup: BombSetup) -> Result<Reply, Error> {
        log::info!(
            "timebomb: the safe wire in {} is {}",
            setup.channel,
            setup.safe_wire
        );
        let own = self.directory.own_nick();
        let ChannelState {
            session,
            timer_seq,
            rng,
            ..
        } = state;
        let (sess, mut effects) = BombSession::arm(setup, self.scheduler.as_ref(), timer_seq)?;
        *session = Some(sess);
        if let Some(sess) = session.as_mut() {
            if irc::nick_eq(sess.victim(), &own) {
                let sub = sess.play_self(&own, rng, self.scheduler.as_ref(), timer_seq)?;
                effects.extend(sub.effects);
            }
        }
        Ok(Reply::with_effects(effects))
    }
}

fn not_eligible(message: impl Into<String>) -> Reply {
    Reply::rejected(Rejection::NotEligible {
        message: message.into(),
    })
}

fn rate_limited(kind: LimitKind) -> Reply {
    let message = match kind {
        LimitKind::Total => {
            "Sorry, but I've stuffed so many pants with explosives lately that I'm \
             temporarily out. You'll have to wait."
        }
        LimitKind::Sender => "You've bombed a lot of people recently, let someone else have a go.",
        LimitKind::Victim => "That user has been bombed a lot lately, try picking someone else.",
    };
    Reply::rejected(Rejection::RateLimited {
        kind,
        message: message.to_string(),
    })
}

/// Draws the randomized bomb parameters: fuse length, wire count, the
/// wires themselves (distinct, sampled without replacement), and which
/// one is safe.
fn draw_setup(
    rng: &mut StdRng,
    settings: &Settings,
    fuse_range: (u32, u32),
    channel: &Channel,
    victim: String,
    sender: String,
) -> BombSetup {
    let fuse_secs = range_sample(rng, fuse_range.0, fuse_range.1);
    let wire_count = range_sample(rng, settings.min_wires, settings.max_wires).max(1);
    let palette = Settings::palette_for(wire_count);
    let count = (wire_count as usize).min(palette.len());
    if count < wire_count as usize {
        log::warn!(
            "wire count {} exceeds palette size {}; clamping",
            wire_count,
            palette.len()
        );
    }
    let picks: Vec<String> = rand::seq::index::sample(rng, palette.len(), count)
        .iter()
        .map(|i| palette[i].to_string())
        .collect();
    let safe_wire = picks[rng.gen_range(0..picks.len())].clone();
    let wires: IndexSet<String> = picks.into_iter().collect();
    BombSetup {
        channel: channel.clone(),
        victim,
        sender,
        wires,
        safe_wire,
        fuse_secs,
        show_art: settings.show_art,
        show_correct_wire: settings.show_correct_wire,
        command_prefix: settings.command_prefix.clone(),
    }
}

/// Inclusive uniform draw that tolerates inverted bounds.
fn range_sample(rng: &mut StdRng, lo: u32, hi: u32) -> u32 {
    let (lo, hi) = (lo.min(hi), lo.max(hi));
    rng.gen_range(lo..=hi)
}
