use std::time::Duration;

use chrono::{DateTime, Utc};
use fusecore::{irc, Channel, Effect, Error, Rejection, Reply, Scheduler, TimerHandle};
use indexmap::IndexSet;
use rand::{rngs::StdRng, Rng};
use strum_macros::Display;

use crate::art;

/// Fixed fuse for a rethrown bomb, seconds. Deliberately independent of
/// the original fuse.
pub const RETHROW_GRACE_SECS: u64 = 10;

/// Delay before the post-detonation re-invite check, seconds.
pub const REINVITE_DELAY_SECS: u64 = 5;

/// Timer events a session asks the host to deliver back later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// The live bomb's fuse ran out. `seq` pins the event to one
    /// particular arming of the fuse; a fire from a cancelled or
    /// replaced arming must detonate nothing.
    Deadline { channel: Channel, seq: u64 },
    /// Post-detonation check: invite the victim back if they are still
    /// gone by then.
    Reinvite { channel: Channel, nick: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum BombState {
    /// Live, fuse running, the victim is expected to cut a wire.
    Armed,
    /// Live, mid-flight after a rethrow; the victim can only duck.
    Thrown,
    Defused,
    Detonated,
}

/// Everything drawn or resolved before a session exists.
pub struct BombSetup {
    pub channel: Channel,
    pub victim: String,
    pub sender: String,
    pub wires: IndexSet<String>,
    pub safe_wire: String,
    pub fuse_secs: u32,
    pub show_art: bool,
    pub show_correct_wire: bool,
    pub command_prefix: String,
}

/// One bomb's lifecycle in one channel. At most one session per channel
/// may be live (`Armed` or `Thrown`) at a time; the controller enforces
/// that before constructing a new one.
pub struct BombSession {
    channel: Channel,
    victim: String,
    sender: String,
    wires: IndexSet<String>,
    safe_wire: String,
    deadline: DateTime<Utc>,
    state: BombState,
    rethrown: bool,
    /// Whether any cut attempt was made; set before the attempt is
    /// judged, so a wrong cut still counts as having responded.
    responded: bool,
    show_art: bool,
    show_correct_wire: bool,
    command_prefix: String,
    timer: Option<(u64, TimerHandle)>,
}

impl BombSession {
    /// Builds the session and arms its deadline timer. A scheduling
    /// failure aborts creation; no half-armed session escapes.
    pub fn arm(
        setup: BombSetup,
        host: &dyn Scheduler<TimerEvent>,
        next_seq: &mut u64,
    ) -> Result<(Self, Vec<Effect>), Error> {
        let mut session = Self {
            channel: setup.channel,
            victim: setup.victim,
            sender: setup.sender,
            wires: setup.wires,
            safe_wire: setup.safe_wire,
            deadline: host.now(),
            state: BombState::Armed,
            rethrown: false,
            responded: false,
            show_art: setup.show_art,
            show_correct_wire: setup.show_correct_wire,
            command_prefix: setup.command_prefix,
            timer: None,
        };
        session.arm_deadline(host, Duration::from_secs(u64::from(setup.fuse_secs)), next_seq)?;

        let wire_names: Vec<String> = session.wires.iter().cloned().collect();
        let effects = vec![
            Effect::action(
                &session.channel,
                format!(
                    "stuffs a bomb down {}'s pants. The timer is set for {} seconds! \
                     There are {} wires. They are: {}.",
                    session.victim,
                    setup.fuse_secs,
                    session.wires.len(),
                    irc::comma_and(&wire_names)
                ),
            ),
            Effect::say(
                &session.channel,
                format!(
                    "{}, try to defuse the bomb with: '{}cutwire \u{2}color\u{2}'",
                    session.victim, session.command_prefix
                ),
            ),
        ];
        Ok((session, effects))
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn victim(&self) -> &str {
        &self.victim
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn wires(&self) -> &IndexSet<String> {
        &self.wires
    }

    pub fn safe_wire(&self) -> &str {
        &self.safe_wire
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn state(&self) -> BombState {
        self.state
    }

    pub fn rethrown(&self) -> bool {
        self.rethrown
    }

    pub fn responded(&self) -> bool {
        self.responded
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, BombState::Armed | BombState::Thrown)
    }

    /// Whether a deadline fire belongs to the current arming of the fuse.
    pub fn deadline_matches(&self, seq: u64) -> bool {
        matches!(self.timer, Some((current, _)) if current == seq)
    }

    /// Applies a wire-cut attempt. The caller has already checked who may
    /// cut and that the bomb is not mid-flight; this is the raw
    /// transition shared by players and the bot's own self-play.
    pub fn cut_wire(
        &mut self,
        color: &str,
        own_nick: &str,
        rng: &mut StdRng,
        host: &dyn Scheduler<TimerEvent>,
        next_seq: &mut u64,
    ) -> Result<Reply, Error> {
        if !self.is_live() {
            return Ok(Reply::ok());
        }
        self.responded = true;

        // A joke wire needs an independent 1-in-N draw on top of naming
        // the right decoy string. Two stages, always.
        let decoy_window = rng.gen_range(1..=self.wires.len()) == 1;
        if color.eq_ignore_ascii_case("potato") && decoy_window {
            let effects = vec![Effect::say(
                &self.channel,
                format!(
                    "{} turned the bomb into a potato! That made it mostly harmless \
                     and slightly {}.",
                    self.victim, self.safe_wire
                ),
            )];
            self.settle(BombState::Defused, host);
            return Ok(Reply::with_effects(effects));
        }
        if color.eq_ignore_ascii_case("pizza") && decoy_window {
            let effects = vec![Effect::say(
                &self.channel,
                format!(
                    "{} turned the bomb into a pizza! Their pants are ruined with \
                     pizza stuffed down them, but at least it didn't explode.",
                    self.victim
                ),
            )];
            self.settle(BombState::Defused, host);
            return Ok(Reply::with_effects(effects));
        }

        if self.safe_wire.eq_ignore_ascii_case(color) {
            let mut effects = vec![Effect::say(
                &self.channel,
                format!(
                    "{} cut the {} wire! That defused the bomb!",
                    self.victim, color
                ),
            )];
            if irc::nick_eq(&self.victim, &self.sender) {
                self.settle(BombState::Defused, host);
                return Ok(Reply::with_effects(effects));
            }

            // Rethrow: straight back at the thrower, short fuse.
            std::mem::swap(&mut self.victim, &mut self.sender);
            self.state = BombState::Thrown;
            self.rethrown = true;
            self.arm_deadline(host, Duration::from_secs(RETHROW_GRACE_SECS), next_seq)?;
            effects.push(Effect::say(
                &self.channel,
                format!(
                    "{} quickly rearms the bomb and throws it back at {} with only \
                     a few seconds on the clock!",
                    self.sender, self.victim
                ),
            ));

            if irc::nick_eq(&self.victim, own_nick) {
                // The bomb landed back in the bot's own pants.
                let sub = self.play_self(own_nick, rng, host, next_seq)?;
                effects.extend(sub.effects);
            }
            return Ok(Reply::with_effects(effects));
        }

        // Any other wire is the wrong wire.
        self.clear_deadline(host);
        let effects = self.detonate(host);
        Ok(Reply::with_effects(effects))
    }

    /// The bot resolves its own bomb by cutting a uniformly random wire.
    /// It may well blow itself up.
    pub fn play_self(
        &mut self,
        own_nick: &str,
        rng: &mut StdRng,
        host: &dyn Scheduler<TimerEvent>,
        next_seq: &mut u64,
    ) -> Result<Reply, Error> {
        if !self.is_live() {
            return Ok(Reply::ok());
        }
        let idx = rng.gen_range(0..self.wires.len());
        let Some(pick) = self.wires.get_index(idx).cloned() else {
            return Ok(Reply::ok());
        };
        let mut effects = vec![Effect::say(
            &self.channel,
            format!("{}cutwire {}", self.command_prefix, pick),
        )];
        let sub = self.cut_wire(&pick, own_nick, rng, host, next_seq)?;
        effects.extend(sub.effects);
        Ok(Reply::with_effects(effects))
    }

    /// DUCK! Valid only for the current victim of a thrown bomb; any
    /// other call is a silent no-op.
    pub fn dodge(&mut self, by: &str, host: &dyn Scheduler<TimerEvent>) -> Reply {
        if self.state != BombState::Thrown || !irc::nick_eq(by, &self.victim) {
            return Reply::ok();
        }
        let effects = vec![Effect::say(
            &self.channel,
            format!(
                "{} ducks! The bomb sails past and explodes harmlessly a few \
                 meters away.",
                self.victim
            ),
        )];
        self.settle(BombState::Defused, host);
        Reply::with_effects(effects)
    }

    /// Operator defusal. A victim may not defuse their own jeopardy
    /// unless they threw the bomb themselves or are privileged.
    pub fn force_defuse(
        &mut self,
        by: &str,
        privileged: bool,
        host: &dyn Scheduler<TimerEvent>,
    ) -> Reply {
        if !self.is_live() {
            return Reply::not_found();
        }
        if irc::nick_eq(by, &self.victim)
            && !irc::nick_eq(&self.victim, &self.sender)
            && !privileged
        {
            return Reply::rejected(Rejection::PermissionDenied {
                message: "You can't defuse a bomb in your own pants, you'll just have \
                          to cut a wire and hope for the best."
                    .to_string(),
            });
        }
        self.settle(BombState::Defused, host);
        Reply::with_effects(vec![Effect::say(&self.channel, "Bomb defused.")])
    }

    /// Pulls the deadline up to "now". The host's timer fire then walks
    /// the one and only detonation path.
    pub fn force_detonate(
        &mut self,
        host: &dyn Scheduler<TimerEvent>,
        next_seq: &mut u64,
    ) -> Result<Reply, Error> {
        if !self.is_live() {
            return Ok(Reply::not_found());
        }
        self.arm_deadline(host, Duration::ZERO, next_seq)?;
        Ok(Reply::ok())
    }

    /// Terminal explosion, shared by the deadline fire and a wrong-wire
    /// cut.
    pub fn detonate(&mut self, host: &dyn Scheduler<TimerEvent>) -> Vec<Effect> {
        self.state = BombState::Detonated;
        self.clear_deadline(host);

        let mut effects = Vec::new();
        if self.show_correct_wire {
            effects.push(Effect::say(
                &self.channel,
                format!("You should have gone for the {} wire!", self.safe_wire),
            ));
        }
        if self.show_art {
            for line in art::EXPLOSION {
                effects.push(Effect::say(&self.channel, *line));
            }
        } else {
            effects.push(Effect::say(&self.channel, "KABOOM!"));
        }
        let reason = if self.show_correct_wire {
            format!("BOOM! You should have gone for the {} wire!", self.safe_wire)
        } else {
            "BOOM!".to_string()
        };
        effects.push(Effect::kick(&self.channel, self.victim.clone(), reason));

        if !self.responded {
            // Victims who never even tried get invited back in, if they
            // are still gone once the dust settles.
            let event = TimerEvent::Reinvite {
                channel: self.channel.clone(),
                nick: self.victim.clone(),
            };
            if let Err(e) = host.schedule(Duration::from_secs(REINVITE_DELAY_SECS), event) {
                log::warn!(
                    "could not schedule re-invite for {} in {}: {}",
                    self.victim,
                    self.channel,
                    e
                );
            }
        }
        effects
    }

    fn settle(&mut self, state: BombState, host: &dyn Scheduler<TimerEvent>) {
        self.state = state;
        self.clear_deadline(host);
    }

    fn arm_deadline(
        &mut self,
        host: &dyn Scheduler<TimerEvent>,
        after: Duration,
        next_seq: &mut u64,
    ) -> Result<(), Error> {
        if let Some((_, handle)) = self.timer.take() {
            host.cancel(handle);
        }
        *next_seq += 1;
        let handle = host.schedule(
            after,
            TimerEvent::Deadline {
                channel: self.channel.clone(),
                seq: *next_seq,
            },
        )?;
        self.deadline = host.now() + chrono::Duration::from_std(after)?;
        self.timer = Some((*next_seq, handle));
        Ok(())
    }

    fn clear_deadline(&mut self, host: &dyn Scheduler<TimerEvent>) {
        if let Some((_, handle)) = self.timer.take() {
            host.cancel(handle);
        }
    }
}
