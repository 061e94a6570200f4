use fusecore::{irc, Channel};
use serde::{Deserialize, Serialize};

/// Wire colors used when a bomb has fewer than twelve wires.
pub const SHORT_PALETTE: &[&str] = &[
    "red", "orange", "yellow", "green", "blue", "purple", "pink", "black", "brown", "grey",
    "white",
];

/// The extended palette, used once the wire count would exhaust the
/// short one. Sampling is always without replacement, so the palette in
/// play must be at least as large as the wire count.
pub const LONG_PALETTE: &[&str] = &[
    "blue",
    "red",
    "green",
    "yellow",
    "orange",
    "purple",
    "pink",
    "brown",
    "grey",
    "black",
    "white",
    "beige",
    "gold",
    "silver",
    "turquoise",
    "cyan",
    "magenta",
    "lilac",
    "violet",
    "burgundy",
    "salmon",
    "mustard",
    "lavender",
    "plum",
    "khaki",
    "fuchsia",
    "emerald",
    "olive",
    "sapphire",
    "indigo",
    "coral",
    "peach",
    "caramel",
    "chocolate",
    "sand",
    "garnet",
    "amber",
    "teal",
    "terracotta",
    "tan",
    "champagne",
    "rust",
];

/// Resolved per-channel tunables. One snapshot is taken at the start of
/// each operation; the engine never re-reads configuration mid-flight.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub allow_bombs: bool,
    /// Whether the bot may end up holding a bomb itself.
    pub allow_self_bombs: bool,
    /// ASCII-art explosion instead of a one-line bang.
    pub show_art: bool,
    /// Reveal the safe wire on detonation (message and kick reason).
    pub show_correct_wire: bool,
    /// Restrict random targeting to users who spoke recently.
    pub bomb_active_users: bool,
    /// Whether joining the channel counts as speaking.
    pub join_is_activity: bool,
    /// Inclusive wire-count range.
    pub min_wires: u32,
    pub max_wires: u32,
    /// Inclusive fuse range for directly targeted bombs, seconds.
    pub min_time: u32,
    pub max_time: u32,
    /// Fuse range for random bombs. Conventionally wider than the direct
    /// range so someone not paying attention has time to react.
    pub min_random_time: u32,
    pub max_random_time: u32,
    /// Sliding-window length for admission control, seconds.
    pub rate_limit_window: u32,
    /// Average allowed creations per hour, counted over the window.
    pub rate_limit_total: f64,
    pub rate_limit_sender: f64,
    pub rate_limit_victim: f64,
    /// Minutes of silence before a user stops counting as active.
    pub idle_time_mins: u32,
    /// Nicks that can never be bombed, and may not bomb anyone either.
    pub exclusions: Vec<String>,
    /// Nicks exempt from random targeting only.
    pub random_exclusions: Vec<String>,
    /// Command prefix quoted in help lines ("!cutwire red").
    pub command_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allow_bombs: false,
            allow_self_bombs: false,
            show_art: false,
            show_correct_wire: false,
            bomb_active_users: true,
            join_is_activity: false,
            min_wires: 2,
            max_wires: 4,
            min_time: 45,
            max_time: 70,
            min_random_time: 60,
            max_random_time: 120,
            rate_limit_window: 1800,
            rate_limit_total: 9.0,
            rate_limit_sender: 5.0,
            rate_limit_victim: 3.0,
            idle_time_mins: 30,
            exclusions: Vec::new(),
            random_exclusions: Vec::new(),
            command_prefix: "!".to_string(),
        }
    }
}

impl Settings {
    pub fn is_excluded(&self, nick: &str) -> bool {
        self.exclusions.iter().any(|n| irc::nick_eq(n, nick))
    }

    pub fn is_random_excluded(&self, nick: &str) -> bool {
        self.random_exclusions.iter().any(|n| irc::nick_eq(n, nick))
    }

    pub fn palette_for(wire_count: u32) -> &'static [&'static str] {
        if wire_count < 12 {
            SHORT_PALETTE
        } else {
            LONG_PALETTE
        }
    }
}

/// Per-channel settings lookup, supplied by the configuration store.
pub trait SettingsSource: Send + Sync {
    fn settings_for(&self, channel: &Channel) -> Settings;
}
