use std::fmt;

use strum_macros::{Display, EnumString};

use crate::effect::Effect;

/// Which admission-control threshold a request tripped. Kept separate
/// from the user-facing text so callers can count denials per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LimitKind {
    Total,
    Sender,
    Victim,
}

/// An expected, recoverable refusal. These are data, not errors; the
/// `message` is suitable for direct display in the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    PermissionDenied { message: String },
    NotEligible { message: String },
    RateLimited { kind: LimitKind, message: String },
    AlreadyActive { message: String },
    NoActiveSession { message: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied { message }
            | Self::NotEligible { message }
            | Self::RateLimited { message, .. }
            | Self::AlreadyActive { message }
            | Self::NoActiveSession { message } => f.write_str(message),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Ok,
    Rejected(Rejection),
    /// The operation needed a live session and none exists. Player-facing
    /// commands return `Ok` with no effects instead, so channel state is
    /// not leaked to ineligible actors.
    NotFound,
}

/// What an operation produced: a verdict plus the effects to deliver.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Reply {
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

impl Reply {
    /// Success with nothing to send (also the shape of a silent no-op).
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn with_effects(effects: Vec<Effect>) -> Self {
        Self {
            outcome: Outcome::Ok,
            effects,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            outcome: Outcome::Rejected(rejection),
            effects: Vec::new(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            outcome: Outcome::NotFound,
            effects: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == Outcome::Ok
    }
}
