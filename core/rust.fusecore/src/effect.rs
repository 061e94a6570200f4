use crate::types::Channel;

/// An outbound chat effect. Modules never talk to a transport directly;
/// they return these and the surrounding service delivers them however
/// it likes (IRC, simulator, test buffer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Say {
        channel: Channel,
        text: String,
    },
    /// A `/me`-style action line.
    Action {
        channel: Channel,
        text: String,
    },
    Kick {
        channel: Channel,
        nick: String,
        reason: String,
    },
    Invite {
        channel: Channel,
        nick: String,
    },
}

impl Effect {
    pub fn say(channel: &Channel, text: impl Into<String>) -> Self {
        Self::Say {
            channel: channel.clone(),
            text: text.into(),
        }
    }

    pub fn action(channel: &Channel, text: impl Into<String>) -> Self {
        Self::Action {
            channel: channel.clone(),
            text: text.into(),
        }
    }

    pub fn kick(channel: &Channel, nick: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Kick {
            channel: channel.clone(),
            nick: nick.into(),
            reason: reason.into(),
        }
    }

    pub fn invite(channel: &Channel, nick: impl Into<String>) -> Self {
        Self::Invite {
            channel: channel.clone(),
            nick: nick.into(),
        }
    }
}
