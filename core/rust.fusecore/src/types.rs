use std::fmt;

use serde::{Deserialize, Serialize};

use crate::irc;

/// A channel name, stored casefolded (RFC 1459 rules) so map lookups and
/// comparisons are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    pub fn new(name: &str) -> Self {
        Self(irc::lower(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod test {
    use super::Channel;

    #[test]
    fn channel_is_casefolded() {
        assert_eq!(Channel::new("#Lounge"), Channel::new("#lounge"));
        assert_eq!(Channel::new("#ops[1]").as_str(), "#ops{1}");
    }
}
