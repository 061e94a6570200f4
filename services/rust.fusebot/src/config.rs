use std::collections::HashMap;
use std::path::Path;

use bot_modules_timebomb::{Settings, SettingsSource};
use fusecore::{Channel, Error};
use serde::Deserialize;

/// On-disk shape of the settings file:
///
/// ```yaml
/// channels:
///   "#lounge":
///     allow_bombs: true
///     show_art: true
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    channels: HashMap<String, Settings>,
}

/// Per-channel settings resolved from a YAML file. Channels the file
/// does not mention get the fallback.
pub struct FileSettings {
    channels: HashMap<Channel, Settings>,
    fallback: Settings,
}

impl FileSettings {
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let (channels, fallback) = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config: FileConfig = serde_yaml::from_str(&text)?;
                let channels = config
                    .channels
                    .into_iter()
                    .map(|(name, settings)| (Channel::new(&name), settings))
                    .collect();
                (channels, Settings::default())
            }
            // With no file at all the simulator runs the game enabled;
            // a real deployment always ships a config.
            None => (
                HashMap::new(),
                Settings {
                    allow_bombs: true,
                    ..Settings::default()
                },
            ),
        };
        Ok(Self { channels, fallback })
    }
}

impl SettingsSource for FileSettings {
    fn settings_for(&self, channel: &Channel) -> Settings {
        self.channels
            .get(channel)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
