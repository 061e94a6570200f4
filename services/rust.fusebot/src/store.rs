use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use bot_modules_timebomb::{HistoryRecord, HistoryStore};
use fusecore::{Channel, Error};

/// Bomb history persisted as one JSON file mapping channel names to
/// their record lists. Read-modify-write under a lock; the limiter
/// already tolerates a store that fails, so errors just propagate.
pub struct JsonHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

type FileMap = HashMap<String, Vec<HistoryRecord>>;

impl JsonHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<FileMap, Error> {
        if !self.path.exists() {
            return Ok(FileMap::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self, channel: &Channel) -> Result<Vec<HistoryRecord>, Error> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let map = self.read_map()?;
        Ok(map.get(channel.as_str()).cloned().unwrap_or_default())
    }

    fn save(&self, channel: &Channel, records: &[HistoryRecord]) -> Result<(), Error> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut map = self.read_map()?;
        map.insert(channel.as_str().to_string(), records.to_vec());
        std::fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}
