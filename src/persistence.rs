//! Save/load of the whole session and the append-only winner list.
//!
//! A session is stored as a single record under a fixed key. Loading merges
//! the saved fields over the current values, so a record written by an older
//! build with fewer fields still loads.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{economy::GameState, player::Player, zones::Zone};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is full: '{key}' needs {needed} bytes, limit is {limit}")]
    Full {
        key: String,
        needed: usize,
        limit: usize,
    },
}

/// Flat string key/value storage local to this machine.
pub trait Store: Send {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// One JSON file per key inside a directory. Writes go through a temporary
/// file and a rename so readers never see a half-written record.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Store for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process store, optionally with a per-value size limit to mimic a full
/// browser store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    limit: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            limit: Some(limit),
        }
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.limit {
            if value.len() > limit {
                return Err(StoreError::Full {
                    key: key.to_string(),
                    needed: value.len(),
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub state: GameState,
    pub player: Player,
    pub zones_config: Vec<Zone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub name: String,
    #[serde(alias = "date")]
    pub timestamp: DateTime<Utc>,
    pub money: u64,
    pub bricks_sold_total: u64,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no saved game found")]
    Missing,
    #[error("saved data is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SaveGateway {
    store: Box<dyn Store>,
    save_key: String,
    winners_key: String,
}

impl SaveGateway {
    pub fn new(
        store: Box<dyn Store>,
        save_key: impl Into<String>,
        winners_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            save_key: save_key.into(),
            winners_key: winners_key.into(),
        }
    }

    /// Overwrites the session record in one write.
    pub fn save(&mut self, record: &SaveRecord) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(record)
            .map_err(|err| PersistenceError::Corrupt(err.to_string()))?;
        self.store.write(&self.save_key, &json)?;
        Ok(())
    }

    /// Reads the session record and merges it over `current`. The caller's
    /// state is never touched; on error nothing is returned to apply.
    pub fn load(&self, current: &SaveRecord) -> Result<SaveRecord, PersistenceError> {
        let raw = self
            .store
            .read(&self.save_key)?
            .ok_or(PersistenceError::Missing)?;
        merge_record(current, &raw)
    }

    pub fn has_save(&self) -> Result<bool, PersistenceError> {
        Ok(self.store.read(&self.save_key)?.is_some())
    }

    /// Deletes the session record. The winner list is kept.
    pub fn clear(&mut self) -> Result<(), PersistenceError> {
        self.store.remove(&self.save_key)?;
        Ok(())
    }

    pub fn winners(&self) -> Result<Vec<WinnerRecord>, PersistenceError> {
        match self.store.read(&self.winners_key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| PersistenceError::Corrupt(format!("winner list: {err}"))),
            None => Ok(Vec::new()),
        }
    }

    /// Appends to the winner list and returns how many winners came before.
    pub fn append_winner(&mut self, winner: WinnerRecord) -> Result<usize, PersistenceError> {
        let mut winners = self.winners()?;
        let earlier = winners.len();
        winners.push(winner);
        let json = serde_json::to_string(&winners)
            .map_err(|err| PersistenceError::Corrupt(err.to_string()))?;
        self.store.write(&self.winners_key, &json)?;
        Ok(earlier)
    }
}

fn merge_record(current: &SaveRecord, raw: &str) -> Result<SaveRecord, PersistenceError> {
    let corrupt = |err: serde_json::Error| PersistenceError::Corrupt(err.to_string());

    let saved: Value = serde_json::from_str(raw).map_err(corrupt)?;
    let Value::Object(saved) = saved else {
        return Err(PersistenceError::Corrupt(
            "save record is not an object".into(),
        ));
    };

    let mut merged = serde_json::to_value(current).map_err(corrupt)?;
    for section in ["state", "player"] {
        match saved.get(section) {
            None | Some(Value::Null) => {}
            Some(Value::Object(fields)) => {
                if let Some(Value::Object(target)) = merged.get_mut(section) {
                    overlay(target, fields);
                }
            }
            Some(_) => {
                return Err(PersistenceError::Corrupt(format!(
                    "'{section}' is not an object"
                )))
            }
        }
    }
    if let Some(zones) = saved.get("zonesConfig").filter(|zones| !zones.is_null()) {
        merged["zonesConfig"] = zones.clone();
    }

    let record: SaveRecord = serde_json::from_value(merged).map_err(corrupt)?;
    if record.zones_config.is_empty() {
        return Err(PersistenceError::Corrupt(
            "saved zone list is empty".into(),
        ));
    }
    Ok(record)
}

fn overlay(target: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, value) in fields {
        target.insert(key.clone(), value.clone());
    }
}
