use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{AccessGate, Cart, LegInput, PersonalStats};

pub const SESSION_KEY: &str = "income_probe_data";
pub const ACCESS_KEY: &str = "access_code";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode session snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// String-valued key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_error(key: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(key, e))?;
        fs::write(self.path_for(key), value).map_err(|e| io_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub personal_stats: PersonalStats,
    pub legs: Vec<LegInput>,
    pub cart: Cart,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            personal_stats: PersonalStats::default(),
            legs: default_legs(),
            cart: Cart::new(),
        }
    }
}

impl SessionSnapshot {
    /// Zeroes every figure and empties the cart, keeping leg ids and names.
    pub fn reset(&mut self) {
        self.personal_stats = PersonalStats::default();
        self.cart.clear();
        for leg in &mut self.legs {
            leg.current_gsv = 0.0;
            leg.target_gsv = 0.0;
            leg.flex_points = None;
            leg.flex_reload_date = None;
        }
    }

    pub fn next_leg_id(&self) -> u32 {
        self.legs.iter().map(|leg| leg.id).max().unwrap_or(0) + 1
    }
}

pub fn default_legs() -> Vec<LegInput> {
    vec![
        LegInput::new(1, "Leg 1 (Leader)", 35_000.0, 40_000.0),
        LegInput::new(2, "Leg 2 (Leader)", 28_000.0, 30_000.0),
        LegInput::new(3, "Leg 3 (Leader)", 8_000.0, 10_000.0),
        LegInput::new(4, "Brand Rep 4", 1_500.0, 2_000.0),
        LegInput::new(5, "Brand Rep 5", 1_800.0, 2_000.0),
        LegInput::new(6, "Brand Rep 6", 500.0, 2_000.0),
    ]
}

/// Missing or corrupt data falls back to defaults.
pub fn load_snapshot(store: &dyn KeyValueStore) -> SessionSnapshot {
    let raw = match store.get(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SessionSnapshot::default(),
        Err(e) => {
            tracing::warn!("could not read saved session, using defaults: {e}");
            return SessionSnapshot::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("saved session is corrupt, using defaults: {e}");
            SessionSnapshot::default()
        }
    }
}

pub fn save_snapshot(
    store: &dyn KeyValueStore,
    snapshot: &SessionSnapshot,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(snapshot)?;
    store.set(SESSION_KEY, &json)?;
    tracing::debug!(legs = snapshot.legs.len(), cart = snapshot.cart.len(), "session saved");
    Ok(())
}

pub fn reset_session(
    store: &dyn KeyValueStore,
    snapshot: &mut SessionSnapshot,
) -> Result<(), StoreError> {
    snapshot.reset();
    store.remove(SESSION_KEY)
}

/// Checks `input` against the gate and remembers it on success.
pub fn unlock(
    store: &dyn KeyValueStore,
    gate: &AccessGate,
    input: &str,
    today: NaiveDate,
) -> Result<bool, StoreError> {
    match gate.check(input, today) {
        Some(code) => {
            store.set(ACCESS_KEY, &code)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Re-validates a remembered code, dropping it once it has expired.
pub fn restore_access(
    store: &dyn KeyValueStore,
    gate: &AccessGate,
    today: NaiveDate,
) -> Result<bool, StoreError> {
    let Some(saved) = store.get(ACCESS_KEY)? else {
        return Ok(false);
    };
    if gate.accepts(&saved, today) {
        return Ok(true);
    }
    tracing::info!("saved access code expired, clearing it");
    store.remove(ACCESS_KEY)?;
    Ok(false)
}
