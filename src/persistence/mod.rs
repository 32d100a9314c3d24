//! Key-value persistence for the high score and player settings
//!
//! Features:
//! - Small typed values (int / float / bool) behind a [`KeyValueStore`] trait
//! - In-memory store for tests and headless runs
//! - JSON file store (tmp → rename on flush)
//! - LocalStorage store on wasm32
//!
//! Reads never fail: a missing key yields the caller's default, a value of the
//! wrong type is logged and also yields the default.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The persisted keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKey {
    HighScore,
    MusicVolume,
    SFXVolume,
    MusicEnabled,
    SFXEnabled,
}

impl SettingsKey {
    /// Storage key string
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsKey::HighScore => "HighScore",
            SettingsKey::MusicVolume => "MusicVolume",
            SettingsKey::SFXVolume => "SFXVolume",
            SettingsKey::MusicEnabled => "MusicEnabled",
            SettingsKey::SFXEnabled => "SFXEnabled",
        }
    }
}

/// A stored value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Durable key-value storage
pub trait KeyValueStore {
    fn get(&self, key: SettingsKey) -> Option<StoredValue>;
    fn set(&mut self, key: SettingsKey, value: StoredValue);
    fn remove(&mut self, key: SettingsKey);
    /// Make pending writes durable
    fn flush(&mut self) -> io::Result<()>;
}

/// Read an integer, falling back to `default`
pub fn get_int(store: &dyn KeyValueStore, key: SettingsKey, default: i64) -> i64 {
    match store.get(key) {
        None => default,
        Some(StoredValue::Int(v)) => v,
        Some(other) => {
            log::warn!("Stored {} is {:?}, expected an integer", key.as_str(), other);
            default
        }
    }
}

/// Read a float, falling back to `default`. Integers are widened.
pub fn get_float(store: &dyn KeyValueStore, key: SettingsKey, default: f64) -> f64 {
    match store.get(key) {
        None => default,
        Some(StoredValue::Float(v)) => v,
        Some(StoredValue::Int(v)) => v as f64,
        Some(other) => {
            log::warn!("Stored {} is {:?}, expected a float", key.as_str(), other);
            default
        }
    }
}

/// Read a flag, falling back to `default`
pub fn get_bool(store: &dyn KeyValueStore, key: SettingsKey, default: bool) -> bool {
    match store.get(key) {
        None => default,
        Some(StoredValue::Bool(v)) => v,
        Some(other) => {
            log::warn!("Stored {} is {:?}, expected a bool", key.as_str(), other);
            default
        }
    }
}

type ValueMap = BTreeMap<String, StoredValue>;

/// Volatile store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: ValueMap,
    flushes: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `flush` was called
    pub fn flush_count(&self) -> u32 {
        self.flushes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: SettingsKey) -> Option<StoredValue> {
        self.values.get(key.as_str()).copied()
    }

    fn set(&mut self, key: SettingsKey, value: StoredValue) {
        self.values.insert(key.as_str().to_string(), value);
    }

    fn remove(&mut self, key: SettingsKey) {
        self.values.remove(key.as_str());
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// JSON object on disk
///
/// Writes are buffered until [`KeyValueStore::flush`], which writes a `.tmp`
/// sibling and renames it over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: ValueMap,
    dirty: bool,
}

impl JsonFileStore {
    /// Open (or start) a store at `path`
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and replaced on the next flush.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<ValueMap>(&json) {
                Ok(values) => {
                    log::info!("Loaded {} stored values from {}", values.len(), path.display());
                    values
                }
                Err(e) => {
                    log::warn!("Ignoring corrupt store {}: {}", path.display(), e);
                    ValueMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => ValueMap::new(),
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                ValueMap::new()
            }
        };
        Self {
            path,
            values,
            dirty: false,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: SettingsKey) -> Option<StoredValue> {
        self.values.get(key.as_str()).copied()
    }

    fn set(&mut self, key: SettingsKey, value: StoredValue) {
        self.values.insert(key.as_str().to_string(), value);
        self.dirty = true;
    }

    fn remove(&mut self, key: SettingsKey) {
        if self.values.remove(key.as_str()).is_some() {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        log::debug!("Flushed store to {}", self.path.display());
        Ok(())
    }
}

/// Browser LocalStorage, one entry per key holding a JSON value
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    storage: Option<web_sys::Storage>,
    prefix: String,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    pub fn new(prefix: &str) -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if storage.is_none() {
            log::warn!("LocalStorage unavailable, settings will not persist");
        }
        Self {
            storage,
            prefix: prefix.to_string(),
        }
    }

    fn item_key(&self, key: SettingsKey) -> String {
        format!("{}{}", self.prefix, key.as_str())
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: SettingsKey) -> Option<StoredValue> {
        let json = self.storage.as_ref()?.get_item(&self.item_key(key)).ok()??;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring stored {}: {}", key.as_str(), e);
                None
            }
        }
    }

    fn set(&mut self, key: SettingsKey, value: StoredValue) {
        let Some(storage) = &self.storage else { return };
        match serde_json::to_string(&value) {
            Ok(json) => {
                if storage.set_item(&self.item_key(key), &json).is_err() {
                    log::warn!("Failed to store {}", key.as_str());
                }
            }
            Err(e) => log::warn!("Failed to encode {}: {}", key.as_str(), e),
        }
    }

    fn remove(&mut self, key: SettingsKey) {
        if let Some(storage) = &self.storage {
            let _ = storage.remove_item(&self.item_key(key));
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        // LocalStorage writes are synchronous
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fruit-drop-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_key_returns_default() {
        let store = MemoryStore::new();
        assert_eq!(get_int(&store, SettingsKey::HighScore, 7), 7);
        assert_eq!(get_float(&store, SettingsKey::MusicVolume, 0.5), 0.5);
        assert!(get_bool(&store, SettingsKey::SFXEnabled, true));
    }

    #[test]
    fn test_type_mismatch_returns_default() {
        let mut store = MemoryStore::new();
        store.set(SettingsKey::HighScore, StoredValue::Bool(true));
        store.set(SettingsKey::MusicEnabled, StoredValue::Float(1.0));
        store.set(SettingsKey::SFXVolume, StoredValue::Int(1));
        assert_eq!(get_int(&store, SettingsKey::HighScore, 3), 3);
        assert!(!get_bool(&store, SettingsKey::MusicEnabled, false));
        // Integers widen to floats
        assert_eq!(get_float(&store, SettingsKey::SFXVolume, 0.2), 1.0);
    }

    #[test]
    fn test_remove() {
        let mut store = MemoryStore::new();
        store.set(SettingsKey::HighScore, StoredValue::Int(10));
        store.remove(SettingsKey::HighScore);
        assert_eq!(store.get(SettingsKey::HighScore), None);
    }

    #[test]
    fn test_stored_value_json_shape() {
        assert_eq!(serde_json::to_string(&StoredValue::Int(5)).expect("json"), "5");
        assert_eq!(serde_json::from_str::<StoredValue>("0.25").expect("json"), StoredValue::Float(0.25));
        assert_eq!(serde_json::from_str::<StoredValue>("false").expect("json"), StoredValue::Bool(false));
        assert_eq!(serde_json::from_str::<StoredValue>("42").expect("json"), StoredValue::Int(42));
    }

    #[test]
    fn test_file_store_persists_after_flush() {
        let path = temp_path("persist");
        let _ = fs::remove_file(&path);

        let mut store = JsonFileStore::open(&path);
        store.set(SettingsKey::HighScore, StoredValue::Int(1200));
        store.set(SettingsKey::MusicVolume, StoredValue::Float(0.25));
        // Nothing on disk before the flush
        assert!(!path.exists());
        store.flush().expect("flush");
        assert!(!store.tmp_path().exists());

        let reopened = JsonFileStore::open(&path);
        assert_eq!(get_int(&reopened, SettingsKey::HighScore, 0), 1200);
        assert_eq!(get_float(&reopened, SettingsKey::MusicVolume, 0.0), 0.25);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").expect("write");
        let store = JsonFileStore::open(&path);
        assert_eq!(store.get(SettingsKey::HighScore), None);
        let _ = fs::remove_file(&path);
    }
}
