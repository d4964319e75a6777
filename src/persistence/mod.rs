//! Key-value persistence
//!
//! Everything the game keeps across restarts is a handful of string keys:
//! LocalStorage on web, an in-memory map natively and in tests.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// String-keyed store that survives process restarts (on web)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    /// Returns false if the write failed (quota, private mode, ...)
    fn set(&mut self, key: &str, value: &str) -> bool;
    fn remove(&mut self, key: &str);
}

/// In-memory store (native builds and tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        self.entries.insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStore {
    storage: Option<web_sys::Storage>,
}

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    pub fn new() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if storage.is_none() {
            log::warn!("LocalStorage unavailable, progress will not be saved");
        }
        Self { storage }
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok()?
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        match &self.storage {
            Some(storage) => storage.set_item(key, value).is_ok(),
            None => false,
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = &self.storage {
            let _ = storage.remove_item(key);
        }
    }
}

/// Read and parse a JSON value; missing or corrupt entries yield None
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let json = store.get(key)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring corrupt '{}': {}", key, e);
            None
        }
    }
}

/// Serialize and write a JSON value
pub fn save_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => {
            let ok = store.set(key, &json);
            if !ok {
                log::warn!("Failed to write '{}'", key);
            }
            ok
        }
        Err(e) => {
            log::warn!("Failed to serialize '{}': {}", key, e);
            false
        }
    }
}

/// Read an integer stored as plain text
pub fn load_int<T: std::str::FromStr>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    store.get(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.get("k").is_none());
        assert!(store.set("k", "v"));
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.remove("k");
        assert!(store.get("k").is_none());
    }

    #[test]
    fn test_corrupt_json_is_none() {
        let mut store = MemoryStore::new();
        store.set("bad", "{oops");
        assert!(load_json::<Vec<u32>>(&store, "bad").is_none());
    }

    #[test]
    fn test_load_int() {
        let mut store = MemoryStore::new();
        store.set("n", " 1200 ");
        store.set("junk", "12abc");
        assert_eq!(load_int::<u64>(&store, "n"), Some(1200));
        assert_eq!(load_int::<u64>(&store, "junk"), None);
        assert_eq!(load_int::<u64>(&store, "missing"), None);
    }
}
