use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

pub const KEY_USERS: &str = "tasks_users";
pub const KEY_PROGRESS: &str = "tasks_progress";
pub const KEY_CURRENT_USER: &str = "tasks_current_user";

pub fn user_list_key(username: &str) -> String {
    format!("tasks_list_{username}")
}

/// Flat string-to-string storage that survives restarts. Everything the app
/// persists goes through this so the logic above it can run against an
/// in-memory fake in tests.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Reads a JSON-encoded value under `key`, falling back to the type's default
/// when the key is absent or holds text that no longer parses.
pub fn read_json<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key) {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(key, %err, "corrupt stored value, using default");
            T::default()
        }),
        None => T::default(),
    }
}

pub fn write_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(err) => error!(key, %err, "failed to encode value for storage"),
    }
}

/// All keys in a single JSON object file, rewritten on every mutation.
/// Load problems degrade to an empty map; persistence problems are logged
/// and the in-memory copy stays authoritative for the session.
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: PathBuf) -> Self {
        let entries = if Path::new(&path).exists() {
            match fs::read_to_string(&path) {
                Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
                    warn!(path = %path.display(), %err, "state file is corrupt, starting empty");
                    BTreeMap::new()
                }),
                Err(err) => {
                    warn!(path = %path.display(), %err, "state file is unreadable, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            debug!(path = %path.display(), "no state file yet");
            BTreeMap::new()
        };
        Self { path, entries }
    }

    fn persist(&self) {
        match serde_json::to_string_pretty(&self.entries) {
            Ok(data) => {
                if let Err(err) = fs::write(&self.path, data) {
                    error!(path = %self.path.display(), %err, "failed to save state");
                }
            }
            Err(err) => error!(%err, "failed to encode state"),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist();
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.persist();
        }
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_store_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = JsonFileStore::open(path.clone());
        store.set("tasks_current_user", "ana");
        store.set("tasks_progress", r#"{"2024-01-01_ana":[1]}"#);
        drop(store);

        let reopened = JsonFileStore::open(path);
        assert_eq!(reopened.get("tasks_current_user").as_deref(), Some("ana"));
        assert_eq!(
            reopened.get("tasks_progress").as_deref(),
            Some(r#"{"2024-01-01_ana":[1]}"#)
        );
    }

    #[test]
    fn remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = JsonFileStore::open(path.clone());
        store.set("tasks_current_user", "ana");
        store.remove("tasks_current_user");
        drop(store);

        let reopened = JsonFileStore::open(path);
        assert_eq!(reopened.get("tasks_current_user"), None);
    }

    #[test]
    fn corrupt_state_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json at all").unwrap();

        let store = JsonFileStore::open(path);
        assert_eq!(store.get("tasks_progress"), None);
    }

    #[test]
    fn read_json_defaults_on_corrupt_value() {
        let mut store = MemoryStore::default();
        store.set("tasks_users", "not-an-array");
        let users: Vec<String> = read_json(&store, "tasks_users");
        assert_eq!(users, Vec::<String>::new());
    }

    #[test]
    fn read_json_defaults_on_missing_key() {
        let store = MemoryStore::default();
        let progress: BTreeMap<String, Vec<u32>> = read_json(&store, "tasks_progress");
        assert!(progress.is_empty());
    }
}
