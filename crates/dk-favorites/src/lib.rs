//! Persisted favorite tools
//!
//! The favorite set is an insertion-ordered, deduplicated list of tool ids
//! stored as one JSON array under a single storage key. Every mutation that
//! actually changes the set is written through immediately and announced to
//! listeners; no-op calls stay silent.
//!
//! Storage problems never escape this crate: a missing or corrupt value loads
//! as an empty set and failed writes are logged.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use dk_core::listeners::{ListenerId, ListenerSet};
use dk_core::{Error, KeyValueStore, Result};

/// Storage key holding the JSON array of favorite ids
pub const FAVORITES_KEY: &str = "devkit.favorites";

/// What changed in the favorite set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChangeKind {
    Added,
    Removed,
    Cleared,
    Imported,
}

/// Notification delivered to favorite listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteChange {
    pub kind: FavoriteChangeKind,
    /// The id that was added or removed; `None` for bulk changes
    pub tool_id: Option<String>,
    /// The full set after the change
    pub favorites: Vec<String>,
}

/// Favorite tool ids with write-through persistence
pub struct FavoriteStore {
    storage: Arc<dyn KeyValueStore>,
    favorites: Mutex<Vec<String>>,
    listeners: ListenerSet<FavoriteChange>,
}

impl FavoriteStore {
    /// Create a store and load the persisted set
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let favorites = load(storage.as_ref());
        debug!("Loaded {} favorites", favorites.len());
        Self {
            storage,
            favorites: Mutex::new(favorites),
            listeners: ListenerSet::new("favorites"),
        }
    }

    /// Add a tool id; returns false if it was already a favorite
    pub fn add_favorite(&self, tool_id: &str) -> bool {
        let snapshot = {
            let mut favorites = self.lock();
            if favorites.iter().any(|id| id == tool_id) {
                return false;
            }
            favorites.push(tool_id.to_string());
            self.persist(&favorites);
            favorites.clone()
        };
        self.notify(FavoriteChangeKind::Added, Some(tool_id), snapshot);
        true
    }

    /// Remove a tool id; returns false if it was not a favorite
    pub fn remove_favorite(&self, tool_id: &str) -> bool {
        let snapshot = {
            let mut favorites = self.lock();
            let before = favorites.len();
            favorites.retain(|id| id != tool_id);
            if favorites.len() == before {
                return false;
            }
            self.persist(&favorites);
            favorites.clone()
        };
        self.notify(FavoriteChangeKind::Removed, Some(tool_id), snapshot);
        true
    }

    /// Flip membership and return the new state
    pub fn toggle_favorite(&self, tool_id: &str) -> bool {
        if self.is_favorite(tool_id) {
            self.remove_favorite(tool_id);
            false
        } else {
            self.add_favorite(tool_id);
            true
        }
    }

    pub fn is_favorite(&self, tool_id: &str) -> bool {
        self.lock().iter().any(|id| id == tool_id)
    }

    /// Favorite ids in the order they were added
    pub fn favorites(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Remove every favorite; notifies only if the set was non-empty
    pub fn clear_all(&self) {
        {
            let mut favorites = self.lock();
            if favorites.is_empty() {
                return;
            }
            favorites.clear();
            self.persist(&favorites);
        }
        self.notify(FavoriteChangeKind::Cleared, None, Vec::new());
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&FavoriteChange) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Serialize the full set as a JSON array
    pub fn export_favorites(&self) -> String {
        let favorites = self.favorites();
        serde_json::to_string(&favorites).unwrap_or_else(|e| {
            warn!("Failed to serialize favorites: {}", e);
            "[]".to_string()
        })
    }

    /// Replace the whole set from a JSON array produced by
    /// [`export_favorites`](Self::export_favorites).
    ///
    /// Duplicates are dropped. Returns the resulting number of favorites.
    pub fn import_favorites(&self, data: &str) -> Result<usize> {
        let ids: Vec<String> = serde_json::from_str(data)
            .map_err(|e| Error::invalid_argument(format!("favorites must be a JSON array of ids: {}", e)))?;
        let imported = dedupe(ids);

        let (changed, count) = {
            let mut favorites = self.lock();
            let changed = *favorites != imported;
            if changed {
                *favorites = imported.clone();
                self.persist(&favorites);
            }
            (changed, favorites.len())
        };

        if changed {
            self.notify(FavoriteChangeKind::Imported, None, imported);
        }
        Ok(count)
    }

    /// Call with the favorites lock released
    fn notify(&self, kind: FavoriteChangeKind, tool_id: Option<&str>, favorites: Vec<String>) {
        let change = FavoriteChange {
            kind,
            tool_id: tool_id.map(str::to_string),
            favorites,
        };
        self.listeners.notify(&change);
    }

    /// Call with the favorites lock held so writes land in mutation order
    fn persist(&self, favorites: &[String]) {
        let result = serde_json::to_string(favorites)
            .map_err(Error::from)
            .and_then(|json| self.storage.set(FAVORITES_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist favorites: {}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.favorites.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load(storage: &dyn KeyValueStore) -> Vec<String> {
    let raw = match storage.get(FAVORITES_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Failed to read favorites: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(ids) => dedupe(ids),
        Err(e) => {
            warn!("Discarding corrupt favorites data: {}", e);
            Vec::new()
        }
    }
}

fn dedupe(ids: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk_core::MemoryStore;

    fn store() -> (Arc<MemoryStore>, FavoriteStore) {
        let storage = Arc::new(MemoryStore::new());
        let favorites = FavoriteStore::new(storage.clone());
        (storage, favorites)
    }

    fn recorder(store: &FavoriteStore) -> Arc<Mutex<Vec<FavoriteChange>>> {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        store.add_listener(move |change| {
            sink.lock().unwrap().push(change.clone());
            Ok(())
        });
        changes
    }

    #[test]
    fn test_add_persists_and_notifies() {
        let (storage, favorites) = store();
        let changes = recorder(&favorites);

        assert!(favorites.add_favorite("base64-encoder"));
        assert!(!favorites.add_favorite("base64-encoder"));

        assert_eq!(favorites.count(), 1);
        assert_eq!(
            storage.get(FAVORITES_KEY).unwrap().as_deref(),
            Some(r#"["base64-encoder"]"#)
        );
        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    /// Store whose first write stalls, so a later write can overtake it
    struct SlowFirstWrite {
        inner: MemoryStore,
        writes: std::sync::atomic::AtomicUsize,
    }

    impl KeyValueStore for SlowFirstWrite {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_concurrent_writes_persist_latest_set() {
        let storage = Arc::new(SlowFirstWrite {
            inner: MemoryStore::new(),
            writes: std::sync::atomic::AtomicUsize::new(0),
        });
        let favorites = Arc::new(FavoriteStore::new(storage.clone()));

        let first = {
            let favorites = Arc::clone(&favorites);
            std::thread::spawn(move || favorites.add_favorite("a"))
        };
        // let the first writer reach the slow write
        std::thread::sleep(std::time::Duration::from_millis(20));
        let second = {
            let favorites = Arc::clone(&favorites);
            std::thread::spawn(move || favorites.add_favorite("b"))
        };
        assert!(first.join().unwrap());
        assert!(second.join().unwrap());

        assert_eq!(favorites.favorites(), vec!["a", "b"]);
        assert_eq!(
            storage.get(FAVORITES_KEY).unwrap().as_deref(),
            Some(r#"["a","b"]"#)
        );
    }

    #[test]
    fn test_noop_remove_is_silent() {
        let (_, favorites) = store();
        let changes = recorder(&favorites);

        assert!(!favorites.remove_favorite("missing"));
        favorites.clear_all();

        assert!(changes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let (_, favorites) = store();
        favorites.add_favorite("url-encoder");
        let changes = recorder(&favorites);

        assert!(favorites.toggle_favorite("regex-tester"));
        assert!(!favorites.toggle_favorite("regex-tester"));

        assert_eq!(favorites.favorites(), vec!["url-encoder"]);
        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, FavoriteChangeKind::Added);
        assert_eq!(changes[0].favorites, vec!["url-encoder", "regex-tester"]);
        assert_eq!(changes[1].kind, FavoriteChangeKind::Removed);
        assert_eq!(changes[1].tool_id.as_deref(), Some("regex-tester"));
        assert_eq!(changes[1].favorites, vec!["url-encoder"]);
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(FAVORITES_KEY, "{\"oops\":").unwrap();

        let favorites = FavoriteStore::new(storage);
        assert_eq!(favorites.count(), 0);
        assert!(favorites.add_favorite("a"));
    }

    #[test]
    fn test_load_dedupes_persisted_ids() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(FAVORITES_KEY, r#"["a","b","a"]"#).unwrap();

        let favorites = FavoriteStore::new(storage);
        assert_eq!(favorites.favorites(), vec!["a", "b"]);
    }

    #[test]
    fn test_export_import_round_trip() {
        let (_, favorites) = store();
        favorites.add_favorite("hash-generator");
        favorites.add_favorite("json-formatter");
        let changes = recorder(&favorites);

        let exported = favorites.export_favorites();
        assert_eq!(favorites.import_favorites(&exported).unwrap(), 2);

        assert_eq!(favorites.favorites(), vec!["hash-generator", "json-formatter"]);
        assert!(changes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_import_replaces_set() {
        let (storage, favorites) = store();
        favorites.add_favorite("old");
        let changes = recorder(&favorites);

        assert_eq!(favorites.import_favorites(r#"["x","y","x"]"#).unwrap(), 2);
        assert!(!favorites.is_favorite("old"));
        assert_eq!(changes.lock().unwrap()[0].kind, FavoriteChangeKind::Imported);

        let reloaded = FavoriteStore::new(storage);
        assert_eq!(reloaded.favorites(), vec!["x", "y"]);
    }

    #[test]
    fn test_import_rejects_non_array() {
        let (_, favorites) = store();
        favorites.add_favorite("keep");

        assert!(favorites.import_favorites(r#"{"ids":[]}"#).is_err());
        assert!(favorites.is_favorite("keep"));
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let (_, favorites) = store();
        favorites.add_listener(|_| anyhow::bail!("view crashed"));
        let changes = recorder(&favorites);

        favorites.add_favorite("a");
        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_listener_stops_notifications() {
        let (_, favorites) = store();
        let changes = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&changes);
        let id = favorites.add_listener(move |_| {
            *sink.lock().unwrap() += 1;
            Ok(())
        });

        favorites.add_favorite("a");
        assert!(favorites.remove_listener(id));
        favorites.add_favorite("b");

        assert_eq!(*changes.lock().unwrap(), 1);
    }
}
