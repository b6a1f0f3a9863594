use crate::defaults;
use crate::error::StorageError;
use crate::vfs::{FileRecord, Registry};
use crate::workspace::{ContentOverrides, Workspace};
use std::cell::RefCell;
use std::collections::HashMap;

pub const FILES_KEY: &str = "portfolio-ide:files";
pub const OVERRIDES_KEY: &str = "portfolio-ide:overrides";

/// String key/value backend. The browser build writes to
/// `window.localStorage`; tests use [`MemoryStore`].
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    inner: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Result<Self, StorageError> {
        let inner = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)?;
        Ok(LocalStorage { inner })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner
            .get_item(key)
            .map_err(|_| StorageError::Unavailable)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner
            .set_item(key, value)
            .map_err(|_| StorageError::Write(key.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner
            .remove_item(key)
            .map_err(|_| StorageError::Write(key.to_string()))
    }
}

/// Loads the workspace from storage and writes it back after mount.
///
/// Nothing is written before [`PersistenceBridge::mount`]: the first render
/// hydrates from storage and must not clobber it with defaults.
pub struct PersistenceBridge<S: KeyValueStore> {
    store: S,
    mounted: bool,
    saved_revision: Option<u64>,
}

impl<S: KeyValueStore> PersistenceBridge<S> {
    pub fn new(store: S) -> Self {
        PersistenceBridge {
            store,
            mounted: false,
            saved_revision: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mount(&mut self) {
        self.mounted = true;
        self.saved_revision = None;
        tracing::debug!("persistence mounted");
    }

    fn read_records(&self) -> Result<Option<Vec<FileRecord>>, StorageError> {
        match self.store.get(FILES_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn read_overrides(&self) -> Result<ContentOverrides, StorageError> {
        match self.store.get(OVERRIDES_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(ContentOverrides::new()),
        }
    }

    /// Hydrate a workspace. Missing or unreadable data falls back to the
    /// default tree; the protected files are always present afterwards.
    pub fn load(&self) -> Workspace {
        let registry = match self.read_records() {
            Ok(Some(records)) => Registry::from_records(records),
            Ok(None) => {
                tracing::debug!("no stored files, using defaults");
                defaults::default_registry()
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored files unreadable, using defaults");
                defaults::default_registry()
            }
        };
        let overrides = self.read_overrides().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored overrides unreadable, discarding");
            ContentOverrides::new()
        });
        let mut workspace = Workspace::new(registry, overrides);
        workspace.restore_anchors();
        tracing::info!(files = workspace.registry().len(), "workspace loaded");
        workspace
    }

    /// Write the workspace if mounted and changed since the last save.
    /// Returns whether anything was written.
    pub fn save(&mut self, workspace: &Workspace) -> Result<bool, StorageError> {
        if !self.mounted || self.saved_revision == Some(workspace.revision()) {
            return Ok(false);
        }
        let files = serde_json::to_string(workspace.registry().records())?;
        let overrides = serde_json::to_string(workspace.overrides())?;
        self.store.set(FILES_KEY, &files)?;
        self.store.set(OVERRIDES_KEY, &overrides)?;
        self.saved_revision = Some(workspace.revision());
        tracing::debug!(revision = workspace.revision(), "workspace saved");
        Ok(true)
    }

    /// Drop the stored workspace so the next load starts from defaults.
    pub fn forget(&mut self) -> Result<(), StorageError> {
        self.store.remove(FILES_KEY)?;
        self.store.remove(OVERRIDES_KEY)?;
        self.saved_revision = None;
        tracing::info!("stored workspace cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_storage_loads_defaults() {
        let bridge = PersistenceBridge::new(MemoryStore::new());
        let ws = bridge.load();
        assert!(ws.registry().is_file("/about.md"));
        assert!(ws.registry().is_file("/web/index.html"));
    }

    #[test]
    fn corrupt_storage_falls_back() {
        let store = MemoryStore::new();
        store.set(FILES_KEY, "{not json").unwrap();
        store.set(OVERRIDES_KEY, "[1,2]").unwrap();
        let ws = PersistenceBridge::new(&store).load();
        assert!(ws.registry().is_file("/README.md"));
        assert!(ws.overrides().is_empty());
    }

    #[test]
    fn nothing_written_before_mount() {
        let store = MemoryStore::new();
        let mut bridge = PersistenceBridge::new(&store);
        let ws = bridge.load();
        assert!(!bridge.save(&ws).unwrap());
        assert!(store.is_empty());
        bridge.mount();
        assert!(bridge.is_mounted());
        assert!(bridge.save(&ws).unwrap());
        assert!(!bridge.save(&ws).unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_anchor_is_restored_first() {
        let store = MemoryStore::new();
        let records = vec![FileRecord::new("/x.txt", "x")];
        store
            .set(FILES_KEY, &serde_json::to_string(&records).unwrap())
            .unwrap();
        let ws = PersistenceBridge::new(&store).load();
        let paths: Vec<&str> = ws
            .registry()
            .records()
            .iter()
            .map(|r| r.path.as_str())
            .collect();
        assert_eq!(paths, vec!["/about.md", "/README.md", "/x.txt"]);
    }

    #[test]
    fn forget_clears_keys() {
        let store = MemoryStore::new();
        let mut bridge = PersistenceBridge::new(&store);
        let ws = bridge.load();
        bridge.mount();
        bridge.save(&ws).unwrap();
        bridge.forget().unwrap();
        assert!(store.is_empty());
    }
}
