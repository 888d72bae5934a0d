//! Store implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, warn};

use pokedex_types::CollectionEnvelope;

use crate::error::{Error, Result};

/// Whole-collection persistence for resolved records.
///
/// Implementations keep exactly one [`CollectionEnvelope`]. Every operation
/// works on the whole collection; there is no per-record access. Callers that
/// read, modify and write back must serialize those sequences themselves.
pub trait CacheStore: Send + Sync {
    /// Read the persisted envelope.
    ///
    /// Never fails: a missing, unreadable or corrupt store is reset to
    /// [`CollectionEnvelope::default`], which is persisted and returned.
    fn load(&self) -> CollectionEnvelope;

    /// Overwrite the persisted envelope.
    fn save(&self, envelope: &CollectionEnvelope) -> Result<()>;

    /// Reset to the empty envelope.
    fn clear(&self) -> Result<()> {
        self.save(&CollectionEnvelope::default())
    }

    /// Whether the persisted collection holds any records.
    ///
    /// Read errors are treated as "not populated".
    fn is_populated(&self) -> bool;
}

/// File-backed store holding the envelope as a single pretty-printed JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open or create a store at the given path.
    ///
    /// Parent directories are created as needed, and an empty envelope is
    /// written if no file exists yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let store = Self {
            path: path.to_path_buf(),
        };

        if !path.exists() {
            info!("Creating store file at {}", path.display());
            store.save(&CollectionEnvelope::default())?;
        } else {
            info!("Opening store file at {}", path.display());
        }

        Ok(store)
    }

    /// Open the default store location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_store_path())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<CollectionEnvelope> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_atomic(&self, content: &str) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| Error::Write {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> CollectionEnvelope {
        match self.read() {
            Ok(envelope) => {
                debug!("Loaded {} records from {}", envelope.data.len(), self.path.display());
                envelope
            }
            Err(e) => {
                warn!(
                    "Store at {} is unreadable ({}), reinitializing",
                    self.path.display(),
                    e
                );
                let fresh = CollectionEnvelope::default();
                if let Err(e) = self.save(&fresh) {
                    warn!("Failed to reinitialize store: {}", e);
                }
                fresh
            }
        }
    }

    fn save(&self, envelope: &CollectionEnvelope) -> Result<()> {
        let content = serde_json::to_string_pretty(envelope)?;
        self.write_atomic(&content)?;
        debug!("Saved {} records to {}", envelope.data.len(), self.path.display());
        Ok(())
    }

    fn is_populated(&self) -> bool {
        self.read().map(|e| !e.data.is_empty()).unwrap_or(false)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    envelope: Mutex<CollectionEnvelope>,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with an envelope.
    pub fn with_envelope(envelope: CollectionEnvelope) -> Self {
        Self {
            envelope: Mutex::new(envelope),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful saves (including clears).
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> CollectionEnvelope {
        self.envelope
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save(&self, envelope: &CollectionEnvelope) -> Result<()> {
        *self
            .envelope
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = envelope.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_populated(&self) -> bool {
        !self
            .envelope
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .data
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokedex_types::{DEFAULT_SPRITE_BASE_URL, DetailRecord, sprite_url};

    fn create_test_record(id: u32, name: &str) -> DetailRecord {
        let mut record = DetailRecord::stub(id, name, sprite_url(DEFAULT_SPRITE_BASE_URL, id));
        record.types = vec!["grass".to_string()];
        record
    }

    fn populated_envelope() -> CollectionEnvelope {
        let mut envelope = CollectionEnvelope::default();
        envelope.upsert(create_test_record(1, "bulbasaur"));
        envelope.upsert(create_test_record(2, "ivysaur"));
        envelope
    }

    #[test]
    fn test_open_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pokemon_data.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.load(), CollectionEnvelope::default());
        assert!(!store.is_populated());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).unwrap();

        let envelope = populated_envelope();
        store.save(&envelope).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, envelope);
        assert_eq!(loaded.total, 2);
        assert!(store.is_populated());
    }

    #[test]
    fn test_saved_file_is_pretty_camel_case_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.save(&populated_envelope()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains('\n'));
        assert!(content.contains("\"hasMore\""));
        assert!(content.contains("\"imageUrl\""));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::open(&path).unwrap();
        std::fs::write(&path, "{ this is not json").unwrap();

        assert!(!store.is_populated());
        let loaded = store.load();
        assert_eq!(loaded, CollectionEnvelope::default());
        assert!(!store.is_populated());

        // The healed envelope was written back
        let content = std::fs::read_to_string(&path).unwrap();
        let on_disk: CollectionEnvelope = serde_json::from_str(&content).unwrap();
        assert_eq!(on_disk, CollectionEnvelope::default());
    }

    #[test]
    fn test_missing_file_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(store.load(), CollectionEnvelope::default());
        assert!(path.exists());
    }

    #[test]
    fn test_clear_resets_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).unwrap();
        store.save(&populated_envelope()).unwrap();

        store.clear().unwrap();
        assert_eq!(store.load(), CollectionEnvelope::default());
        assert!(!store.is_populated());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(!store.is_populated());

        store.save(&populated_envelope()).unwrap();
        assert!(store.is_populated());
        assert_eq!(store.load().data.len(), 2);

        store.clear().unwrap();
        assert!(!store.is_populated());
        assert_eq!(store.save_count(), 2);
    }
}
