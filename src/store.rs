//! Record store: the in-memory collection and its durable mirror.
//!
//! The whole collection is the unit of persistence: every mutation
//! re-serializes it into the `screenAnalyses` entry before returning. An
//! empty collection removes the entry instead of storing `[]`.
//!
//! Storage backends implement [`Storage`], a minimal named-entry key/value
//! interface. `FileStorage` keeps one JSON file per entry under the app
//! data directory; `MemoryStorage` is for tests and throwaway sessions.

use crate::error::StoreError;
use crate::record::AnalysisRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the entry holding the serialized collection.
pub const STORAGE_KEY: &str = "screenAnalyses";

/// Named-entry durable storage.
pub trait Storage {
    /// Read an entry. `Ok(None)` means the entry does not exist.
    fn get_item(&self, key: &str) -> std::io::Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> std::io::Result<()>;
    /// Remove an entry. Removing a missing entry is not an error.
    fn remove_item(&mut self, key: &str) -> std::io::Result<()>;
}

// ── Backends ─────────────────────────────────────────────────────────

/// One `<key>.json` file per entry inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(self.entry_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        // Write-then-rename so a crash never leaves a half-written entry.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)
    }

    fn remove_item(&mut self, key: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Volatile storage backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> std::io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> std::io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Ordered collection of analysis records, newest first.
///
/// The store is the only writer of its storage entry.
pub struct RecordStore<S: Storage> {
    storage: S,
    records: Vec<AnalysisRecord>,
}

impl<S: Storage> RecordStore<S> {
    /// Open a store and load whatever the storage holds.
    ///
    /// Records persisted mid-analysis are moved to ERROR, since the call
    /// that owned them is gone.
    pub fn open(storage: S) -> Self {
        let mut store = Self {
            storage,
            records: Vec::new(),
        };
        store.load_all();

        let mut recovered = 0;
        for record in &mut store.records {
            if record.recover_interrupted() {
                recovered += 1;
            }
        }
        if recovered > 0 {
            log::warn!("[STORE] Recovered {} interrupted analyses", recovered);
            if let Err(e) = store.save_all() {
                log::error!("[STORE] Failed to persist recovered records: {}", e);
            }
        }
        store
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// A missing entry is an empty collection. An unreadable or corrupt
    /// entry is logged, removed, and treated as empty; it never blocks
    /// startup.
    pub fn load_all(&mut self) -> &[AnalysisRecord] {
        self.records = match self.storage.get_item(STORAGE_KEY) {
            Ok(None) => Vec::new(),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<AnalysisRecord>>(&raw) {
                Ok(records) => {
                    log::info!("[STORE] Loaded {} records", records.len());
                    records
                }
                Err(e) => {
                    log::warn!("[STORE] Discarding corrupt {} entry: {}", STORAGE_KEY, e);
                    if let Err(e) = self.storage.remove_item(STORAGE_KEY) {
                        log::error!("[STORE] Failed to remove corrupt entry: {}", e);
                    }
                    Vec::new()
                }
            },
            Err(e) => {
                log::warn!("[STORE] Failed to read {} entry: {}", STORAGE_KEY, e);
                Vec::new()
            }
        };
        sort_newest_first(&mut self.records);
        &self.records
    }

    /// Persist the full current collection. Empty removes the entry.
    pub fn save_all(&mut self) -> Result<(), StoreError> {
        write_collection(&mut self.storage, &self.records)
    }

    /// Add a record and re-sort. A record whose id is already present is
    /// rejected.
    pub fn insert(&mut self, record: AnalysisRecord) -> Result<(), StoreError> {
        if self.get(&record.id).is_some() {
            return Err(StoreError::DuplicateId(record.id));
        }
        log::info!("[STORE] Insert {} ({})", record.id, record.screen_name);
        self.commit(|records| {
            // New records go in front so ties on timestamp keep the newest first.
            records.insert(0, record);
            sort_newest_first(records);
        })
    }

    /// Apply `mutate` to the record with `id`. Returns whether it was found;
    /// the collection is persisted either way.
    pub fn update_by_id<F>(&mut self, id: &str, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut AnalysisRecord),
    {
        self.commit(|records| match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                mutate(record);
                true
            }
            None => {
                log::debug!("[STORE] Update skipped, no record {}", id);
                false
            }
        })
    }

    /// Remove the record with `id`. Returns whether it existed.
    pub fn delete_by_id(&mut self, id: &str) -> Result<bool, StoreError> {
        let removed = self.commit(|records| {
            let before = records.len();
            records.retain(|r| r.id != id);
            records.len() != before
        })?;
        if removed {
            log::info!("[STORE] Deleted {}", id);
        }
        Ok(removed)
    }

    /// Empty the collection; the entry is removed from storage.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        log::info!("[STORE] Clearing {} records", self.records.len());
        self.commit(|records| records.clear())
    }

    /// Apply `change` to a copy of the collection, write the copy, and only
    /// then make it current. A failed write leaves memory as it was.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Vec<AnalysisRecord>) -> T,
    ) -> Result<T, StoreError> {
        let mut candidate = self.records.clone();
        let out = change(&mut candidate);
        if let Err(e) = write_collection(&mut self.storage, &candidate) {
            log::error!("[STORE] Write failed, change discarded: {}", e);
            return Err(e);
        }
        self.records = candidate;
        Ok(out)
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&AnalysisRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give the storage back, e.g. to reopen it as after a restart.
    pub fn into_storage(self) -> S {
        self.storage
    }
}

fn write_collection<S: Storage>(
    storage: &mut S,
    records: &[AnalysisRecord],
) -> Result<(), StoreError> {
    if records.is_empty() {
        storage.remove_item(STORAGE_KEY)?;
        log::debug!("[STORE] Collection empty, entry removed");
        return Ok(());
    }
    let json = serde_json::to_string(records)?;
    storage.set_item(STORAGE_KEY, &json)?;
    log::debug!("[STORE] Saved {} records ({} bytes)", records.len(), json.len());
    Ok(())
}

fn sort_newest_first(records: &mut [AnalysisRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
