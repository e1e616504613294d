//! Persisted collection store.
//!
//! Each collection lives in one named slot of a key-value backend as a JSON
//! array. Reads return the whole ordered list, writes replace it. Mutations go
//! through [`CollectionStore::update`], which holds a per-key lock for the full
//! read-modify-write cycle so writers on the same store never interleave.

use crate::error::StoreError;
use crate::models::{Appointment, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Canonical slot names. Every call site uses these.
pub mod keys {
    pub const APPOINTMENTS: &str = "@MedicalApp:appointments";
    pub const USERS: &str = "@MedicalApp:users";
    /// Older builds wrote appointments here. Only read by the migration.
    pub const LEGACY_APPOINTMENTS: &str = "appointments";
}

/// Raw string slots keyed by name.
pub trait KeyValueBackend: Send + Sync {
    /// `Ok(None)` when the slot has never been written.
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    /// Replace the slot. Readers see either the old or the new value.
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// In-process backend, used by tests and the demo.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot with raw text, bypassing serialization.
    pub fn with_slot(self, key: &str, raw: &str) -> Self {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), raw.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of writes performed since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueBackend for MemoryBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a data directory.
///
/// Writes go to a sibling temp file which is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileBackend { dir: dir.into() }
    }

    /// Map a slot name to a file name. Anything outside `[A-Za-z0-9_-]`
    /// becomes `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl KeyValueBackend for FileBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Records that carry a stable identifier, used when merging slots.
pub trait Record {
    fn record_id(&self) -> &str;
}

impl Record for Appointment {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for User {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Outcome of an [`CollectionStore::update`] closure.
#[derive(Debug)]
pub enum Change<R> {
    /// Persist the modified collection, then return the value.
    Commit(R),
    /// Leave the slot untouched.
    Discard(R),
}

/// Typed access to JSON-array slots of a backend.
pub struct CollectionStore<B: KeyValueBackend> {
    backend: B,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<B: KeyValueBackend> CollectionStore<B> {
    pub fn new(backend: B) -> Self {
        CollectionStore {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Load the stored list, or an empty one if the slot was never written.
    ///
    /// Unreadable or malformed slots are an error, not an empty list.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let raw = self.backend.read(key).map_err(|source| StoreError::Read {
            key: key.to_string(),
            source,
        })?;
        match raw {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Like [`load`](Self::load) but degrades any failure to an empty list.
    pub fn load_or_empty<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.load(key) {
            Ok(items) => items,
            Err(error) => {
                warn!(key, %error, "treating unreadable slot as empty");
                Vec::new()
            }
        }
    }

    /// Serialize and replace the whole slot.
    pub fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_unlocked(key, items)
    }

    fn write_unlocked<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let rendered = serde_json::to_string(items).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend
            .write(key, &rendered)
            .map_err(|source| StoreError::Write {
                key: key.to_string(),
                source,
            })?;
        debug!(key, records = items.len(), "slot saved");
        Ok(())
    }

    /// Read-modify-write under the slot's lock.
    ///
    /// The closure must not touch the same slot through this store.
    pub fn update<T, R, E, F>(&self, key: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce(&mut Vec<T>) -> Result<Change<R>, E>,
    {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut items: Vec<T> = self.load(key)?;
        match f(&mut items)? {
            Change::Commit(value) => {
                self.write_unlocked(key, &items)?;
                Ok(value)
            }
            Change::Discard(value) => Ok(value),
        }
    }

    /// Append the incoming records whose id is not already stored.
    ///
    /// Existing records win; incoming order is preserved. Returns how many
    /// records were added. Nothing is written when none are new.
    pub fn merge<T>(&self, key: &str, incoming: Vec<T>) -> Result<usize, StoreError>
    where
        T: Record + Serialize + DeserializeOwned,
    {
        self.update(key, |items: &mut Vec<T>| {
            let mut seen: HashSet<String> =
                items.iter().map(|r| r.record_id().to_string()).collect();
            let before = items.len();
            for record in incoming {
                if seen.insert(record.record_id().to_string()) {
                    items.push(record);
                }
            }
            let added = items.len() - before;
            Ok::<_, StoreError>(if added > 0 {
                Change::Commit(added)
            } else {
                Change::Discard(0)
            })
        })
    }

    /// Fold the legacy appointments slot into the canonical one and drop it.
    pub fn migrate_legacy_appointments(&self) -> Result<usize, StoreError> {
        let legacy: Vec<Appointment> = self.load(keys::LEGACY_APPOINTMENTS)?;
        if legacy.is_empty() {
            return Ok(0);
        }
        let found = legacy.len();
        let added = self.merge(keys::APPOINTMENTS, legacy)?;
        self.backend
            .remove(keys::LEGACY_APPOINTMENTS)
            .map_err(|source| StoreError::Write {
                key: keys::LEGACY_APPOINTMENTS.to_string(),
                source,
            })?;
        info!(found, added, "migrated legacy appointments slot");
        Ok(added)
    }
}
