// crates/cy-dictionary-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Entry Store
// Description: Mutex-guarded entry persistence for tests and local runs.
// Purpose: Provide a deterministic persistence port without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryEntryPersistence`] keeps entries in a map guarded by a mutex and
//! enforces the english-phrase uniqueness constraint exactly like a durable
//! store would, reporting it as an integrity violation with the constraint
//! name. It is not intended for production use; contents vanish on restart.
//! [`SharedEntryPersistence`] wraps any port in a clonable `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::DictionaryEntry;
use crate::core::ENGLISH_PHRASE_UNIQUE_CONSTRAINT;
use crate::core::EntryId;
use crate::core::EntryPage;
use crate::core::EntryWrite;
use crate::core::PageRequest;
use crate::core::UploadRecord;
use crate::core::UploadVersionId;
use crate::core::WriteTarget;
use crate::interfaces::EntryPersistence;
use crate::interfaces::PersistenceError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable store state.
#[derive(Debug, Default)]
struct StoreState {
    /// Entries keyed by raw entry id.
    entries: BTreeMap<u64, DictionaryEntry>,
    /// Raw entry id keyed by english phrase.
    phrase_index: BTreeMap<String, u64>,
    /// Last issued entry id.
    last_entry_id: u64,
    /// Last issued upload version id.
    last_version_id: u64,
}

impl StoreState {
    /// Returns the id of the entry holding `phrase`, if any.
    fn id_for_phrase(&self, phrase: &str) -> Option<u64> {
        self.phrase_index.get(phrase).copied()
    }

    /// Stores `entry`, moving its index key when the phrase changed.
    fn put_entry(&mut self, entry: DictionaryEntry) {
        let id = entry.id.get();
        let phrase = entry.english_phrase.clone();
        if let Some(previous) = self.entries.insert(id, entry)
            && previous.english_phrase != phrase
        {
            self.phrase_index.remove(&previous.english_phrase);
        }
        self.phrase_index.insert(phrase, id);
    }

    /// Issues the next upload record.
    fn next_upload(&mut self, write: &EntryWrite) -> Result<UploadRecord, PersistenceError> {
        self.last_version_id += 1;
        let version_id = UploadVersionId::from_raw(self.last_version_id)
            .ok_or_else(|| PersistenceError::Store("upload version id overflow".to_string()))?;
        Ok(UploadRecord {
            version_id,
            uploaded_at: write.upload.uploaded_at,
            uploaded_by: write.upload.uploaded_by.clone(),
        })
    }
}

/// In-memory entry persistence for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEntryPersistence {
    /// Store state protected by a mutex.
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryEntryPersistence {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, PersistenceError> {
        self.state
            .lock()
            .map_err(|_| PersistenceError::Store("entry store mutex poisoned".to_string()))
    }
}

impl EntryPersistence for InMemoryEntryPersistence {
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, PersistenceError> {
        let mut guard = self.lock()?;
        let holder = guard.id_for_phrase(&write.english_phrase);
        let id = match write.target {
            WriteTarget::Insert => {
                if holder.is_some() {
                    return Err(unique_violation(&write.english_phrase));
                }
                guard.last_entry_id += 1;
                EntryId::from_raw(guard.last_entry_id)
                    .ok_or_else(|| PersistenceError::Store("entry id overflow".to_string()))?
            }
            WriteTarget::Update(id) => {
                if !guard.entries.contains_key(&id.get()) {
                    return Err(PersistenceError::NotFound(format!("entry {id}")));
                }
                if holder.is_some_and(|holder| holder != id.get()) {
                    return Err(unique_violation(&write.english_phrase));
                }
                id
            }
        };
        let upload = guard.next_upload(write)?;
        let entry = DictionaryEntry {
            id,
            english_phrase: write.english_phrase.clone(),
            translation_phrase: write.translation_phrase.clone(),
            upload,
        };
        guard.put_entry(entry.clone());
        drop(guard);
        Ok(entry)
    }

    fn find_all(&self) -> Result<Vec<DictionaryEntry>, PersistenceError> {
        Ok(self.lock()?.entries.values().cloned().collect())
    }

    fn find_page(&self, page: PageRequest) -> Result<EntryPage, PersistenceError> {
        if page.limit == 0 {
            return Err(PersistenceError::Invalid("page limit must be greater than zero".to_string()));
        }
        let guard = self.lock()?;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        let items = guard
            .phrase_index
            .values()
            .skip(offset)
            .take(limit)
            .filter_map(|id| guard.entries.get(id).cloned())
            .collect();
        let total = u64::try_from(guard.entries.len()).unwrap_or(u64::MAX);
        drop(guard);
        Ok(EntryPage {
            items,
            total,
        })
    }

    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, PersistenceError> {
        let guard = self.lock()?;
        Ok(guard.id_for_phrase(phrase).and_then(|id| guard.entries.get(&id)).cloned())
    }

    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, PersistenceError> {
        let mut guard = self.lock()?;
        let doomed: Vec<(String, u64)> = guard
            .phrase_index
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(phrase, _)| phrase.starts_with(prefix))
            .map(|(phrase, id)| (phrase.clone(), *id))
            .collect();
        for (phrase, id) in &doomed {
            guard.phrase_index.remove(phrase);
            guard.entries.remove(id);
        }
        let removed = doomed.len();
        drop(guard);
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

/// Builds the uniqueness violation reported for a duplicate phrase.
fn unique_violation(phrase: &str) -> PersistenceError {
    PersistenceError::IntegrityViolation {
        constraint: Some(ENGLISH_PHRASE_UNIQUE_CONSTRAINT.to_string()),
        message: format!("english phrase already stored: '{phrase}'"),
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared entry persistence backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedEntryPersistence {
    /// Inner persistence implementation.
    inner: Arc<dyn EntryPersistence>,
}

impl SharedEntryPersistence {
    /// Wraps a persistence port in a shared, clonable wrapper.
    #[must_use]
    pub fn from_persistence(persistence: impl EntryPersistence + 'static) -> Self {
        Self {
            inner: Arc::new(persistence),
        }
    }
}

impl std::fmt::Debug for SharedEntryPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEntryPersistence").finish_non_exhaustive()
    }
}

impl EntryPersistence for SharedEntryPersistence {
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, PersistenceError> {
        self.inner.save_and_flush(write)
    }

    fn find_all(&self) -> Result<Vec<DictionaryEntry>, PersistenceError> {
        self.inner.find_all()
    }

    fn find_page(&self, page: PageRequest) -> Result<EntryPage, PersistenceError> {
        self.inner.find_page(page)
    }

    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, PersistenceError> {
        self.inner.find_by_phrase(phrase)
    }

    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, PersistenceError> {
        self.inner.delete_by_phrase_prefix(prefix)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
