// crates/cy-dictionary-core/tests/dictionary_service.rs
// ============================================================================
// Module: Dictionary Service Tests
// Description: Upsert retry, conflict recovery, reads, lookups, and resets.
// Purpose: Ensure the service honors the bounded retry and read invariants.
// Dependencies: cy-dictionary-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use cy_dictionary_core::ConflictAwareRepository;
use cy_dictionary_core::DictionaryEntry;
use cy_dictionary_core::DictionaryError;
use cy_dictionary_core::DictionaryRequest;
use cy_dictionary_core::DictionaryService;
use cy_dictionary_core::ENGLISH_PHRASE_UNIQUE_CONSTRAINT;
use cy_dictionary_core::EntryId;
use cy_dictionary_core::EntryPage;
use cy_dictionary_core::EntryPersistence;
use cy_dictionary_core::EntryWrite;
use cy_dictionary_core::InMemoryEntryPersistence;
use cy_dictionary_core::MAX_SAVE_ATTEMPTS;
use cy_dictionary_core::PageRequest;
use cy_dictionary_core::PersistenceError;
use cy_dictionary_core::RepositoryError;
use cy_dictionary_core::SaveAction;
use cy_dictionary_core::Timestamp;
use cy_dictionary_core::TranslationRequest;
use cy_dictionary_core::UploadMetadata;
use cy_dictionary_core::UploadRecord;
use cy_dictionary_core::UploadVersionId;
use cy_dictionary_core::ValidationError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn upload() -> UploadMetadata {
    UploadMetadata::new("translator-1", Timestamp::from_unix_millis(1_700_000_000_000))
}

fn request(pairs: &[(&str, Option<&str>)]) -> DictionaryRequest {
    DictionaryRequest {
        translations: pairs
            .iter()
            .map(|(phrase, translation)| ((*phrase).to_string(), translation.map(str::to_string)))
            .collect(),
    }
}

fn memory_service() -> DictionaryService<ConflictAwareRepository<InMemoryEntryPersistence>> {
    DictionaryService::new(ConflictAwareRepository::new(InMemoryEntryPersistence::new()))
}

fn conflict() -> PersistenceError {
    PersistenceError::IntegrityViolation {
        constraint: Some(ENGLISH_PHRASE_UNIQUE_CONSTRAINT.to_string()),
        message: "duplicate key".to_string(),
    }
}

fn stored(id: u64, phrase: &str, translation: Option<&str>) -> DictionaryEntry {
    DictionaryEntry {
        id: EntryId::from_raw(id).unwrap(),
        english_phrase: phrase.to_string(),
        translation_phrase: translation.map(str::to_string),
        upload: UploadRecord {
            version_id: UploadVersionId::from_raw(id).unwrap(),
            uploaded_at: Timestamp::from_unix_millis(1),
            uploaded_by: "seed".to_string(),
        },
    }
}

/// Persistence double that replays scripted save outcomes.
struct ScriptedPersistence {
    saves: Mutex<VecDeque<Result<(), PersistenceError>>>,
    save_calls: AtomicU32,
    rows: Mutex<Vec<DictionaryEntry>>,
}

impl ScriptedPersistence {
    fn new(saves: Vec<Result<(), PersistenceError>>) -> Self {
        Self {
            saves: Mutex::new(saves.into()),
            save_calls: AtomicU32::new(0),
            rows: Mutex::new(Vec::new()),
        }
    }

    fn with_rows(self, rows: Vec<DictionaryEntry>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }
}

impl EntryPersistence for ScriptedPersistence {
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, PersistenceError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.saves.lock().unwrap().pop_front().unwrap_or_else(|| Err(conflict()));
        next.map(|()| stored(7, &write.english_phrase, write.translation_phrase.as_deref()))
    }

    fn find_all(&self) -> Result<Vec<DictionaryEntry>, PersistenceError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    fn find_page(&self, _page: PageRequest) -> Result<EntryPage, PersistenceError> {
        let items = self.rows.lock().unwrap().clone();
        let total = items.len() as u64;
        Ok(EntryPage {
            items,
            total,
        })
    }

    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, PersistenceError> {
        Ok(self.rows.lock().unwrap().iter().find(|entry| entry.english_phrase == phrase).cloned())
    }

    fn delete_by_phrase_prefix(&self, _prefix: &str) -> Result<u64, PersistenceError> {
        Ok(0)
    }
}

/// Persistence double whose first phrase lookup misses, as if the read raced
/// another writer's insert.
struct StaleFirstRead {
    inner: InMemoryEntryPersistence,
    stale: AtomicBool,
}

impl EntryPersistence for StaleFirstRead {
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
        if self.stale.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_by_phrase(phrase)
    }

    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, PersistenceError> {
        self.inner.delete_by_phrase_prefix(prefix)
    }
}

// ============================================================================
// SECTION: Retry Ceiling
// ============================================================================

#[test]
fn two_conflicts_then_success_uses_three_attempts() {
    let persistence = Arc::new(ScriptedPersistence::new(vec![Err(conflict()), Err(conflict()), Ok(())]));
    let service = DictionaryService::new(ConflictAwareRepository::new(SharedHandle(Arc::clone(&persistence))));

    let report = service.put_dictionary(&request(&[("Hello", Some("Helo"))]), &upload()).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.results[0].attempts, 3);
    assert_eq!(persistence.save_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn persistent_conflict_surfaces_after_ceiling() {
    let persistence = Arc::new(ScriptedPersistence::new(Vec::new()));
    let service = DictionaryService::new(ConflictAwareRepository::new(SharedHandle(Arc::clone(&persistence))));

    let report = service.put_dictionary(&request(&[("Hello", Some("Helo"))]), &upload()).unwrap();

    assert!(!report.is_complete());
    assert_eq!(persistence.save_calls.load(Ordering::SeqCst), MAX_SAVE_ATTEMPTS);
    let failure = report.failures().next().unwrap();
    assert_eq!(
        failure.outcome,
        Err(DictionaryError::StorageExhausted {
            phrase: "Hello".to_string(),
            attempts: MAX_SAVE_ATTEMPTS,
        })
    );
    assert_eq!(failure.outcome.as_ref().unwrap_err().code(), "storage_exhausted");
}

#[test]
fn non_conflict_failure_is_not_retried() {
    let io = PersistenceError::Io("disk unplugged".to_string());
    let persistence = Arc::new(ScriptedPersistence::new(vec![Err(io.clone()), Ok(())]));
    let service = DictionaryService::new(ConflictAwareRepository::new(SharedHandle(Arc::clone(&persistence))));

    let report = service.put_dictionary(&request(&[("Hello", None)]), &upload()).unwrap();

    assert_eq!(persistence.save_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.results[0].outcome, Err(DictionaryError::Storage(RepositoryError::Storage(io))));
}

#[test]
fn other_constraint_violation_is_not_retried() {
    let violation = PersistenceError::IntegrityViolation {
        constraint: Some("uploads_uploaded_by_check".to_string()),
        message: "bad uploader".to_string(),
    };
    let persistence = Arc::new(ScriptedPersistence::new(vec![Err(violation.clone())]));
    let service = DictionaryService::new(ConflictAwareRepository::new(SharedHandle(Arc::clone(&persistence))));

    let report = service.put_dictionary(&request(&[("Hello", None)]), &upload()).unwrap();

    assert_eq!(persistence.save_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        report.results[0].outcome,
        Err(DictionaryError::Storage(RepositoryError::Storage(violation)))
    );
}

#[test]
fn failing_phrase_does_not_block_the_rest() {
    let persistence =
        Arc::new(ScriptedPersistence::new(vec![Ok(()), Err(conflict()), Err(conflict()), Err(conflict()), Ok(())]));
    let service = DictionaryService::new(ConflictAwareRepository::new(SharedHandle(Arc::clone(&persistence))));

    let report = service
        .put_dictionary(&request(&[("A", None), ("B", None), ("C", None)]), &upload())
        .unwrap();

    assert_eq!(report.saved_count(), 2);
    let failed: Vec<&str> = report.failures().map(|result| result.phrase.as_str()).collect();
    assert_eq!(failed, vec!["B"]);
}

/// Lets an `Arc` test double be observed while the service owns it.
struct SharedHandle(Arc<ScriptedPersistence>);

impl EntryPersistence for SharedHandle {
    fn save_and_flush(&self, write: &EntryWrite) -> Result<DictionaryEntry, PersistenceError> {
        self.0.save_and_flush(write)
    }

    fn find_all(&self) -> Result<Vec<DictionaryEntry>, PersistenceError> {
        self.0.find_all()
    }

    fn find_page(&self, page: PageRequest) -> Result<EntryPage, PersistenceError> {
        self.0.find_page(page)
    }

    fn find_by_phrase(&self, phrase: &str) -> Result<Option<DictionaryEntry>, PersistenceError> {
        self.0.find_by_phrase(phrase)
    }

    fn delete_by_phrase_prefix(&self, prefix: &str) -> Result<u64, PersistenceError> {
        self.0.delete_by_phrase_prefix(prefix)
    }
}

// ============================================================================
// SECTION: Conflict Recovery
// ============================================================================

#[test]
fn losing_insert_race_recovers_as_update() {
    let inner = InMemoryEntryPersistence::new();
    let winner = DictionaryService::new(ConflictAwareRepository::new(inner.clone()));
    winner.put_dictionary(&request(&[("Hello", Some("Helo"))]), &upload()).unwrap();

    let loser = DictionaryService::new(ConflictAwareRepository::new(StaleFirstRead {
        inner: inner.clone(),
        stale: AtomicBool::new(true),
    }));
    let report = loser.put_dictionary(&request(&[("Hello", Some("Shwmae"))]), &upload()).unwrap();

    assert_eq!(report.results[0].outcome, Ok(SaveAction::Updated));
    assert_eq!(report.results[0].attempts, 2);
    let entries = inner.find_all().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].translation_phrase.as_deref(), Some("Shwmae"));
}

#[test]
fn concurrent_writers_leave_one_entry_per_phrase() {
    let inner = InMemoryEntryPersistence::new();
    let handles: Vec<_> = (0 .. 8)
        .map(|worker| {
            let service = DictionaryService::new(ConflictAwareRepository::new(inner.clone()));
            std::thread::spawn(move || {
                let translation = format!("cyfieithiad-{worker}");
                service
                    .put_dictionary(&request(&[("Hello", Some(translation.as_str()))]), &upload())
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_complete());
    }

    let entries = inner.find_all().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].english_phrase, "Hello");
}

// ============================================================================
// SECTION: Upsert Semantics
// ============================================================================

#[test]
fn insert_then_update_replaces_translation() {
    let service = memory_service();
    let first = service.put_dictionary(&request(&[("Hello", None)]), &upload()).unwrap();
    assert_eq!(first.results[0].outcome, Ok(SaveAction::Inserted));

    let second = service.put_dictionary(&request(&[("Hello", Some("Helo"))]), &upload()).unwrap();
    assert_eq!(second.results[0].outcome, Ok(SaveAction::Updated));

    let contents = service.get_dictionary_contents().unwrap();
    assert_eq!(contents.translations.get("Hello").map(String::as_str), Some("Helo"));
}

#[test]
fn blank_translation_clears_stored_translation() {
    let service = memory_service();
    service.put_dictionary(&request(&[("Hello", Some("Helo"))]), &upload()).unwrap();
    service.put_dictionary(&request(&[("Hello", Some("   "))]), &upload()).unwrap();

    let entries = service.list_entries(PageRequest::new(0, 10)).unwrap();
    assert_eq!(entries.items[0].translation_phrase, None);
    let contents = service.get_dictionary_contents().unwrap();
    assert_eq!(contents.translations.get("Hello").map(String::as_str), Some(""));
}

#[test]
fn upload_record_tracks_latest_writer() {
    let service = memory_service();
    service.put_dictionary(&request(&[("Hello", None)]), &upload()).unwrap();
    let later = UploadMetadata::new("translator-2", Timestamp::from_unix_millis(1_800_000_000_000));
    service.put_dictionary(&request(&[("Hello", Some("Helo"))]), &later).unwrap();

    let page = service.list_entries(PageRequest::new(0, 10)).unwrap();
    assert_eq!(page.items[0].upload.uploaded_by, "translator-2");
    assert_eq!(page.items[0].upload.uploaded_at, later.uploaded_at);
}

#[test]
fn invalid_request_writes_nothing() {
    let service = memory_service();
    let err = service.put_dictionary(&request(&[("Hello", None), (" ", None)]), &upload()).unwrap_err();
    assert_eq!(err, DictionaryError::Validation(ValidationError::BlankPhrase("translations")));
    assert!(service.get_dictionary_contents().unwrap().is_empty());
}

// ============================================================================
// SECTION: Reads and Lookups
// ============================================================================

#[test]
fn duplicate_phrases_in_store_fail_the_read() {
    let persistence = ScriptedPersistence::new(Vec::new())
        .with_rows(vec![stored(1, "Hello", Some("Helo")), stored(2, "Hello", Some("Shwmae"))]);
    let service = DictionaryService::new(ConflictAwareRepository::new(persistence));

    let err = service.get_dictionary_contents().unwrap_err();
    assert_eq!(err, DictionaryError::DuplicatePhrase("Hello".to_string()));
    assert_eq!(err.code(), "data_integrity");
}

#[test]
fn lookup_of_unknown_phrase_on_empty_store_is_empty() {
    let service = memory_service();
    let result = service.get_translations(&TranslationRequest::new(["Unknown Phrase"])).unwrap();
    assert!(result.is_empty());
    assert!(service.get_dictionary_contents().unwrap().is_empty());
}

#[test]
fn lookup_renders_untranslated_as_empty_and_omits_unknown() {
    let service = memory_service();
    service
        .put_dictionary(&request(&[("Hello", Some("Helo")), ("Goodbye", None)]), &upload())
        .unwrap();

    let result = service
        .get_translations(&TranslationRequest::new(["Hello", "Goodbye", "Missing"]))
        .unwrap();
    assert_eq!(result.translations.len(), 2);
    assert_eq!(result.translations.get("Hello").map(String::as_str), Some("Helo"));
    assert_eq!(result.translations.get("Goodbye").map(String::as_str), Some(""));
}

#[test]
fn lookup_rejects_empty_request() {
    let service = memory_service();
    let err = service.get_translations(&TranslationRequest::default()).unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.code(), "invalid_request");
}

// ============================================================================
// SECTION: Test Phrase Reset and Listing
// ============================================================================

#[test]
fn delete_test_phrases_removes_only_prefixed_entries() {
    let service = memory_service();
    service
        .put_dictionary(&request(&[("TEST-a", None), ("TEST-b", None), ("Hello", None)]), &upload())
        .unwrap();

    assert_eq!(service.delete_test_phrases("TEST-").unwrap(), 2);
    assert_eq!(service.delete_test_phrases("TEST-").unwrap(), 0);
    let contents = service.get_dictionary_contents().unwrap();
    assert_eq!(contents.translations.keys().collect::<Vec<_>>(), vec!["Hello"]);
}

#[test]
fn delete_test_phrases_rejects_blank_prefix() {
    let service = memory_service();
    service.put_dictionary(&request(&[("Hello", None)]), &upload()).unwrap();
    assert!(service.delete_test_phrases("  ").unwrap_err().is_client_error());
    assert_eq!(service.get_dictionary_contents().unwrap().translations.len(), 1);
}

#[test]
fn list_entries_rejects_out_of_range_limits() {
    let service = memory_service();
    assert!(service.list_entries(PageRequest::new(0, 0)).is_err());
    assert!(service.list_entries(PageRequest::new(0, 1_001)).is_err());
    assert_eq!(service.list_entries(PageRequest::new(5, 10)).unwrap().items.len(), 0);
}
