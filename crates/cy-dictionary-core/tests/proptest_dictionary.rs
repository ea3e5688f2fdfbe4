// crates/cy-dictionary-core/tests/proptest_dictionary.rs
// ============================================================================
// Module: Dictionary Property-Based Tests
// Description: Property tests for upsert and read-back invariants.
// Purpose: Detect lost writes, duplicate entries, and null renderings.
// ============================================================================

//! Property-based tests for dictionary invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use cy_dictionary_core::ConflictAwareRepository;
use cy_dictionary_core::DictionaryRequest;
use cy_dictionary_core::DictionaryService;
use cy_dictionary_core::EntryPersistence;
use cy_dictionary_core::InMemoryEntryPersistence;
use cy_dictionary_core::Timestamp;
use cy_dictionary_core::TranslationRequest;
use cy_dictionary_core::UploadMetadata;
use proptest::prelude::*;

fn batch_strategy() -> impl Strategy<Value = BTreeMap<String, Option<String>>> {
    prop::collection::btree_map(
        "[A-Za-z][A-Za-z ]{0,11}",
        prop::option::of("[a-zŵŷâêîôû ]{0,12}"),
        1 .. 12,
    )
}

fn expected_rendering(translation: Option<&String>) -> String {
    translation.filter(|value| !value.trim().is_empty()).cloned().unwrap_or_default()
}

proptest! {
    #[test]
    fn last_batch_wins_and_phrases_stay_unique(
        first in batch_strategy(),
        second in batch_strategy(),
    ) {
        let persistence = InMemoryEntryPersistence::new();
        let service = DictionaryService::new(ConflictAwareRepository::new(persistence.clone()));
        let upload = UploadMetadata::new("proptest", Timestamp::from_unix_millis(0));

        for batch in [&first, &second] {
            let report = service
                .put_dictionary(&DictionaryRequest { translations: batch.clone() }, &upload)
                .unwrap();
            prop_assert!(report.is_complete());
        }

        let mut expected: BTreeMap<String, String> = BTreeMap::new();
        for batch in [&first, &second] {
            for (phrase, translation) in batch {
                expected.insert(phrase.clone(), expected_rendering(translation.as_ref()));
            }
        }

        let contents = service.get_dictionary_contents().unwrap();
        prop_assert_eq!(&contents.translations, &expected);
        prop_assert_eq!(persistence.find_all().unwrap().len(), expected.len());

        let lookup = service
            .get_translations(&TranslationRequest::new(expected.keys().cloned()))
            .unwrap();
        prop_assert_eq!(lookup.translations, expected);
    }
}
