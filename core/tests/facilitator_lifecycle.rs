// core/tests/facilitator_lifecycle.rs
//
// Integration tests for dictionary lifecycle and learning.
//
// Tests cover:
// - reuse of dictionaries across resets, forced reloads and account changes
// - closing and diagnostics
// - confidence weights across several groups
// - one cached lookup per context for next-word predictions
// - learning next-word predictions and unlearning them
// - queued blacklist writes surviving a locale switch
// - promotion of a repeatedly typed unknown word to the personal dictionary

use ahash::AHashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use suggest_core::dictionary::{
    main_handle, sub_handle, CompiledDictionary, CompiledDictionaryBuilder, DynamicDictionary, LookupRequest,
};
use suggest_core::{
    Blacklist, DictType, Dictionary, DictionaryFacilitator, DictionaryGroup, DictionaryProvider, EventType,
    FileDictionaryProvider, InputStyle, KeyboardState, Locale, MainDictionary, NgramContext, Settings,
    SubDictionary, Suggest, SuggestedWordInfo, WordComposer, WordInfo,
};

const WAIT: Duration = Duration::from_secs(10);

/// Main dictionary that counts context-only lookups.
#[derive(Debug)]
struct CountingMain {
    inner: CompiledDictionary,
    predictions: Arc<AtomicUsize>,
}

impl Dictionary for CountingMain {
    fn dict_type(&self) -> DictType {
        DictType::Main
    }

    fn locale(&self) -> Option<&Locale> {
        self.inner.locale()
    }

    fn suggestions(&self, request: &LookupRequest<'_>, weight: &mut f32) -> Option<Vec<SuggestedWordInfo>> {
        if request.composed.typed_word.is_empty() {
            self.predictions.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.suggestions(request, weight)
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.inner.is_in_dictionary(word)
    }
}

#[derive(Debug, Default)]
struct CountingProvider {
    main_loads: AtomicUsize,
    sub_opens: AtomicUsize,
    predictions: Arc<AtomicUsize>,
}

impl DictionaryProvider for CountingProvider {
    fn create_main_dictionary(&self, locale: &Locale) -> anyhow::Result<MainDictionary> {
        self.main_loads.fetch_add(1, Ordering::SeqCst);
        let mut builder = CompiledDictionaryBuilder::new(locale.clone());
        builder
            .add_word("hello", 200)
            .add_word("help", 150)
            .add_word("world", 180)
            .add_bigram("hello", "world", 190);
        Ok(main_handle(CountingMain {
            inner: builder.build()?,
            predictions: Arc::clone(&self.predictions),
        }))
    }

    fn create_sub_dictionary(
        &self,
        dict_type: DictType,
        locale: &Locale,
        _account: Option<&str>,
    ) -> anyhow::Result<SubDictionary> {
        self.sub_opens.fetch_add(1, Ordering::SeqCst);
        Ok(sub_handle(DynamicDictionary::in_memory(dict_type, locale.clone())))
    }

    fn blacklist_path(&self, _locale: &Locale) -> Option<PathBuf> {
        None
    }
}

fn counts(provider: &CountingProvider) -> (usize, usize) {
    (
        provider.main_loads.load(Ordering::SeqCst),
        provider.sub_opens.load(Ordering::SeqCst),
    )
}

#[test]
fn reset_reuses_what_is_already_open() {
    let provider = Arc::new(CountingProvider::default());
    let facilitator = DictionaryFacilitator::new(provider.clone(), Settings::default()).unwrap();
    let en = Locale::new("en");
    let de = Locale::new("de");

    facilitator.reset_dictionaries(&en, &[], false, true, false, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    assert_eq!(counts(&provider), (1, 2));
    assert!(facilitator.has_at_least_one_initialized_main_dictionary());

    facilitator.reset_dictionaries(&en, &[de.clone()], false, true, false, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    assert_eq!(counts(&provider), (2, 4));
    assert_eq!(facilitator.groups().len(), 2);
    assert!(!facilitator.has_at_least_one_uninitialized_main_dictionary());

    facilitator.reset_dictionaries(&en, &[de], false, true, true, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    assert_eq!(counts(&provider), (4, 8));
}

#[test]
fn history_belongs_to_its_account() {
    let provider = Arc::new(CountingProvider::default());
    let facilitator = DictionaryFacilitator::new(provider.clone(), Settings::default()).unwrap();
    let en = Locale::new("en");

    facilitator.reset_dictionaries(&en, &[], false, true, false, Some("home"));
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    facilitator.reset_dictionaries(&en, &[], false, true, false, Some("work"));
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));

    // a different account gets fresh mutable dictionaries
    assert_eq!(counts(&provider), (2, 4));
    let group = facilitator.currently_preferred_group();
    assert_eq!(group.account(), Some("work"));
    assert!(group.has_dict(DictType::UserHistory, Some("work")));
    assert!(!group.has_dict(DictType::UserHistory, Some("home")));
    assert!(group.has_dict(DictType::User, None));
}

#[test]
fn close_leaves_an_inactive_placeholder() {
    let facilitator = DictionaryFacilitator::new(Arc::new(CountingProvider::default()), Settings::default()).unwrap();
    facilitator.reset_dictionaries(&Locale::new("en"), &[Locale::new("fr")], false, false, false, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));

    let dump: serde_json::Value = serde_json::from_str(&facilitator.dump().unwrap()).unwrap();
    assert_eq!(dump.as_array().map(Vec::len), Some(2));
    assert!(facilitator.is_active());

    facilitator.close_dictionaries();
    assert!(!facilitator.is_active());
    assert!(!facilitator.has_at_least_one_initialized_main_dictionary());
    assert!(!facilitator.is_valid_spelling_word("hello"));
    assert_eq!(facilitator.next_word_cache_len(), 0);
}

#[test]
fn next_word_predictions_are_looked_up_once_per_context() {
    let provider = Arc::new(CountingProvider::default());
    let facilitator = DictionaryFacilitator::new(provider.clone(), Settings::default()).unwrap();
    facilitator.reset_dictionaries(&Locale::new("en"), &[], false, true, false, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    let suggest = Suggest::new(Arc::new(facilitator));
    let settings = Settings::default();
    let request = |ctx: &NgramContext| {
        suggest.get_suggested_words(
            &WordComposer::new(),
            ctx,
            &KeyboardState::default(),
            &settings,
            true,
            InputStyle::Typing,
            0,
        )
    };

    let after_hello = NgramContext::from_words(vec![WordInfo::new("hello")]);
    let out = request(&after_hello);
    assert_eq!(out.word(0), Some("world"));
    assert_eq!(out.input_style, InputStyle::Prediction);
    assert_eq!(provider.predictions.load(Ordering::SeqCst), 1);

    // same words, longer window with empty padding
    let padded = NgramContext::new(5, vec![WordInfo::new("hello"), WordInfo::empty(), WordInfo::empty()]);
    assert_eq!(padded, after_hello);
    let out = request(&padded);
    assert_eq!(out.word(0), Some("world"));
    assert_eq!(provider.predictions.load(Ordering::SeqCst), 1);
    assert_eq!(suggest.facilitator().next_word_cache_len(), 1);

    request(&NgramContext::from_words(vec![WordInfo::new("help")]));
    assert_eq!(provider.predictions.load(Ordering::SeqCst), 2);

    suggest.clear_next_word_suggestions_cache();
    request(&after_hello);
    assert_eq!(provider.predictions.load(Ordering::SeqCst), 3);
}

fn bare_group(tag: &str) -> Arc<DictionaryGroup> {
    Arc::new(DictionaryGroup::new(
        Locale::new(tag),
        None,
        None,
        AHashMap::new(),
        Arc::new(Blacklist::in_memory()),
    ))
}

#[test]
fn weight_grows_with_confidence() {
    let groups = vec![bare_group("en"), bare_group("de")];
    let de = &groups[1];
    de.decrease_confidence();
    let mut last = de.weight_for_locale(&groups, false);
    for _ in 0..4 {
        de.increase_confidence();
        let weight = de.weight_for_locale(&groups, false);
        assert!(weight >= last, "{} < {}", weight, last);
        assert!(weight <= 1.0);
        last = weight;
    }
    assert_eq!(last, 1.0);
    assert!(de.weight_for_locale(&groups, true) >= de.weight_for_locale(&groups, false));
    assert_eq!(de.weight_for_locale(&groups[1..], false), 1.0);
}

fn file_facilitator(dir: &std::path::Path, settings: Settings) -> DictionaryFacilitator {
    let mut builder = CompiledDictionaryBuilder::new("en");
    builder.add_word("good", 200).add_word("morning", 180);
    builder
        .write(dir.join("main-en.fst"), dir.join("main-en.bincode"))
        .unwrap();
    let facilitator = DictionaryFacilitator::new(Arc::new(FileDictionaryProvider::new(dir)), settings).unwrap();
    facilitator.reset_dictionaries(&Locale::new("en"), &[], false, true, false, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    facilitator
}

fn predicted_after(facilitator: &DictionaryFacilitator, prev: &str) -> Vec<String> {
    let ctx = NgramContext::from_words(vec![WordInfo::new(prev)]);
    let settings = facilitator.settings();
    facilitator
        .get_next_word_suggestions(&ctx, Default::default(), &settings, 0)
        .iter()
        .map(|s| s.word.clone())
        .collect()
}

#[test]
fn learned_pairs_are_predicted_until_unlearned() {
    let dir = tempfile::tempdir().unwrap();
    let facilitator = file_facilitator(dir.path(), Settings::default());

    assert!(predicted_after(&facilitator, "hello").is_empty());
    let start = NgramContext::beginning_of_sentence();
    facilitator.add_to_user_history("hello", false, &start, 10, true);
    let after_hello = start.next_context(WordInfo::new("hello"));
    facilitator.add_to_user_history("world", false, &after_hello, 11, true);
    assert!(facilitator.wait_for_background_tasks(WAIT));

    assert_eq!(predicted_after(&facilitator, "hello"), vec!["world".to_string()]);
    let history = facilitator
        .dictionary_stats()
        .into_iter()
        .find(|s| s.dict_type == DictType::UserHistory)
        .unwrap();
    assert_eq!(history.word_count, 2);

    // backspace alone keeps what was learned but forgets the spelling answer
    assert!(facilitator.cached_spelling_validity("world").is_some());
    facilitator.unlearn_from_user_history("world", &after_hello, 12, EventType::Backspace);
    assert!(facilitator.cached_spelling_validity("world").is_none());
    assert!(facilitator.wait_for_background_tasks(WAIT));
    assert_eq!(predicted_after(&facilitator, "hello"), vec!["world".to_string()]);

    facilitator.unlearn_from_user_history("world", &after_hello, 12, EventType::RevertCommit);
    assert!(facilitator.wait_for_background_tasks(WAIT));
    assert!(predicted_after(&facilitator, "hello").is_empty());
}

#[test]
fn repeated_unknown_word_is_promoted() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        add_to_personal_dictionary: true,
        ..Settings::default()
    };
    let facilitator = file_facilitator(dir.path(), settings);
    let ctx = NgramContext::from_words(vec![WordInfo::new("good")]);
    let in_user_dictionary = |f: &DictionaryFacilitator| {
        f.currently_preferred_group()
            .sub_dictionary(DictType::User)
            .is_some_and(|user| user.is_in_dictionary("zorp"))
    };

    for ts in 0..4 {
        facilitator.add_to_user_history("zorp", false, &ctx, ts, true);
        assert!(facilitator.wait_for_background_tasks(WAIT));
    }
    assert!(!in_user_dictionary(&facilitator));

    facilitator.add_to_user_history("zorp", false, &ctx, 4, true);
    assert!(facilitator.wait_for_background_tasks(WAIT));
    assert!(in_user_dictionary(&facilitator));
    assert!(facilitator.currently_preferred_group().is_valid_word("zorp"));

    facilitator.clear_user_history();
    let history = facilitator
        .dictionary_stats()
        .into_iter()
        .find(|s| s.dict_type == DictType::UserHistory)
        .unwrap();
    assert_eq!(history.word_count, 0);
}

#[test]
fn queued_removal_survives_a_locale_switch() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        background_threads: 1,
        ..Settings::default()
    };
    let facilitator = file_facilitator(dir.path(), settings);

    // hold the only worker so the blacklist write stays queued
    let (release, gate) = std::sync::mpsc::channel::<()>();
    facilitator.executor().spawn("gate", move || {
        let _ = gate.recv_timeout(WAIT);
    });
    facilitator.remove_word("good");
    facilitator.reset_dictionaries(&Locale::new("de"), &[], false, true, false, None);
    release.send(()).unwrap();
    assert!(facilitator.wait_for_background_tasks(WAIT));

    let saved = std::fs::read_to_string(dir.path().join("blacklist-en.txt")).unwrap();
    assert_eq!(saved.lines().collect::<Vec<_>>(), vec!["good"]);

    facilitator.reset_dictionaries(&Locale::new("en"), &[], false, true, false, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    assert!(facilitator.has_at_least_one_initialized_main_dictionary());
    assert!(!facilitator.is_valid_spelling_word("good"));
    assert!(facilitator.is_valid_spelling_word("morning"));
}
