// core/tests/suggest_scenarios.rs
//
// End-to-end suggestion requests against compiled dictionaries on disk.
//
// Tests cover:
// - auto-correction of a typo and keeping a valid typed word
// - words with digits never being replaced
// - predictions at a sentence start and after a known word
// - a second language taking over once the user writes in it
// - removed words staying out until typed again
// - gesture input preferring a word already used in this context

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use suggest_core::dictionary::CompiledDictionaryBuilder;
use suggest_core::ngram::BEGINNING_OF_SENTENCE_TAG;
use suggest_core::{
    DictionaryFacilitator, FileDictionaryProvider, InputStyle, KeyboardState, Locale, NgramContext, Settings,
    Suggest, SuggestedWords, WordComposer, WordInfo,
};

const WAIT: Duration = Duration::from_secs(10);

fn write_main(dir: &Path, locale: &str, fill: impl FnOnce(&mut CompiledDictionaryBuilder)) {
    let mut builder = CompiledDictionaryBuilder::new(locale);
    fill(&mut builder);
    builder
        .write(
            dir.join(format!("main-{}.fst", locale)),
            dir.join(format!("main-{}.bincode", locale)),
        )
        .unwrap();
}

fn engine(dir: &Path, primary: &str, secondary: &[&str]) -> Suggest {
    let facilitator = DictionaryFacilitator::new(Arc::new(FileDictionaryProvider::new(dir)), Settings::default()).unwrap();
    let secondary: Vec<Locale> = secondary.iter().map(|l| Locale::new(*l)).collect();
    facilitator.reset_dictionaries(&Locale::new(primary), &secondary, false, true, false, None);
    assert!(facilitator.wait_for_loading_main_dictionaries(WAIT));
    Suggest::new(Arc::new(facilitator))
}

fn type_word(engine: &Suggest, composer: &WordComposer, ctx: &NgramContext, style: InputStyle) -> SuggestedWords {
    let settings = engine.facilitator().settings();
    engine.get_suggested_words(composer, ctx, &KeyboardState::default(), &settings, true, style, 7)
}

fn english(b: &mut CompiledDictionaryBuilder) {
    b.add_word("the", 250).add_word("ten", 150).add_word("tea", 120);
}

#[test]
fn typo_is_replaced_by_frequent_word() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", english);
    let engine = engine(dir.path(), "en", &[]);

    let out = type_word(&engine, &WordComposer::from_typed_word("teh"), &NgramContext::empty(), InputStyle::Typing);

    assert!(out.will_auto_correct);
    assert!(!out.typed_word_valid);
    assert_eq!(out.typed_word(), Some("teh"));
    assert_eq!(out.auto_correction().map(|s| s.word.as_str()), Some("the"));
    // typed word first, the correction, then the typed word again to undo it
    assert_eq!(out.word(0), Some("teh"));
    assert_eq!(out.word(1), Some("the"));
    assert_eq!(out.word(2), Some("teh"));
    assert_eq!(out.sequence_number, 7);
    assert_eq!(out.input_style, InputStyle::Typing);
}

#[test]
fn valid_word_is_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", english);
    let engine = engine(dir.path(), "en", &[]);

    let out = type_word(&engine, &WordComposer::from_typed_word("ten"), &NgramContext::empty(), InputStyle::Typing);

    assert!(!out.will_auto_correct);
    assert!(out.typed_word_valid);
    assert_eq!(out.word(0), Some("ten"));
    // the typed word appears once
    assert_eq!(out.words.iter().filter(|s| s.word == "ten").count(), 1);
    assert!(out.suggestions().iter().any(|s| s.word == "tea"));
}

#[test]
fn word_with_digits_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", english);
    let engine = engine(dir.path(), "en", &[]);

    let out = type_word(&engine, &WordComposer::from_typed_word("th3"), &NgramContext::empty(), InputStyle::Typing);

    assert!(!out.will_auto_correct);
    assert!(out.auto_correction().is_none());
    assert_eq!(out.word(0), Some("th3"));
}

#[test]
fn empty_input_yields_predictions() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", |b| {
        b.add_word("good", 200)
            .add_word("morning", 180)
            .add_bigram(BEGINNING_OF_SENTENCE_TAG, "I", 200)
            .add_bigram("good", "morning", 180);
    });
    let engine = engine(dir.path(), "en", &[]);
    let composer = WordComposer::new();

    let out = type_word(&engine, &composer, &NgramContext::beginning_of_sentence(), InputStyle::Typing);
    assert_eq!(out.input_style, InputStyle::BeginningOfSentencePrediction);
    assert_eq!(out.word(0), Some("I"));
    assert!(out.typed_word_info.is_none());
    assert!(!out.will_auto_correct);

    let after_good = NgramContext::from_words(vec![WordInfo::new("good")]);
    let out = type_word(&engine, &composer, &after_good, InputStyle::Typing);
    assert_eq!(out.input_style, InputStyle::Prediction);
    assert_eq!(out.word(0), Some("morning"));
    assert!(engine.facilitator().next_word_cache_len() >= 2);
}

#[test]
fn writing_in_second_language_makes_it_preferred() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", |b| {
        b.add_word("the", 250).add_word("thanks", 200);
    });
    write_main(dir.path(), "de", |b| {
        b.add_word("danke", 200).add_word("bitte", 200).add_word("schön", 180);
    });
    let engine = engine(dir.path(), "en", &["de"]);
    let facilitator = engine.facilitator();
    assert_eq!(facilitator.currently_preferred_group().locale().as_str(), "en");

    let ctx = NgramContext::empty();
    for (ts, word) in ["danke", "bitte", "danke"].into_iter().enumerate() {
        facilitator.add_to_user_history(word, false, &ctx, ts as u64, true);
    }
    assert!(facilitator.wait_for_background_tasks(WAIT));

    assert_eq!(facilitator.currently_preferred_group().locale().as_str(), "de");
    assert!(facilitator.clearly_preferred_group().is_some());
    assert_eq!(facilitator.locales_and_confidences().as_deref(), Some("en 0, de 4"));

    let groups = facilitator.groups();
    assert!(groups[0].weight_for_locale(&groups, false) < 1.0);
    assert_eq!(groups[1].weight_for_locale(&groups, false), 1.0);

    let out = type_word(&engine, &WordComposer::from_typed_word("bite"), &ctx, InputStyle::Typing);
    let correction = out.auto_correction().expect("auto-correction");
    assert_eq!(correction.word, "bitte");
    assert_eq!(correction.source_dict.locale, Some(Locale::new("de")));
}

#[test]
fn removed_word_stays_out_until_typed_again() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", english);
    let engine = engine(dir.path(), "en", &[]);
    let facilitator = engine.facilitator();
    let ctx = NgramContext::empty();

    assert!(facilitator.is_valid_spelling_word("tea"));
    facilitator.remove_word("tea");
    facilitator.remove_word("tea");
    assert_eq!(facilitator.groups()[0].blacklist().len(), 1);
    assert!(!facilitator.is_valid_spelling_word("tea"));

    let out = type_word(&engine, &WordComposer::from_typed_word("teh"), &ctx, InputStyle::Typing);
    assert!(out.words.iter().all(|s| s.word != "tea"));
    assert!(out.raw_suggestions.as_ref().unwrap().iter().all(|s| s.word != "tea"));

    facilitator.add_to_user_history("tea", false, &ctx, 1, true);
    assert!(facilitator.is_valid_spelling_word("tea"));
    assert!(facilitator.groups()[0].blacklist().is_empty());

    facilitator.remove_word("ten");
    assert!(facilitator.wait_for_background_tasks(WAIT));
    let saved = std::fs::read_to_string(dir.path().join("blacklist-en.txt")).unwrap();
    assert_eq!(saved.lines().collect::<Vec<_>>(), vec!["ten"]);
}

#[test]
fn removals_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", english);
    {
        let engine = engine(dir.path(), "en", &[]);
        engine.facilitator().remove_word("ten");
        assert!(engine.facilitator().wait_for_background_tasks(WAIT));
    }
    let engine = engine(dir.path(), "en", &[]);
    assert!(!engine.facilitator().is_valid_spelling_word("ten"));
    assert!(engine.facilitator().is_valid_spelling_word("the"));
}

fn gesture_words(b: &mut CompiledDictionaryBuilder) {
    b.add_word("help", 210)
        .add_word("hello", 200)
        .add_word("hell", 50)
        .add_word("please", 200)
        .add_bigram("please", "hello", 200);
}

fn gesture(word: &str) -> WordComposer {
    let mut composer = WordComposer::new();
    composer.set_batch_input_word(word);
    composer
}

#[test]
fn gesture_prefers_word_seen_in_context() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", gesture_words);
    let engine = engine(dir.path(), "en", &[]);

    let out = type_word(&engine, &gesture("helo"), &NgramContext::empty(), InputStyle::TailBatch);
    assert_eq!(out.word(0), Some("help"));

    let after_please = NgramContext::from_words(vec![WordInfo::new("please")]);
    let out = type_word(&engine, &gesture("helo"), &after_please, InputStyle::TailBatch);
    assert_eq!(out.word(0), Some("hello"));
    assert_eq!(out.word(1), Some("help"));
    assert_eq!(out.typed_word(), Some("hello"));
    assert!(out.typed_word_valid);
    assert!(!out.will_auto_correct);
    assert_eq!(out.input_style, InputStyle::TailBatch);
}

#[test]
fn rejected_gesture_result_moves_down() {
    let dir = tempfile::tempdir().unwrap();
    write_main(dir.path(), "en", gesture_words);
    let engine = engine(dir.path(), "en", &[]);

    let mut composer = gesture("helo");
    composer.set_rejected_batch_mode_suggestion(Some("help".to_string()));
    let mut delivered = None;
    let settings = engine.facilitator().settings();
    engine.get_suggested_words_with_callback(
        &composer,
        &NgramContext::empty(),
        &KeyboardState::default(),
        &settings,
        true,
        InputStyle::UpdateBatch,
        3,
        |words| delivered = Some(words),
    );
    let out = delivered.expect("callback ran");
    assert_eq!(out.word(0), Some("hello"));
    assert_eq!(out.word(1), Some("help"));
    assert_eq!(out.sequence_number, 3);
}
