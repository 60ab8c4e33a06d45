//! Suggestion decision engine.
//!
//! Turns the merged dictionary candidates for the word being composed into
//! the list shown to the user and decides whether committing replaces the
//! typed word. Three paths:
//! - empty typed word: context predictions, never auto-corrected
//! - gesture input: the best decode stands in for the typed word
//! - typing: case and quote transformation, typed-word reconciliation and
//!   the auto-correction decision

use crate::autocorrect::{AutoCorrector, ContextScores};
use crate::candidate::{kind, remove_dups_and_typed_word, DictionaryRef, SuggestedWordInfo, SuggestionResults};
use crate::composer::{CapsMode, WordComposer};
use crate::dictionary::DictType;
use crate::facilitator::DictionaryFacilitator;
use crate::keyboard::KeyboardState;
use crate::ngram::NgramContext;
use crate::settings::Settings;
use crate::suggested_words::{InputStyle, SuggestedWords};
use crate::text;
use std::sync::Arc;
use tracing::{debug, trace};

/// Typing and gesture lookups share one dictionary session.
pub const SESSION_ID_TYPING: i32 = 0;
pub const SESSION_ID_GESTURE: i32 = 0;

/// Gesture candidates scoring below this are decoder noise.
const SUPPRESS_SUGGEST_THRESHOLD: i32 = -2_000_000_000;

const SINGLE_LETTER_RIVAL_RATIO: f64 = 0.94;
const SINGLE_LETTER_DEMOTION: f64 = 0.93;

/// Next-word predictions below this are not trusted to steer gesture input.
const NEXT_WORD_PREFERENCE_MIN_SCORE: i32 = 170;
const NEXT_WORD_PREFERENCE_RATIO: f64 = 0.93;

#[derive(Clone)]
pub struct Suggest {
    facilitator: Arc<DictionaryFacilitator>,
}

impl Suggest {
    pub fn new(facilitator: Arc<DictionaryFacilitator>) -> Self {
        Self { facilitator }
    }

    pub fn facilitator(&self) -> &Arc<DictionaryFacilitator> {
        &self.facilitator
    }

    /// Drops cached context predictions, e.g. after a settings change.
    pub fn clear_next_word_suggestions_cache(&self) {
        self.facilitator.clear_on_settings_reload();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn get_suggested_words(
        &self,
        composer: &WordComposer,
        ngram_context: &NgramContext,
        keyboard: &KeyboardState,
        settings: &Settings,
        correction_enabled: bool,
        input_style: InputStyle,
        sequence_number: i32,
    ) -> SuggestedWords {
        let words = if composer.is_batch_mode() {
            self.suggested_words_for_batch_input(composer, ngram_context, keyboard, settings, input_style, sequence_number)
        } else {
            self.suggested_words_for_non_batch_input(
                composer,
                ngram_context,
                keyboard,
                settings,
                input_style,
                correction_enabled,
                sequence_number,
            )
        };
        debug!(
            typed = composer.typed_word(),
            count = words.len(),
            will_auto_correct = words.will_auto_correct,
            style = ?words.input_style,
            "suggestions ready"
        );
        words
    }

    /// Same as `get_suggested_words`, delivering the result to `callback`.
    #[allow(clippy::too_many_arguments)]
    pub fn get_suggested_words_with_callback<F>(
        &self,
        composer: &WordComposer,
        ngram_context: &NgramContext,
        keyboard: &KeyboardState,
        settings: &Settings,
        correction_enabled: bool,
        input_style: InputStyle,
        sequence_number: i32,
        callback: F,
    ) where
        F: FnOnce(SuggestedWords),
    {
        callback(self.get_suggested_words(
            composer,
            ngram_context,
            keyboard,
            settings,
            correction_enabled,
            input_style,
            sequence_number,
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn suggested_words_for_non_batch_input(
        &self,
        composer: &WordComposer,
        ngram_context: &NgramContext,
        keyboard: &KeyboardState,
        settings: &Settings,
        input_style_if_not_prediction: InputStyle,
        correction_enabled: bool,
        sequence_number: i32,
    ) -> SuggestedWords {
        let typed_word = composer.typed_word();
        let results_are_predictions = !composer.is_composing_word();
        let proximity = keyboard.proximity;
        let results = if typed_word.is_empty() {
            self.facilitator
                .get_next_word_suggestions(ngram_context, proximity, settings, SESSION_ID_TYPING)
        } else {
            self.facilitator.get_suggestion_results(
                &composer.composed_data(),
                ngram_context,
                proximity,
                settings,
                SESSION_ID_TYPING,
                input_style_if_not_prediction,
            )
        };

        let trailing_quotes = text::trailing_single_quotes_count(typed_word);
        let caps_mode = keyboard.caps_mode;
        let all_upper = (composer.is_all_upper_case() && !composer.is_resumed()) || caps_mode == CapsMode::ManualShiftLocked;
        let first_char = composer.is_or_will_be_only_first_char_capitalized() || caps_mode == CapsMode::ManualShifted;
        let mut container: Vec<SuggestedWordInfo> = results
            .iter()
            .map(|info| transformed(info, all_upper, first_char, trailing_quotes))
            .collect();

        let capitalized_typed_word = capitalize(
            typed_word,
            caps_mode == CapsMode::ManualShiftLocked,
            caps_mode == CapsMode::ManualShifted,
        );
        // Kept so the typed word can be shown again next to an auto-correction.
        let typed_word_first_occurrence = container.iter().find(|s| s.word == capitalized_typed_word).cloned();
        let first_occurrence_of_typed_word = remove_dups_and_typed_word(Some(&capitalized_typed_word), &mut container);

        let preferred = self.facilitator.currently_preferred_group();
        let corrector = AutoCorrector {
            settings,
            correction_enabled,
            current_locale: Some(preferred.locale()),
            has_initialized_main_dictionary: self.facilitator.has_at_least_one_initialized_main_dictionary(),
            input_purpose: keyboard.input_purpose,
        };
        let first = container.first().cloned();
        let probe = || {
            let Some(first_word) = first.as_ref().or_else(|| results.first()).map(|f| f.word.clone()) else {
                return ContextScores::default();
            };
            let next_words = self
                .facilitator
                .get_next_word_suggestions(ngram_context, proximity, settings, SESSION_ID_TYPING);
            ContextScores {
                first: next_words.find(&first_word).map(|s| s.score),
                typed: next_words.find(&capitalized_typed_word).map(|s| s.score),
            }
        };
        let decision = corrector.decide(
            composer,
            &capitalized_typed_word,
            &results,
            typed_word_first_occurrence.as_ref(),
            first.as_ref(),
            probe,
        );

        let typed_word_info = (!capitalized_typed_word.is_empty()).then(|| {
            let source = typed_word_first_occurrence
                .as_ref()
                .map(|s| s.source_dict.clone())
                .unwrap_or_else(DictionaryRef::user_typed);
            SuggestedWordInfo::typed(capitalized_typed_word.as_str(), source)
        });
        if let Some(info) = &typed_word_info {
            container.insert(0, info.clone());
        }

        let input_style = if results_are_predictions {
            if results.is_beginning_of_sentence {
                InputStyle::BeginningOfSentencePrediction
            } else {
                InputStyle::Prediction
            }
        } else {
            input_style_if_not_prediction
        };

        // With an auto-correction pending, the typed word stays selectable
        // right after it.
        let index_of_typed_word = if decision.has_auto_correction { 2 } else { 1 };
        let show_typed_word = decision.has_auto_correction
            || (settings.center_suggestion_text_to_enter && !composer.is_resumed())
            || capitalized_typed_word != typed_word;
        if show_typed_word && container.len() >= index_of_typed_word && !capitalized_typed_word.is_empty() {
            let entry = typed_word_first_occurrence.clone().unwrap_or_else(|| {
                SuggestedWordInfo::new(capitalized_typed_word.as_str(), "", 0, kind::TYPED, DictionaryRef::user_typed())
            });
            container.insert(index_of_typed_word, entry);
        }

        let typed_word_valid = first_occurrence_of_typed_word.is_some()
            || (!results_are_predictions && !decision.allows_to_be_auto_corrected);
        trace!(
            typed = %capitalized_typed_word,
            allows = decision.allows_to_be_auto_corrected,
            has = decision.has_auto_correction,
            typed_word_valid,
            "typing suggestions"
        );
        SuggestedWords {
            words: container,
            raw_suggestions: results.raw_suggestions.clone(),
            typed_word_info,
            typed_word_valid,
            will_auto_correct: decision.has_auto_correction,
            is_obsolete: false,
            input_style,
            sequence_number,
        }
    }

    fn suggested_words_for_batch_input(
        &self,
        composer: &WordComposer,
        ngram_context: &NgramContext,
        keyboard: &KeyboardState,
        settings: &Settings,
        input_style: InputStyle,
        sequence_number: i32,
    ) -> SuggestedWords {
        let proximity = keyboard.proximity;
        let mut results = self.facilitator.get_suggestion_results(
            &composer.composed_data(),
            ngram_context,
            proximity,
            settings,
            SESSION_ID_GESTURE,
            input_style,
        );
        replace_single_letter_first_suggestion(&mut results);

        let caps_mode = keyboard.caps_mode;
        let first_char = composer.was_shifted_no_lock() || caps_mode == CapsMode::ManualShifted;
        let all_upper = composer.is_all_upper_case() || caps_mode == CapsMode::ManualShiftLocked;
        let mut container: Vec<SuggestedWordInfo> = results
            .iter()
            .map(|info| transformed(info, all_upper, first_char, 0))
            .collect();

        let rejected = match composer.rejected_batch_mode_suggestion() {
            Some(word) if container.len() > 1 && container[0].word == word => {
                let rejected = container.remove(0);
                container.insert(1, rejected.clone());
                Some(rejected)
            }
            _ => None,
        };
        remove_dups_and_typed_word(None, &mut container);
        container.retain(|s| s.score >= SUPPRESS_SUGGEST_THRESHOLD);

        let typed_word = composer.typed_word();
        let capitalized_typed_word = capitalize(
            typed_word,
            caps_mode == CapsMode::ManualShiftLocked,
            caps_mode == CapsMode::ManualShifted,
        );
        if capitalized_typed_word != typed_word && !container.iter().skip(1).any(|s| s.word == capitalized_typed_word) {
            let at = container.len().min(1);
            container.insert(
                at,
                SuggestedWordInfo::new(capitalized_typed_word, "", 0, kind::TYPED, DictionaryRef::user_typed()),
            );
        }

        // The best decode acts as the typed word: valid, never auto-corrected.
        let next_words = self
            .facilitator
            .get_next_word_suggestions(ngram_context, proximity, settings, SESSION_ID_TYPING);
        let pseudo_typed_word = prefer_next_word_suggestion(
            container.first().cloned(),
            &mut container,
            next_words,
            rejected.as_ref(),
            settings.use_personalized_dicts,
        );
        SuggestedWords {
            words: container,
            raw_suggestions: results.raw_suggestions.clone(),
            typed_word_info: pseudo_typed_word,
            typed_word_valid: true,
            will_auto_correct: false,
            is_obsolete: false,
            input_style,
            sequence_number,
        }
    }
}

fn capitalize(word: &str, all_upper: bool, first_char: bool) -> String {
    if all_upper {
        word.to_uppercase()
    } else if first_char {
        text::capitalize_first_code_point(word)
    } else {
        word.to_string()
    }
}

/// Applies the typed word's case profile to a candidate and re-appends the
/// typed word's trailing quotes. A candidate that already contains a quote
/// gets one fewer.
fn transformed(info: &SuggestedWordInfo, all_upper: bool, first_char: bool, trailing_quotes: usize) -> SuggestedWordInfo {
    let mut word = capitalize(&info.word, all_upper, first_char);
    let quotes = trailing_quotes.saturating_sub(usize::from(info.word.contains('\'')));
    word.extend(std::iter::repeat('\'').take(quotes));
    if word == info.word {
        info.clone()
    } else {
        info.with_word(word)
    }
}

/// A single-letter gesture decode closely followed by a longer word is
/// demoted below it.
fn replace_single_letter_first_suggestion(results: &mut SuggestionResults) {
    let (Some(first), Some(second)) = (results.get(0), results.get(1)) else {
        return;
    };
    if first.code_point_count() != 1 {
        return;
    }
    if second.code_point_count() > 1 && f64::from(second.score) > SINGLE_LETTER_RIVAL_RATIO * f64::from(first.score) {
        let first = first.clone();
        results.remove_word(&first.word);
        let demoted = (f64::from(first.score) * SINGLE_LETTER_DEMOTION) as i32;
        trace!(word = %first.word, from = first.score, to = demoted, "demoted single-letter decode");
        results.add(first.with_score(demoted));
    }
}

/// Moves the first good candidate the user already typed in this context
/// to the front and returns it as the new pseudo typed word.
fn prefer_next_word_suggestion(
    pseudo_typed_word: Option<SuggestedWordInfo>,
    container: &mut Vec<SuggestedWordInfo>,
    mut next_words: SuggestionResults,
    rejected: Option<&SuggestedWordInfo>,
    use_personalized_dicts: bool,
) -> Option<SuggestedWordInfo> {
    let Some(pseudo) = pseudo_typed_word.as_ref() else {
        return pseudo_typed_word;
    };
    if !use_personalized_dicts || pseudo.source_dict.dict_type != DictType::Main || container.len() < 2 {
        return pseudo_typed_word;
    }
    next_words.retain(|s| s.score >= NEXT_WORD_PREFERENCE_MIN_SCORE);
    if next_words.is_empty() {
        return pseudo_typed_word;
    }
    let floor = f64::from(pseudo.score) * NEXT_WORD_PREFERENCE_RATIO;
    let mut chosen = None;
    for (i, suggestion) in container.iter().enumerate() {
        if f64::from(suggestion.score) < floor {
            break;
        }
        if rejected.is_some_and(|r| r.word == suggestion.word) {
            continue;
        }
        if next_words.contains_word(&suggestion.word) {
            chosen = Some(i);
            break;
        }
    }
    match chosen {
        Some(i) => {
            let preferred = container.remove(i);
            container.insert(0, preferred.clone());
            Some(preferred)
        }
        None => pseudo_typed_word,
    }
}
