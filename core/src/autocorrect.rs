//! Auto-correction decision.
//!
//! Given the ranked candidates for a typed word, decides whether the typed
//! word may be replaced at all (`allows_to_be_auto_corrected`) and whether
//! the top candidate actually replaces it (`has_auto_correction`).
//!
//! The context probe is a next-word lookup with the typed word blanked. It
//! is only run when the raw scores cannot settle the question.

use crate::candidate::{kind, SuggestedWordInfo, SuggestionResults};
use crate::composer::WordComposer;
use crate::keyboard::InputPurpose;
use crate::locale::Locale;
use crate::settings::Settings;
use crate::text;
use tracing::trace;

/// Languages whose compounds make long suggestions containing a space
/// suspicious, with the longest such suggestion still allowed.
const SPACE_FILTER_LIMITS: &[(&str, usize)] = &[("de", 12)];

/// Scores of the top candidate and of the typed word among the pure context
/// predictions for the current n-gram context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextScores {
    pub first: Option<i32>,
    pub typed: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoCorrectionDecision {
    pub allows_to_be_auto_corrected: bool,
    pub has_auto_correction: bool,
}

impl AutoCorrectionDecision {
    fn new(allows_to_be_auto_corrected: bool, has_auto_correction: bool) -> Self {
        Self {
            allows_to_be_auto_corrected,
            has_auto_correction,
        }
    }
}

/// Runs the context probe at most once.
struct ContextProbe<F> {
    probe: Option<F>,
    scores: Option<ContextScores>,
}

impl<F: FnOnce() -> ContextScores> ContextProbe<F> {
    fn new(probe: F) -> Self {
        Self {
            probe: Some(probe),
            scores: None,
        }
    }

    fn scores(&mut self) -> ContextScores {
        if let Some(scores) = self.scores {
            return scores;
        }
        let scores = self.probe.take().map(|f| f()).unwrap_or_default();
        self.scores = Some(scores);
        scores
    }
}

/// Inputs of one decision that do not depend on the candidate list.
#[derive(Debug, Clone, Copy)]
pub struct AutoCorrector<'a> {
    pub settings: &'a Settings,
    pub correction_enabled: bool,
    /// Locale of the currently preferred dictionary group.
    pub current_locale: Option<&'a Locale>,
    pub has_initialized_main_dictionary: bool,
    pub input_purpose: InputPurpose,
}

impl AutoCorrector<'_> {
    /// Decides for `typed_word`.
    ///
    /// `typed_word_info` is the typed word's own entry if a dictionary
    /// offered it, `first` the top candidate once the typed word has been
    /// taken out of the list.
    pub fn decide<F>(
        &self,
        composer: &WordComposer,
        typed_word: &str,
        results: &SuggestionResults,
        typed_word_info: Option<&SuggestedWordInfo>,
        first: Option<&SuggestedWordInfo>,
        context_probe: F,
    ) -> AutoCorrectionDecision
    where
        F: FnOnce() -> ContextScores,
    {
        let mut probe = ContextProbe::new(context_probe);
        let trailing_quotes = text::trailing_single_quotes_count(typed_word);
        let considered: String = {
            let count = typed_word.chars().count();
            typed_word.chars().take(count - trailing_quotes).collect()
        };
        let score_limit = self.settings.score_limit_for_autocorrect();

        let allows = self.allows_to_be_auto_corrected(&considered, typed_word, typed_word_info, first, score_limit, &mut probe);

        let disqualified = !self.correction_enabled
            || !allows
            || !composer.is_composing_word()
            || results.is_empty()
            || composer.has_digits()
            || composer.is_mostly_caps()
            || composer.is_resumed()
            || self.input_purpose.is_url_or_email()
            || !self.has_initialized_main_dictionary;
        if disqualified {
            trace!(typed_word, allows, "auto-correction disqualified");
            return AutoCorrectionDecision::new(allows, false);
        }

        let Some(first_suggestion) = first.or_else(|| results.first()) else {
            return AutoCorrectionDecision::new(allows, false);
        };
        if !self.suggestion_exceeds_threshold(first_suggestion, &considered) {
            return AutoCorrectionDecision::new(true, false);
        }
        let allowed = self.allowed_by_space_filter(first_suggestion);

        if let Some(typed) = typed_word_info.filter(|t| allowed && t.score > score_limit) {
            if first_suggestion.score < score_limit {
                return AutoCorrectionDecision::new(true, false);
            }
            if typed.source_dict.locale != first_suggestion.source_dict.locale {
                let prefers_first = self.current_locale.is_some()
                    && self.current_locale == first_suggestion.source_dict.locale.as_ref();
                return AutoCorrectionDecision::new(true, prefers_first);
            }
            let bonus = &self.settings.typed_word_bonus;
            let mut first_bonus = 0;
            if first_suggestion.is_kind_of(kind::WHITELIST) {
                first_bonus += bonus.whitelist;
            }
            if text::is_lowercase_ascii(typed_word) {
                first_bonus += bonus.lowercase_ascii;
            }
            if first_suggestion.score > typed.score {
                first_bonus += bonus.higher_score;
            }
            let scores = probe.scores();
            let first_context = scores.first.unwrap_or(0);
            let typed_context = scores.typed.unwrap_or(0);
            let has = first_context + first_bonus >= typed_context + bonus.required_margin;
            trace!(
                typed_word,
                first = %first_suggestion.word,
                first_context,
                typed_context,
                first_bonus,
                has,
                "typed word competes with top candidate"
            );
            return AutoCorrectionDecision::new(true, has);
        }
        AutoCorrectionDecision::new(allows, allowed)
    }

    fn allows_to_be_auto_corrected<F: FnOnce() -> ContextScores>(
        &self,
        considered: &str,
        typed_word: &str,
        typed_word_info: Option<&SuggestedWordInfo>,
        first: Option<&SuggestedWordInfo>,
        score_limit: i32,
        probe: &mut ContextProbe<F>,
    ) -> bool {
        if first.is_some_and(|f| f.is_kind_of(kind::WHITELIST))
            || (considered.chars().count() > 1 && typed_word_info.is_none())
        {
            return true;
        }
        let Some(first) = first.filter(|_| !typed_word.is_empty()) else {
            return false;
        };
        if first.score > score_limit {
            return true;
        }
        match probe.scores() {
            ContextScores { first: None, .. } => false,
            ContextScores { typed: None, .. } => true,
            ContextScores {
                first: Some(first_context),
                typed: Some(typed_context),
            } => first_context - typed_context > self.settings.typed_word_bonus.next_word_margin,
        }
    }

    /// Whether `suggestion` is strong enough to replace `typed`.
    pub fn suggestion_exceeds_threshold(&self, suggestion: &SuggestedWordInfo, typed: &str) -> bool {
        if suggestion.is_kind_of(kind::WHITELIST) {
            return true;
        }
        if suggestion.is_kind_of(kind::SHORTCUT) {
            if !self.settings.autocorrect_shortcuts {
                return false;
            }
        } else if !suggestion.is_appropriate_for_auto_correction() {
            return false;
        }
        let normalized = calc_normalized_score(typed, &suggestion.word, suggestion.score);
        trace!(typed, word = %suggestion.word, normalized, "normalized score");
        normalized >= self.settings.auto_correction_threshold
    }

    fn allowed_by_space_filter(&self, suggestion: &SuggestedWordInfo) -> bool {
        let Some(locale) = &suggestion.source_dict.locale else {
            return true;
        };
        let language = locale.language();
        match SPACE_FILTER_LIMITS.iter().find(|(lang, _)| *lang == language) {
            Some(&(_, limit)) => suggestion.code_point_count() <= limit || !suggestion.word.contains(' '),
            None => true,
        }
    }
}

/// Score of `after` as a replacement for `before`, scaled down by how much
/// of `after` had to be edited. Zero when nothing sensible can be said.
pub fn calc_normalized_score(before: &str, after: &str, score: i32) -> f32 {
    let before_len = before.chars().count();
    let after_len = after.chars().count();
    if before_len == 0 || after_len == 0 || after.chars().all(|c| c == ' ') || score <= 0 {
        return 0.0;
    }
    let distance = levenshtein(before, after);
    if distance >= after_len {
        return 0.0;
    }
    (score as f32 / 1_000_000.0) * (1.0 - distance as f32 / after_len as f32)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{remove_dups_and_typed_word, DictionaryRef, MAX_SCORE};
    use crate::dictionary::DictType;
    use crate::settings::AutoCorrectionTier;

    fn suggestion(word: &str, score: i32, locale: &str) -> SuggestedWordInfo {
        let k = if score == MAX_SCORE {
            kind::WHITELIST
        } else {
            kind::CORRECTION | kind::FLAG_APPROPRIATE_FOR_AUTO_CORRECTION
        };
        SuggestedWordInfo::new(word, "", score, k, DictionaryRef::new(DictType::Main, Some(Locale::new(locale))))
    }

    fn shortcut(word: &str, score: i32) -> SuggestedWordInfo {
        SuggestedWordInfo::new(word, "", score, kind::SHORTCUT, DictionaryRef::new(DictType::Main, Some(Locale::new("en"))))
    }

    fn settings(tier: AutoCorrectionTier) -> Settings {
        let mut s = Settings::default();
        s.set_auto_correction_tier(tier);
        s
    }

    /// Runs a decision the way the suggestion pipeline does for a plain
    /// typed word, with `next_words` as the context predictions.
    fn decide(
        typed: &str,
        suggestions: Vec<SuggestedWordInfo>,
        next_words: &[(&str, i32)],
        settings: &Settings,
        locale: &str,
    ) -> AutoCorrectionDecision {
        let mut results = SuggestionResults::new(18, false);
        results.add_all(suggestions.iter().cloned());
        let typed_info = suggestions.iter().find(|s| s.word == typed).cloned();
        let mut container = suggestions;
        remove_dups_and_typed_word(Some(typed), &mut container);
        let first = container.first().cloned();
        let composer = WordComposer::from_typed_word(typed);
        let locale = Locale::new(locale);
        let corrector = AutoCorrector {
            settings,
            correction_enabled: true,
            current_locale: Some(&locale),
            has_initialized_main_dictionary: true,
            input_purpose: InputPurpose::FreeForm,
        };
        let score_of = |w: &str| next_words.iter().find(|(n, _)| *n == w).map(|&(_, s)| s);
        let first_word = first.as_ref().map(|f| f.word.clone()).unwrap_or_default();
        corrector.decide(&composer, typed, &results, typed_info.as_ref(), first.as_ref(), || ContextScores {
            first: score_of(&first_word),
            typed: score_of(typed),
        })
    }

    fn has(typed: &str, suggestions: Vec<SuggestedWordInfo>, next_words: &[(&str, i32)], tier: AutoCorrectionTier) -> bool {
        decide(typed, suggestions, next_words, &settings(tier), "en").has_auto_correction
    }

    #[test]
    fn valid_typed_word_with_weak_candidate_stays() {
        let s = vec![suggestion("on", 1_800_000, "en"), suggestion("in", 600_000, "en")];
        assert!(!has("on", s, &[("in", 240)], AutoCorrectionTier::Modest));
    }

    #[test]
    fn whitelist_against_valid_typed_word_uses_context() {
        let s = || vec![suggestion("I'll", MAX_SCORE, "en"), suggestion("ill", 1_500_000, "en")];
        let modest = AutoCorrectionTier::Modest;
        assert!(has("ill", s(), &[], modest));
        assert!(!has("ill", s(), &[("ill", 200)], modest));
        assert!(has("ill", s(), &[("I'll", 200), ("ill", 200)], modest));
        assert!(!has("ill", s(), &[("I'll", 200), ("ill", 211)], modest));
    }

    #[test]
    fn different_locales_prefer_current_locale() {
        let s = || vec![suggestion("I", MAX_SCORE, "en"), suggestion("i", 1_500_000, "pl")];
        let very = settings(AutoCorrectionTier::VeryAggressive);
        assert!(!decide("i", s(), &[], &very, "pl").has_auto_correction);
        let modest = settings(AutoCorrectionTier::Modest);
        assert!(decide("i", s(), &[], &modest, "en").has_auto_correction);

        let s = vec![suggestion("in", MAX_SCORE, "en"), suggestion("un", 1_500_000, "fr")];
        assert!(!decide("un", s, &[], &modest, "fr").has_auto_correction);
    }

    #[test]
    fn accent_pair_needs_context_margin() {
        let s = || vec![suggestion("ne", 1_900_000, "fr"), suggestion("né", 1_899_999, "fr")];
        let modest = settings(AutoCorrectionTier::Modest);
        let run = |next: &[(&str, i32)]| decide("ne", s(), next, &modest, "fr").has_auto_correction;
        assert!(!run(&[]));
        assert!(run(&[("né", 200)]));
        assert!(run(&[("né", 215), ("ne", 200)]));
        assert!(!run(&[("né", 200), ("ne", 200)]));
    }

    #[test]
    fn weak_candidate_with_equal_context_is_not_allowed() {
        let s = vec![suggestion("ne", 600_000, "fr"), suggestion("né", 1_600_000, "fr")];
        let d = decide("né", s, &[("né", 200), ("ne", 200)], &settings(AutoCorrectionTier::Modest), "fr");
        assert!(!d.allows_to_be_auto_corrected);
        assert!(!d.has_auto_correction);
    }

    #[test]
    fn shortcuts_follow_threshold_and_setting() {
        assert!(has("gd", vec![shortcut("good", 700_000)], &[], AutoCorrectionTier::Aggressive));
        assert!(!has("gd", vec![shortcut("good", 300_000)], &[], AutoCorrectionTier::Modest));

        let mut s = settings(AutoCorrectionTier::Aggressive);
        s.autocorrect_shortcuts = false;
        assert!(!decide("gd", vec![shortcut("good", 12_000_000)], &[], &s, "en").has_auto_correction);
    }

    #[test]
    fn digits_disqualify() {
        let s = vec![suggestion("123", MAX_SCORE, "en")];
        let d = decide("12", s, &[], &settings(AutoCorrectionTier::VeryAggressive), "en");
        assert!(d.allows_to_be_auto_corrected);
        assert!(!d.has_auto_correction);
    }

    #[test]
    fn long_german_phrases_are_filtered() {
        let s = vec![suggestion("zum beispiel gesagt", 1_900_000, "de")];
        let d = decide("zumbeispielgesagt", s, &[], &settings(AutoCorrectionTier::VeryAggressive), "de");
        assert!(d.allows_to_be_auto_corrected);
        assert!(!d.has_auto_correction);

        let s = vec![suggestion("zum beispiel gesagt", 1_900_000, "en")];
        let d = decide("zumbeispielgesagt", s, &[], &settings(AutoCorrectionTier::VeryAggressive), "en");
        assert!(d.has_auto_correction);
    }

    #[test]
    fn normalized_score() {
        assert_eq!(calc_normalized_score("", "the", 1_000_000), 0.0);
        assert_eq!(calc_normalized_score("teh", "   ", 1_000_000), 0.0);
        assert_eq!(calc_normalized_score("abc", "xyz", 1_000_000), 0.0);
        let s = calc_normalized_score("teh", "the", 1_600_000);
        assert!((s - 1.6 / 3.0).abs() < 1e-4);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("né", "ne"), 1);
    }
}
