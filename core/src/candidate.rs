//! Suggestion candidates and the bounded, ranked result set.
//!
//! This module provides:
//! - `SuggestedWordInfo`: one candidate word with score, kind/flags and source
//! - `kind`: the kind enumeration and flag bits packed into `kind_and_flags`
//! - `SuggestionResults`: capacity-bounded ranked set de-duplicated by word
//! - `remove_dups_and_typed_word`: list clean-up used by the decision engine

use crate::dictionary::DictType;
use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const MAX_SCORE: i32 = i32::MAX;
pub const NOT_AN_INDEX: i32 = -1;
pub const NOT_A_CONFIDENCE: i32 = -1;

/// Capacity of the merged suggestion set.
pub const MAX_SUGGESTIONS: usize = 18;

/// Kinds and flags of a suggestion, packed as `kind | flags`.
pub mod kind {
    pub const MASK_KIND: u32 = 0xFF;

    pub const TYPED: u32 = 0;
    pub const CORRECTION: u32 = 1;
    pub const COMPLETION: u32 = 2;
    pub const WHITELIST: u32 = 3;
    pub const BLACKLIST: u32 = 4;
    pub const HARDCODED: u32 = 5;
    pub const APP_DEFINED: u32 = 6;
    pub const SHORTCUT: u32 = 7;
    pub const PREDICTION: u32 = 8;
    pub const CLIPBOARD: u32 = 9;
    pub const RESUMED: u32 = 10;
    pub const OOV_CORRECTION: u32 = 11;

    pub const FLAG_POSSIBLY_OFFENSIVE: u32 = 0x8000_0000;
    pub const FLAG_EXACT_MATCH: u32 = 0x4000_0000;
    pub const FLAG_EXACT_MATCH_WITH_ACCENTS: u32 = 0x2000_0000;
    pub const FLAG_APPROPRIATE_FOR_AUTO_CORRECTION: u32 = 0x1000_0000;
}

/// Identity of the dictionary a candidate came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DictionaryRef {
    pub dict_type: DictType,
    pub locale: Option<Locale>,
}

impl DictionaryRef {
    pub fn new(dict_type: DictType, locale: Option<Locale>) -> Self {
        Self { dict_type, locale }
    }

    /// Source used for the literal typed word when no dictionary knows it.
    pub fn user_typed() -> Self {
        Self::new(DictType::UserTyped, None)
    }
}

impl fmt::Display for DictionaryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locale {
            Some(locale) => write!(f, "{}:{}", self.dict_type, locale),
            None => write!(f, "{}", self.dict_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedWordInfo {
    pub word: String,
    pub prev_words_context: String,
    pub score: i32,
    pub kind_and_flags: u32,
    pub source_dict: DictionaryRef,
    pub index_of_touch_point_of_second_word: i32,
    pub auto_commit_first_word_confidence: i32,
    pub debug_string: Option<String>,
    code_point_count: usize,
}

impl SuggestedWordInfo {
    pub fn new<T: Into<String>>(
        word: T,
        prev_words_context: impl Into<String>,
        score: i32,
        kind_and_flags: u32,
        source_dict: DictionaryRef,
    ) -> Self {
        let word = word.into();
        let code_point_count = word.chars().count();
        Self {
            word,
            prev_words_context: prev_words_context.into(),
            score,
            kind_and_flags,
            source_dict,
            index_of_touch_point_of_second_word: NOT_AN_INDEX,
            auto_commit_first_word_confidence: NOT_A_CONFIDENCE,
            debug_string: None,
            code_point_count,
        }
    }

    /// Entry for the literal typed word, always ranked first.
    pub fn typed(word: impl Into<String>, source_dict: DictionaryRef) -> Self {
        Self::new(word, "", MAX_SCORE, kind::TYPED, source_dict)
    }

    /// Same candidate with a different surface form.
    pub fn with_word(&self, word: impl Into<String>) -> Self {
        let word = word.into();
        Self {
            code_point_count: word.chars().count(),
            word,
            ..self.clone()
        }
    }

    pub fn with_score(&self, score: i32) -> Self {
        Self {
            score,
            ..self.clone()
        }
    }

    pub fn code_point_count(&self) -> usize {
        self.code_point_count
    }

    pub fn kind(&self) -> u32 {
        self.kind_and_flags & kind::MASK_KIND
    }

    pub fn is_kind_of(&self, k: u32) -> bool {
        self.kind() == k
    }

    pub fn is_possibly_offensive(&self) -> bool {
        self.kind_and_flags & kind::FLAG_POSSIBLY_OFFENSIVE != 0
    }

    pub fn is_exact_match(&self) -> bool {
        self.kind_and_flags & kind::FLAG_EXACT_MATCH != 0
    }

    pub fn is_exact_match_with_accents(&self) -> bool {
        self.kind_and_flags & kind::FLAG_EXACT_MATCH_WITH_ACCENTS != 0
    }

    pub fn is_appropriate_for_auto_correction(&self) -> bool {
        self.kind_and_flags & kind::FLAG_APPROPRIATE_FOR_AUTO_CORRECTION != 0
    }

    /// Ranking: higher score first, then the source dictionary's priority,
    /// then shorter words, then code point order.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| {
                self.source_dict
                    .dict_type
                    .priority()
                    .cmp(&other.source_dict.dict_type.priority())
            })
            .then_with(|| self.code_point_count.cmp(&other.code_point_count))
            .then_with(|| self.word.cmp(&other.word))
    }
}

impl fmt::Display for SuggestedWordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.word)
    }
}

/// Removes the typed word and every later duplicate from `candidates`.
///
/// Returns the index the typed word first occurred at, if it occurred.
pub fn remove_dups_and_typed_word(
    typed_word: Option<&str>,
    candidates: &mut Vec<SuggestedWordInfo>,
) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let first_occurrence = match typed_word {
        Some(typed) if !typed.is_empty() => remove_word_after(typed, candidates, 0),
        _ => None,
    };
    let mut i = 0;
    while i < candidates.len() {
        let word = candidates[i].word.clone();
        remove_word_after(&word, candidates, i + 1);
        i += 1;
    }
    first_occurrence
}

fn remove_word_after(word: &str, candidates: &mut Vec<SuggestedWordInfo>, start: usize) -> Option<usize> {
    let mut first = None;
    let mut i = start;
    while i < candidates.len() {
        if candidates[i].word == word {
            first.get_or_insert(i);
            candidates.remove(i);
        } else {
            i += 1;
        }
    }
    first
}

/// Capacity-bounded ranked collection of candidates.
///
/// A word is kept at most once: the first inserted occurrence wins, later
/// ones are ignored. Optional raw suggestions keep everything that was
/// offered, unfiltered and uncapped, for diagnostics.
#[derive(Debug, Clone)]
pub struct SuggestionResults {
    items: Vec<SuggestedWordInfo>,
    capacity: usize,
    pub is_beginning_of_sentence: bool,
    pub raw_suggestions: Option<Vec<SuggestedWordInfo>>,
}

impl SuggestionResults {
    pub fn new(capacity: usize, is_beginning_of_sentence: bool) -> Self {
        Self {
            items: Vec::new(),
            capacity,
            is_beginning_of_sentence,
            raw_suggestions: None,
        }
    }

    pub fn with_raw_suggestions(mut self) -> Self {
        self.raw_suggestions = Some(Vec::new());
        self
    }

    /// Inserts `info` at its rank. Returns false when the word is already
    /// present or the set is full and `info` ranks last.
    pub fn add(&mut self, info: SuggestedWordInfo) -> bool {
        if self.capacity == 0 || self.contains_word(&info.word) {
            return false;
        }
        if self.items.len() >= self.capacity {
            match self.items.last() {
                Some(last) if info.rank_cmp(last) != Ordering::Less => return false,
                _ => {}
            }
            self.items.pop();
        }
        let pos = self
            .items
            .partition_point(|existing| existing.rank_cmp(&info) != Ordering::Greater);
        self.items.insert(pos, info);
        true
    }

    pub fn add_all<I: IntoIterator<Item = SuggestedWordInfo>>(&mut self, infos: I) {
        for info in infos {
            self.add(info);
        }
    }

    pub fn remove_word(&mut self, word: &str) -> Option<SuggestedWordInfo> {
        let pos = self.items.iter().position(|i| i.word == word)?;
        Some(self.items.remove(pos))
    }

    pub fn retain<F: FnMut(&SuggestedWordInfo) -> bool>(&mut self, f: F) {
        self.items.retain(f);
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.items.iter().any(|i| i.word == word)
    }

    pub fn find(&self, word: &str) -> Option<&SuggestedWordInfo> {
        self.items.iter().find(|i| i.word == word)
    }

    pub fn first(&self) -> Option<&SuggestedWordInfo> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&SuggestedWordInfo> {
        self.items.last()
    }

    pub fn get(&self, index: usize) -> Option<&SuggestedWordInfo> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SuggestedWordInfo> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<SuggestedWordInfo> {
        self.items.clone()
    }
}

impl<'a> IntoIterator for &'a SuggestionResults {
    type Item = &'a SuggestedWordInfo;
    type IntoIter = std::slice::Iter<'a, SuggestedWordInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
