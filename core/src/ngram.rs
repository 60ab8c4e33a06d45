//! Rolling window of previously committed words.
//!
//! `NgramContext` is both the lookup context handed to dictionaries and the
//! key of the next-word prediction cache. Slots are stored newest first.
//!
//! Equality and hashing only look at the valid prefix: trailing slots that
//! hold no information (`WordInfo::empty()`) are ignored, so `[the]` and
//! `[the, <empty>]` are the same key.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Number of previous words a context keeps by default.
pub const MAX_PREV_WORD_COUNT_FOR_N_GRAM: usize = 3;

/// Tag emitted for the sentence-start marker in flattened contexts.
pub const BEGINNING_OF_SENTENCE_TAG: &str = "<S>";

/// Separator between words in flattened contexts.
pub const CONTEXT_SEPARATOR: &str = " ";

/// One slot of an n-gram context.
///
/// `word == None` means "no information" (for example after a comma). The
/// sentence-start marker carries an empty, known word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordInfo {
    word: Option<String>,
    beginning_of_sentence: bool,
}

impl WordInfo {
    pub fn new<T: Into<String>>(word: T) -> Self {
        Self {
            word: Some(word.into()),
            beginning_of_sentence: false,
        }
    }

    pub fn empty() -> Self {
        Self {
            word: None,
            beginning_of_sentence: false,
        }
    }

    pub fn beginning_of_sentence() -> Self {
        Self {
            word: Some(String::new()),
            beginning_of_sentence: true,
        }
    }

    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    pub fn is_beginning_of_sentence(&self) -> bool {
        self.beginning_of_sentence
    }

    pub fn is_valid(&self) -> bool {
        self.word.is_some()
    }

    fn is_empty_placeholder(&self) -> bool {
        self.word.is_none() && !self.beginning_of_sentence
    }
}

#[derive(Debug, Clone)]
pub struct NgramContext {
    prev_words: Vec<WordInfo>,
    max_prev_word_count: usize,
}

impl NgramContext {
    /// Build a context from newest-first slots. Extra slots beyond
    /// `max_prev_word_count` are dropped.
    pub fn new(max_prev_word_count: usize, mut prev_words: Vec<WordInfo>) -> Self {
        prev_words.truncate(max_prev_word_count);
        Self {
            prev_words,
            max_prev_word_count,
        }
    }

    pub fn from_words(prev_words: Vec<WordInfo>) -> Self {
        Self::new(MAX_PREV_WORD_COUNT_FOR_N_GRAM, prev_words)
    }

    /// Context with a single "no information" slot.
    pub fn empty() -> Self {
        Self::from_words(vec![WordInfo::empty()])
    }

    pub fn empty_with_capacity(max_prev_word_count: usize) -> Self {
        Self::new(max_prev_word_count, vec![WordInfo::empty()])
    }

    pub fn beginning_of_sentence() -> Self {
        Self::from_words(vec![WordInfo::beginning_of_sentence()])
    }

    /// Returns a new context with `word` as the most recent slot.
    pub fn next_context(&self, word: WordInfo) -> NgramContext {
        let count = self.max_prev_word_count.min(self.prev_words.len() + 1);
        let mut prev_words = Vec::with_capacity(count);
        prev_words.push(word);
        prev_words.extend(self.prev_words.iter().take(count.saturating_sub(1)).cloned());
        prev_words.truncate(self.max_prev_word_count);
        NgramContext {
            prev_words,
            max_prev_word_count: self.max_prev_word_count,
        }
    }

    /// Rewrites `from` to `to` if it directly follows a sentence start.
    ///
    /// Slots are scanned from the oldest to the newest; the first match whose
    /// older neighbour is the sentence-start marker is replaced.
    pub fn change_word_if_after_beginning_of_sentence(&mut self, from: &str, to: &str) -> bool {
        let mut after_beginning = false;
        for info in self.prev_words.iter_mut().rev() {
            if after_beginning && info.word() == Some(from) {
                *info = WordInfo::new(to);
                return true;
            }
            after_beginning = info.is_beginning_of_sentence();
        }
        false
    }

    /// Flattens the context oldest first, e.g. `"<S> the quick"`.
    pub fn extract_prev_words_context(&self) -> String {
        self.prev_words_oldest_first().join(CONTEXT_SEPARATOR)
    }

    pub fn extract_prev_words_context_array(&self) -> Vec<String> {
        self.prev_words_oldest_first()
    }

    fn prev_words_oldest_first(&self) -> Vec<String> {
        self.prev_words
            .iter()
            .rev()
            .filter_map(|info| {
                if info.is_beginning_of_sentence() {
                    Some(BEGINNING_OF_SENTENCE_TAG.to_string())
                } else {
                    info.word().filter(|w| !w.is_empty()).map(str::to_string)
                }
            })
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.prev_words.first().is_some_and(WordInfo::is_valid)
    }

    pub fn is_beginning_of_sentence_context(&self) -> bool {
        self.prev_words
            .first()
            .is_some_and(WordInfo::is_beginning_of_sentence)
    }

    /// `n` is 1-indexed: 1 is the most recent word.
    pub fn nth_prev_word(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        self.prev_words.get(n - 1).and_then(WordInfo::word)
    }

    pub fn is_nth_prev_word_beginning_of_sentence(&self, n: usize) -> bool {
        n > 0
            && self
                .prev_words
                .get(n - 1)
                .is_some_and(WordInfo::is_beginning_of_sentence)
    }

    pub fn prev_word_count(&self) -> usize {
        self.prev_words.len()
    }

    pub fn max_prev_word_count(&self) -> usize {
        self.max_prev_word_count
    }

    /// Number of slots that carry a word or a sentence start.
    pub fn valid_word_count(&self) -> usize {
        self.prev_words.iter().filter(|w| w.is_valid()).count()
    }

    /// The slots that take part in equality and hashing.
    fn significant_prefix(&self) -> &[WordInfo] {
        let end = self
            .prev_words
            .iter()
            .rposition(|w| !w.is_empty_placeholder())
            .map_or(0, |i| i + 1);
        &self.prev_words[..end]
    }
}

impl Default for NgramContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for NgramContext {
    fn eq(&self, other: &Self) -> bool {
        self.significant_prefix() == other.significant_prefix()
    }
}

impl Eq for NgramContext {}

impl Hash for NgramContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_prefix().hash(state);
    }
}

impl fmt::Display for NgramContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, info) in self.prev_words.iter().enumerate() {
            match info.word() {
                None => write!(f, "PrevWord[{i}]: Empty. ")?,
                Some(word) => write!(
                    f,
                    "PrevWord[{i}]: {word}, isBeginningOfSentence: {}. ",
                    info.is_beginning_of_sentence()
                )?,
            }
        }
        Ok(())
    }
}
