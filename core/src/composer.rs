//! The word being composed.
//!
//! `WordComposer` tracks the literal typed word together with the case and
//! digit statistics the decision engine consults, the caps mode the word was
//! started in, and batch (gesture) state. `ComposedData` is the immutable
//! snapshot handed to dictionaries.

use serde::{Deserialize, Serialize};

/// Shift state of the keyboard when a word was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CapsMode {
    #[default]
    Off,
    ManualShifted,
    ManualShiftLocked,
    AutoShifted,
    AutoShiftLocked,
}

/// Coordinates and timestamps of the touch points that produced the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputPointers {
    pub xs: Vec<i32>,
    pub ys: Vec<i32>,
    pub pointer_ids: Vec<i32>,
    pub times: Vec<i32>,
}

impl InputPointers {
    pub fn add_pointer(&mut self, x: i32, y: i32, pointer_id: i32, time: i32) {
        self.xs.push(x);
        self.ys.push(y);
        self.pointer_ids.push(pointer_id);
        self.times.push(time);
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn clear(&mut self) {
        self.xs.clear();
        self.ys.clear();
        self.pointer_ids.clear();
        self.times.clear();
    }
}

/// Snapshot of the composing state passed to dictionary lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedData {
    pub input_pointers: InputPointers,
    pub is_batch_mode: bool,
    pub typed_word: String,
}

impl ComposedData {
    pub fn new(input_pointers: InputPointers, is_batch_mode: bool, typed_word: impl Into<String>) -> Self {
        Self {
            input_pointers,
            is_batch_mode,
            typed_word: typed_word.into(),
        }
    }

    /// Blank input, used for pure context predictions.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.typed_word.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordComposer {
    typed_word: String,
    input_pointers: InputPointers,
    caps_count: usize,
    digits_count: usize,
    only_first_char_capitalized: bool,
    capitalized_mode: CapsMode,
    is_batch_mode: bool,
    is_resumed: bool,
    rejected_batch_mode_suggestion: Option<String>,
}

impl WordComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composer already holding `word`, as if it had been typed key by key.
    pub fn from_typed_word(word: &str) -> Self {
        let mut composer = Self::new();
        composer.set_typed_word(word);
        composer
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add_char(&mut self, ch: char, x: i32, y: i32) {
        self.typed_word.push(ch);
        let index = self.input_pointers.len() as i32;
        self.input_pointers.add_pointer(x, y, 0, index);
        self.refresh_counts();
    }

    /// Backspace. Returns false when there was nothing to delete.
    pub fn delete_last(&mut self) -> bool {
        if self.typed_word.pop().is_none() {
            return false;
        }
        if self.input_pointers.len() > self.typed_word.chars().count() {
            self.input_pointers.xs.pop();
            self.input_pointers.ys.pop();
            self.input_pointers.pointer_ids.pop();
            self.input_pointers.times.pop();
        }
        self.refresh_counts();
        true
    }

    pub fn set_typed_word(&mut self, word: &str) {
        self.typed_word = word.to_string();
        self.input_pointers.clear();
        self.refresh_counts();
    }

    /// Switches into gesture mode with the decoder's trace.
    pub fn set_batch_input_pointers(&mut self, pointers: InputPointers) {
        self.input_pointers = pointers;
        self.is_batch_mode = true;
    }

    /// Sets the word decoded from a gesture.
    pub fn set_batch_input_word(&mut self, word: &str) {
        self.is_batch_mode = true;
        self.typed_word = word.to_string();
        self.refresh_counts();
    }

    pub fn set_capitalized_mode_at_start_of_word(&mut self, mode: CapsMode) {
        self.capitalized_mode = mode;
    }

    pub fn set_resumed(&mut self, resumed: bool) {
        self.is_resumed = resumed;
    }

    pub fn set_rejected_batch_mode_suggestion(&mut self, word: Option<String>) {
        self.rejected_batch_mode_suggestion = word;
    }

    fn refresh_counts(&mut self) {
        self.caps_count = self.typed_word.chars().filter(|c| c.is_uppercase()).count();
        self.digits_count = self.typed_word.chars().filter(|c| c.is_numeric()).count();
        self.only_first_char_capitalized = self.caps_count == 1
            && self.typed_word.chars().next().is_some_and(char::is_uppercase);
    }

    pub fn typed_word(&self) -> &str {
        &self.typed_word
    }

    /// Length in code points.
    pub fn size(&self) -> usize {
        self.typed_word.chars().count()
    }

    pub fn is_composing_word(&self) -> bool {
        !self.typed_word.is_empty()
    }

    pub fn is_batch_mode(&self) -> bool {
        self.is_batch_mode
    }

    pub fn is_resumed(&self) -> bool {
        self.is_resumed
    }

    pub fn has_digits(&self) -> bool {
        self.digits_count > 0
    }

    /// More than one upper-case letter.
    pub fn is_mostly_caps(&self) -> bool {
        self.caps_count > 1
    }

    pub fn is_all_upper_case(&self) -> bool {
        if self.size() <= 1 {
            return matches!(self.capitalized_mode, CapsMode::AutoShiftLocked | CapsMode::ManualShiftLocked);
        }
        self.caps_count == self.size()
    }

    pub fn was_shifted_no_lock(&self) -> bool {
        matches!(self.capitalized_mode, CapsMode::AutoShifted | CapsMode::ManualShifted)
    }

    pub fn was_auto_capitalized(&self) -> bool {
        matches!(self.capitalized_mode, CapsMode::AutoShifted | CapsMode::AutoShiftLocked)
    }

    pub fn is_or_will_be_only_first_char_capitalized(&self) -> bool {
        if self.is_composing_word() {
            self.only_first_char_capitalized
        } else {
            self.capitalized_mode != CapsMode::Off
        }
    }

    pub fn rejected_batch_mode_suggestion(&self) -> Option<&str> {
        self.rejected_batch_mode_suggestion.as_deref()
    }

    pub fn composed_data(&self) -> ComposedData {
        ComposedData::new(self.input_pointers.clone(), self.is_batch_mode, self.typed_word.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_typing() {
        let mut c = WordComposer::new();
        for ch in "Hello".chars() {
            c.add_char(ch, 0, 0);
        }
        assert!(c.is_composing_word());
        assert!(c.is_or_will_be_only_first_char_capitalized());
        assert!(!c.is_mostly_caps());
        c.add_char('2', 0, 0);
        assert!(c.has_digits());
        assert!(c.delete_last());
        assert!(!c.has_digits());
        assert_eq!(c.size(), 5);
    }

    #[test]
    fn all_upper_case_for_short_words_uses_caps_mode() {
        let mut c = WordComposer::from_typed_word("A");
        assert!(!c.is_all_upper_case());
        c.set_capitalized_mode_at_start_of_word(CapsMode::ManualShiftLocked);
        assert!(c.is_all_upper_case());
        let c = WordComposer::from_typed_word("NASA");
        assert!(c.is_all_upper_case());
        assert!(c.is_mostly_caps());
    }

    #[test]
    fn empty_composer_uses_caps_mode_for_first_char() {
        let mut c = WordComposer::new();
        assert!(!c.is_or_will_be_only_first_char_capitalized());
        c.set_capitalized_mode_at_start_of_word(CapsMode::AutoShifted);
        assert!(c.is_or_will_be_only_first_char_capitalized());
        assert!(c.was_shifted_no_lock());
        assert!(c.was_auto_capitalized());
    }
}
