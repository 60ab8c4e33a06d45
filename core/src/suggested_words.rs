//! Final output of a suggestion request.

use crate::candidate::{kind, SuggestedWordInfo};
use serde::{Deserialize, Serialize};

/// How the suggestions were produced. The style on a `SuggestedWords` value
/// is authoritative for display and commit decisions, not the style the
/// caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputStyle {
    #[default]
    None,
    Typing,
    UpdateBatch,
    TailBatch,
    ApplicationSpecified,
    Recorrection,
    Prediction,
    BeginningOfSentencePrediction,
}

impl InputStyle {
    pub fn is_prediction(self) -> bool {
        matches!(self, InputStyle::Prediction | InputStyle::BeginningOfSentencePrediction)
    }

    pub fn is_batch(self) -> bool {
        matches!(self, InputStyle::UpdateBatch | InputStyle::TailBatch)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuggestedWords {
    pub words: Vec<SuggestedWordInfo>,
    pub raw_suggestions: Option<Vec<SuggestedWordInfo>>,
    pub typed_word_info: Option<SuggestedWordInfo>,
    pub typed_word_valid: bool,
    pub will_auto_correct: bool,
    pub is_obsolete: bool,
    pub input_style: InputStyle,
    pub sequence_number: i32,
}

impl SuggestedWords {
    pub fn empty(input_style: InputStyle, sequence_number: i32) -> Self {
        Self {
            input_style,
            sequence_number,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SuggestedWordInfo> {
        self.words.get(index)
    }

    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(|i| i.word.as_str())
    }

    /// Candidates without the leading typed-word entry.
    pub fn suggestions(&self) -> &[SuggestedWordInfo] {
        match self.words.first() {
            Some(first) if first.is_kind_of(kind::TYPED) && self.typed_word_info.is_some() => &self.words[1..],
            _ => &self.words,
        }
    }

    /// The word that replaces the typed word on commit, if any.
    pub fn auto_correction(&self) -> Option<&SuggestedWordInfo> {
        if self.will_auto_correct {
            self.suggestions().first()
        } else {
            None
        }
    }

    pub fn typed_word(&self) -> Option<&str> {
        self.typed_word_info.as_ref().map(|i| i.word.as_str())
    }

    pub fn is_prediction(&self) -> bool {
        self.input_style.is_prediction()
    }
}
