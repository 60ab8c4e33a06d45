//! Dictionary abstraction.
//!
//! Every word source the facilitator consults implements `Dictionary`:
//! - `CompiledDictionary`: read-only, fst-indexed main dictionary
//! - `DynamicDictionary`: mutable store for history, user and contacts words
//! - `NormalizedDictionary`: decorator folding text to a Unicode normal form
//! - `DictionaryCollection`: several dictionaries presented as one
//!
//! Handles are shared as `Arc<DictHandle<..>>`. A dictionary is closed when
//! the last handle goes away, so a lookup running against an old group list
//! never sees a closed dictionary.

use crate::candidate::{DictionaryRef, SuggestedWordInfo};
use crate::composer::ComposedData;
use crate::keyboard::ProximityInfo;
use crate::locale::Locale;
use crate::ngram::NgramContext;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub mod collection;
pub mod compiled;
pub mod dynamic;
pub mod normalized;
pub mod provider;
pub mod scoring;

pub use collection::DictionaryCollection;
pub use compiled::{CompiledDictionary, CompiledDictionaryBuilder};
pub use dynamic::DynamicDictionary;
pub use normalized::{NormalizedDictionary, NormalizationForm};
pub use provider::{DictionaryProvider, FileDictionaryProvider};

/// Returned by `frequency` when the word is unknown or the dictionary cannot tell.
pub const NOT_A_PROBABILITY: i32 = -1;

/// Initial value of the language-model versus spatial-model weight.
pub const NOT_A_WEIGHT_OF_LANG_MODEL_VS_SPATIAL_MODEL: f32 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DictType {
    Main,
    Contacts,
    UserHistory,
    User,
    /// Pseudo source of the literal typed word.
    UserTyped,
}

/// Lookup order inside a dictionary group.
pub const ALL_DICTIONARY_TYPES: [DictType; 4] =
    [DictType::Main, DictType::Contacts, DictType::UserHistory, DictType::User];

/// Mutable sub-dictionaries a group may own.
pub const SUB_DICTIONARY_TYPES: [DictType; 3] = [DictType::Contacts, DictType::UserHistory, DictType::User];

impl DictType {
    /// Tie-break priority between equally scored candidates; lower wins.
    pub fn priority(self) -> u8 {
        match self {
            DictType::Main => 0,
            DictType::Contacts => 1,
            DictType::UserHistory => 2,
            DictType::User => 3,
            DictType::UserTyped => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DictType::Main => "main",
            DictType::Contacts => "contacts",
            DictType::UserHistory => "history",
            DictType::User => "user",
            DictType::UserTyped => "user_typed",
        }
    }
}

impl fmt::Display for DictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a single dictionary lookup needs.
#[derive(Debug, Clone, Copy)]
pub struct LookupRequest<'a> {
    pub composed: &'a ComposedData,
    pub ngram_context: &'a NgramContext,
    pub proximity: ProximityInfo,
    pub settings: &'a Settings,
    pub session_id: i32,
    pub weight_for_locale: f32,
}

/// Read capability set shared by all dictionaries.
///
/// Implementations must be safe for concurrent reads.
pub trait Dictionary: Send + Sync + fmt::Debug {
    fn dict_type(&self) -> DictType;

    fn locale(&self) -> Option<&Locale>;

    /// Candidates for the composed input in the given context. `None` means
    /// the dictionary could not answer, which callers treat as no candidates.
    fn suggestions(
        &self,
        request: &LookupRequest<'_>,
        weight_of_lang_model_vs_spatial_model: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>>;

    fn is_in_dictionary(&self, word: &str) -> bool;

    fn is_valid_word(&self, word: &str) -> bool {
        self.is_in_dictionary(word)
    }

    /// Unigram frequency, or `NOT_A_PROBABILITY`.
    fn frequency(&self, _word: &str) -> i32 {
        NOT_A_PROBABILITY
    }

    fn max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        self.frequency(word)
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn on_finish_input(&self) {}

    /// Releases resources. Called once, when the last handle is dropped.
    fn close(&self) {}

    fn source(&self) -> DictionaryRef {
        DictionaryRef::new(self.dict_type(), self.locale().cloned())
    }
}

/// Word counts of a mutable dictionary, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryStats {
    pub dict_type: DictType,
    pub locale: Option<Locale>,
    pub word_count: usize,
    pub ngram_count: usize,
    pub path: Option<String>,
}

/// Dictionaries that can learn and forget words.
pub trait ExpandableDictionary: Dictionary {
    fn as_dictionary(&self) -> &(dyn Dictionary + 'static);

    /// Records one use of `word` after `ngram_context`.
    fn add_entry(
        &self,
        ngram_context: &NgramContext,
        word: &str,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    ) -> crate::Result<()>;

    /// Adds a word with an explicit frequency, or raises it if present.
    fn add_word(&self, word: &str, frequency: u8) -> crate::Result<()>;

    fn remove_entry(&self, word: &str) -> crate::Result<bool>;

    fn clear(&self) -> crate::Result<()>;

    fn stats(&self) -> DictionaryStats;
}

/// Owning handle that closes its dictionary when dropped.
#[derive(Debug)]
pub struct DictHandle<D: ?Sized + Dictionary> {
    inner: Box<D>,
}

impl<D: ?Sized + Dictionary> DictHandle<D> {
    pub fn new(inner: Box<D>) -> Self {
        Self { inner }
    }
}

impl<D: ?Sized + Dictionary> Deref for DictHandle<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.inner
    }
}

impl<D: ?Sized + Dictionary> Drop for DictHandle<D> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

pub type MainDictionary = Arc<DictHandle<dyn Dictionary>>;
pub type SubDictionary = Arc<DictHandle<dyn ExpandableDictionary>>;

pub fn main_handle<D: Dictionary + 'static>(dict: D) -> MainDictionary {
    Arc::new(DictHandle::new(Box::new(dict) as Box<dyn Dictionary>))
}

pub fn sub_handle<D: ExpandableDictionary + 'static>(dict: D) -> SubDictionary {
    Arc::new(DictHandle::new(Box::new(dict) as Box<dyn ExpandableDictionary>))
}
