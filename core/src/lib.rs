//! suggest-core
//!
//! Suggestion, auto-correction and learning engine for keyboard input across
//! several active languages.
//!
//! Dictionaries are grouped per language (`DictionaryGroup`), fronted by a
//! `DictionaryFacilitator` that merges their candidates and routes learning,
//! and consumed by `Suggest`, which turns the merged candidates into what the
//! suggestion strip shows and decides whether the typed word gets replaced.
//!
//! Public API:
//! - `NgramContext` - Previous words, used as the key for context predictions
//! - `DictionaryGroup` - One language's dictionaries, blacklist and confidence
//! - `DictionaryFacilitator` - Multi-language lookup, learning and lifecycle
//! - `Suggest` - Suggestion list assembly and the auto-correction decision
//! - `Settings` - User-facing switches and runtime knobs

pub mod autocorrect;
pub mod blacklist;
pub mod candidate;
pub mod composer;
pub mod dictionary;
pub mod error;
pub mod executor;
pub mod facilitator;
pub mod group;
pub mod keyboard;
pub mod locale;
pub mod ngram;
pub mod settings;
pub mod suggest;
pub mod suggested_words;
pub mod text;

pub use autocorrect::{AutoCorrectionDecision, AutoCorrector};
pub use blacklist::Blacklist;
pub use candidate::{DictionaryRef, SuggestedWordInfo, SuggestionResults};
pub use composer::{CapsMode, ComposedData, InputPointers, WordComposer};
pub use dictionary::{
    DictType, Dictionary, DictionaryProvider, ExpandableDictionary, FileDictionaryProvider, MainDictionary,
    SubDictionary,
};
pub use error::{Result, SuggestError};
pub use executor::BackgroundExecutor;
pub use facilitator::{DictionaryFacilitator, EventType};
pub use group::DictionaryGroup;
pub use keyboard::{InputPurpose, KeyboardState, ProximityInfo};
pub use locale::Locale;
pub use ngram::{NgramContext, WordInfo};
pub use settings::{AutoCorrectionTier, Settings, TypedWordBonus};
pub use suggest::Suggest;
pub use suggested_words::{InputStyle, SuggestedWords};
