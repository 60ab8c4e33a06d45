//! Several dictionaries of one type presented as a single dictionary.

use super::{DictType, Dictionary, LookupRequest, MainDictionary, NOT_A_PROBABILITY};
use crate::candidate::SuggestedWordInfo;
use crate::locale::Locale;

#[derive(Debug)]
pub struct DictionaryCollection {
    dict_type: DictType,
    locale: Locale,
    dictionaries: Vec<MainDictionary>,
}

impl DictionaryCollection {
    pub fn new(dict_type: DictType, locale: impl Into<Locale>, dictionaries: Vec<MainDictionary>) -> Self {
        Self {
            dict_type,
            locale: locale.into(),
            dictionaries,
        }
    }

    pub fn add(&mut self, dictionary: MainDictionary) {
        self.dictionaries.push(dictionary);
    }

    pub fn len(&self) -> usize {
        self.dictionaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }
}

impl Dictionary for DictionaryCollection {
    fn dict_type(&self) -> DictType {
        self.dict_type
    }

    fn locale(&self) -> Option<&Locale> {
        Some(&self.locale)
    }

    fn suggestions(
        &self,
        request: &LookupRequest<'_>,
        weight_of_lang_model_vs_spatial_model: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        let mut merged: Option<Vec<SuggestedWordInfo>> = None;
        for dict in &self.dictionaries {
            if let Some(found) = dict.suggestions(request, weight_of_lang_model_vs_spatial_model) {
                merged.get_or_insert_with(Vec::new).extend(found);
            }
        }
        merged
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.dictionaries.iter().any(|d| d.is_in_dictionary(word))
    }

    fn is_valid_word(&self, word: &str) -> bool {
        self.dictionaries.iter().any(|d| d.is_valid_word(word))
    }

    fn frequency(&self, word: &str) -> i32 {
        self.dictionaries
            .iter()
            .map(|d| d.frequency(word))
            .max()
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        self.dictionaries
            .iter()
            .map(|d| d.max_frequency_of_exact_matches(word))
            .max()
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn is_initialized(&self) -> bool {
        self.dictionaries.iter().all(|d| d.is_initialized())
    }

    fn on_finish_input(&self) {
        for d in &self.dictionaries {
            d.on_finish_input();
        }
    }
}
