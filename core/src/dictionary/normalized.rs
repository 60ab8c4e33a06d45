//! Decorator that folds queries to a Unicode normal form before they reach
//! the wrapped dictionary, so decomposed input ("ne" + U+0301) finds
//! precomposed entries ("né").

use super::{DictType, Dictionary, LookupRequest};
use crate::candidate::{DictionaryRef, SuggestedWordInfo};
use crate::composer::ComposedData;
use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizationForm {
    #[default]
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
}

impl NormalizationForm {
    pub fn apply(self, s: &str) -> String {
        match self {
            NormalizationForm::Nfc => s.nfc().collect(),
            NormalizationForm::Nfd => s.nfd().collect(),
            NormalizationForm::Nfkc => s.nfkc().collect(),
            NormalizationForm::Nfkd => s.nfkd().collect(),
        }
    }
}

#[derive(Debug)]
pub struct NormalizedDictionary<D: Dictionary> {
    inner: D,
    form: NormalizationForm,
}

impl<D: Dictionary> NormalizedDictionary<D> {
    pub fn new(inner: D, form: NormalizationForm) -> Self {
        Self { inner, form }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn form(&self) -> NormalizationForm {
        self.form
    }
}

impl<D: Dictionary> Dictionary for NormalizedDictionary<D> {
    fn dict_type(&self) -> DictType {
        self.inner.dict_type()
    }

    fn locale(&self) -> Option<&Locale> {
        self.inner.locale()
    }

    fn suggestions(
        &self,
        request: &LookupRequest<'_>,
        weight_of_lang_model_vs_spatial_model: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        let normalized = self.form.apply(&request.composed.typed_word);
        if normalized == request.composed.typed_word {
            return self.inner.suggestions(request, weight_of_lang_model_vs_spatial_model);
        }
        let composed = ComposedData::new(
            request.composed.input_pointers.clone(),
            request.composed.is_batch_mode,
            normalized,
        );
        let request = LookupRequest {
            composed: &composed,
            ..*request
        };
        self.inner.suggestions(&request, weight_of_lang_model_vs_spatial_model)
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.inner.is_in_dictionary(&self.form.apply(word))
    }

    fn is_valid_word(&self, word: &str) -> bool {
        self.inner.is_valid_word(&self.form.apply(word))
    }

    fn frequency(&self, word: &str) -> i32 {
        self.inner.frequency(&self.form.apply(word))
    }

    fn max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        self.inner.max_frequency_of_exact_matches(&self.form.apply(word))
    }

    fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    fn on_finish_input(&self) {
        self.inner.on_finish_input();
    }

    fn close(&self) {
        self.inner.close();
    }

    fn source(&self) -> DictionaryRef {
        self.inner.source()
    }
}
