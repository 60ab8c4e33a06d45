//! Mutable dictionaries: user history, personal words and contacts.
//!
//! Entries live in memory behind an `RwLock`; when opened with a path every
//! change is also written through to a `redb` database so learning survives
//! restarts. Values are bincode-encoded.

use super::scoring;
use super::{DictType, Dictionary, DictionaryStats, ExpandableDictionary, LookupRequest, NOT_A_PROBABILITY};
use crate::candidate::{kind, SuggestedWordInfo};
use crate::error::{Result, SuggestError};
use crate::locale::Locale;
use crate::ngram::{NgramContext, BEGINNING_OF_SENTENCE_TAG};
use ahash::AHashMap;
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

const WORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("words");
const NGRAMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("ngrams");

/// Frequency given to words added explicitly to the personal dictionary.
pub const USER_WORD_FREQUENCY: u8 = 250;

const HISTORY_BASE_FREQUENCY: u32 = 90;
const HISTORY_FREQUENCY_STEP: u32 = 10;
const PREDICTION_BASE_SCORE: u32 = 140;
const PREDICTION_SCORE_STEP: u32 = 30;

/// Unigram frequency of a history word seen `count` times.
pub fn history_frequency(count: u32) -> u8 {
    HISTORY_BASE_FREQUENCY
        .saturating_add(HISTORY_FREQUENCY_STEP.saturating_mul(count))
        .min(255) as u8
}

fn prediction_score(count: u32) -> i32 {
    PREDICTION_BASE_SCORE
        .saturating_add(PREDICTION_SCORE_STEP.saturating_mul(count))
        .min(255) as i32
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct DynamicEntry {
    frequency: u8,
    count: u32,
    is_valid: bool,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Entries {
    words: AHashMap<String, DynamicEntry>,
    /// previous word (or sentence-start tag) -> next word -> count
    ngrams: AHashMap<String, BTreeMap<String, u32>>,
}

pub struct DynamicDictionary {
    dict_type: DictType,
    locale: Locale,
    entries: RwLock<Entries>,
    db: Option<redb::Database>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for DynamicDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicDictionary")
            .field("dict_type", &self.dict_type)
            .field("locale", &self.locale)
            .field("path", &self.path)
            .finish()
    }
}

impl DynamicDictionary {
    /// Dictionary that keeps everything in memory.
    pub fn in_memory(dict_type: DictType, locale: impl Into<Locale>) -> Self {
        Self {
            dict_type,
            locale: locale.into(),
            entries: RwLock::new(Entries::default()),
            db: None,
            path: None,
        }
    }

    /// Open (or create) a persistent dictionary at `path` and load its contents.
    pub fn open<P: AsRef<Path>>(dict_type: DictType, locale: impl Into<Locale>, path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;
        {
            let write_txn = db.begin_write()?;
            write_txn.open_table(WORDS_TABLE)?;
            write_txn.open_table(NGRAMS_TABLE)?;
            write_txn.commit()?;
        }

        let mut entries = Entries::default();
        let read_txn = db.begin_read()?;
        let words = read_txn.open_table(WORDS_TABLE)?;
        for item in words.iter()? {
            let (k, v) = item?;
            match bincode::deserialize::<DynamicEntry>(v.value()) {
                Ok(entry) => {
                    entries.words.insert(k.value().to_string(), entry);
                }
                Err(e) => warn!("dropping unreadable entry {:?} in {}: {}", k.value(), path.display(), e),
            }
        }
        let ngrams = read_txn.open_table(NGRAMS_TABLE)?;
        for item in ngrams.iter()? {
            let (k, v) = item?;
            if let Ok(next) = bincode::deserialize::<BTreeMap<String, u32>>(v.value()) {
                entries.ngrams.insert(k.value().to_string(), next);
            }
        }
        drop(words);
        drop(ngrams);
        drop(read_txn);

        debug!(
            dict_type = %dict_type,
            words = entries.words.len(),
            "opened dynamic dictionary {}",
            path.display()
        );
        Ok(Self {
            dict_type,
            locale: locale.into(),
            entries: RwLock::new(entries),
            db: Some(db),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write-through of the current state of `words` and `ngram_rows`.
    ///
    /// State is read after the write transaction starts, so concurrent
    /// writers always leave the store matching memory.
    fn persist(&self, words: &[&str], ngram_rows: &[&str]) -> Result<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        let write_txn = db.begin_write()?;
        {
            let entries = self.read();
            let mut table = write_txn.open_table(WORDS_TABLE)?;
            for &word in words {
                match entries.words.get(word) {
                    Some(entry) => {
                        let bytes = bincode::serialize(entry)?;
                        table.insert(word, bytes.as_slice())?;
                    }
                    None => {
                        table.remove(word)?;
                    }
                }
            }
            let mut table = write_txn.open_table(NGRAMS_TABLE)?;
            for &prev in ngram_rows {
                match entries.ngrams.get(prev) {
                    Some(next) if !next.is_empty() => {
                        let bytes = bincode::serialize(next)?;
                        table.insert(prev, bytes.as_slice())?;
                    }
                    _ => {
                        table.remove(prev)?;
                    }
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn ngram_key(ngram_context: &NgramContext) -> Option<String> {
        if ngram_context.is_beginning_of_sentence_context() {
            Some(BEGINNING_OF_SENTENCE_TAG.to_string())
        } else {
            ngram_context
                .nth_prev_word(1)
                .filter(|w| !w.is_empty())
                .map(str::to_string)
        }
    }

    fn predictions(&self, request: &LookupRequest<'_>, prev_words_context: &str) -> Vec<SuggestedWordInfo> {
        let Some(key) = Self::ngram_key(request.ngram_context) else {
            return Vec::new();
        };
        let entries = self.read();
        let source = self.source();
        entries
            .ngrams
            .get(&key)
            .into_iter()
            .flatten()
            .map(|(word, &count)| {
                SuggestedWordInfo::new(
                    word.clone(),
                    prev_words_context,
                    scoring::weighted(prediction_score(count), request.weight_for_locale),
                    kind::PREDICTION,
                    source.clone(),
                )
            })
            .collect()
    }
}

impl Dictionary for DynamicDictionary {
    fn dict_type(&self) -> DictType {
        self.dict_type
    }

    fn locale(&self) -> Option<&Locale> {
        Some(&self.locale)
    }

    fn suggestions(
        &self,
        request: &LookupRequest<'_>,
        _weight_of_lang_model_vs_spatial_model: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        let typed = request.composed.typed_word.as_str();
        let prev_words_context = request.ngram_context.extract_prev_words_context();
        if typed.is_empty() {
            return Some(self.predictions(request, &prev_words_context));
        }
        let source = self.source();
        let entries = self.read();
        let out = entries
            .words
            .iter()
            .filter(|(_, e)| e.frequency > 0)
            .filter_map(|(word, e)| {
                let m = scoring::score_candidate(typed, word, e.frequency)?;
                Some(SuggestedWordInfo::new(
                    word.clone(),
                    prev_words_context.as_str(),
                    scoring::weighted(m.score, request.weight_for_locale),
                    m.kind_and_flags,
                    source.clone(),
                ))
            })
            .collect();
        Some(out)
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.read().words.contains_key(word)
    }

    /// History never vouches for a word's spelling.
    fn is_valid_word(&self, word: &str) -> bool {
        self.dict_type != DictType::UserHistory && self.is_in_dictionary(word)
    }

    fn frequency(&self, word: &str) -> i32 {
        self.read()
            .words
            .get(word)
            .map(|e| i32::from(e.frequency))
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn close(&self) {
        if let Some(path) = &self.path {
            debug!("closing {} dictionary {}", self.dict_type, path.display());
        }
    }
}

impl ExpandableDictionary for DynamicDictionary {
    fn as_dictionary(&self) -> &(dyn Dictionary + 'static) {
        self
    }

    fn add_entry(
        &self,
        ngram_context: &NgramContext,
        word: &str,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    ) -> Result<()> {
        if word.is_empty() {
            return Err(SuggestError::InvalidWord(word.to_string()));
        }
        let ngram = {
            let mut entries = self.write();
            let entry = entries.words.entry(word.to_string()).or_default();
            entry.count = entry.count.saturating_add(count);
            entry.frequency = entry.frequency.max(history_frequency(entry.count));
            entry.is_valid |= is_valid;
            entry.last_used = entry.last_used.max(timestamp);

            Self::ngram_key(ngram_context).inspect(|prev| {
                let c = entries
                    .ngrams
                    .entry(prev.clone())
                    .or_default()
                    .entry(word.to_string())
                    .or_insert(0);
                *c = c.saturating_add(count);
            })
        };
        let rows: Vec<&str> = ngram.as_deref().into_iter().collect();
        self.persist(&[word], &rows)
    }

    fn add_word(&self, word: &str, frequency: u8) -> Result<()> {
        if word.is_empty() {
            return Err(SuggestError::InvalidWord(word.to_string()));
        }
        {
            let mut entries = self.write();
            let entry = entries.words.entry(word.to_string()).or_default();
            entry.frequency = entry.frequency.max(frequency);
            entry.is_valid = true;
        }
        self.persist(&[word], &[])
    }

    fn remove_entry(&self, word: &str) -> Result<bool> {
        let (removed, touched) = {
            let mut entries = self.write();
            let removed = entries.words.remove(word).is_some();
            let mut touched = Vec::new();
            for (prev, next) in entries.ngrams.iter_mut() {
                if next.remove(word).is_some() {
                    touched.push(prev.clone());
                }
            }
            entries.ngrams.retain(|_, next| !next.is_empty());
            (removed, touched)
        };
        let rows: Vec<&str> = touched.iter().map(String::as_str).collect();
        if removed || !rows.is_empty() {
            self.persist(&[word], &rows)?;
        }
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        {
            let mut entries = self.write();
            entries.words.clear();
            entries.ngrams.clear();
        }
        if let Some(db) = &self.db {
            let write_txn = db.begin_write()?;
            write_txn.delete_table(WORDS_TABLE)?;
            write_txn.delete_table(NGRAMS_TABLE)?;
            write_txn.open_table(WORDS_TABLE)?;
            write_txn.open_table(NGRAMS_TABLE)?;
            write_txn.commit()?;
        }
        Ok(())
    }

    fn stats(&self) -> DictionaryStats {
        let entries = self.read();
        DictionaryStats {
            dict_type: self.dict_type,
            locale: Some(self.locale.clone()),
            word_count: entries.words.len(),
            ngram_count: entries.ngrams.values().map(BTreeMap::len).sum(),
            path: self.path.as_ref().map(|p| p.display().to_string()),
        }
    }
}
