//! Read-only main dictionary backed by an `fst` index and a bincode payload.
//!
//! On-disk layout is a pair of files sharing a stem:
//! - `<stem>.fst`: lowercased word -> bucket index
//! - `<stem>.bincode`: `CompiledPayload` with entries, buckets, next words
//!   and the whitelist
//!
//! Candidate lookup walks the index twice: once with a prefix automaton for
//! completions and once with a Levenshtein automaton for corrections.

use super::scoring::{self, max_edit_distance};
use super::{DictType, Dictionary, LookupRequest, NOT_A_PROBABILITY};
use crate::candidate::{kind, DictionaryRef, SuggestedWordInfo, MAX_SCORE};
use crate::error::{Result, SuggestError};
use crate::locale::Locale;
use crate::ngram::BEGINNING_OF_SENTENCE_TAG;
use ahash::{AHashMap, AHashSet};
use fst::automaton::{Levenshtein, Str};
use fst::{Automaton, IntoStreamer, Map, MapBuilder, Streamer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Upper bound on index keys visited by one prefix walk.
const MAX_PREFIX_MATCHES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextWord {
    pub word: String,
    pub frequency: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub frequency: u8,
    pub possibly_offensive: bool,
    pub next_words: Vec<NextWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompiledPayload {
    pub locale: Locale,
    pub entries: Vec<WordEntry>,
    /// Entry indices sharing one lowercased key, in fst value order.
    pub buckets: Vec<Vec<u32>>,
    pub beginning_of_sentence: Vec<NextWord>,
    /// Next words of context words that are not dictionary words themselves.
    pub context_only: Vec<(String, Vec<NextWord>)>,
    /// Typed form (lowercase) -> forced replacement.
    pub whitelist: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct CompiledDictionary {
    index: Map<Vec<u8>>,
    payload: CompiledPayload,
    by_word: AHashMap<String, usize>,
    context_only: AHashMap<String, usize>,
    whitelist: AHashMap<String, String>,
}

impl CompiledDictionary {
    fn from_parts(index: Map<Vec<u8>>, payload: CompiledPayload) -> Result<Self> {
        if index.len() != payload.buckets.len() {
            return Err(SuggestError::InvalidData(format!(
                "index has {} keys but payload has {} buckets",
                index.len(),
                payload.buckets.len()
            )));
        }
        let by_word = payload
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.word.clone(), i))
            .collect();
        let context_only = payload
            .context_only
            .iter()
            .enumerate()
            .map(|(i, (word, _))| (word.clone(), i))
            .collect();
        let whitelist = payload.whitelist.iter().cloned().collect();
        Ok(Self {
            index,
            payload,
            by_word,
            context_only,
            whitelist,
        })
    }

    /// Load from an fst + bincode pair written by `CompiledDictionaryBuilder::write`.
    pub fn load_from_fst_bincode<P: AsRef<Path>>(fst_path: P, bincode_path: P) -> Result<Self> {
        let fst_path = fst_path.as_ref();
        let bincode_path = bincode_path.as_ref();
        if !fst_path.exists() {
            return Err(SuggestError::DictionaryNotFound(fst_path.to_path_buf()));
        }

        let index = {
            let mut f = File::open(fst_path)?;
            let mut buf = Vec::new();
            f.read_to_end(&mut buf)?;
            Map::new(buf)?
        };

        let payload: CompiledPayload = {
            let mut f = File::open(bincode_path)?;
            let mut buf = Vec::new();
            f.read_to_end(&mut buf)?;
            bincode::deserialize(&buf)?
        };

        let dict = Self::from_parts(index, payload)?;
        debug!(
            locale = %dict.payload.locale,
            words = dict.payload.entries.len(),
            "loaded compiled dictionary from {}",
            fst_path.display()
        );
        Ok(dict)
    }

    pub fn word_count(&self) -> usize {
        self.payload.entries.len()
    }

    fn entry(&self, word: &str) -> Option<&WordEntry> {
        self.by_word.get(word).and_then(|&i| self.payload.entries.get(i))
    }

    fn next_words_after(&self, prev: &str) -> Option<&Vec<NextWord>> {
        if let Some(entry) = self.entry(prev) {
            return Some(&entry.next_words);
        }
        self.context_only
            .get(prev)
            .and_then(|&i| self.payload.context_only.get(i))
            .map(|(_, next)| next)
    }

    fn bucket(&self, index: u64) -> impl Iterator<Item = &WordEntry> {
        self.payload
            .buckets
            .get(index as usize)
            .into_iter()
            .flatten()
            .filter_map(move |&i| self.payload.entries.get(i as usize))
    }

    /// Entry indices whose key is a prefix extension of, or close to, `key`.
    fn candidate_indices(&self, key: &str) -> AHashSet<u64> {
        let mut found = AHashSet::new();

        let prefix = Str::new(key).starts_with();
        let mut stream = self.index.search(prefix).into_stream();
        while let Some((_, bucket)) = stream.next() {
            found.insert(bucket);
            if found.len() >= MAX_PREFIX_MATCHES {
                break;
            }
        }

        let len = key.chars().count();
        if max_edit_distance(len) > 0 {
            // transpositions cost two plain edits, filtered again on scoring
            match Levenshtein::new(key, 2) {
                Ok(lev) => {
                    let mut stream = self.index.search(lev).into_stream();
                    while let Some((_, bucket)) = stream.next() {
                        found.insert(bucket);
                    }
                }
                Err(e) => debug!("skipping correction walk for {:?}: {}", key, e),
            }
        }
        found
    }

    fn predictions(&self, request: &LookupRequest<'_>, prev_words_context: &str) -> Vec<SuggestedWordInfo> {
        let ctx = request.ngram_context;
        let next_words = if ctx.is_beginning_of_sentence_context() {
            Some(&self.payload.beginning_of_sentence)
        } else {
            ctx.nth_prev_word(1)
                .and_then(|prev| self.next_words_after(prev).or_else(|| self.next_words_after(&prev.to_lowercase())))
        };
        let source = self.source();
        next_words
            .into_iter()
            .flatten()
            .filter(|n| !(request.settings.block_potentially_offensive && self.is_offensive(&n.word)))
            .map(|n| {
                SuggestedWordInfo::new(
                    n.word.clone(),
                    prev_words_context,
                    scoring::weighted(i32::from(n.frequency), request.weight_for_locale),
                    kind::PREDICTION,
                    source.clone(),
                )
            })
            .collect()
    }

    fn is_offensive(&self, word: &str) -> bool {
        self.entry(word).map(|e| e.possibly_offensive).unwrap_or(false)
    }
}

impl Dictionary for CompiledDictionary {
    fn dict_type(&self) -> DictType {
        DictType::Main
    }

    fn locale(&self) -> Option<&Locale> {
        Some(&self.payload.locale)
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
        let key = typed.to_lowercase();
        let mut out = Vec::new();

        if let Some(replacement) = self.whitelist.get(&key) {
            out.push(SuggestedWordInfo::new(
                replacement.clone(),
                prev_words_context.as_str(),
                MAX_SCORE,
                kind::WHITELIST | kind::FLAG_APPROPRIATE_FOR_AUTO_CORRECTION,
                source.clone(),
            ));
        }

        for bucket in self.candidate_indices(&key) {
            for entry in self.bucket(bucket) {
                if entry.possibly_offensive && request.settings.block_potentially_offensive {
                    continue;
                }
                let Some(m) = scoring::score_candidate(typed, &entry.word, entry.frequency) else {
                    continue;
                };
                let mut flags = m.kind_and_flags;
                if entry.possibly_offensive {
                    flags |= kind::FLAG_POSSIBLY_OFFENSIVE;
                }
                out.push(SuggestedWordInfo::new(
                    entry.word.clone(),
                    prev_words_context.as_str(),
                    scoring::weighted(m.score, request.weight_for_locale),
                    flags,
                    source.clone(),
                ));
            }
        }
        Some(out)
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.by_word.contains_key(word)
    }

    fn frequency(&self, word: &str) -> i32 {
        self.entry(word)
            .map(|e| i32::from(e.frequency))
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        let Some(bucket) = self.index.get(word.to_lowercase()) else {
            return NOT_A_PROBABILITY;
        };
        self.bucket(bucket)
            .map(|e| i32::from(e.frequency))
            .max()
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn source(&self) -> DictionaryRef {
        DictionaryRef::new(DictType::Main, Some(self.payload.locale.clone()))
    }
}

/// Collects words, bigrams and whitelist entries, then emits the fst index
/// and bincode payload.
#[derive(Debug, Clone, Default)]
pub struct CompiledDictionaryBuilder {
    locale: Locale,
    words: BTreeMap<String, WordEntry>,
    beginning_of_sentence: BTreeMap<String, u8>,
    context_only: BTreeMap<String, Vec<NextWord>>,
    whitelist: BTreeMap<String, String>,
}

fn push_next_word(list: &mut Vec<NextWord>, next: &str, frequency: u8) {
    match list.iter_mut().find(|n| n.word == next) {
        Some(n) => n.frequency = n.frequency.max(frequency),
        None => list.push(NextWord {
            word: next.to_string(),
            frequency,
        }),
    }
}

fn sort_next_words(list: &mut [NextWord]) {
    list.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.word.cmp(&b.word)));
}

impl CompiledDictionaryBuilder {
    pub fn new(locale: impl Into<Locale>) -> Self {
        Self {
            locale: locale.into(),
            ..Self::default()
        }
    }

    /// Adds a word, keeping the higher frequency when it already exists.
    pub fn add_word(&mut self, word: &str, frequency: u8) -> &mut Self {
        let pending = self.context_only.remove(word);
        let entry = self.words.entry(word.to_string()).or_insert_with(|| WordEntry {
            word: word.to_string(),
            frequency,
            possibly_offensive: false,
            next_words: Vec::new(),
        });
        for n in pending.into_iter().flatten() {
            push_next_word(&mut entry.next_words, &n.word, n.frequency);
        }
        entry.frequency = entry.frequency.max(frequency);
        self
    }

    pub fn add_offensive_word(&mut self, word: &str, frequency: u8) -> &mut Self {
        self.add_word(word, frequency);
        if let Some(e) = self.words.get_mut(word) {
            e.possibly_offensive = true;
        }
        self
    }

    /// Adds `next` as a prediction after `prev`. `prev` may be the
    /// beginning-of-sentence tag. A `prev` that is not a word of the
    /// dictionary only serves as context; it does not become valid.
    pub fn add_bigram(&mut self, prev: &str, next: &str, frequency: u8) -> &mut Self {
        if prev == BEGINNING_OF_SENTENCE_TAG {
            let f = self.beginning_of_sentence.entry(next.to_string()).or_insert(frequency);
            *f = (*f).max(frequency);
            return self;
        }
        let list = match self.words.get_mut(prev) {
            Some(entry) => &mut entry.next_words,
            None => self.context_only.entry(prev.to_string()).or_default(),
        };
        push_next_word(list, next, frequency);
        self
    }

    pub fn add_whitelist(&mut self, typed: &str, replacement: &str) -> &mut Self {
        self.whitelist.insert(typed.to_lowercase(), replacement.to_string());
        self
    }

    /// Parses one line of the plain-text source format:
    ///
    /// ```text
    /// w <word> <frequency> [offensive]
    /// b <prev|<S>> <next> <frequency>
    /// wl <typed> <replacement>
    /// ```
    ///
    /// Blank lines and `#` comments are ignored.
    pub fn add_source_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        let fields: Vec<&str> = line.split('\t').flat_map(|f| f.split(' ')).filter(|f| !f.is_empty()).collect();
        let bad = || SuggestError::InvalidData(format!("malformed dictionary line: {:?}", line));
        let freq = |s: &str| s.parse::<u8>().map_err(|_| bad());
        match fields.as_slice() {
            ["w", word, f] => {
                self.add_word(word, freq(*f)?);
            }
            ["w", word, f, "offensive"] => {
                self.add_offensive_word(word, freq(*f)?);
            }
            ["b", prev, next, f] => {
                self.add_bigram(prev, next, freq(*f)?);
            }
            ["wl", typed, replacement] => {
                self.add_whitelist(typed, replacement);
            }
            _ => return Err(bad()),
        }
        Ok(())
    }

    fn into_parts(self) -> Result<(Vec<u8>, CompiledPayload)> {
        let mut entries: Vec<WordEntry> = self.words.into_values().collect();
        for e in &mut entries {
            sort_next_words(&mut e.next_words);
        }
        let context_only: Vec<(String, Vec<NextWord>)> = self
            .context_only
            .into_iter()
            .map(|(word, mut next)| {
                sort_next_words(&mut next);
                (word, next)
            })
            .collect();

        let mut keyed: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for (i, e) in entries.iter().enumerate() {
            keyed.entry(e.word.to_lowercase()).or_default().push(i as u32);
        }

        let mut builder = MapBuilder::memory();
        let mut buckets = Vec::with_capacity(keyed.len());
        for (key, bucket) in keyed {
            builder.insert(&key, buckets.len() as u64)?;
            buckets.push(bucket);
        }
        let fst_bytes = builder.into_inner()?;

        let mut beginning_of_sentence: Vec<NextWord> = self
            .beginning_of_sentence
            .into_iter()
            .map(|(word, frequency)| NextWord { word, frequency })
            .collect();
        beginning_of_sentence.sort_by(|a, b| b.frequency.cmp(&a.frequency));

        let payload = CompiledPayload {
            locale: self.locale,
            entries,
            buckets,
            beginning_of_sentence,
            context_only,
            whitelist: self.whitelist.into_iter().collect(),
        };
        Ok((fst_bytes, payload))
    }

    /// Builds the dictionary in memory.
    pub fn build(self) -> Result<CompiledDictionary> {
        let (fst_bytes, payload) = self.into_parts()?;
        CompiledDictionary::from_parts(Map::new(fst_bytes)?, payload)
    }

    /// Writes `<fst_path>` and `<bincode_path>`.
    pub fn write<P: AsRef<Path>>(self, fst_path: P, bincode_path: P) -> Result<()> {
        let (fst_bytes, payload) = self.into_parts()?;
        let mut f = File::create(fst_path.as_ref())?;
        f.write_all(&fst_bytes)?;
        let writer = BufWriter::new(File::create(bincode_path.as_ref())?);
        bincode::serialize_into(writer, &payload)?;
        Ok(())
    }
}
