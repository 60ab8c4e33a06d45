//! Owner of the dictionary groups of every active locale.
//!
//! The group list is replaced as a whole on a locale change. Readers take
//! a snapshot (`Arc`) of the list before they start, so a reset racing a
//! lookup never shows it a half-built list or a closed dictionary: old
//! handles close only once the last snapshot holding them is dropped.
//!
//! Lookups for the primary locale run on the calling thread while the
//! secondary locales are looked up on the background pool. Learning writes,
//! blacklist writes and main-dictionary loads are fire-and-forget.

use crate::blacklist::Blacklist;
use crate::candidate::{SuggestedWordInfo, SuggestionResults, MAX_SUGGESTIONS};
use crate::composer::ComposedData;
use crate::dictionary::dynamic::USER_WORD_FREQUENCY;
use crate::dictionary::{
    DictType, Dictionary, DictionaryProvider, DictionaryStats, ExpandableDictionary, LookupRequest, SubDictionary,
    ALL_DICTIONARY_TYPES, NOT_A_PROBABILITY, NOT_A_WEIGHT_OF_LANG_MODEL_VS_SPATIAL_MODEL,
};
use crate::error::Result;
use crate::executor::BackgroundExecutor;
use crate::group::{DictionaryGroup, MAX_CONFIDENCE};
use crate::keyboard::ProximityInfo;
use crate::locale::Locale;
use crate::ngram::{NgramContext, WordInfo};
use crate::settings::Settings;
use crate::suggested_words::InputStyle;
use crate::text;
use ahash::AHashMap;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Capitalized words are learned in lower case when the lower-case form is
/// at least this frequent in the main dictionary.
const CAPITALIZED_FORM_MAX_PROBABILITY_FOR_INSERT: i32 = 140;

/// History frequency a word needs before it is promoted to the user
/// dictionary.
const PROMOTION_HISTORY_FREQUENCY: i32 = 120;

/// Why a word is being unlearned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A plain backspace over the word. Never unlearns.
    Backspace,
    /// The user reverted an auto-correction.
    RevertCommit,
    /// The user picked a different suggestion for the word.
    Recorrection,
    Other,
}

/// Blocks callers until in-flight main-dictionary loads are done.
#[derive(Debug, Default)]
struct LoadingLatch {
    loading: Mutex<usize>,
    done: Condvar,
}

impl LoadingLatch {
    fn enter(self: &Arc<Self>) -> LatchGuard {
        *self.loading.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        LatchGuard(Arc::clone(self))
    }

    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut loading = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        while *loading > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            loading = self
                .done
                .wait_timeout(loading, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// Releases one load when dropped, even if the load task never ran.
struct LatchGuard(Arc<LoadingLatch>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        let mut loading = self.0.loading.lock().unwrap_or_else(PoisonError::into_inner);
        *loading = loading.saturating_sub(1);
        if *loading == 0 {
            self.0.done.notify_all();
        }
    }
}

/// Pending rewrite of a sentence-initial word in the next learning context.
#[derive(Debug, Default)]
struct ContextRewrite {
    active: bool,
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct GroupDump {
    locale: Locale,
    account: Option<String>,
    confidence: i32,
    has_main_dictionary: bool,
    blacklisted: Vec<String>,
    dictionaries: Vec<DictionaryStats>,
}

type Groups = Arc<Vec<Arc<DictionaryGroup>>>;

pub struct DictionaryFacilitator {
    provider: Arc<dyn DictionaryProvider>,
    executor: Arc<BackgroundExecutor>,
    groups: Mutex<Groups>,
    settings: RwLock<Settings>,
    loading: Arc<LoadingLatch>,
    rewrite: Mutex<ContextRewrite>,
    spelling_cache: Mutex<LruCache<String, bool>>,
    next_word_cache: Arc<Mutex<AHashMap<NgramContext, SuggestionResults>>>,
}

impl std::fmt::Debug for DictionaryFacilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryFacilitator")
            .field("provider", &self.provider)
            .field("groups", &self.groups())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DictionaryFacilitator {
    /// Facilitator with no active locale. Call `reset_dictionaries` to load one.
    pub fn new(provider: Arc<dyn DictionaryProvider>, settings: Settings) -> Result<Self> {
        let executor = Arc::new(BackgroundExecutor::new(settings.background_threads)?);
        let capacity = NonZeroUsize::new(settings.spelling_cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            provider,
            executor,
            groups: Mutex::new(Arc::new(vec![Arc::new(DictionaryGroup::default())])),
            settings: RwLock::new(settings),
            loading: Arc::new(LoadingLatch::default()),
            rewrite: Mutex::new(ContextRewrite::default()),
            spelling_cache: Mutex::new(LruCache::new(capacity)),
            next_word_cache: Arc::new(Mutex::new(AHashMap::new())),
        })
    }

    /// Snapshot of the current group list, primary locale first.
    pub fn groups(&self) -> Groups {
        Arc::clone(&lock(&self.groups))
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the settings and drops everything computed under the old ones.
    pub fn set_settings(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self.clear_on_settings_reload();
    }

    pub fn executor(&self) -> &BackgroundExecutor {
        &self.executor
    }

    pub fn primary_locale(&self) -> Locale {
        self.groups()
            .first()
            .map(|g| g.locale().clone())
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        !self.primary_locale().is_empty()
    }

    // Lifecycle

    /// Rebuilds the group list for `primary` followed by `secondary`.
    ///
    /// Dictionaries of a locale (and account) that was already active are
    /// carried over unless `force_reload` is set. Main dictionaries that
    /// are not carried over load in the background; see
    /// `wait_for_loading_main_dictionaries`.
    pub fn reset_dictionaries(
        &self,
        primary: &Locale,
        secondary: &[Locale],
        use_contacts: bool,
        use_personalization: bool,
        force_reload: bool,
        account: Option<&str>,
    ) {
        let mut locales = vec![primary.clone()];
        for locale in secondary {
            if !locales.contains(locale) {
                locales.push(locale.clone());
            }
        }
        let mut sub_types = vec![DictType::User];
        if use_personalization {
            sub_types.push(DictType::UserHistory);
        }
        if use_contacts {
            sub_types.push(DictType::Contacts);
        }

        // Superseded loads still queued are dropped; writes always land.
        self.executor.cancel_pending();

        let old_groups = self.groups();
        let mut new_groups = Vec::with_capacity(locales.len());
        let mut to_load = Vec::new();
        for locale in &locales {
            let old = old_groups
                .iter()
                .find(|g| g.locale() == locale && g.account() == account)
                .filter(|_| !force_reload);
            let main = old.and_then(|g| g.main_dictionary());
            let mut subs = AHashMap::new();
            for &dict_type in &sub_types {
                let reused = old.and_then(|g| g.sub_dictionary(dict_type)).cloned();
                let sub = match reused {
                    Some(sub) => Some(sub),
                    None => self.create_sub_dictionary(dict_type, locale, account),
                };
                if let Some(sub) = sub {
                    subs.insert(dict_type, sub);
                }
            }
            let blacklist = match old_groups.iter().find(|g| g.locale() == locale) {
                Some(g) => Arc::clone(g.blacklist()),
                None => Arc::new(match self.provider.blacklist_path(locale) {
                    Some(path) => Blacklist::load(path),
                    None => Blacklist::in_memory(),
                }),
            };
            let needs_load = main.as_ref().map_or(true, |m| !m.is_initialized());
            let group = Arc::new(DictionaryGroup::new(
                locale.clone(),
                account.map(str::to_string),
                main,
                subs,
                blacklist,
            ));
            if needs_load {
                to_load.push(Arc::clone(&group));
            }
            new_groups.push(group);
        }

        *lock(&self.groups) = Arc::new(new_groups);
        drop(old_groups);
        info!(locales = ?locales, loading = to_load.len(), "dictionary groups reset");

        for group in to_load {
            self.load_main_dictionary(&group);
        }
        self.spelling_cache_clear();
        self.clear_on_settings_reload();
    }

    fn create_sub_dictionary(&self, dict_type: DictType, locale: &Locale, account: Option<&str>) -> Option<SubDictionary> {
        match self.provider.create_sub_dictionary(dict_type, locale, account) {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!(%locale, "no {} dictionary: {:#}", dict_type, e);
                None
            }
        }
    }

    fn load_main_dictionary(&self, group: &Arc<DictionaryGroup>) {
        let guard = self.loading.enter();
        let provider = Arc::clone(&self.provider);
        let locale = group.locale().clone();
        let group: Weak<DictionaryGroup> = Arc::downgrade(group);
        self.executor.spawn_cancellable("load-main", move || {
            let _guard = guard;
            let Some(group) = group.upgrade() else {
                debug!(%locale, "group gone before its main dictionary loaded");
                return;
            };
            match provider.create_main_dictionary(&locale) {
                Ok(main) => {
                    group.set_main_dictionary(Some(main));
                    info!(%locale, "main dictionary loaded");
                }
                Err(e) => warn!(%locale, "main dictionary unavailable: {:#}", e),
            }
        });
    }

    /// Waits for main-dictionary loads started by resets. Returns false on
    /// timeout.
    pub fn wait_for_loading_main_dictionaries(&self, timeout: Duration) -> bool {
        self.loading.wait(timeout)
    }

    /// Waits until learning, blacklist writes and loads have drained.
    pub fn wait_for_background_tasks(&self, timeout: Duration) -> bool {
        self.executor.wait_for_idle(timeout)
    }

    pub fn on_finish_input(&self) {
        for group in self.groups().iter() {
            group.on_finish_input();
        }
    }

    /// Deactivates every locale. Dictionaries close once no lookup holds them.
    pub fn close_dictionaries(&self) {
        self.on_finish_input();
        *lock(&self.groups) = Arc::new(vec![Arc::new(DictionaryGroup::default())]);
        self.clear_on_settings_reload();
        debug!("dictionaries closed");
    }

    /// Drops cached next-word predictions.
    pub fn clear_on_settings_reload(&self) {
        lock(&self.next_word_cache).clear();
    }

    pub fn has_at_least_one_initialized_main_dictionary(&self) -> bool {
        self.groups().iter().any(|g| g.has_initialized_main_dictionary())
    }

    pub fn has_at_least_one_uninitialized_main_dictionary(&self) -> bool {
        self.groups().iter().any(|g| !g.has_initialized_main_dictionary())
    }

    // Preferred groups

    /// Group with the highest confidence; the earliest wins ties.
    pub fn currently_preferred_group(&self) -> Arc<DictionaryGroup> {
        Self::preferred_in(&self.groups())
    }

    fn preferred_in(groups: &[Arc<DictionaryGroup>]) -> Arc<DictionaryGroup> {
        let mut best: Option<&Arc<DictionaryGroup>> = None;
        for group in groups {
            match best {
                Some(b) if group.confidence() <= b.confidence() => {}
                _ => best = Some(group),
            }
        }
        best.cloned().unwrap_or_default()
    }

    /// The preferred group, if it is confident and no other group is.
    pub fn clearly_preferred_group(&self) -> Option<Arc<DictionaryGroup>> {
        Self::clearly_preferred_in(&self.groups())
    }

    fn clearly_preferred_in(groups: &[Arc<DictionaryGroup>]) -> Option<Arc<DictionaryGroup>> {
        if groups.len() == 1 {
            return groups.first().cloned();
        }
        let preferred = Self::preferred_in(groups);
        if preferred.confidence() < MAX_CONFIDENCE {
            return None;
        }
        let others_silent = groups
            .iter()
            .filter(|g| !Arc::ptr_eq(g, &preferred))
            .all(|g| g.confidence() <= 0);
        others_silent.then_some(preferred)
    }

    /// `"en 2, de 0"`, or `None` with a single locale.
    pub fn locales_and_confidences(&self) -> Option<String> {
        let groups = self.groups();
        if groups.len() < 2 {
            return None;
        }
        let parts: Vec<String> = groups
            .iter()
            .map(|g| format!("{} {}", g.locale(), g.confidence()))
            .collect();
        Some(parts.join(", "))
    }

    // Lookup

    /// Candidates for `composed` from every group, merged and ranked.
    pub fn get_suggestion_results(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        proximity: ProximityInfo,
        settings: &Settings,
        session_id: i32,
        input_style: InputStyle,
    ) -> SuggestionResults {
        let groups = self.groups();
        let is_batch = composed.is_batch_mode || input_style.is_batch();

        let jobs: Vec<Box<dyn FnOnce() -> Vec<SuggestedWordInfo> + Send>> = if groups.len() > 1 {
            let shared = Arc::new((composed.clone(), ngram_context.clone(), settings.clone()));
            (1..groups.len())
                .map(|i| {
                    let groups = Arc::clone(&groups);
                    let shared = Arc::clone(&shared);
                    Box::new(move || {
                        let (composed, ngram_context, settings) = &*shared;
                        Self::group_suggestions(&groups, i, composed, ngram_context, proximity, settings, session_id, is_batch)
                    }) as Box<dyn FnOnce() -> Vec<SuggestedWordInfo> + Send>
                })
                .collect()
        } else {
            Vec::new()
        };
        let secondary = self.executor.fan_out(jobs);
        let primary = Self::group_suggestions(&groups, 0, composed, ngram_context, proximity, settings, session_id, is_batch);
        let secondary = secondary.join();

        let mut results = SuggestionResults::new(MAX_SUGGESTIONS, ngram_context.is_beginning_of_sentence_context())
            .with_raw_suggestions();
        let mut all = primary;
        for (i, part) in secondary.into_iter().enumerate() {
            match part {
                Some(part) => all.extend(part),
                None => warn!(group = i + 1, "secondary lookup failed"),
            }
        }
        results.add_all(all.iter().cloned());
        include_at_least_two_word_suggestions(&mut results, &all, &composed.typed_word);
        results.raw_suggestions = Some(all);
        results
    }

    #[allow(clippy::too_many_arguments)]
    fn group_suggestions(
        groups: &[Arc<DictionaryGroup>],
        index: usize,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        proximity: ProximityInfo,
        settings: &Settings,
        session_id: i32,
        is_batch: bool,
    ) -> Vec<SuggestedWordInfo> {
        let Some(group) = groups.get(index) else {
            return Vec::new();
        };
        let request = LookupRequest {
            composed,
            ngram_context,
            proximity,
            settings,
            session_id,
            weight_for_locale: group.weight_for_locale(groups, is_batch),
        };
        let mut out = Vec::new();
        for dict_type in ALL_DICTIONARY_TYPES {
            let Some(dict) = group.dictionary(dict_type) else {
                continue;
            };
            let mut weight = NOT_A_WEIGHT_OF_LANG_MODEL_VS_SPATIAL_MODEL;
            let Some(found) = dict.suggestions(&request, &mut weight) else {
                continue;
            };
            let checks_presence = is_batch && matches!(dict_type, DictType::Main | DictType::UserHistory);
            out.extend(found.into_iter().filter(|info| {
                if groups.iter().any(|g| g.is_blacklisted(&info.word)) {
                    return false;
                }
                // Gesture decoding invents history words; keep only confirmed ones.
                !(checks_presence
                    && info.code_point_count() > 2
                    && info.source_dict.dict_type == dict_type
                    && !dict.is_in_dictionary(&info.word))
            }));
        }
        out
    }

    /// Pure context predictions, cached per n-gram context until the next
    /// reset or settings reload.
    pub fn get_next_word_suggestions(
        &self,
        ngram_context: &NgramContext,
        proximity: ProximityInfo,
        settings: &Settings,
        session_id: i32,
    ) -> SuggestionResults {
        if let Some(cached) = lock(&self.next_word_cache).get(ngram_context) {
            return cached.clone();
        }
        let results = self.get_suggestion_results(
            &ComposedData::empty(),
            ngram_context,
            proximity,
            settings,
            session_id,
            InputStyle::Prediction,
        );
        lock(&self.next_word_cache).insert(ngram_context.clone(), results.clone());
        results
    }

    pub fn next_word_cache_len(&self) -> usize {
        lock(&self.next_word_cache).len()
    }

    // Validity

    pub fn is_valid_spelling_word(&self, word: &str) -> bool {
        if let Some(&valid) = lock(&self.spelling_cache).peek(word) {
            return valid;
        }
        self.compute_spelling_validity(word)
    }

    fn compute_spelling_validity(&self, word: &str) -> bool {
        let groups = self.groups();
        !groups.iter().any(|g| g.is_blacklisted(word)) && groups.iter().any(|g| g.is_valid_word(word))
    }

    /// Cached spelling answer for `word`, if one is held.
    pub fn cached_spelling_validity(&self, word: &str) -> Option<bool> {
        lock(&self.spelling_cache).peek(word).copied()
    }

    fn put_word_into_valid_spelling_word_cache(&self, word: &str) {
        let lower = word.to_lowercase();
        let lower_valid = self.compute_spelling_validity(&lower);
        let capitalized = text::capitalize_first_and_downcase_rest(word);
        let capitalized_valid = lower_valid || self.compute_spelling_validity(&capitalized);
        let mut cache = lock(&self.spelling_cache);
        cache.put(lower, lower_valid);
        cache.put(capitalized, capitalized_valid);
    }

    fn invalidate_spelling_cache(&self, word: &str) {
        let mut cache = lock(&self.spelling_cache);
        cache.pop(word);
        cache.pop(&word.to_lowercase());
        cache.pop(&text::capitalize_first_and_downcase_rest(word));
    }

    fn spelling_cache_clear(&self) {
        lock(&self.spelling_cache).clear();
    }

    /// Valid in the primary locale.
    pub fn is_valid_suggestion_word(&self, word: &str) -> bool {
        self.groups().first().is_some_and(|g| g.is_valid_word(word))
    }

    // Learning

    /// Learns a committed text. Multi-word commits are learned word by word
    /// in the currently preferred locale.
    pub fn add_to_user_history(
        &self,
        suggestion: &str,
        was_auto_capitalized: bool,
        ngram_context: &NgramContext,
        timestamp: u64,
        block_potentially_offensive: bool,
    ) {
        let words = text::split_on_whitespace(suggestion);
        let groups = self.groups();
        if let [word] = words.as_slice() {
            self.adjust_confidences(&groups, word, was_auto_capitalized);
            let opted_in = self.settings().add_to_personal_dictionary;
            let primary_has_history = groups
                .first()
                .is_some_and(|g| g.has_dict(DictType::UserHistory, g.account()));
            if opted_in && primary_has_history && !was_auto_capitalized {
                self.add_to_personal_if_invalid_but_in_history(&groups, word);
            }
        }

        let preferred = Self::preferred_in(&groups);
        let mut context = ngram_context.clone();
        for (i, word) in words.iter().enumerate() {
            let auto_capitalized = i == 0 && was_auto_capitalized;
            self.add_word_to_user_history(&preferred, &mut context, word, auto_capitalized, timestamp, block_potentially_offensive);
            context = context.next_context(WordInfo::new(*word));
            // Typing a blacklisted word again takes it off the list.
            for group in groups.iter().filter(|g| g.confidence() == preferred.confidence()) {
                group.remove_from_blacklist(word, &self.executor);
            }
        }
        // After the blacklist update, so a retyped word reads as valid again.
        self.put_word_into_valid_spelling_word_cache(suggestion);
    }

    fn add_word_to_user_history(
        &self,
        group: &DictionaryGroup,
        context: &mut NgramContext,
        word: &str,
        was_auto_capitalized: bool,
        timestamp: u64,
        block_potentially_offensive: bool,
    ) {
        let Some(history) = group.sub_dictionary(DictType::UserHistory).cloned() else {
            return;
        };
        let main = group.main_dictionary();
        let frequency_in_main = main.as_ref().map_or(NOT_A_PROBABILITY, |m| m.frequency(word));
        if frequency_in_main == 0 && block_potentially_offensive {
            debug!("not learning offensive word");
            return;
        }

        let learned = {
            let mut rewrite = lock(&self.rewrite);
            if rewrite.active {
                rewrite.active = context.change_word_if_after_beginning_of_sentence(&rewrite.from, &rewrite.to);
            }
            if was_auto_capitalized || context.is_beginning_of_sentence_context() {
                let decapitalized = text::decapitalize(word);
                if group.is_valid_word(word) && !group.is_valid_word(&decapitalized) {
                    // Capitalized-only word, such as a name.
                    word.to_string()
                } else {
                    rewrite.active = true;
                    rewrite.from = word.to_string();
                    rewrite.to = decapitalized.clone();
                    decapitalized
                }
            } else {
                let lower = word.to_lowercase();
                let lower_frequency = main.as_ref().map_or(NOT_A_PROBABILITY, |m| m.frequency(&lower));
                if frequency_in_main < lower_frequency && lower_frequency >= CAPITALIZED_FORM_MAX_PROBABILITY_FOR_INSERT {
                    lower
                } else {
                    word.to_string()
                }
            }
        };

        let is_valid = frequency_in_main > 0;
        let context = context.clone();
        let locale = group.locale().clone();
        let next_word_cache = Arc::clone(&self.next_word_cache);
        self.executor.spawn("learn", move || {
            match history.add_entry(&context, &learned, is_valid, 1, timestamp) {
                Ok(()) => lock(&next_word_cache).clear(),
                Err(e) => warn!(%locale, "failed to learn word: {}", e),
            }
        });
    }

    fn adjust_confidences(&self, groups: &[Arc<DictionaryGroup>], word: &str, was_auto_capitalized: bool) {
        if groups.len() <= 1 || word.contains(' ') {
            return;
        }
        let decapitalized = if was_auto_capitalized {
            text::decapitalize(word)
        } else {
            word.to_string()
        };
        for group in groups {
            if group.is_valid_word(word) || (was_auto_capitalized && group.is_valid_word(&decapitalized)) {
                group.increase_confidence();
            } else {
                group.decrease_confidence();
            }
        }
        debug!(word, confidences = ?groups.iter().map(|g| g.confidence()).collect::<Vec<_>>(), "confidences adjusted");
    }

    fn add_to_personal_if_invalid_but_in_history(&self, groups: &[Arc<DictionaryGroup>], word: &str) {
        if word.chars().count() <= 1 {
            return;
        }
        let Some(group) = Self::clearly_preferred_in(groups) else {
            return;
        };
        let (Some(user), Some(history)) = (
            group.sub_dictionary(DictType::User).cloned(),
            group.sub_dictionary(DictType::UserHistory),
        ) else {
            return;
        };
        if group.is_valid_word(word) || user.is_in_dictionary(word) {
            return;
        }
        if history.frequency(word) <= PROMOTION_HISTORY_FREQUENCY {
            return;
        }
        let word = word.to_string();
        let locale = group.locale().clone();
        self.executor.spawn("promote-word", move || match user.add_word(&word, USER_WORD_FREQUENCY) {
            Ok(()) => info!(%locale, "added {:?} to the personal dictionary", word),
            Err(e) => warn!(%locale, "failed to add word to personal dictionary: {}", e),
        });
    }

    /// Forgets a learned word. A backspace alone is not a reason to unlearn,
    /// but the cached spelling answer is dropped either way.
    pub fn unlearn_from_user_history(
        &self,
        word: &str,
        _ngram_context: &NgramContext,
        _timestamp: u64,
        event_type: EventType,
    ) {
        if event_type != EventType::Backspace {
            let preferred = self.currently_preferred_group();
            if let Some(history) = preferred.sub_dictionary(DictType::UserHistory).cloned() {
                let word = word.to_string();
                let next_word_cache = Arc::clone(&self.next_word_cache);
                self.executor.spawn("unlearn", move || match history.remove_entry(&word) {
                    Ok(true) => lock(&next_word_cache).clear(),
                    Ok(false) => {}
                    Err(e) => warn!("failed to unlearn word: {}", e),
                });
            }
        }
        self.invalidate_spelling_cache(word);
    }

    /// Removes `word` everywhere; words in immutable dictionaries are
    /// blacklisted instead.
    pub fn remove_word(&self, word: &str) {
        for group in self.groups().iter() {
            group.remove_word(word, &self.executor);
        }
        self.invalidate_spelling_cache(word);
        self.clear_on_settings_reload();
    }

    pub fn clear_user_history(&self) {
        for group in self.groups().iter() {
            if let Some(history) = group.sub_dictionary(DictType::UserHistory) {
                if let Err(e) = history.clear() {
                    warn!(locale = %group.locale(), "failed to clear history: {}", e);
                }
            }
        }
        self.clear_on_settings_reload();
    }

    // Diagnostics

    pub fn dictionary_stats(&self) -> Vec<DictionaryStats> {
        self.groups().iter().flat_map(|g| g.stats()).collect()
    }

    /// JSON description of every group.
    pub fn dump(&self) -> serde_json::Result<String> {
        let groups: Vec<GroupDump> = self
            .groups()
            .iter()
            .map(|g| GroupDump {
                locale: g.locale().clone(),
                account: g.account().map(str::to_string),
                confidence: g.confidence(),
                has_main_dictionary: g.main_dictionary().is_some(),
                blacklisted: g.blacklist().snapshot(),
                dictionaries: g.stats(),
            })
            .collect();
        serde_json::to_string_pretty(&groups)
    }
}

/// Makes sure at least two entries differ from the typed word (ignoring
/// case) when the merged list has room, borrowing from `all`.
fn include_at_least_two_word_suggestions(results: &mut SuggestionResults, all: &[SuggestedWordInfo], typed_word: &str) {
    if results.len() <= 2 || typed_word.is_empty() {
        return;
    }
    let typed_lower = typed_word.to_lowercase();
    let is_typed = |word: &str| word.to_lowercase() == typed_lower;
    let found = results.iter().filter(|s| !is_typed(&s.word)).take(2).count();
    for _ in found..2 {
        let Some(pick) = all
            .iter()
            .find(|s| !is_typed(&s.word) && !results.contains_word(&s.word))
            .cloned()
        else {
            break;
        };
        let Some(last_typed) = results.iter().rev().find(|s| is_typed(&s.word)).map(|s| s.word.clone()) else {
            break;
        };
        results.remove_word(&last_typed);
        results.add(pick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{kind, DictionaryRef};

    fn info(word: &str, score: i32) -> SuggestedWordInfo {
        SuggestedWordInfo::new(word, "", score, kind::CORRECTION, DictionaryRef::new(DictType::Main, None))
    }

    #[test]
    fn case_variants_leave_room_for_two_other_words() {
        let mut results = SuggestionResults::new(4, false);
        let all = vec![
            info("Us", 900),
            info("us", 800),
            info("US", 700),
            info("uS", 600),
            info("use", 500),
            info("bus", 400),
        ];
        results.add_all(all.iter().cloned());
        assert_eq!(results.len(), 4);
        include_at_least_two_word_suggestions(&mut results, &all, "us");
        let words: Vec<&str> = results.iter().map(|s| s.word.as_str()).collect();
        assert_eq!(words, vec!["Us", "us", "use", "bus"]);
    }

    #[test]
    fn small_results_are_left_alone() {
        let mut results = SuggestionResults::new(4, false);
        let all = vec![info("us", 800), info("US", 700)];
        results.add_all(all.iter().cloned());
        include_at_least_two_word_suggestions(&mut results, &all, "us");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn latch_releases_on_drop() {
        let latch = Arc::new(LoadingLatch::default());
        let guard = latch.enter();
        assert!(!latch.wait(Duration::from_millis(10)));
        drop(guard);
        assert!(latch.wait(Duration::from_millis(10)));
    }
}
