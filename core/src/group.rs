//! One locale's dictionaries and its standing during multilingual typing.
//!
//! A group owns the main dictionary of a locale (loaded in the background,
//! so it may appear late), the mutable sub-dictionaries and the locale's
//! blacklist. Its confidence counter decides how strongly its candidates
//! are weighted against the other groups'.

use crate::blacklist::Blacklist;
use crate::dictionary::{
    DictType, Dictionary, DictionaryStats, ExpandableDictionary, MainDictionary, SubDictionary, SUB_DICTIONARY_TYPES,
};
use crate::executor::BackgroundExecutor;
use crate::locale::Locale;
use ahash::AHashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

pub const MAX_CONFIDENCE: i32 = 2;
const INITIAL_CONFIDENCE: i32 = 1;

const WEIGHT_STEP_TYPING: f32 = 0.15;
const WEIGHT_STEP_GESTURE: f32 = 0.05;

/// Either kind of dictionary a group holds, usable as a `Dictionary`.
#[derive(Debug, Clone)]
pub enum GroupDictionary {
    Main(MainDictionary),
    Sub(SubDictionary),
}

impl GroupDictionary {
    pub fn as_expandable(&self) -> Option<&SubDictionary> {
        match self {
            GroupDictionary::Sub(sub) => Some(sub),
            GroupDictionary::Main(_) => None,
        }
    }
}

impl Deref for GroupDictionary {
    type Target = dyn Dictionary;

    fn deref(&self) -> &Self::Target {
        match self {
            GroupDictionary::Main(main) => &***main,
            GroupDictionary::Sub(sub) => sub.as_dictionary(),
        }
    }
}

pub struct DictionaryGroup {
    locale: Locale,
    account: Option<String>,
    main: RwLock<Option<MainDictionary>>,
    subs: AHashMap<DictType, SubDictionary>,
    confidence: AtomicI32,
    blacklist: Arc<Blacklist>,
}

impl fmt::Debug for DictionaryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut subs: Vec<DictType> = self.subs.keys().copied().collect();
        subs.sort();
        f.debug_struct("DictionaryGroup")
            .field("locale", &self.locale)
            .field("account", &self.account)
            .field("has_main", &self.main_dictionary().is_some())
            .field("subs", &subs)
            .field("confidence", &self.confidence())
            .finish()
    }
}

impl Default for DictionaryGroup {
    /// Placeholder group with no locale and no dictionaries.
    fn default() -> Self {
        Self::new(Locale::root(), None, None, AHashMap::new(), Arc::new(Blacklist::in_memory()))
    }
}

impl DictionaryGroup {
    pub fn new(
        locale: Locale,
        account: Option<String>,
        main: Option<MainDictionary>,
        subs: AHashMap<DictType, SubDictionary>,
        blacklist: Arc<Blacklist>,
    ) -> Self {
        Self {
            locale,
            account,
            main: RwLock::new(main),
            subs,
            confidence: AtomicI32::new(INITIAL_CONFIDENCE),
            blacklist,
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn main_dictionary(&self) -> Option<MainDictionary> {
        self.main.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Installs a freshly loaded main dictionary, returning the one it replaces.
    pub fn set_main_dictionary(&self, main: Option<MainDictionary>) -> Option<MainDictionary> {
        let mut slot = self.main.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, main)
    }

    pub fn sub_dictionary(&self, dict_type: DictType) -> Option<&SubDictionary> {
        self.subs.get(&dict_type)
    }

    pub fn dictionary(&self, dict_type: DictType) -> Option<GroupDictionary> {
        match dict_type {
            DictType::Main => self.main_dictionary().map(GroupDictionary::Main),
            _ => self.subs.get(&dict_type).cloned().map(GroupDictionary::Sub),
        }
    }

    /// History is bound to the account the group was created for; asking
    /// on behalf of another account finds none.
    pub fn has_dict(&self, dict_type: DictType, account: Option<&str>) -> bool {
        match dict_type {
            DictType::Main => self.main_dictionary().is_some(),
            DictType::UserHistory if account != self.account() => false,
            _ => self.subs.contains_key(&dict_type),
        }
    }

    pub fn has_initialized_main_dictionary(&self) -> bool {
        self.main_dictionary().is_some_and(|main| main.is_initialized())
    }

    pub fn blacklist(&self) -> &Arc<Blacklist> {
        &self.blacklist
    }

    // Confidence

    pub fn confidence(&self) -> i32 {
        self.confidence.load(Ordering::Relaxed)
    }

    /// Unbounded upward. The surplus is dropped on the next decrease.
    pub fn increase_confidence(&self) {
        self.confidence.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrease_confidence(&self) {
        let _ = self.confidence.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
            Some(if c > MAX_CONFIDENCE { MAX_CONFIDENCE } else { (c - 1).max(0) })
        });
    }

    fn weight(&self, step: f32) -> f32 {
        let missing = (MAX_CONFIDENCE - self.confidence()).max(0);
        1.0 - step * missing as f32
    }

    pub fn weight_for_typing(&self) -> f32 {
        self.weight(WEIGHT_STEP_TYPING)
    }

    pub fn weight_for_gesture(&self) -> f32 {
        self.weight(WEIGHT_STEP_GESTURE)
    }

    /// Weight applied to this group's candidates when merged with `groups`.
    ///
    /// A confident group still gives up half a step while another group is
    /// at least as confident.
    pub fn weight_for_locale(&self, groups: &[Arc<DictionaryGroup>], is_gesturing: bool) -> f32 {
        if groups.len() <= 1 {
            return 1.0;
        }
        let step = if is_gesturing {
            WEIGHT_STEP_GESTURE
        } else {
            WEIGHT_STEP_TYPING
        };
        let confidence = self.confidence();
        if confidence < MAX_CONFIDENCE {
            return self.weight(step);
        }
        let contested = groups
            .iter()
            .any(|g| !std::ptr::eq(g.as_ref(), self) && g.confidence() >= confidence);
        if contested {
            1.0 - step / 2.0
        } else {
            1.0
        }
    }

    // Blacklist

    pub fn is_blacklisted(&self, word: &str) -> bool {
        self.blacklist.is_blacklisted(word)
    }

    pub fn add_to_blacklist(&self, word: &str, executor: &BackgroundExecutor) {
        if self.blacklist.add(word) {
            debug!(locale = %self.locale, word, "blacklisted");
            self.persist_blacklist(executor);
        }
    }

    pub fn remove_from_blacklist(&self, word: &str, executor: &BackgroundExecutor) {
        if self.blacklist.remove(word) {
            debug!(locale = %self.locale, word, "un-blacklisted");
            self.persist_blacklist(executor);
        }
    }

    fn persist_blacklist(&self, executor: &BackgroundExecutor) {
        if self.blacklist.path().is_none() {
            return;
        }
        let blacklist = Arc::clone(&self.blacklist);
        executor.spawn("blacklist-write", move || {
            if let Err(e) = blacklist.persist() {
                warn!("failed to write blacklist: {}", e);
            }
        });
    }

    // Words

    /// Valid in some dictionary of the group and not blacklisted here.
    pub fn is_valid_word(&self, word: &str) -> bool {
        if word.is_empty() || self.is_blacklisted(word) {
            return false;
        }
        if self.main_dictionary().is_some_and(|main| main.is_valid_word(word)) {
            return true;
        }
        self.subs.values().any(|sub| sub.is_valid_word(word))
    }

    /// Forgets `word`: learned and personal entries are deleted, words the
    /// group cannot delete are blacklisted instead.
    pub fn remove_word(&self, word: &str, executor: &BackgroundExecutor) {
        for dict_type in [DictType::UserHistory, DictType::User] {
            if let Some(sub) = self.subs.get(&dict_type) {
                if let Err(e) = sub.remove_entry(word) {
                    warn!(locale = %self.locale, "failed to remove {:?} from {}: {}", word, dict_type, e);
                }
            }
        }
        if let Some(contacts) = self.subs.get(&DictType::Contacts) {
            if contacts.is_in_dictionary(word) {
                if let Err(e) = contacts.remove_entry(word) {
                    warn!(locale = %self.locale, "failed to remove {:?} from contacts: {}", word, e);
                }
                self.add_to_blacklist(word, executor);
                return;
            }
        }
        let Some(main) = self.main_dictionary() else {
            return;
        };
        if main.is_valid_word(word) {
            self.add_to_blacklist(word, executor);
            return;
        }
        let lower = word.to_lowercase();
        if lower != word && main.is_valid_word(&lower) {
            self.add_to_blacklist(&lower, executor);
        }
    }

    pub fn stats(&self) -> Vec<DictionaryStats> {
        SUB_DICTIONARY_TYPES
            .iter()
            .filter_map(|t| self.subs.get(t))
            .map(|sub| sub.stats())
            .collect()
    }

    /// Lets every dictionary of the group flush per-input state.
    pub fn on_finish_input(&self) {
        if let Some(main) = self.main_dictionary() {
            main.on_finish_input();
        }
        for sub in self.subs.values() {
            sub.on_finish_input();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{main_handle, sub_handle, CompiledDictionaryBuilder, DynamicDictionary};
    use crate::ngram::NgramContext;

    fn group(locale: &str, account: Option<&str>) -> DictionaryGroup {
        let mut b = CompiledDictionaryBuilder::new(locale);
        b.add_word("hello", 200).add_word("world", 180).add_word("paris", 120);
        let main = main_handle(b.build().unwrap());
        let mut subs = AHashMap::new();
        for t in SUB_DICTIONARY_TYPES {
            subs.insert(t, sub_handle(DynamicDictionary::in_memory(t, locale)));
        }
        DictionaryGroup::new(
            Locale::new(locale),
            account.map(str::to_string),
            Some(main),
            subs,
            Arc::new(Blacklist::in_memory()),
        )
    }

    #[test]
    fn confidence_surplus_is_dropped_on_decrease() {
        let g = DictionaryGroup::default();
        assert_eq!(g.confidence(), 1);
        g.increase_confidence();
        g.increase_confidence();
        g.increase_confidence();
        assert_eq!(g.confidence(), 4);
        g.decrease_confidence();
        assert_eq!(g.confidence(), MAX_CONFIDENCE);
        g.decrease_confidence();
        g.decrease_confidence();
        g.decrease_confidence();
        assert_eq!(g.confidence(), 0);
    }

    #[test]
    fn weights_follow_confidence() {
        let g = DictionaryGroup::default();
        g.decrease_confidence();
        let (t0, g0) = (g.weight_for_typing(), g.weight_for_gesture());
        assert!((t0 - 0.7).abs() < 1e-6);
        assert!((g0 - 0.9).abs() < 1e-6);
        g.increase_confidence();
        assert!(g.weight_for_typing() > t0);
        g.increase_confidence();
        assert_eq!(g.weight_for_typing(), 1.0);
        g.increase_confidence();
        assert_eq!(g.weight_for_typing(), 1.0);
        assert_eq!(g.weight_for_gesture(), 1.0);
    }

    #[test]
    fn contested_confident_groups_share_the_lead() {
        let en = Arc::new(group("en", None));
        let de = Arc::new(group("de", None));
        let groups = vec![Arc::clone(&en), Arc::clone(&de)];
        assert!((en.weight_for_locale(&groups, false) - 0.85).abs() < 1e-6);
        en.increase_confidence();
        de.increase_confidence();
        assert!((en.weight_for_locale(&groups, false) - 0.925).abs() < 1e-6);
        de.decrease_confidence();
        assert_eq!(en.weight_for_locale(&groups, false), 1.0);
        assert_eq!(en.weight_for_locale(&groups[..1], true), 1.0);
    }

    #[test]
    fn history_is_scoped_to_the_account() {
        let g = group("en", Some("me@example.com"));
        assert!(g.has_dict(DictType::Main, None));
        assert!(g.has_dict(DictType::User, None));
        assert!(g.has_dict(DictType::UserHistory, Some("me@example.com")));
        assert!(!g.has_dict(DictType::UserHistory, Some("other@example.com")));
        assert!(!g.has_dict(DictType::UserHistory, None));
    }

    #[test]
    fn removing_a_main_word_blacklists_it() {
        let executor = BackgroundExecutor::new(1).unwrap();
        let g = group("en", None);
        assert!(g.is_valid_word("hello"));
        g.remove_word("hello", &executor);
        assert!(g.is_blacklisted("hello"));
        assert!(!g.is_valid_word("hello"));

        g.remove_word("Paris", &executor);
        assert!(g.is_blacklisted("paris"));
        assert!(!g.is_blacklisted("Paris"));
    }

    #[test]
    fn removing_a_learned_word_deletes_it() {
        let executor = BackgroundExecutor::new(1).unwrap();
        let g = group("en", None);
        let user = g.sub_dictionary(DictType::User).unwrap();
        user.add_word("zorp", 250).unwrap();
        let history = g.sub_dictionary(DictType::UserHistory).unwrap();
        history.add_entry(&NgramContext::empty(), "zorp", false, 1, 0).unwrap();
        assert!(g.is_valid_word("zorp"));

        g.remove_word("zorp", &executor);
        assert!(!g.is_valid_word("zorp"));
        assert!(!history.is_in_dictionary("zorp"));
        assert!(!g.is_blacklisted("zorp"));
    }
}
