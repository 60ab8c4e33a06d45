//! Locale tags.
//!
//! A `Locale` is a thin wrapper around a language tag such as `en_US` or
//! `de`. Only the language subtag is ever interpreted (for the per-language
//! auto-correction filters); everything else is an opaque identity used to
//! key dictionary groups and blacklist files.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new<T: Into<String>>(tag: T) -> Self {
        Locale(tag.into())
    }

    /// The empty locale used by an inactive facilitator.
    pub fn root() -> Self {
        Locale(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Language subtag: everything before the first `_` or `-`, lowercased.
    pub fn language(&self) -> String {
        self.0
            .split(['_', '-'])
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File-system friendly form, used for blacklist and dictionary file names.
    pub fn file_stem(&self) -> String {
        self.0.replace('_', "-")
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(s: &str) -> Self {
        Locale::new(s)
    }
}

impl From<String> for Locale {
    fn from(s: String) -> Self {
        Locale(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_subtag() {
        assert_eq!(Locale::new("de_CH").language(), "de");
        assert_eq!(Locale::new("pt-BR").language(), "pt");
        assert_eq!(Locale::new("EN").language(), "en");
        assert_eq!(Locale::root().language(), "");
    }

    #[test]
    fn file_stem_uses_dashes() {
        assert_eq!(Locale::new("en_US").file_stem(), "en-US");
    }
}
