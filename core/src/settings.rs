//! Settings consumed by the suggestion core.
//!
//! Designed to be deserialized from TOML (via `serde`). Unknown keys are
//! rejected by `toml` only if the caller asks for it; missing keys take the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Score above which a candidate is considered strong on its own.
const SCORE_LIMIT_VERY_AGGRESSIVE: i32 = 600_000;
const SCORE_LIMIT_AGGRESSIVE: i32 = 800_000;
const SCORE_LIMIT_MODEST: i32 = 950_000;

/// Named auto-correction aggressiveness tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoCorrectionTier {
    Modest,
    Aggressive,
    VeryAggressive,
}

impl AutoCorrectionTier {
    /// Normalized-score threshold of the tier.
    pub fn threshold(self) -> f32 {
        match self {
            AutoCorrectionTier::Modest => 0.185,
            AutoCorrectionTier::Aggressive => 0.067,
            AutoCorrectionTier::VeryAggressive => -1.0,
        }
    }
}

/// Additive bonuses of the typed-word-wins comparison.
///
/// The top candidate replaces a typed word that is itself a strong match
/// only if `first_context_score + bonus >= typed_context_score + required_margin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypedWordBonus {
    pub whitelist: i32,
    pub lowercase_ascii: i32,
    pub higher_score: i32,
    pub required_margin: i32,
    /// Margin by which the top candidate's context score must beat the typed
    /// word's before a dictionary word may be corrected away.
    pub next_word_margin: i32,
}

impl Default for TypedWordBonus {
    fn default() -> Self {
        Self {
            whitelist: 20,
            lowercase_ascii: 5,
            higher_score: 5,
            required_margin: 20,
            next_word_margin: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch for replacing the typed word on commit.
    pub auto_correction_enabled: bool,
    /// Normalized-score threshold; see `AutoCorrectionTier` for the presets.
    pub auto_correction_threshold: f32,
    /// Explicit score limit; derived from the threshold when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_limit_override: Option<i32>,
    /// Allow shortcut expansions to auto-correct.
    pub autocorrect_shortcuts: bool,
    pub use_personalized_dicts: bool,
    pub use_contacts_dict: bool,
    pub block_potentially_offensive: bool,
    /// Additional locales typed alongside the primary one.
    pub secondary_locales: Vec<String>,
    /// Promote repeatedly typed unknown words into the user dictionary.
    pub add_to_personal_dictionary: bool,
    /// Show the typed word in the middle of the strip.
    pub center_suggestion_text_to_enter: bool,
    pub typed_word_bonus: TypedWordBonus,

    // Runtime knobs
    /// Worker threads of the background pool.
    pub background_threads: usize,
    /// Entries kept by the spelling-validity cache.
    pub spelling_cache_size: usize,
    /// Directory holding dictionaries and blacklists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_correction_enabled: true,
            auto_correction_threshold: AutoCorrectionTier::Modest.threshold(),
            score_limit_override: None,
            autocorrect_shortcuts: true,
            use_personalized_dicts: true,
            use_contacts_dict: false,
            block_potentially_offensive: true,
            secondary_locales: Vec::new(),
            add_to_personal_dictionary: false,
            center_suggestion_text_to_enter: false,
            typed_word_bonus: TypedWordBonus::default(),
            background_threads: 2,
            spelling_cache_size: 200,
            data_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn set_auto_correction_tier(&mut self, tier: AutoCorrectionTier) {
        self.auto_correction_threshold = tier.threshold();
    }

    /// Raw score above which the top candidate is trusted without looking at
    /// the n-gram context.
    pub fn score_limit_for_autocorrect(&self) -> i32 {
        if let Some(limit) = self.score_limit_override {
            return limit;
        }
        if self.auto_correction_threshold < 0.0 {
            SCORE_LIMIT_VERY_AGGRESSIVE
        } else if self.auto_correction_threshold < 0.07 {
            SCORE_LIMIT_AGGRESSIVE
        } else {
            SCORE_LIMIT_MODEST
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_modest() {
        let s = Settings::default();
        assert_eq!(s.score_limit_for_autocorrect(), 950_000);
        assert!(s.auto_correction_enabled);
        assert!(s.use_personalized_dicts);
    }

    #[test]
    fn score_limit_follows_tier() {
        let mut s = Settings::default();
        s.set_auto_correction_tier(AutoCorrectionTier::Aggressive);
        assert_eq!(s.score_limit_for_autocorrect(), 800_000);
        s.set_auto_correction_tier(AutoCorrectionTier::VeryAggressive);
        assert_eq!(s.score_limit_for_autocorrect(), 600_000);
        s.score_limit_override = Some(42);
        assert_eq!(s.score_limit_for_autocorrect(), 42);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = Settings::from_toml_str(
            r#"
            use_contacts_dict = true
            secondary_locales = ["de"]

            [typed_word_bonus]
            whitelist = 30
            "#,
        )
        .unwrap();
        assert!(s.use_contacts_dict);
        assert_eq!(s.secondary_locales, vec!["de".to_string()]);
        assert_eq!(s.typed_word_bonus.whitelist, 30);
        assert_eq!(s.typed_word_bonus.lowercase_ascii, 5);
        assert_eq!(s.background_threads, 2);
    }

    #[test]
    fn toml_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut s = Settings::default();
        s.add_to_personal_dictionary = true;
        s.save_toml(&path).unwrap();
        let loaded = Settings::load_toml(&path).unwrap();
        assert_eq!(loaded, s);
    }
}
