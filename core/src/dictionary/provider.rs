//! Where dictionaries come from.
//!
//! The facilitator never opens files itself; it asks a `DictionaryProvider`
//! for the main dictionary of a locale and for the mutable dictionaries of a
//! locale and account.

use super::{
    main_handle, sub_handle, CompiledDictionary, DictType, DictionaryCollection, DynamicDictionary,
    MainDictionary, NormalizationForm, NormalizedDictionary, SubDictionary,
};
use crate::error::SuggestError;
use crate::locale::Locale;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait DictionaryProvider: Send + Sync + std::fmt::Debug {
    /// Loads the main dictionary for `locale`. May be slow; called off the
    /// caller's thread.
    fn create_main_dictionary(&self, locale: &Locale) -> anyhow::Result<MainDictionary>;

    fn create_sub_dictionary(
        &self,
        dict_type: DictType,
        locale: &Locale,
        account: Option<&str>,
    ) -> anyhow::Result<SubDictionary>;

    /// File holding the blacklist of `locale`, or `None` to keep it in memory.
    fn blacklist_path(&self, locale: &Locale) -> Option<PathBuf>;
}

/// Provider reading everything from one data directory:
///
/// ```text
/// main-<locale>.fst / main-<locale>.bincode      compiled main dictionary
/// main-<locale>+<name>.fst / .bincode            optional supplements
/// <type>-<locale>[-<account>].redb               history, user, contacts
/// blacklist-<locale>.txt                         removed words
/// ```
///
/// A locale with a region (`en_US`) falls back to its language (`en`) when
/// no main dictionary exists for the full tag.
#[derive(Debug, Clone)]
pub struct FileDictionaryProvider {
    data_dir: PathBuf,
    normalization: NormalizationForm,
}

impl FileDictionaryProvider {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            normalization: NormalizationForm::Nfc,
        }
    }

    pub fn with_normalization(mut self, form: NormalizationForm) -> Self {
        self.normalization = form;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// fst files making up the main dictionary of `stem`, base file first.
    fn main_files(&self, stem: &str) -> anyhow::Result<Vec<PathBuf>> {
        let base = format!("main-{}", stem);
        let mut supplements = Vec::new();
        let entries = std::fs::read_dir(&self.data_dir)
            .with_context(|| format!("reading {}", self.data_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("fst") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if name == base {
                continue;
            }
            if name.strip_prefix(base.as_str()).is_some_and(|rest| rest.starts_with('+')) {
                supplements.push(path);
            }
        }
        supplements.sort();
        let base_path = self.data_dir.join(format!("{}.fst", base));
        let mut files = Vec::new();
        if base_path.exists() {
            files.push(base_path);
        }
        files.extend(supplements);
        Ok(files)
    }

    fn load_compiled(&self, fst_path: &Path) -> anyhow::Result<MainDictionary> {
        let bincode_path = fst_path.with_extension("bincode");
        let dict = CompiledDictionary::load_from_fst_bincode(fst_path, bincode_path.as_path())
            .with_context(|| format!("loading {}", fst_path.display()))?;
        Ok(main_handle(NormalizedDictionary::new(dict, self.normalization)))
    }
}

impl DictionaryProvider for FileDictionaryProvider {
    fn create_main_dictionary(&self, locale: &Locale) -> anyhow::Result<MainDictionary> {
        let mut files = self.main_files(&locale.file_stem())?;
        if files.is_empty() && locale.language() != locale.as_str() {
            files = self.main_files(&locale.language())?;
        }
        match files.len() {
            0 => Err(SuggestError::DictionaryNotFound(
                self.data_dir.join(format!("main-{}.fst", locale.file_stem())),
            )
            .into()),
            1 => self.load_compiled(&files[0]),
            n => {
                debug!(%locale, parts = n, "main dictionary has supplements");
                let parts = files
                    .iter()
                    .map(|f| self.load_compiled(f))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(main_handle(DictionaryCollection::new(DictType::Main, locale.clone(), parts)))
            }
        }
    }

    fn create_sub_dictionary(
        &self,
        dict_type: DictType,
        locale: &Locale,
        account: Option<&str>,
    ) -> anyhow::Result<SubDictionary> {
        let name = match account {
            Some(account) => format!("{}-{}-{}.redb", dict_type.name(), locale.file_stem(), account),
            None => format!("{}-{}.redb", dict_type.name(), locale.file_stem()),
        };
        let path = self.data_dir.join(name);
        let dict = DynamicDictionary::open(dict_type, locale.clone(), &path)
            .with_context(|| format!("opening {}", path.display()))?;
        Ok(sub_handle(dict))
    }

    fn blacklist_path(&self, locale: &Locale) -> Option<PathBuf> {
        Some(self.data_dir.join(format!("blacklist-{}.txt", locale.file_stem())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::CompiledDictionaryBuilder;

    fn write_main(dir: &Path, name: &str, words: &[(&str, u8)]) {
        let mut b = CompiledDictionaryBuilder::new("en");
        for (w, f) in words {
            b.add_word(w, *f);
        }
        b.write(dir.join(format!("{}.fst", name)), dir.join(format!("{}.bincode", name)))
            .unwrap();
    }

    #[test]
    fn falls_back_to_language_and_merges_supplements() {
        let dir = tempfile::tempdir().unwrap();
        write_main(dir.path(), "main-en", &[("color", 200)]);
        write_main(dir.path(), "main-en+tech", &[("kubernetes", 120)]);
        let provider = FileDictionaryProvider::new(dir.path());

        let main = provider.create_main_dictionary(&Locale::new("en_US")).unwrap();
        assert!(main.is_valid_word("color"));
        assert!(main.is_valid_word("kubernetes"));
        assert!(provider.create_main_dictionary(&Locale::new("de")).is_err());
    }

    #[test]
    fn sub_dictionaries_are_per_account() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileDictionaryProvider::new(dir.path());
        let en = Locale::new("en");
        let user = provider.create_sub_dictionary(DictType::User, &en, Some("work")).unwrap();
        user.add_word("synergy", 250).unwrap();
        assert!(dir.path().join("user-en-work.redb").exists());
        assert_eq!(
            provider.blacklist_path(&en),
            Some(dir.path().join("blacklist-en.txt"))
        );
    }
}
