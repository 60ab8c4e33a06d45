//! Per-locale blacklist of words removed by the user.
//!
//! Compiled dictionaries are immutable, so removal is modeled as exclusion.
//! The set lives in memory; the backing file holds one word per line and
//! is rewritten in full (through a temp file and rename) after each change.

use crate::error::Result;
use ahash::AHashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Blacklist {
    words: RwLock<AHashSet<String>>,
    path: Option<PathBuf>,
    /// Serializes file rewrites.
    file_lock: Mutex<()>,
}

impl Blacklist {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Reads `path` if it exists. An unreadable file yields an empty list.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut words = AHashSet::new();
        if path.is_file() {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    words.extend(content.lines().filter(|l| !l.is_empty()).map(str::to_string));
                    debug!(entries = words.len(), "loaded blacklist {}", path.display());
                }
                Err(e) => warn!("ignoring unreadable blacklist {}: {}", path.display(), e),
            }
        }
        Self {
            words: RwLock::new(words),
            path: Some(path),
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, AHashSet<String>> {
        self.words.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_blacklisted(&self, word: &str) -> bool {
        self.read().contains(word)
    }

    /// Returns true if the word was not blacklisted before.
    pub fn add(&self, word: &str) -> bool {
        self.words
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(word.to_string())
    }

    /// Returns true if the word was blacklisted before.
    pub fn remove(&self, word: &str) -> bool {
        self.words
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(word)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the current entries.
    pub fn snapshot(&self) -> Vec<String> {
        let mut words: Vec<String> = self.read().iter().cloned().collect();
        words.sort();
        words
    }

    /// Writes the current entries to the backing file, replacing it atomically.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.file_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let words = self.snapshot();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        for word in &words {
            writeln!(tmp, "{}", word)?;
        }
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(entries = words.len(), "wrote blacklist {}", path.display());
        Ok(())
    }
}
