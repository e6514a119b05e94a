//! Core data types for Vortaro.
//!
//! This module defines the fundamental data structures used throughout the
//! indexing and search system. These types are designed to be:
//!
//! - **Serializable**: For persistence to disk
//! - **Fixed-shape**: Every record carries all five fields, no optional keys
//! - **Content-addressed**: Identical translations collapse to one record

use chrono::{DateTime, Utc};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Last indexed modification time of a dictionary source file.
pub type Watermark = DateTime<Utc>;

/// Content address of a [`Definition`].
///
/// Derived from the identity tuple (from-language, from-word, to-language,
/// to-word), so re-reading the same line yields the same id and indexing it a
/// second time is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Get the raw id value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One translation read from a dictionary file.
///
/// Words are kept in their original script; the romanized search key is
/// derived on demand and never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Definition {
    /// Part of speech; empty when the source has none
    pub part_of_speech: String,

    /// Language code of `from_word` (lowercase, e.g. "sr")
    pub from_lang: String,

    /// The searched word, original script
    pub from_word: String,

    /// Language code of `to_word`
    pub to_lang: String,

    /// The translation, original script
    pub to_word: String,
}

impl Definition {
    /// Create a new definition with an empty part of speech.
    ///
    /// Language codes are lower-cased.
    pub fn new(
        from_lang: impl AsRef<str>,
        from_word: impl Into<String>,
        to_lang: impl AsRef<str>,
        to_word: impl Into<String>,
    ) -> Self {
        Definition {
            part_of_speech: String::new(),
            from_lang: from_lang.as_ref().to_lowercase(),
            from_word: from_word.into(),
            to_lang: to_lang.as_ref().to_lowercase(),
            to_word: to_word.into(),
        }
    }

    /// Set the part of speech
    pub fn with_part_of_speech(mut self, part_of_speech: impl Into<String>) -> Self {
        self.part_of_speech = part_of_speech.into();
        self
    }

    /// The same translation read in the opposite direction.
    pub fn reversed(&self) -> Self {
        Definition {
            part_of_speech: self.part_of_speech.clone(),
            from_lang: self.to_lang.clone(),
            from_word: self.to_word.clone(),
            to_lang: self.from_lang.clone(),
            to_word: self.from_word.clone(),
        }
    }

    /// Content address over the identity tuple.
    ///
    /// The part of speech is not part of the identity.
    pub fn id(&self) -> RecordId {
        let mut hasher = FxHasher::default();
        self.from_lang.hash(&mut hasher);
        self.from_word.hash(&mut hasher);
        self.to_lang.hash(&mut hasher);
        self.to_word.hash(&mut hasher);
        RecordId(hasher.finish())
    }

    /// Result ordering key: shortest from-word first, then lexicographic.
    pub fn sort_key(&self) -> (usize, &str, &str, &str, &str, &str) {
        (
            self.from_word.chars().count(),
            &self.part_of_speech,
            &self.from_lang,
            &self.from_word,
            &self.to_lang,
            &self.to_word,
        )
    }
}

/// Languages present in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Languages {
    /// Codes that appear as `from_lang`
    pub from: BTreeSet<String>,

    /// Codes that appear as `to_lang`
    pub to: BTreeSet<String>,
}

/// Statistics about the index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of distinct fragments
    pub fragments: u64,

    /// Number of distinct canonical phrases
    pub phrases: u64,

    /// Number of distinct definition records
    pub records: u64,

    /// Number of source files with a watermark
    pub sources: u64,

    /// Number of distinct from-languages
    pub from_languages: u32,

    /// Number of distinct to-languages
    pub to_languages: u32,

    /// Fragment length the index was built with
    pub fragment_size: usize,

    /// When the index was last updated
    pub last_updated: Option<DateTime<Utc>>,

    /// Index format version
    pub version: u32,
}

impl IndexStats {
    /// Current index format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create new empty stats
    pub fn new(fragment_size: usize) -> Self {
        IndexStats {
            fragment_size,
            version: Self::CURRENT_VERSION,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_lowercases_languages() {
        let def = Definition::new("SR", "шар", "EN", "paint");
        assert_eq!(def.from_lang, "sr");
        assert_eq!(def.to_lang, "en");
        assert!(def.part_of_speech.is_empty());
    }

    #[test]
    fn test_id_ignores_part_of_speech() {
        let a = Definition::new("de", "Haus", "en", "house").with_part_of_speech("noun");
        let b = Definition::new("de", "Haus", "en", "house");
        assert_eq!(a.id(), b.id());

        let c = Definition::new("de", "Haus", "en", "home");
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_id_separates_fields() {
        // "ab" + "c" must not collide with "a" + "bc"
        let a = Definition::new("en", "ab", "de", "c");
        let b = Definition::new("en", "a", "de", "bc");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_reversed() {
        let def = Definition::new("eo", "hundo", "en", "dog").with_part_of_speech("n");
        let rev = def.reversed();
        assert_eq!(rev.from_lang, "en");
        assert_eq!(rev.from_word, "dog");
        assert_eq!(rev.to_word, "hundo");
        assert_eq!(rev.part_of_speech, "n");
        assert_eq!(rev.reversed(), def);
    }

    #[test]
    fn test_sort_key_counts_chars() {
        let cyr = Definition::new("sr", "шар", "en", "paint");
        let lat = Definition::new("en", "abcd", "sr", "x");
        assert!(cyr.sort_key() < lat.sort_key());
    }
}
