//! Fragment extraction and per-file index batches.
//!
//! A fragment is a short substring of a canonical phrase. The inverted index
//! maps every fragment to the phrases containing it, so a substring query only
//! needs a handful of lookups instead of a scan over every phrase.
//!
//! For fragment size `N`:
//! - phrases of `N` or more characters contribute each `N`-character window;
//! - shorter phrases contribute every one of their substrings, so a query
//!   shorter than `N` still finds them by its own text.
//!
//! All lengths are counted in characters, never bytes.

use crate::error::Result;
use crate::storage::IndexStorage;
use crate::transliterate;
use crate::types::{Definition, RecordId};
use rustc_hash::{FxHashMap, FxHashSet};

/// Default fragment length.
pub const DEFAULT_FRAGMENT_SIZE: usize = 3;

/// Every fragment stored for `phrase` with fragment size `n`.
pub fn fragments_of(phrase: &str, n: usize) -> FxHashSet<String> {
    let chars: Vec<char> = phrase.chars().collect();
    let mut fragments = FxHashSet::default();

    if n == 0 || chars.is_empty() {
        return fragments;
    }

    if chars.len() >= n {
        fragments.extend(chars.windows(n).map(|w| w.iter().collect::<String>()));
    } else {
        for len in 1..=chars.len() {
            fragments.extend(chars.windows(len).map(|w| w.iter().collect::<String>()));
        }
    }

    fragments
}

/// The distinct `n`-character windows of a query, in first-seen order.
///
/// Empty when the query is shorter than `n`.
pub fn query_windows(query: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = query.chars().collect();
    if n == 0 || chars.len() < n {
        return Vec::new();
    }

    let mut seen = FxHashSet::default();
    chars
        .windows(n)
        .map(|w| w.iter().collect::<String>())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Index additions staged for one source file.
///
/// All maps are sets, so staging the same record twice changes nothing. A
/// batch is handed to [`IndexStorage::merge`] as a unit.
#[derive(Debug, Default)]
pub struct IndexBatch {
    pub(crate) fragment_size: usize,
    pub(crate) fragments: FxHashMap<String, FxHashSet<String>>,
    pub(crate) phrases: FxHashMap<String, FxHashSet<RecordId>>,
    pub(crate) records: FxHashMap<RecordId, Definition>,
}

impl IndexBatch {
    /// Create an empty batch for fragment size `fragment_size`.
    pub fn new(fragment_size: usize) -> Self {
        IndexBatch {
            fragment_size,
            ..Default::default()
        }
    }

    /// Stage one record under its canonical phrase.
    pub fn index(&mut self, record: Definition, phrase: &str) {
        let id = record.id();

        if !self.phrases.contains_key(phrase) {
            for fragment in fragments_of(phrase, self.fragment_size) {
                self.fragments
                    .entry(fragment)
                    .or_default()
                    .insert(phrase.to_string());
            }
        }

        self.phrases.entry(phrase.to_string()).or_default().insert(id);
        self.records.entry(id).or_insert(record);
    }

    /// Fragment size the batch was built with
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// Number of distinct records staged
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of distinct phrases staged
    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    /// True if nothing has been staged
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Turns definitions into fragment index entries.
#[derive(Debug, Clone, Copy)]
pub struct FragmentIndexer {
    fragment_size: usize,
}

impl Default for FragmentIndexer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAGMENT_SIZE)
    }
}

impl FragmentIndexer {
    /// Create an indexer producing fragments of `fragment_size` characters.
    pub fn new(fragment_size: usize) -> Self {
        FragmentIndexer { fragment_size }
    }

    /// Fragment size in characters
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// The canonical phrase a record is filed under.
    pub fn canonical_phrase(&self, record: &Definition) -> String {
        transliterate::canonical(&record.from_lang, &record.from_word)
    }

    /// Fragments stored for `phrase`.
    pub fn fragments_of(&self, phrase: &str) -> FxHashSet<String> {
        fragments_of(phrase, self.fragment_size)
    }

    /// Start a batch for one source file.
    pub fn batch(&self) -> IndexBatch {
        IndexBatch::new(self.fragment_size)
    }

    /// Stage a record into `batch` under its canonical phrase.
    pub fn stage(&self, batch: &mut IndexBatch, record: Definition) {
        let phrase = self.canonical_phrase(&record);
        batch.index(record, &phrase);
    }

    /// Write one record straight to storage, without batching.
    pub fn index<S: IndexStorage + ?Sized>(
        &self,
        storage: &S,
        record: &Definition,
        phrase: &str,
    ) -> Result<()> {
        for fragment in self.fragments_of(phrase) {
            storage.add_fragment_phrase(&fragment, phrase)?;
        }
        storage.add_phrase_record(phrase, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> FxHashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_long_phrase_uses_exact_windows() {
        assert_eq!(
            fragments_of("abcdefghi", 5),
            set(&["abcde", "bcdef", "cdefg", "defgh", "efghi"])
        );
        assert_eq!(fragments_of("abcde", 5), set(&["abcde"]));
        assert_eq!(fragments_of("šar", 3), set(&["šar"]));
    }

    #[test]
    fn test_short_phrase_uses_all_substrings() {
        assert_eq!(
            fragments_of("abc", 5),
            set(&["abc", "ab", "bc", "a", "b", "c"])
        );
        assert_eq!(fragments_of("a", 3), set(&["a"]));
        assert_eq!(fragments_of("aa", 3), set(&["aa", "a"]));
    }

    #[test]
    fn test_multibyte_windows() {
        assert_eq!(
            fragments_of("čokanj", 3),
            set(&["čok", "oka", "kan", "anj"])
        );
    }

    #[test]
    fn test_empty_phrase() {
        assert!(fragments_of("", 3).is_empty());
        assert!(fragments_of("abc", 0).is_empty());
    }

    #[test]
    fn test_query_windows() {
        assert_eq!(query_windows("abcab", 3), vec!["abc", "bca", "cab"]);
        assert_eq!(query_windows("aaaa", 3), vec!["aaa"]);
        assert!(query_windows("ab", 3).is_empty());
    }

    #[test]
    fn test_batch_is_idempotent() {
        let indexer = FragmentIndexer::new(3);
        let mut batch = indexer.batch();
        let record = Definition::new("sr", "шар", "en", "paint");

        indexer.stage(&mut batch, record.clone());
        indexer.stage(&mut batch, record);

        assert_eq!(batch.record_count(), 1);
        assert_eq!(batch.phrase_count(), 1);
        assert_eq!(batch.fragments.len(), 1);
        assert_eq!(batch.fragments["šar"], set(&["šar"]));
    }

    #[test]
    fn test_homographs_share_phrase() {
        let indexer = FragmentIndexer::new(3);
        let mut batch = indexer.batch();
        indexer.stage(&mut batch, Definition::new("en", "bank", "de", "Bank"));
        indexer.stage(&mut batch, Definition::new("en", "Bank", "de", "Ufer"));

        assert_eq!(batch.phrase_count(), 1);
        assert_eq!(batch.record_count(), 2);
        assert_eq!(batch.phrases["bank"].len(), 2);
    }
}
