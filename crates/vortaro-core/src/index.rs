//! In-memory fragment index.
//!
//! The `Index` is the central data structure holding the inverted fragment
//! index, the phrase to record associations, the records themselves and the
//! per-file watermarks. It implements [`IndexStorage`] and is what the CLI
//! loads from and saves to disk.
//!
//! ## Architecture
//!
//! - `fragments`: fragment -> set of canonical phrases
//! - `phrases`: canonical phrase -> set of record ids
//! - `records`: record id -> definition (content-addressed, stored once)
//! - `watermarks`: absolute source path -> last indexed mtime
//!
//! All of it sits behind one `RwLock`. A per-file [`IndexBatch`] is merged
//! under a single write lock, so searches observe a file's contribution either
//! completely or not at all.

use crate::error::{Result, VortaroError};
use crate::fragment::IndexBatch;
use crate::persistence::IndexSnapshot;
use crate::storage::IndexStorage;
use crate::types::{Definition, IndexStats, Languages, RecordId, Watermark};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument, warn};

/// The in-memory index.
///
/// ## Example
///
/// ```rust
/// use vortaro_core::{Definition, FragmentIndexer, Index, Searcher, SearchQuery};
///
/// let index = Index::new(3);
/// let indexer = FragmentIndexer::new(index.fragment_size());
/// let mut batch = indexer.batch();
/// indexer.stage(&mut batch, Definition::new("sr", "шар", "en", "paint"));
/// vortaro_core::IndexStorage::merge(&index, batch).unwrap();
///
/// let results = Searcher::new(&index).search(&SearchQuery::new("ar")).unwrap();
/// assert_eq!(results.count(), 1);
/// ```
pub struct Index {
    /// Fragment length every stored fragment was cut with
    fragment_size: usize,

    /// All index data
    state: RwLock<IndexState>,

    /// Generation counter, bumped on every mutation
    generation: AtomicU64,
}

#[derive(Debug, Default)]
struct IndexState {
    fragments: FxHashMap<String, FxHashSet<String>>,
    phrases: FxHashMap<String, FxHashSet<RecordId>>,
    records: FxHashMap<RecordId, Definition>,
    watermarks: FxHashMap<PathBuf, Watermark>,
    languages: Languages,
    last_updated: Option<DateTime<Utc>>,
}

impl IndexState {
    fn insert_record(&mut self, id: RecordId, record: Definition) {
        if let Some(existing) = self.records.get(&id) {
            if !same_identity(existing, &record) {
                warn!(
                    id = %id,
                    existing = %existing.from_word,
                    incoming = %record.from_word,
                    "Record id collision, keeping the first record"
                );
            }
            return;
        }

        if !self.languages.from.contains(&record.from_lang) {
            self.languages.from.insert(record.from_lang.clone());
        }
        if !self.languages.to.contains(&record.to_lang) {
            self.languages.to.insert(record.to_lang.clone());
        }
        self.records.insert(id, record);
    }
}

fn same_identity(a: &Definition, b: &Definition) -> bool {
    a.from_lang == b.from_lang
        && a.from_word == b.from_word
        && a.to_lang == b.to_lang
        && a.to_word == b.to_word
}

impl Index {
    /// Create a new empty index cutting fragments of `fragment_size` characters.
    pub fn new(fragment_size: usize) -> Self {
        Index {
            fragment_size,
            state: RwLock::new(IndexState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Fragment length of this index
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// Get the number of records in the index.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Check if the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// Get the current generation (modification counter).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Indexed source files and their watermarks, sorted by path.
    pub fn sources(&self) -> Vec<(PathBuf, Watermark)> {
        let mut sources: Vec<_> = self
            .state
            .read()
            .watermarks
            .iter()
            .map(|(path, mtime)| (path.clone(), *mtime))
            .collect();
        sources.sort();
        sources
    }

    fn touch(&self, state: &mut IndexState) {
        state.last_updated = Some(Utc::now());
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Flatten the index for persistence.
    pub(crate) fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();

        let mut record_ids: Vec<RecordId> = state.records.keys().copied().collect();
        record_ids.sort_unstable();
        let record_pos: FxHashMap<RecordId, u32> = record_ids
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos as u32))
            .collect();
        let records = record_ids
            .iter()
            .map(|id| state.records[id].clone())
            .collect();

        let mut phrase_keys: Vec<&String> = state.phrases.keys().collect();
        phrase_keys.sort_unstable();
        let phrase_pos: FxHashMap<&str, u32> = phrase_keys
            .iter()
            .enumerate()
            .map(|(pos, phrase)| (phrase.as_str(), pos as u32))
            .collect();
        let phrases = phrase_keys
            .iter()
            .map(|phrase| {
                let mut ids: Vec<u32> = state.phrases[*phrase]
                    .iter()
                    .filter_map(|id| record_pos.get(id).copied())
                    .collect();
                ids.sort_unstable();
                ((*phrase).clone(), ids)
            })
            .collect();

        let mut fragments: Vec<(String, Vec<u32>)> = state
            .fragments
            .iter()
            .map(|(fragment, phrases)| {
                let mut positions: Vec<u32> = phrases
                    .iter()
                    .filter_map(|p| phrase_pos.get(p.as_str()).copied())
                    .collect();
                positions.sort_unstable();
                (fragment.clone(), positions)
            })
            .collect();
        fragments.sort_unstable();

        let mut watermarks: Vec<(PathBuf, Watermark)> = state
            .watermarks
            .iter()
            .map(|(path, mtime)| (path.clone(), *mtime))
            .collect();
        watermarks.sort();

        IndexSnapshot {
            fragment_size: self.fragment_size,
            records,
            phrases,
            fragments,
            watermarks,
            last_updated: state.last_updated,
        }
    }

    /// Rebuild an index from a snapshot. Record ids are recomputed.
    pub(crate) fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self> {
        let index = Index::new(snapshot.fragment_size);
        let corrupted = |what: &str| VortaroError::IndexCorrupted {
            reason: format!("dangling {what} reference in snapshot"),
        };

        {
            let mut state = index.state.write();

            let ids: Vec<RecordId> = snapshot.records.iter().map(Definition::id).collect();
            for (id, record) in ids.iter().zip(snapshot.records) {
                state.insert_record(*id, record);
            }

            let phrase_names: Vec<String> =
                snapshot.phrases.iter().map(|(p, _)| p.clone()).collect();
            for (phrase, positions) in snapshot.phrases {
                let set = positions
                    .into_iter()
                    .map(|pos| ids.get(pos as usize).copied().ok_or_else(|| corrupted("record")))
                    .collect::<Result<FxHashSet<RecordId>>>()?;
                state.phrases.insert(phrase, set);
            }

            for (fragment, positions) in snapshot.fragments {
                let set = positions
                    .into_iter()
                    .map(|pos| {
                        phrase_names
                            .get(pos as usize)
                            .cloned()
                            .ok_or_else(|| corrupted("phrase"))
                    })
                    .collect::<Result<FxHashSet<String>>>()?;
                state.fragments.insert(fragment, set);
            }

            state.watermarks = snapshot.watermarks.into_iter().collect();
            state.last_updated = snapshot.last_updated;
        }

        Ok(index)
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new(crate::fragment::DEFAULT_FRAGMENT_SIZE)
    }
}

impl IndexStorage for Index {
    fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    fn add_fragment_phrase(&self, fragment: &str, phrase: &str) -> Result<()> {
        let mut state = self.state.write();
        let phrases = state.fragments.entry(fragment.to_string()).or_default();
        if phrases.insert(phrase.to_string()) {
            self.touch(&mut state);
        }
        Ok(())
    }

    fn add_phrase_record(&self, phrase: &str, record: &Definition) -> Result<()> {
        let id = record.id();
        let mut state = self.state.write();
        let inserted = state
            .phrases
            .entry(phrase.to_string())
            .or_default()
            .insert(id);
        state.insert_record(id, record.clone());
        if inserted {
            self.touch(&mut state);
        }
        Ok(())
    }

    #[instrument(skip(self, batch), fields(records = batch.record_count()))]
    fn merge(&self, batch: IndexBatch) -> Result<()> {
        if batch.fragment_size != self.fragment_size {
            return Err(VortaroError::FragmentSizeMismatch {
                found: batch.fragment_size,
                expected: self.fragment_size,
            });
        }

        let IndexBatch {
            fragments,
            phrases,
            records,
            ..
        } = batch;

        let mut state = self.state.write();
        for (id, record) in records {
            state.insert_record(id, record);
        }
        for (phrase, ids) in phrases {
            state.phrases.entry(phrase).or_default().extend(ids);
        }
        for (fragment, phrases) in fragments {
            state.fragments.entry(fragment).or_default().extend(phrases);
        }
        self.touch(&mut state);

        debug!(
            fragments = state.fragments.len(),
            phrases = state.phrases.len(),
            records = state.records.len(),
            "Batch merged"
        );
        Ok(())
    }

    fn phrases_for_fragment(&self, fragment: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .fragments
            .get(fragment)
            .map(|phrases| phrases.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn fragments_containing(&self, needle: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .fragments
            .keys()
            .filter(|fragment| fragment.contains(needle))
            .cloned()
            .collect())
    }

    fn records_for_phrase(&self, phrase: &str) -> Result<Vec<Definition>> {
        let state = self.state.read();
        Ok(state
            .phrases
            .get(phrase)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn for_each_record(&self, phrase: &str, visit: &mut dyn FnMut(&Definition)) -> Result<()> {
        let state = self.state.read();
        if let Some(ids) = state.phrases.get(phrase) {
            ids.iter()
                .filter_map(|id| state.records.get(id))
                .for_each(|record| visit(record));
        }
        Ok(())
    }

    fn watermark(&self, source: &Path) -> Result<Option<Watermark>> {
        Ok(self.state.read().watermarks.get(source).copied())
    }

    fn set_watermark(&self, source: &Path, mtime: Watermark) -> Result<()> {
        let mut state = self.state.write();
        state.watermarks.insert(source.to_path_buf(), mtime);
        self.touch(&mut state);
        Ok(())
    }

    fn clear_watermark(&self, source: &Path) -> Result<()> {
        let mut state = self.state.write();
        if state.watermarks.remove(source).is_some() {
            self.touch(&mut state);
        }
        Ok(())
    }

    fn languages(&self) -> Result<Languages> {
        Ok(self.state.read().languages.clone())
    }

    fn stats(&self) -> Result<IndexStats> {
        let state = self.state.read();
        let mut stats = IndexStats::new(self.fragment_size);
        stats.fragments = state.fragments.len() as u64;
        stats.phrases = state.phrases.len() as u64;
        stats.records = state.records.len() as u64;
        stats.sources = state.watermarks.len() as u64;
        stats.from_languages = state.languages.from.len() as u32;
        stats.to_languages = state.languages.to.len() as u32;
        stats.last_updated = state.last_updated;
        Ok(stats)
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.state.write();
        *state = IndexState::default();
        self.touch(&mut state);
        Ok(())
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("fragment_size", &self.fragment_size)
            .field("record_count", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentIndexer;

    fn make_batch(index: &Index, records: &[Definition]) -> IndexBatch {
        let indexer = FragmentIndexer::new(index.fragment_size());
        let mut batch = indexer.batch();
        for record in records {
            indexer.stage(&mut batch, record.clone());
        }
        batch
    }

    fn make_records() -> Vec<Definition> {
        vec![
            Definition::new("sr", "шар", "en", "paint").with_part_of_speech("noun"),
            Definition::new("sr", "шарати", "en", "to paint").with_part_of_speech("verb"),
            Definition::new("en", "elephant", "de", "Elefant"),
        ]
    }

    #[test]
    fn test_merge_and_lookup() {
        let index = Index::new(3);
        index.merge(make_batch(&index, &make_records())).unwrap();

        assert_eq!(index.len(), 3);

        let mut phrases = index.phrases_for_fragment("šar").unwrap();
        phrases.sort();
        assert_eq!(phrases, vec!["šar", "šarati"]);

        let records = index.records_for_phrase("šar").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from_word, "шар");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let index = Index::new(3);
        index.merge(make_batch(&index, &make_records())).unwrap();
        let before = index.stats().unwrap();

        index.merge(make_batch(&index, &make_records())).unwrap();
        let after = index.stats().unwrap();

        assert_eq!(before.fragments, after.fragments);
        assert_eq!(before.phrases, after.phrases);
        assert_eq!(before.records, after.records);
        assert_eq!(index.records_for_phrase("elephant").unwrap().len(), 1);
    }

    #[test]
    fn test_single_record_path() {
        let index = Index::new(3);
        let indexer = FragmentIndexer::new(3);
        let record = Definition::new("en", "ox", "de", "Ochse");
        let phrase = indexer.canonical_phrase(&record);

        indexer.index(&index, &record, &phrase).unwrap();
        indexer.index(&index, &record, &phrase).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.phrases_for_fragment("o").unwrap(), vec!["ox"]);
        assert_eq!(index.records_for_phrase("ox").unwrap().len(), 1);
    }

    #[test]
    fn test_for_each_record_matches_lookup() {
        let index = Index::new(3);
        index.merge(make_batch(&index, &make_records())).unwrap();

        let mut visited = Vec::new();
        index
            .for_each_record("šarati", &mut |record| visited.push(record.clone()))
            .unwrap();
        assert_eq!(visited, index.records_for_phrase("šarati").unwrap());

        let mut count = 0;
        index.for_each_record("missing", &mut |_| count += 1).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_fragments_containing() {
        let index = Index::new(3);
        index.merge(make_batch(&index, &make_records())).unwrap();

        let mut fragments = index.fragments_containing("ar").unwrap();
        fragments.sort();
        assert_eq!(fragments, vec!["ara", "šar"]);
        assert!(index.fragments_containing("zz").unwrap().is_empty());
    }

    #[test]
    fn test_fragment_size_mismatch() {
        let index = Index::new(3);
        let batch = IndexBatch::new(4);
        let result = index.merge(batch);
        assert!(matches!(
            result,
            Err(VortaroError::FragmentSizeMismatch { found: 4, expected: 3 })
        ));
    }

    #[test]
    fn test_languages() {
        let index = Index::new(3);
        index.merge(make_batch(&index, &make_records())).unwrap();

        let languages = index.languages().unwrap();
        assert_eq!(languages.from.iter().collect::<Vec<_>>(), vec!["en", "sr"]);
        assert_eq!(languages.to.iter().collect::<Vec<_>>(), vec!["de", "en"]);
    }

    #[test]
    fn test_watermarks() {
        let index = Index::new(3);
        let path = Path::new("/data/dict.cc/en-de.txt");
        assert!(index.watermark(path).unwrap().is_none());

        let mtime = Utc::now();
        index.set_watermark(path, mtime).unwrap();
        assert_eq!(index.watermark(path).unwrap(), Some(mtime));
        assert_eq!(index.sources().len(), 1);

        index.clear_watermark(path).unwrap();
        assert!(index.watermark(path).unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let index = Index::new(3);
        index.merge(make_batch(&index, &make_records())).unwrap();
        index
            .set_watermark(Path::new("/data/espdic/espdic.txt"), Utc::now())
            .unwrap();

        index.clear().unwrap();

        assert!(index.is_empty());
        assert!(index.sources().is_empty());
        assert!(index.languages().unwrap().from.is_empty());
    }

    #[test]
    fn test_generation() {
        let index = Index::new(3);
        let gen1 = index.generation();
        index.merge(make_batch(&index, &make_records())).unwrap();
        assert!(index.generation() > gen1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let index = Index::new(3);
        index.merge(make_batch(&index, &make_records())).unwrap();
        let path = PathBuf::from("/data/dict.cc/sr-en.txt");
        let mtime = Utc::now();
        index.set_watermark(&path, mtime).unwrap();

        let restored = Index::from_snapshot(index.snapshot()).unwrap();

        assert_eq!(restored.len(), 3);
        assert_eq!(restored.fragment_size(), 3);
        assert_eq!(restored.watermark(&path).unwrap(), Some(mtime));
        let mut phrases = restored.phrases_for_fragment("šar").unwrap();
        phrases.sort();
        assert_eq!(phrases, vec!["šar", "šarati"]);
        assert_eq!(restored.stats().unwrap().fragments, index.stats().unwrap().fragments);
    }

    #[test]
    fn test_concurrent_readers_see_whole_batches() {
        let index = Index::new(3);
        let records: Vec<Definition> = (0..200)
            .map(|i| Definition::new("en", format!("word{i}"), "de", format!("Wort{i}")))
            .collect();

        std::thread::scope(|s| {
            s.spawn(|| index.merge(make_batch(&index, &records)).unwrap());
            s.spawn(|| {
                for _ in 0..50 {
                    let found = index.phrases_for_fragment("wor").unwrap().len();
                    assert!(found == 0 || found == 200);
                }
            });
        });

        assert_eq!(index.phrases_for_fragment("wor").unwrap().len(), 200);
    }
}
