//! Index storage trait.
//!
//! The indexer, change tracker and query engine only talk to the index
//! through this trait. The crate ships one implementation, the in-memory
//! [`Index`](crate::index::Index), which [`IndexStore`](crate::persistence::IndexStore)
//! snapshots to disk; another backend (a key/value store, a database) only
//! needs to implement these operations.
//!
//! ## Contract
//!
//! - Every `add_*` operation is a set union. Adding an existing association
//!   is a no-op, never an overwrite.
//! - [`merge`](IndexStorage::merge) applies a whole [`IndexBatch`] so that a
//!   concurrent reader sees either none or all of it.
//! - Only [`clear`](IndexStorage::clear) and
//!   [`clear_watermark`](IndexStorage::clear_watermark) remove data.

use crate::error::Result;
use crate::fragment::IndexBatch;
use crate::types::{Definition, IndexStats, Languages, Watermark};
use std::path::Path;

/// Backend holding the fragment index, records and source watermarks.
pub trait IndexStorage: Send + Sync {
    /// Fragment length this storage was built with.
    fn fragment_size(&self) -> usize;

    /// Associate `phrase` with `fragment`.
    fn add_fragment_phrase(&self, fragment: &str, phrase: &str) -> Result<()>;

    /// Associate `record` with `phrase`, storing the record by its content id.
    fn add_phrase_record(&self, phrase: &str, record: &Definition) -> Result<()>;

    /// Apply all additions of one source file atomically.
    fn merge(&self, batch: IndexBatch) -> Result<()>;

    /// Phrases filed under exactly this fragment.
    fn phrases_for_fragment(&self, fragment: &str) -> Result<Vec<String>>;

    /// Stored fragments that contain `needle` as a substring.
    fn fragments_containing(&self, needle: &str) -> Result<Vec<String>>;

    /// Records filed under a phrase.
    fn records_for_phrase(&self, phrase: &str) -> Result<Vec<Definition>>;

    /// Visit the records filed under a phrase without copying them out.
    ///
    /// `visit` must not call back into the storage.
    fn for_each_record(&self, phrase: &str, visit: &mut dyn FnMut(&Definition)) -> Result<()> {
        for record in self.records_for_phrase(phrase)? {
            visit(&record);
        }
        Ok(())
    }

    /// Last indexed modification time of a source file.
    fn watermark(&self, source: &Path) -> Result<Option<Watermark>>;

    /// Record a source file as indexed up to `mtime`.
    fn set_watermark(&self, source: &Path, mtime: Watermark) -> Result<()>;

    /// Forget a source file's watermark so it is indexed again.
    fn clear_watermark(&self, source: &Path) -> Result<()>;

    /// Languages present in the stored records.
    fn languages(&self) -> Result<Languages>;

    /// Current statistics.
    fn stats(&self) -> Result<IndexStats>;

    /// Remove everything, including watermarks.
    fn clear(&self) -> Result<()>;
}
