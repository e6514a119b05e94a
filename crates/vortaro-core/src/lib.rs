//! # Vortaro Core Library
//!
//! This crate provides transliteration, indexing, persistence and search for
//! the Vortaro dictionary tool. Words from non-Latin scripts are romanized
//! into a canonical form, cut into short fragments and filed in an inverted
//! index, so a substring query needs a few lookups instead of a scan.
//!
//! ## Architecture
//!
//! - **Transliteration** (`transliterate`): native script <-> Latin tables
//! - **Fragments** (`fragment`): fragment extraction and per-file batches
//! - **Storage** (`storage`): the trait every index backend implements
//! - **Index** (`index`): the in-memory backend
//! - **Sources** (`source`, `formats`): dictionary file readers
//! - **Tracking** (`tracker`): per-file modification watermarks
//! - **Indexer** (`indexer`): parallel incremental reindexing
//! - **Search** (`search`): query resolution and highlighting
//! - **Persistence** (`persistence`): on-disk snapshot of the index
//! - **Config** (`config`): configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use vortaro_core::{builtin_readers, Index, Indexer, Searcher, SearchQuery};
//!
//! let index = Index::new(3);
//! Indexer::new(&index, builtin_readers(&[], true)?).run(data_dir, false)?;
//!
//! for hit in Searcher::new(&index).search(&SearchQuery::new("ar"))? {
//!     println!("{} -> {}", hit.definition.from_word, hit.definition.to_word);
//! }
//! ```

pub mod config;
pub mod error;
pub mod formats;
pub mod fragment;
pub mod index;
pub mod indexer;
pub mod persistence;
pub mod search;
pub mod source;
pub mod storage;
pub mod tracker;
pub mod transliterate;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, VortaroError};
pub use fragment::{FragmentIndexer, IndexBatch};
pub use index::Index;
pub use indexer::{IndexProgress, IndexReport, Indexer, LoggingProgress};
pub use persistence::IndexStore;
pub use search::{highlight, Highlight, SearchHit, SearchQuery, SearchResults, Searcher};
pub use source::{builtin_readers, RecordError, RecordStream, SourceReader};
pub use storage::IndexStorage;
pub use tracker::ChangeTracker;
pub use types::{Definition, IndexStats, Languages, RecordId, Watermark};
