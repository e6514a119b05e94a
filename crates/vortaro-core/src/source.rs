//! Dictionary source readers.
//!
//! This module defines the interface that dictionary format readers must
//! implement. The indexer only sees a stream of [`Definition`] records per
//! file; how a format lays out its lines is the reader's business.
//!
//! ## Implementing a New Format
//!
//! 1. Add a module under `formats/`
//! 2. Implement [`SourceReader`] for it; `name()` is the subdirectory of the
//!    data directory the format's files live in
//! 3. Register it in [`builtin_readers`]

use crate::error::{Result, VortaroError};
use crate::formats::{CedictReader, DictccReader, EspdicReader};
use crate::types::Definition;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::iter::Enumerate;
use std::path::Path;
use thiserror::Error;

/// A problem with one record of a source file.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The line could not be parsed; the record is skipped
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Reading failed; the rest of the file is abandoned
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl RecordError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        RecordError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Lazily parsed records of one source file.
pub type RecordStream =
    Box<dyn Iterator<Item = std::result::Result<Definition, RecordError>> + Send>;

/// A dictionary file format.
///
/// ## Thread Safety
///
/// Readers are shared by the indexing worker pool, so they must be
/// `Send + Sync`. The returned stream is consumed on a single worker.
pub trait SourceReader: Send + Sync {
    /// Format name, also the data subdirectory holding its files
    fn name(&self) -> &'static str;

    /// Open a file and stream its records.
    ///
    /// Fails up front when the file cannot be opened or is not in this format.
    fn read(&self, path: &Path) -> Result<RecordStream>;
}

impl fmt::Debug for dyn SourceReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceReader").field(&self.name()).finish()
    }
}

/// Names of the built-in formats.
pub const FORMAT_NAMES: &[&str] = &[DictccReader::NAME, CedictReader::NAME, EspdicReader::NAME];

/// The built-in readers, restricted to `enabled` names (empty means all).
pub fn builtin_readers(
    enabled: &[String],
    bidirectional: bool,
) -> Result<Vec<Box<dyn SourceReader>>> {
    if let Some(unknown) = enabled
        .iter()
        .find(|name| !FORMAT_NAMES.contains(&name.as_str()))
    {
        return Err(VortaroError::ConfigError {
            reason: format!(
                "unknown dictionary format '{}', expected one of: {}",
                unknown,
                FORMAT_NAMES.join(", ")
            ),
        });
    }

    let wanted = |name: &str| enabled.is_empty() || enabled.iter().any(|e| e == name);
    let mut readers: Vec<Box<dyn SourceReader>> = Vec::new();
    if wanted(DictccReader::NAME) {
        readers.push(Box::new(DictccReader::new(bidirectional)));
    }
    if wanted(CedictReader::NAME) {
        readers.push(Box::new(CedictReader::new(bidirectional)));
    }
    if wanted(EspdicReader::NAME) {
        readers.push(Box::new(EspdicReader::new(bidirectional)));
    }
    Ok(readers)
}

/// Numbered lines of a text file, starting at line 1.
pub(crate) struct SourceLines {
    inner: Enumerate<Lines<BufReader<File>>>,
}

impl SourceLines {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| VortaroError::unreadable(path, e))?;
        Ok(SourceLines {
            inner: BufReader::new(file).lines().enumerate(),
        })
    }
}

impl Iterator for SourceLines {
    type Item = (usize, io::Result<String>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(n, line)| (n + 1, line))
    }
}

/// Follow every record with its reverse when `bidirectional` is set.
pub(crate) fn with_reverse<I, F>(records: I, bidirectional: bool, reverse: F) -> RecordStream
where
    I: Iterator<Item = std::result::Result<Definition, RecordError>> + Send + 'static,
    F: Fn(&Definition) -> Definition + Send + 'static,
{
    if !bidirectional {
        return Box::new(records);
    }
    Box::new(records.flat_map(move |record| match record {
        Ok(def) => {
            let rev = reverse(&def);
            vec![Ok(def), Ok(rev)]
        }
        Err(e) => vec![Err(e)],
    }))
}
