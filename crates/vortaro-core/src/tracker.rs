//! Source file change tracking.
//!
//! A file is fresh when the index holds a watermark equal to its current
//! modification time. Anything else (no watermark, an older or a newer mtime)
//! makes it stale and due for indexing. Watermarks live in the index storage
//! itself, keyed by the file's canonical path, so they persist with it.

use crate::error::{Result, VortaroError};
use crate::storage::IndexStorage;
use crate::types::Watermark;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decides which dictionary files need (re)indexing.
pub struct ChangeTracker<'a, S: IndexStorage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: IndexStorage + ?Sized> ChangeTracker<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        ChangeTracker { storage }
    }

    /// True if `path` changed since it was last indexed, or was never indexed.
    pub fn is_stale(&self, path: &Path) -> Result<bool> {
        let mtime = modified(path)?;
        let stale = match self.storage.watermark(&source_key(path))? {
            Some(watermark) => watermark != mtime,
            None => true,
        };
        debug!(path = %path.display(), stale, "Checked source");
        Ok(stale)
    }

    /// Record `path` as indexed at its current modification time.
    pub fn mark_fresh(&self, path: &Path) -> Result<()> {
        let mtime = modified(path)?;
        self.mark_fresh_at(path, mtime)
    }

    /// Record `path` as indexed at `mtime`.
    ///
    /// The indexer passes the mtime it saw before reading, so a write that
    /// lands during indexing leaves the file stale for the next run.
    pub fn mark_fresh_at(&self, path: &Path, mtime: Watermark) -> Result<()> {
        self.storage.set_watermark(&source_key(path), mtime)
    }

    /// Forget the watermark of `path` so the next run indexes it again.
    pub fn mark_stale(&self, path: &Path) -> Result<()> {
        self.storage.clear_watermark(&source_key(path))
    }
}

/// Modification time of a file as a watermark.
pub fn modified(path: &Path) -> Result<Watermark> {
    let mtime = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| VortaroError::unreadable(path, e))?;
    Ok(DateTime::<Utc>::from(mtime))
}

/// The key a source's watermark is stored under.
pub fn source_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;
    use std::fs::File;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &str) {
        let mut f = File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_unseen_file_is_stale() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("espdic.txt");
        write_file(&path, "hundo : dog\n");

        let index = Index::new(3);
        let tracker = ChangeTracker::new(&index);
        assert!(tracker.is_stale(&path).unwrap());
    }

    #[test]
    fn test_mark_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("espdic.txt");
        write_file(&path, "hundo : dog\n");

        let index = Index::new(3);
        let tracker = ChangeTracker::new(&index);
        tracker.mark_fresh(&path).unwrap();
        assert!(!tracker.is_stale(&path).unwrap());
    }

    #[test]
    fn test_modified_file_is_stale() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("espdic.txt");
        write_file(&path, "hundo : dog\n");
        let base = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&path, base);

        let index = Index::new(3);
        let tracker = ChangeTracker::new(&index);
        tracker.mark_fresh(&path).unwrap();

        set_mtime(&path, base + Duration::from_secs(60));
        assert!(tracker.is_stale(&path).unwrap());

        // An older mtime (restored backup) also counts as a change
        set_mtime(&path, base - Duration::from_secs(60));
        assert!(tracker.is_stale(&path).unwrap());
    }

    #[test]
    fn test_mark_fresh_at_earlier_mtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("espdic.txt");
        write_file(&path, "hundo : dog\n");

        let index = Index::new(3);
        let tracker = ChangeTracker::new(&index);
        let seen = modified(&path).unwrap() - chrono::Duration::seconds(5);
        tracker.mark_fresh_at(&path, seen).unwrap();

        assert!(tracker.is_stale(&path).unwrap());
    }

    #[test]
    fn test_mark_stale() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("espdic.txt");
        write_file(&path, "hundo : dog\n");

        let index = Index::new(3);
        let tracker = ChangeTracker::new(&index);
        tracker.mark_fresh(&path).unwrap();
        tracker.mark_stale(&path).unwrap();
        assert!(tracker.is_stale(&path).unwrap());
    }

    #[test]
    fn test_relative_and_absolute_paths_share_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("espdic.txt");
        write_file(&path, "hundo : dog\n");
        let dotted = dir.path().join(".").join("espdic.txt");

        let index = Index::new(3);
        let tracker = ChangeTracker::new(&index);
        tracker.mark_fresh(&dotted).unwrap();
        assert!(!tracker.is_stale(&path).unwrap());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let index = Index::new(3);
        let tracker = ChangeTracker::new(&index);
        let result = tracker.is_stale(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(VortaroError::SourceUnreadable { .. })));
    }
}
