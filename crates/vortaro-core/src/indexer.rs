//! Incremental index builder.
//!
//! Each run walks `<data_dir>/<format>/` for every enabled reader, skips files
//! whose watermark is current, and reindexes the rest:
//!
//! 1. Stale files are parsed in parallel on a bounded `rayon` pool. Each worker
//!    stages one file into an [`IndexBatch`].
//! 2. Finished batches travel over a bounded channel to the calling thread,
//!    which merges them one at a time and only then advances the file's
//!    watermark to the mtime seen before the file was read.
//!
//! A file that fails midway contributes nothing and keeps its old watermark,
//! so the next run retries it.

use crate::error::{Result, VortaroError};
use crate::fragment::{FragmentIndexer, IndexBatch};
use crate::source::{RecordError, SourceReader};
use crate::storage::IndexStorage;
use crate::tracker::{self, ChangeTracker};
use crate::types::Watermark;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Progress reporting for index runs
pub trait IndexProgress: Send + Sync {
    /// Called after each file's records are merged
    fn on_file(&self, path: &Path, records: u64);

    /// Called when the run is complete
    fn on_complete(&self, report: &IndexReport);
}

/// A progress reporter that logs to tracing
pub struct LoggingProgress;

impl IndexProgress for LoggingProgress {
    fn on_file(&self, path: &Path, records: u64) {
        debug!(path = %path.display(), records, "Indexed source");
    }

    fn on_complete(&self, report: &IndexReport) {
        info!(
            indexed = report.files_indexed,
            fresh = report.files_fresh,
            records = report.records,
            malformed = report.malformed,
            failed = report.failures.len(),
            "Index run complete"
        );
    }
}

/// A source file that could not be indexed.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: VortaroError,
}

/// Outcome of one index run.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Files parsed and merged
    pub files_indexed: u64,

    /// Files skipped because their watermark is current
    pub files_fresh: u64,

    /// Records read from the indexed files
    pub records: u64,

    /// Lines skipped as malformed
    pub malformed: u64,

    /// Files that failed and keep their previous state
    pub failures: Vec<FileFailure>,

    /// Wall time of the run
    pub elapsed: Duration,
}

impl IndexReport {
    /// True when every stale file was indexed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ParsedFile {
    path: PathBuf,
    mtime: Watermark,
    batch: IndexBatch,
    records: u64,
    malformed: u64,
}

/// Drives readers over the data directory and merges results into storage.
pub struct Indexer<'a, S: IndexStorage + ?Sized> {
    storage: &'a S,
    readers: Vec<Box<dyn SourceReader>>,
    fragments: FragmentIndexer,
    workers: usize,
    progress: Option<Arc<dyn IndexProgress>>,
}

impl<'a, S: IndexStorage + ?Sized> Indexer<'a, S> {
    /// Create an indexer writing to `storage` with the given readers.
    pub fn new(storage: &'a S, readers: Vec<Box<dyn SourceReader>>) -> Self {
        Indexer {
            storage,
            readers,
            fragments: FragmentIndexer::new(storage.fragment_size()),
            workers: 0,
            progress: None,
        }
    }

    /// Number of parser threads (0 = one per core).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn IndexProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Source files of every reader, as (reader position, path), sorted by path.
    ///
    /// A format directory that cannot be listed is returned as a failure and
    /// the other formats are still searched.
    pub fn discover(&self, data_dir: &Path) -> (Vec<(usize, PathBuf)>, Vec<FileFailure>) {
        let mut files = Vec::new();
        let mut failures = Vec::new();

        for (pos, reader) in self.readers.iter().enumerate() {
            let dir = data_dir.join(reader.name());
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(dir = %dir.display(), "No sources for format");
                    continue;
                }
                Err(e) => {
                    let error = VortaroError::unreadable(&dir, e);
                    warn!(dir = %dir.display(), %error, "Cannot list sources");
                    failures.push(FileFailure { path: dir, error });
                    continue;
                }
            };

            let mut paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            paths.sort();
            files.extend(paths.into_iter().map(|path| (pos, path)));
        }

        (files, failures)
    }

    /// Reindex every stale source below `data_dir`.
    ///
    /// With `force`, the storage is cleared first so every file is stale.
    #[instrument(skip(self, data_dir), fields(data_dir = %data_dir.display()))]
    pub fn run(&self, data_dir: &Path, force: bool) -> Result<IndexReport> {
        let start = Instant::now();
        let mut report = IndexReport::default();

        if force {
            info!("Clearing index for full rebuild");
            self.storage.clear()?;
        }

        let tracker = ChangeTracker::new(self.storage);
        let (sources, failures) = self.discover(data_dir);
        report.failures.extend(failures);

        let mut stale = Vec::new();
        for (reader, path) in sources {
            match tracker.is_stale(&path) {
                Ok(true) => stale.push((reader, path)),
                Ok(false) => report.files_fresh += 1,
                Err(error) => {
                    warn!(path = %path.display(), %error, "Cannot check source");
                    report.failures.push(FileFailure { path, error });
                }
            }
        }
        info!(stale = stale.len(), fresh = report.files_fresh, "Sources checked");

        if !stale.is_empty() {
            self.index_files(&stale, &tracker, &mut report)?;
        }

        report.elapsed = start.elapsed();
        if let Some(progress) = &self.progress {
            progress.on_complete(&report);
        }
        Ok(report)
    }

    fn index_files(
        &self,
        files: &[(usize, PathBuf)],
        tracker: &ChangeTracker<'_, S>,
        report: &mut IndexReport,
    ) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("vortaro-parse-{i}"))
            .build()
            .map_err(|e| VortaroError::Internal(format!("cannot start worker pool: {e}")))?;
        let (tx, rx) = crossbeam_channel::bounded(pool.current_num_threads() * 2);

        std::thread::scope(|scope| {
            let pool = &pool;
            scope.spawn(move || {
                pool.install(|| {
                    files.par_iter().for_each_with(tx, |tx, (reader, path)| {
                        let parsed = self.parse_file(self.readers[*reader].as_ref(), path);
                        // The receiver drains until every sender is gone
                        let _ = tx.send(parsed.map_err(|error| FileFailure {
                            path: path.clone(),
                            error,
                        }));
                    });
                });
            });

            for parsed in rx {
                let failure = match parsed {
                    Ok(file) => {
                        let path = file.path.clone();
                        match self.commit(file, tracker, report) {
                            Ok(()) => continue,
                            Err(error) => FileFailure { path, error },
                        }
                    }
                    Err(failure) => failure,
                };
                warn!(path = %failure.path.display(), error = %failure.error, "Source failed");
                report.failures.push(failure);
            }
        });
        Ok(())
    }

    fn parse_file(&self, reader: &dyn SourceReader, path: &Path) -> Result<ParsedFile> {
        let mtime = tracker::modified(path)?;
        let mut batch = self.fragments.batch();
        let mut records = 0;
        let mut malformed = 0;

        for record in reader.read(path)? {
            match record {
                Ok(definition) => {
                    self.fragments.stage(&mut batch, definition);
                    records += 1;
                }
                Err(RecordError::Malformed { line, reason }) => {
                    debug!(path = %path.display(), line, %reason, "Skipping malformed record");
                    malformed += 1;
                }
                Err(RecordError::Io(e)) => return Err(VortaroError::unreadable(path, e)),
            }
        }

        Ok(ParsedFile {
            path: path.to_path_buf(),
            mtime,
            batch,
            records,
            malformed,
        })
    }

    fn commit(
        &self,
        file: ParsedFile,
        tracker: &ChangeTracker<'_, S>,
        report: &mut IndexReport,
    ) -> Result<()> {
        self.storage.merge(file.batch)?;
        tracker.mark_fresh_at(&file.path, file.mtime)?;

        report.files_indexed += 1;
        report.records += file.records;
        report.malformed += file.malformed;
        if file.malformed > 0 {
            warn!(
                path = %file.path.display(),
                malformed = file.malformed,
                "Skipped malformed records"
            );
        }
        if let Some(progress) = &self.progress {
            progress.on_file(&file.path, file.records);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;
    use crate::source::builtin_readers;
    use crate::types::{Definition, IndexStats, Languages};
    use std::fs::File;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::SystemTime;
    use tempfile::TempDir;

    const DICTCC: &str = "# EN-DE vocabulary database\tcompiled by dict.cc\n\
        elephant\tElefant\tnoun\n\
        house\tHaus\tnoun\n";

    const ESPDIC: &str = "preamble\n\
        hundo : dog\n\
        ĉevalo : horse\n\
        broken\n";

    fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dict.cc/en-de.txt", DICTCC);
        write(dir.path(), "espdic/espdic.txt", ESPDIC);
        dir
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn bump_mtime(path: &Path) {
        let later = SystemTime::now() + Duration::from_secs(10);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(later)
            .unwrap();
    }

    fn indexer(index: &Index) -> Indexer<'_, Index> {
        Indexer::new(index, builtin_readers(&[], false).unwrap()).with_workers(2)
    }

    #[test]
    fn test_run() {
        let dir = data_dir();
        let index = Index::new(3);

        let report = indexer(&index).run(dir.path(), false).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.records, 4);
        assert_eq!(report.malformed, 1);
        assert_eq!(index.len(), 4);
        assert_eq!(index.phrases_for_fragment("hun").unwrap(), vec!["hundo"]);
    }

    #[test]
    fn test_second_run_is_noop() {
        let dir = data_dir();
        let index = Index::new(3);
        indexer(&index).run(dir.path(), false).unwrap();
        let before = index.stats().unwrap();

        let report = indexer(&index).run(dir.path(), false).unwrap();
        let after = index.stats().unwrap();

        assert_eq!(report.files_indexed, 0);
        assert_eq!(report.files_fresh, 2);
        assert_eq!(before.fragments, after.fragments);
        assert_eq!(before.phrases, after.phrases);
        assert_eq!(before.records, after.records);
    }

    #[test]
    fn test_touched_file_is_reindexed() {
        let dir = data_dir();
        let index = Index::new(3);
        indexer(&index).run(dir.path(), false).unwrap();

        let path = write(dir.path(), "espdic/espdic.txt", "preamble\nhundo : dog\nkato : cat\n");
        bump_mtime(&path);

        let report = indexer(&index).run(dir.path(), false).unwrap();
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_fresh, 1);
        assert_eq!(index.records_for_phrase("kato").unwrap().len(), 1);
        assert_eq!(index.records_for_phrase("hundo").unwrap().len(), 1);
    }

    #[test]
    fn test_failed_file_is_retried() {
        let dir = data_dir();
        let bad = write(dir.path(), "dict.cc/broken.txt", "no header here\n");
        let index = Index::new(3);

        let report = indexer(&index).run(dir.path(), false).unwrap();
        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, bad);
        assert!(matches!(
            report.failures[0].error,
            VortaroError::UnrecognizedSource { .. }
        ));

        let tracker = ChangeTracker::new(&index);
        assert!(tracker.is_stale(&bad).unwrap());

        let report = indexer(&index).run(dir.path(), false).unwrap();
        assert_eq!(report.files_indexed, 0);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_force_rebuilds() {
        let dir = data_dir();
        let index = Index::new(3);
        indexer(&index).run(dir.path(), false).unwrap();

        let report = indexer(&index).run(dir.path(), true).unwrap();
        assert_eq!(report.files_indexed, 2);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_missing_format_dirs() {
        let dir = TempDir::new().unwrap();
        let index = Index::new(3);
        let report = indexer(&index).run(dir.path(), false).unwrap();
        assert_eq!(report.files_indexed, 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let dir = data_dir();
        let single = Index::new(3);
        let many = Index::new(3);

        Indexer::new(&single, builtin_readers(&[], true).unwrap())
            .with_workers(1)
            .run(dir.path(), false)
            .unwrap();
        Indexer::new(&many, builtin_readers(&[], true).unwrap())
            .with_workers(4)
            .run(dir.path(), false)
            .unwrap();

        assert_eq!(single.stats().unwrap().fragments, many.stats().unwrap().fragments);
        assert_eq!(single.len(), many.len());
        assert_eq!(single.len(), 8);
    }

    /// Fails the first merge, then behaves like the wrapped index.
    struct FailFirstMerge {
        inner: Index,
        failed: AtomicBool,
    }

    impl IndexStorage for FailFirstMerge {
        fn fragment_size(&self) -> usize {
            self.inner.fragment_size()
        }
        fn add_fragment_phrase(&self, fragment: &str, phrase: &str) -> Result<()> {
            self.inner.add_fragment_phrase(fragment, phrase)
        }
        fn add_phrase_record(&self, phrase: &str, record: &Definition) -> Result<()> {
            self.inner.add_phrase_record(phrase, record)
        }
        fn merge(&self, batch: IndexBatch) -> Result<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(VortaroError::Io(std::io::Error::other("disk full")));
            }
            self.inner.merge(batch)
        }
        fn phrases_for_fragment(&self, fragment: &str) -> Result<Vec<String>> {
            self.inner.phrases_for_fragment(fragment)
        }
        fn fragments_containing(&self, needle: &str) -> Result<Vec<String>> {
            self.inner.fragments_containing(needle)
        }
        fn records_for_phrase(&self, phrase: &str) -> Result<Vec<Definition>> {
            self.inner.records_for_phrase(phrase)
        }
        fn watermark(&self, source: &Path) -> Result<Option<Watermark>> {
            self.inner.watermark(source)
        }
        fn set_watermark(&self, source: &Path, mtime: Watermark) -> Result<()> {
            self.inner.set_watermark(source, mtime)
        }
        fn clear_watermark(&self, source: &Path) -> Result<()> {
            self.inner.clear_watermark(source)
        }
        fn languages(&self) -> Result<Languages> {
            self.inner.languages()
        }
        fn stats(&self) -> Result<IndexStats> {
            self.inner.stats()
        }
        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }
    }

    #[test]
    fn test_merge_failure_only_fails_that_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "espdic/a.txt", "preamble\nhundo : dog\n");
        write(dir.path(), "espdic/b.txt", "preamble\nkato : cat\n");
        write(dir.path(), "espdic/c.txt", "preamble\nbirdo : bird\n");
        let storage = FailFirstMerge {
            inner: Index::new(3),
            failed: AtomicBool::new(false),
        };

        let report = Indexer::new(&storage, builtin_readers(&[], false).unwrap())
            .with_workers(1)
            .run(dir.path(), false)
            .unwrap();

        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, VortaroError::Io(_)));
        assert_eq!(storage.inner.len(), 2);

        let tracker = ChangeTracker::new(&storage);
        assert!(tracker.is_stale(&report.failures[0].path).unwrap());

        let retry = Indexer::new(&storage, builtin_readers(&[], false).unwrap())
            .run(dir.path(), false)
            .unwrap();
        assert_eq!(retry.files_indexed, 1);
        assert_eq!(storage.inner.len(), 3);
    }

    #[test]
    fn test_unlistable_format_dir_does_not_stop_others() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dict.cc", "not a directory\n");
        write(dir.path(), "espdic/espdic.txt", ESPDIC);
        let index = Index::new(3);

        let report = indexer(&index).run(dir.path(), false).unwrap();

        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, dir.path().join("dict.cc"));
        assert!(matches!(
            report.failures[0].error,
            VortaroError::SourceUnreadable { .. }
        ));
        assert_eq!(index.len(), 2);
    }
}
