//! Application state management.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use vortaro_core::{
    builtin_readers, ChangeTracker, Config, Index, IndexProgress, IndexReport, IndexStore,
    Indexer, LoggingProgress,
};

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The dictionary index
    pub index: Arc<Index>,

    /// Index persistence
    pub store: IndexStore,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let index_dir = config.index_dir()?;
        let store = IndexStore::new(&index_dir).with_compression(config.index.compress);
        let index = Arc::new(store.load_or_new(config.index.fragment_size));

        info!(
            index_dir = %index_dir.display(),
            records = index.len(),
            "Application initialized"
        );

        Ok(App {
            config,
            index,
            store,
        })
    }

    /// Save the current index to disk.
    pub fn save_index(&self) -> anyhow::Result<()> {
        self.store.save(&self.index)?;
        Ok(())
    }

    /// Index new and changed dictionary files, then save.
    ///
    /// `files` are marked stale first so they are read again even when their
    /// modification time has not changed.
    pub fn reindex(
        &self,
        force: bool,
        files: &[PathBuf],
        progress: Option<Arc<dyn IndexProgress>>,
    ) -> anyhow::Result<IndexReport> {
        let tracker = ChangeTracker::new(self.index.as_ref());
        for file in files {
            tracker.mark_stale(file)?;
        }

        let readers = builtin_readers(&self.config.index.formats, self.config.index.bidirectional)?;
        let data_dir = self.config.data_dir()?;
        let indexer = Indexer::new(self.index.as_ref(), readers)
            .with_workers(self.config.index.workers)
            .with_progress(progress.unwrap_or_else(|| Arc::new(LoggingProgress)));

        let report = indexer.run(&data_dir, force)?;

        if force || report.files_indexed > 0 || !files.is_empty() {
            self.save_index()?;
        }

        Ok(report)
    }
}
