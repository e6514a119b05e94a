//! Index command - index new or changed dictionary files.

use crate::app::App;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vortaro_core::{Config, IndexProgress, IndexReport, IndexStorage};

/// Prints one line per indexed file.
struct PrintProgress;

impl IndexProgress for PrintProgress {
    fn on_file(&self, path: &Path, records: u64) {
        println!("  ✓ {} ({} records)", path.display(), records);
    }

    fn on_complete(&self, _report: &IndexReport) {}
}

/// Run the index command.
pub fn run(config: Config, force: bool, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let data_dir = app.config.data_dir()?;

    if !data_dir.exists() {
        println!("No dictionaries found at {}.", data_dir.display());
        println!("Put dictionary files in per-format subdirectories, e.g.:");
        println!("  {}", data_dir.join("dict.cc").join("en-de.txt").display());
        return Ok(());
    }

    if force {
        println!("Rebuilding index from {}...", data_dir.display());
    } else {
        println!("Indexing {}...", data_dir.display());
    }
    println!();

    let report = app.reindex(force, &files, Some(Arc::new(PrintProgress)))?;

    for failure in &report.failures {
        let mark = if failure.error.is_recoverable() { "⚠" } else { "✗" };
        println!("  {} {}: {}", mark, failure.path.display(), failure.error);
    }

    let stats = app.index.stats()?;
    let elapsed = report.elapsed.as_secs_f64();

    println!();
    if report.files_indexed == 0 && report.failures.is_empty() {
        println!("Index is up to date ({} files unchanged).", report.files_fresh);
        return Ok(());
    }

    println!("Indexing complete!");
    println!("  Files indexed:  {}", report.files_indexed);
    println!("  Files current:  {}", report.files_fresh);
    println!("  Files failed:   {}", report.failures.len());
    println!("  Records read:   {}", report.records);
    println!("  Malformed:      {}", report.malformed);
    println!("  Total records:  {}", stats.records);
    println!("  Time:           {:.2}s", elapsed);
    if elapsed > 0.0 {
        println!("  Rate:           {:.0} records/sec", report.records as f64 / elapsed);
    }

    Ok(())
}
