//! Status command - show index status and statistics.

use crate::app::App;
use vortaro_core::{Config, IndexStorage};

/// Run the status command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let stats = app.index.stats()?;
    let languages = app.index.languages()?;

    println!("Vortaro Index Status");
    println!("====================");
    println!();

    if app.index.is_empty() {
        println!("Index is empty. Run 'vortaro index' to build the index.");
        println!();
        println!("Dictionary directory: {}", app.config.data_dir()?.display());
        return Ok(());
    }

    println!("Summary:");
    println!("  Records:        {}", stats.records);
    println!("  Phrases:        {}", stats.phrases);
    println!("  Fragments:      {}", stats.fragments);
    println!("  Fragment size:  {}", stats.fragment_size);
    println!(
        "  From languages: {}",
        languages.from.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!(
        "  To languages:   {}",
        languages.to.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!("  Index version:  {}", stats.version);

    if let Some(updated) = stats.last_updated {
        println!(
            "  Last updated:   {}",
            updated.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!();
    println!("Indexed Sources:");
    for (path, mtime) in app.index.sources() {
        let status = if path.exists() { "✓" } else { "⚠ missing" };
        println!(
            "  {} {} (modified {})",
            status,
            path.display(),
            mtime.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!();
    println!("Dictionary directory: {}", app.config.data_dir()?.display());
    println!("Index file:           {}", app.store.index_path().display());

    Ok(())
}
