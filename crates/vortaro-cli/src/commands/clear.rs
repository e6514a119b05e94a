//! Clear command - remove all index data.

use std::io::{self, Write};
use vortaro_core::{Config, IndexStore};

/// Run the clear command.
pub fn run(config: Config, skip_confirm: bool) -> anyhow::Result<()> {
    let store = IndexStore::new(config.index_dir()?);

    if !store.exists() {
        println!("No index found. Nothing to clear.");
        return Ok(());
    }

    if !skip_confirm {
        print!("This will delete the index. Dictionary files are kept. Continue? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.clear()?;
    println!("Index cleared. Run 'vortaro index' to rebuild it.");

    Ok(())
}
