//! Languages command - list the languages in the index.

use crate::app::App;
use vortaro_core::{transliterate, Config, IndexStorage};

/// Run the languages command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let languages = app.index.languages()?;

    if languages.from.is_empty() {
        eprintln!("Index is empty. Run 'vortaro index' first.");
        return Ok(());
    }

    for lang in &languages.from {
        if transliterate::has_alphabet(lang) {
            println!("{lang}  (searchable in Latin script)");
        } else {
            println!("{lang}");
        }
    }

    Ok(())
}
