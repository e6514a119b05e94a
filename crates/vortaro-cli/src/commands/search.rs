//! Search command - look up words containing a substring.

use crate::app::App;
use crate::output::Table;
use crate::OutputFormat;
use vortaro_core::{Config, SearchHit, SearchQuery, Searcher};

const FALLBACK_SIZE: (u16, u16) = (80, 20);

/// Run the search command.
pub fn run(
    config: Config,
    text: &str,
    limit: Option<usize>,
    from: Vec<String>,
    to: Vec<String>,
    output: OutputFormat,
    width: Option<usize>,
) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if app.index.is_empty() {
        eprintln!("Index is empty. Run 'vortaro index' first.");
        return Ok(());
    }

    let search = &app.config.search;
    let from = if from.is_empty() { search.from_langs.clone() } else { from };
    let to = if to.is_empty() { search.to_langs.clone() } else { to };

    let (columns, rows) = crossterm::terminal::size().unwrap_or(FALLBACK_SIZE);
    let limit = match limit.unwrap_or(search.limit) {
        0 => usize::from(rows).saturating_sub(2).max(1),
        n => n,
    };
    let width = match width.unwrap_or(app.config.ui.width) {
        0 => usize::from(columns),
        n => n,
    };

    let query = SearchQuery::new(text)
        .from_langs(&from)
        .to_langs(&to)
        .limit(limit);
    let results = Searcher::new(app.index.as_ref()).search(&query)?;

    for lang in results.unavailable_languages() {
        eprintln!("Language not available: {}", lang);
    }

    let hits: Vec<SearchHit> = results.collect();

    match output {
        OutputFormat::Text => {
            if hits.is_empty() {
                eprintln!("No matches for \"{}\"", text);
                return Ok(());
            }
            let table = Table::new(hits, app.config.ui.highlight);
            for line in table.render(width) {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = hits.iter().map(hit_json).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}

fn hit_json(hit: &SearchHit) -> serde_json::Value {
    let d = &hit.definition;
    let (prefix, matched, suffix) = hit.highlight.parts();
    serde_json::json!({
        "part_of_speech": d.part_of_speech,
        "from_lang": d.from_lang,
        "from_word": d.from_word,
        "to_lang": d.to_lang,
        "to_word": d.to_word,
        "highlight": [prefix, matched, suffix],
    })
}
