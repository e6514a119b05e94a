//! Result table rendering.
//!
//! Rows look like `pos   from:word   to:word`, with every column but the last
//! padded to the widest cell. Widths are counted in characters, and a line
//! is cut to the table width before any styling is applied.

use crossterm::style::Stylize;
use vortaro_core::{Highlight, SearchHit};

const GAP: &str = "   ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Plain,
    Bold,
    Match,
}

/// A row split into styled pieces.
type Line = Vec<(String, Style)>;

/// Search results laid out as a table.
pub struct Table {
    hits: Vec<SearchHit>,
    highlight: bool,
}

impl Table {
    pub fn new(hits: Vec<SearchHit>, highlight: bool) -> Self {
        Table { hits, highlight }
    }

    /// Render every row, each cut to `width` characters (0 = no limit).
    pub fn render(&self, width: usize) -> Vec<String> {
        let mut widths = [0usize; 4];
        for hit in &self.hits {
            let d = &hit.definition;
            for (w, cell) in widths
                .iter_mut()
                .zip([&d.part_of_speech, &d.from_lang, &d.from_word, &d.to_lang])
            {
                *w = (*w).max(cell.chars().count());
            }
        }

        self.hits
            .iter()
            .map(|hit| {
                let line = self.layout(hit, &widths);
                let line = if width > 0 { truncate(line, width) } else { line };
                self.paint(line)
            })
            .collect()
    }

    fn layout(&self, hit: &SearchHit, widths: &[usize; 4]) -> Line {
        let d = &hit.definition;
        let mut line = vec![
            (pad(&d.part_of_speech, widths[0]), Style::Plain),
            (GAP.to_string(), Style::Plain),
            (format!("{}:", pad(&d.from_lang, widths[1])), Style::Plain),
        ];
        line.extend(word_pieces(&hit.highlight));
        line.push((
            " ".repeat(widths[2] - d.from_word.chars().count()),
            Style::Plain,
        ));
        line.push((GAP.to_string(), Style::Plain));
        line.push((
            format!("{}:{}", pad(&d.to_lang, widths[3]), d.to_word),
            Style::Plain,
        ));
        line
    }

    fn paint(&self, line: Line) -> String {
        line.into_iter()
            .map(|(text, style)| match (self.highlight, style) {
                (false, _) | (_, Style::Plain) => text,
                (true, Style::Bold) => text.bold().to_string(),
                (true, Style::Match) => text.bold().underlined().to_string(),
            })
            .collect()
    }
}

fn word_pieces(highlight: &Highlight) -> Line {
    if !highlight.is_highlighted() {
        return vec![(highlight.prefix.clone(), Style::Bold)];
    }
    vec![
        (highlight.prefix.clone(), Style::Bold),
        (highlight.matched.clone(), Style::Match),
        (highlight.suffix.clone(), Style::Bold),
    ]
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
}

fn truncate(line: Line, width: usize) -> Line {
    let mut left = width;
    let mut out = Vec::with_capacity(line.len());
    for (text, style) in line {
        if left == 0 {
            break;
        }
        let len = text.chars().count();
        if len <= left {
            left -= len;
            out.push((text, style));
        } else {
            out.push((text.chars().take(left).collect(), style));
            left = 0;
        }
    }
    out
}
