//! dict.cc tab-separated exports.
//!
//! The first line names the language pair:
//!
//! ```text
//! # EN-DE vocabulary database	compiled by dict.cc
//! ```
//!
//! Every entry line is `from<TAB>to<TAB>pos[<TAB>subject]`. Bracketed
//! annotations after the from-word (`house [building]`) are dropped.

use super::clean_line;
use crate::error::{Result, VortaroError};
use crate::source::{with_reverse, RecordError, RecordStream, SourceLines, SourceReader};
use crate::types::Definition;
use regex::Regex;
use std::path::Path;
use tracing::debug;

const HEADER: &str = r"^# ([A-Za-z]+)-([A-Za-z]+) vocabulary database\tcompiled by dict\.cc$";

/// Reader for dict.cc exports.
#[derive(Debug, Clone)]
pub struct DictccReader {
    bidirectional: bool,
}

impl DictccReader {
    pub const NAME: &'static str = "dict.cc";

    pub fn new(bidirectional: bool) -> Self {
        DictccReader { bidirectional }
    }
}

impl SourceReader for DictccReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, path: &Path) -> Result<RecordStream> {
        let header = Regex::new(HEADER).map_err(|e| VortaroError::Internal(e.to_string()))?;
        let mut lines = SourceLines::open(path)?;

        let first = match lines.next() {
            Some((_, line)) => line.map_err(|e| VortaroError::unreadable(path, e))?,
            None => String::new(),
        };
        let caps = header
            .captures(clean_line(&first))
            .ok_or_else(|| VortaroError::UnrecognizedSource {
                path: path.to_path_buf(),
                reason: "missing dict.cc language header".to_string(),
            })?;
        let from_lang = caps[1].to_lowercase();
        let to_lang = caps[2].to_lowercase();
        debug!(path = %path.display(), from = %from_lang, to = %to_lang, "dict.cc header");

        let records = lines.filter_map(move |(n, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(RecordError::Io(e))),
            };
            let line = clean_line(&line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            Some(parse_line(n, line, &from_lang, &to_lang))
        });

        Ok(with_reverse(records, self.bidirectional, Definition::reversed))
    }
}

fn parse_line(
    n: usize,
    line: &str,
    from_lang: &str,
    to_lang: &str,
) -> std::result::Result<Definition, RecordError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if !(3..=4).contains(&fields.len()) {
        return Err(RecordError::malformed(
            n,
            format!("expected 3 or 4 tab-separated fields, found {}", fields.len()),
        ));
    }

    let from_word = fields[0].split(" [").next().unwrap_or_default().trim();
    let to_word = fields[1].trim();
    if from_word.is_empty() || to_word.is_empty() {
        return Err(RecordError::malformed(n, "empty word"));
    }

    Ok(Definition::new(from_lang, from_word, to_lang, to_word)
        .with_part_of_speech(fields[2].trim()))
}
