//! ESPDIC Esperanto-English dictionary.
//!
//! After a one-line preamble, every line is `esperanto : english`.

use super::clean_line;
use crate::error::Result;
use crate::source::{with_reverse, RecordError, RecordStream, SourceLines, SourceReader};
use crate::types::Definition;
use std::path::Path;

/// Reader for ESPDIC.
#[derive(Debug, Clone)]
pub struct EspdicReader {
    bidirectional: bool,
}

impl EspdicReader {
    pub const NAME: &'static str = "espdic";

    pub fn new(bidirectional: bool) -> Self {
        EspdicReader { bidirectional }
    }
}

impl SourceReader for EspdicReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, path: &Path) -> Result<RecordStream> {
        let records = SourceLines::open(path)?.skip(1).filter_map(|(n, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(RecordError::Io(e))),
            };
            let line = clean_line(&line);
            if line.trim().is_empty() {
                return None;
            }
            Some(match line.split_once(" : ") {
                Some((eo, en)) if !eo.trim().is_empty() && !en.trim().is_empty() => {
                    Ok(Definition::new("eo", eo.trim(), "en", en.trim()))
                }
                _ => Err(RecordError::malformed(n, "expected 'esperanto : english'")),
            })
        });

        Ok(with_reverse(records, self.bidirectional, Definition::reversed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::testing::source_file;

    const SAMPLE: &str = "ESPDIC (Esperanto English Dictionary) - Paul Denisowski\n\
        hundo : dog\n\
        ĉevalo : horse\n\
        kajo : conjunction; quay, wharf\n\
        sen dupunkto\n";

    #[test]
    fn test_read() {
        let (_dir, path) = source_file("espdic.txt", SAMPLE);
        let records: Vec<_> = EspdicReader::new(false).read(&path).unwrap().collect();

        assert_eq!(records.len(), 4);
        let horse = records[1].as_ref().unwrap();
        assert_eq!(horse.from_lang, "eo");
        assert_eq!(horse.from_word, "ĉevalo");
        assert_eq!(horse.to_word, "horse");
        assert!(horse.part_of_speech.is_empty());
        assert_eq!(records[2].as_ref().unwrap().to_word, "conjunction; quay, wharf");
        assert!(matches!(records[3], Err(RecordError::Malformed { line: 5, .. })));
    }

    #[test]
    fn test_bidirectional() {
        let (_dir, path) = source_file("espdic.txt", "preamble\nhundo : dog\n");
        let records: Vec<_> = EspdicReader::new(true)
            .read(&path)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1], Definition::new("en", "dog", "eo", "hundo"));
    }
}
