//! CC-CEDICT Chinese-English dictionary.
//!
//! ```text
//! 中國 中国 [Zhong1 guo2] /China/Middle Kingdom/
//! ```
//!
//! Each sense becomes its own `zh -> en` record filed under the simplified
//! form. The reverse record shows the Chinese as `simplified [pīn yīn]`.

use super::clean_line;
use crate::error::{Result, VortaroError};
use crate::source::{RecordError, RecordStream, SourceLines, SourceReader};
use crate::types::Definition;
use regex::Regex;
use std::path::Path;

const ENTRY: &str = r"^(\S+) (\S+) \[([^\]]*)\] /(.*)/$";

/// Reader for CC-CEDICT.
#[derive(Debug, Clone)]
pub struct CedictReader {
    bidirectional: bool,
}

impl CedictReader {
    pub const NAME: &'static str = "cc-cedict";

    pub fn new(bidirectional: bool) -> Self {
        CedictReader { bidirectional }
    }
}

impl SourceReader for CedictReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, path: &Path) -> Result<RecordStream> {
        let entry = Regex::new(ENTRY).map_err(|e| VortaroError::Internal(e.to_string()))?;
        let bidirectional = self.bidirectional;
        let lines = SourceLines::open(path)?;

        let records = lines.flat_map(move |(n, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => return vec![Err(RecordError::Io(e))],
            };
            let line = clean_line(&line);
            if line.trim().is_empty() || line.starts_with('#') {
                return Vec::new();
            }

            let Some(caps) = entry.captures(line) else {
                return vec![Err(RecordError::malformed(n, "not a CC-CEDICT entry"))];
            };
            let simplified = &caps[2];
            let pinyin = &caps[3];

            let mut out = Vec::new();
            for sense in caps[4].split('/').map(str::trim).filter(|s| !s.is_empty()) {
                out.push(Ok(Definition::new("zh", simplified, "en", sense)));
                if bidirectional {
                    let chinese = format!("{} [{}]", simplified, render_pinyin(pinyin));
                    out.push(Ok(Definition::new("en", sense, "zh", chinese)));
                }
            }
            if out.is_empty() {
                out.push(Err(RecordError::malformed(n, "entry has no senses")));
            }
            out
        });

        Ok(Box::new(records))
    }
}

const TONES: &[(char, [char; 5])] = &[
    ('a', ['ā', 'á', 'ǎ', 'à', 'a']),
    ('e', ['ē', 'é', 'ě', 'è', 'e']),
    ('i', ['ī', 'í', 'ǐ', 'ì', 'i']),
    ('o', ['ō', 'ó', 'ǒ', 'ò', 'o']),
    ('u', ['ū', 'ú', 'ǔ', 'ù', 'u']),
];

fn toned(vowel: char, tone: usize) -> char {
    TONES
        .iter()
        .find(|(v, _)| *v == vowel)
        .map(|(_, marks)| marks[tone])
        .unwrap_or(vowel)
}

/// Render numbered pinyin (`zhong1 guo2`) with tone marks (`zhōng guó`).
pub fn render_pinyin(pinyin: &str) -> String {
    pinyin
        .split_whitespace()
        .map(render_syllable)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_syllable(syllable: &str) -> String {
    let Some(tone) = syllable
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .filter(|d| (1..=5).contains(d))
    else {
        return syllable.to_string();
    };
    let tone = tone as usize - 1;
    let base = &syllable[..syllable.len() - 1];

    if base.contains("ao") {
        return base.replacen("ao", &format!("{}o", toned('a', tone)), 1);
    }
    for vowel in ['a', 'e', 'o'] {
        if base.contains(vowel) {
            return base.replacen(vowel, &toned(vowel, tone).to_string(), 1);
        }
    }
    for (first, second) in [('i', 'u'), ('u', 'i')] {
        let pair = format!("{first}{second}");
        if base.contains(&pair) {
            return base.replacen(&pair, &format!("{}{}", first, toned(second, tone)), 1);
        }
    }
    syllable.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::testing::source_file;

    const SAMPLE: &str = "# CC-CEDICT\n\
        #! version=1\n\
        中國 中国 [Zhong1 guo2] /China/Middle Kingdom/\n\
        好 好 [hao3] /good/\n\
        garbage\n";

    #[test]
    fn test_read() {
        let (_dir, path) = source_file("cedict.txt", SAMPLE);
        let records: Vec<_> = CedictReader::new(false).read(&path).unwrap().collect();

        assert_eq!(records.len(), 4);
        let china = records[0].as_ref().unwrap();
        assert_eq!(china.from_lang, "zh");
        assert_eq!(china.from_word, "中国");
        assert_eq!(china.to_lang, "en");
        assert_eq!(china.to_word, "China");
        assert_eq!(records[1].as_ref().unwrap().to_word, "Middle Kingdom");
        assert!(matches!(records[3], Err(RecordError::Malformed { line: 5, .. })));
    }

    #[test]
    fn test_reverse_renders_tones() {
        let (_dir, path) = source_file("cedict.txt", SAMPLE);
        let records: Vec<_> = CedictReader::new(true)
            .read(&path)
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        let good = records
            .iter()
            .find(|d| d.from_lang == "en" && d.from_word == "good")
            .unwrap();
        assert_eq!(good.to_word, "好 [hǎo]");

        let china = records
            .iter()
            .find(|d| d.from_lang == "en" && d.from_word == "China")
            .unwrap();
        assert_eq!(china.to_word, "中国 [Zhōng guó]");
    }

    #[test]
    fn test_render_syllable() {
        assert_eq!(render_syllable("hao3"), "hǎo");
        assert_eq!(render_syllable("liu2"), "liú");
        assert_eq!(render_syllable("gui4"), "guì");
        assert_eq!(render_syllable("ma5"), "ma");
        assert_eq!(render_syllable("xx"), "xx");
        assert_eq!(render_syllable("m2"), "m2");
    }
}
