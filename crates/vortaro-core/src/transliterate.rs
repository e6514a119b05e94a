//! Transliteration between native scripts and their canonical Latin form.
//!
//! Every from-word is compared in its romanized, lower-cased form. The same
//! table run backwards recovers original-script spans for highlighting.
//!
//! ## Algorithm
//!
//! A table maps native keys of one or two characters to a roman replacement.
//! Input is scanned left to right; a two-character key wins over a
//! one-character key starting at the same position, and characters without a
//! key are copied through. Matching ignores case; the replacement is emitted
//! in upper case when any character of the matched span is upper case.
//!
//! Languages without a table use the identity transform, so every function in
//! this module is total.

use crate::error::{Result, VortaroError};
use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use tracing::warn;

const BULGARIAN: &[(&str, &str)] = &[
    ("а", "a"),
    ("б", "b"),
    ("в", "v"),
    ("г", "g"),
    ("д", "d"),
    ("е", "e"),
    ("ж", "ž"),
    ("з", "z"),
    ("и", "i"),
    ("й", "y"),
    ("к", "k"),
    ("л", "l"),
    ("м", "m"),
    ("н", "n"),
    ("о", "o"),
    ("п", "p"),
    ("р", "r"),
    ("с", "s"),
    ("т", "t"),
    ("у", "u"),
    ("ф", "f"),
    ("х", "h"),
    ("ц", "c"),
    ("ч", "č"),
    ("ш", "š"),
    ("щ", "št"),
    ("ъ", "ă"),
    ("ь", "'"),
    ("ю", "yu"),
    ("я", "ya"),
];

const ESPERANTO: &[(&str, &str)] = &[
    ("c", "c"),
    ("ĉ", "cx"),
    ("g", "g"),
    ("ĝ", "gx"),
    ("h", "h"),
    ("ĥ", "hx"),
    ("j", "j"),
    ("ĵ", "jx"),
    ("s", "s"),
    ("ŝ", "sx"),
    ("u", "u"),
    ("ŭ", "ux"),
];

const RUSSIAN: &[(&str, &str)] = &[
    ("а", "a"),
    ("б", "b"),
    ("в", "v"),
    ("г", "g"),
    ("д", "d"),
    ("е", "e"),
    ("ё", "ë"),
    ("ж", "ž"),
    ("з", "z"),
    ("и", "i"),
    ("й", "j"),
    ("к", "k"),
    ("л", "l"),
    ("м", "m"),
    ("н", "n"),
    ("о", "o"),
    ("п", "p"),
    ("р", "r"),
    ("с", "s"),
    ("т", "t"),
    ("у", "u"),
    ("ф", "f"),
    ("х", "h"),
    ("ц", "c"),
    ("ч", "č"),
    ("ш", "š"),
    ("щ", "šč"),
    ("ъ", "\""),
    ("ы", "y"),
    ("ь", "'"),
    ("э", "è"),
    ("ю", "ju"),
    ("я", "ja"),
];

const SERBIAN: &[(&str, &str)] = &[
    ("а", "a"),
    ("б", "b"),
    ("в", "v"),
    ("г", "g"),
    ("д", "d"),
    ("е", "e"),
    ("ж", "ž"),
    ("з", "z"),
    ("и", "i"),
    ("к", "k"),
    ("л", "l"),
    ("м", "m"),
    ("н", "n"),
    ("о", "o"),
    ("п", "p"),
    ("р", "r"),
    ("с", "s"),
    ("т", "t"),
    ("у", "u"),
    ("ф", "f"),
    ("х", "h"),
    ("ц", "c"),
    ("ч", "č"),
    ("ш", "š"),
    ("ђ", "dj"),
    ("ј", "j"),
    ("љ", "lj"),
    ("њ", "nj"),
    ("ћ", "ć"),
    ("џ", "dž"),
];

/// Built-in tables, keyed by language code.
const BUILTIN: &[(&str, &[(&str, &str)])] = &[
    ("bg", BULGARIAN),
    ("eo", ESPERANTO),
    ("ru", RUSSIAN),
    ("sr", SERBIAN),
];

/// A script's alphabet in both directions.
#[derive(Debug)]
pub struct Alphabet {
    language: String,
    to_roman: Mapper,
    from_roman: Mapper,
}

impl Alphabet {
    /// Build an alphabet from ordered (native, roman) pairs.
    ///
    /// Both sides of every pair must be one or two characters long, since the
    /// mirrored table is used for the reverse direction.
    pub fn new(language: impl Into<String>, pairs: &[(&str, &str)]) -> Result<Self> {
        let language = language.into();
        let to_roman = Mapper::new(&language, pairs.iter().map(|&(n, r)| (n, r)))?;
        let from_roman = Mapper::new(&language, pairs.iter().map(|&(n, r)| (r, n)))?;
        Ok(Alphabet {
            language,
            to_roman,
            from_roman,
        })
    }

    /// The alphabet used for languages without a table.
    pub fn identity(language: impl Into<String>) -> Self {
        Alphabet {
            language: language.into(),
            to_roman: Mapper::default(),
            from_roman: Mapper::default(),
        }
    }

    /// Language code this alphabet belongs to
    pub fn language(&self) -> &str {
        &self.language
    }

    /// True when both directions copy their input through unchanged
    pub fn is_identity(&self) -> bool {
        self.to_roman.entries.is_empty()
    }

    /// Native script to Latin.
    pub fn to_roman(&self, text: &str) -> String {
        self.to_roman.apply(&self.language, text)
    }

    /// Latin to native script.
    pub fn from_roman(&self, text: &str) -> String {
        self.from_roman.apply(&self.language, text)
    }

    /// The lower-cased roman form used as a search key.
    pub fn canonical(&self, text: &str) -> String {
        self.to_roman(text).to_lowercase()
    }
}

/// One direction of an alphabet.
#[derive(Debug, Default)]
struct Mapper {
    /// Keyed by the (case-folded) first character of a key
    entries: FxHashMap<char, Entry>,
}

#[derive(Debug, Default)]
struct Entry {
    /// Replacement when the first character stands alone
    single: Option<String>,

    /// Replacements keyed by the (case-folded) second character
    pairs: FxHashMap<char, String>,
}

impl Mapper {
    fn new<'a>(language: &str, pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut entries: FxHashMap<char, Entry> = FxHashMap::default();

        for (key, replacement) in pairs {
            let mut chars = key.chars().map(fold);
            let (first, second, rest) = (chars.next(), chars.next(), chars.next());
            let invalid = || VortaroError::InvalidAlphabet {
                language: language.to_string(),
                key: key.to_string(),
            };

            match (first, second, rest) {
                (Some(first), None, None) => {
                    entries.entry(first).or_default().single = Some(replacement.to_string());
                }
                (Some(first), Some(second), None) => {
                    entries
                        .entry(first)
                        .or_default()
                        .pairs
                        .insert(second, replacement.to_string());
                }
                _ => return Err(invalid()),
            }
        }

        Ok(Mapper { entries })
    }

    fn apply(&self, language: &str, text: &str) -> String {
        if self.entries.is_empty() {
            return text.to_string();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut output = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            let Some(entry) = self.entries.get(&fold(chars[i])) else {
                output.push(chars[i]);
                i += 1;
                continue;
            };

            let pair = chars
                .get(i + 1)
                .and_then(|&next| entry.pairs.get(&fold(next)));

            if let Some(replacement) = pair {
                write_cased(&mut output, &chars[i..i + 2], replacement);
                i += 2;
                continue;
            }

            match &entry.single {
                Some(replacement) => write_cased(&mut output, &chars[i..i + 1], replacement),
                None => {
                    warn!(
                        language = %language,
                        character = %chars[i],
                        "Character only appears as the start of a two-character key"
                    );
                    output.push(chars[i]);
                }
            }
            i += 1;
        }

        output
    }
}

/// Lower-case a character when it has a single-character lower-case form.
fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn is_upper(c: char) -> bool {
    c.is_uppercase() && fold(c) != c
}

fn write_cased(output: &mut String, span: &[char], replacement: &str) {
    if span.iter().copied().any(is_upper) {
        output.push_str(&replacement.to_uppercase());
    } else {
        output.push_str(&replacement.to_lowercase());
    }
}

struct Registry {
    alphabets: FxHashMap<&'static str, Alphabet>,
    identity: Alphabet,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let alphabets = BUILTIN
            .iter()
            .map(|&(code, pairs)| match Alphabet::new(code, pairs) {
                Ok(alphabet) => (code, alphabet),
                Err(e) => panic!("built-in alphabet table is broken: {e}"),
            })
            .collect();
        Registry {
            alphabets,
            identity: Alphabet::identity(""),
        }
    })
}

/// The alphabet for a language code, or the identity alphabet.
pub fn alphabet(code: &str) -> &'static Alphabet {
    let registry = registry();
    registry
        .alphabets
        .get(code)
        .or_else(|| registry.alphabets.get(code.to_lowercase().as_str()))
        .unwrap_or(&registry.identity)
}

/// True when a language code has a built-in table.
pub fn has_alphabet(code: &str) -> bool {
    !alphabet(code).is_identity()
}

/// Language codes with a built-in table, sorted.
pub fn alphabet_languages() -> Vec<&'static str> {
    let mut codes: Vec<&'static str> = BUILTIN.iter().map(|&(code, _)| code).collect();
    codes.sort_unstable();
    codes
}

/// Native script to Latin for a language code.
pub fn to_roman(code: &str, text: &str) -> String {
    alphabet(code).to_roman(text)
}

/// Latin to native script for a language code.
pub fn from_roman(code: &str, text: &str) -> String {
    alphabet(code).from_roman(text)
}

/// The canonical search form of `text` in language `code`.
pub fn canonical(code: &str, text: &str) -> String {
    alphabet(code).canonical(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serbian_to_roman() {
        assert_eq!(to_roman("sr", "шар"), "šar");
        assert_eq!(to_roman("sr", "чокањчиће"), "čokanjčiće");
        assert_eq!(to_roman("sr", "џеп"), "džep");
    }

    #[test]
    fn test_digraph_wins_over_single() {
        assert_eq!(from_roman("sr", "njiva"), "њива");
        assert_eq!(from_roman("sr", "nos"), "нос");
        assert_eq!(from_roman("sr", "ljubav"), "љубав");
        assert_eq!(from_roman("eo", "cxu"), "ĉu");
    }

    #[test]
    fn test_round_trip() {
        let words = [
            ("sr", "чокањчиће"),
            ("sr", "љубав"),
            ("sr", "ђак"),
            ("sr", "Џеп"),
            ("ru", "съёмка"),
            ("ru", "щука"),
            ("ru", "объявление"),
            ("bg", "общопрактикуваща лекарка"),
            ("bg", "ябълка"),
            ("eo", "ĉiuĵaŭde"),
            ("eo", "ŝanĝiĝi"),
        ];
        for (lang, word) in words {
            let roman = to_roman(lang, word);
            assert_eq!(from_roman(lang, &roman), word, "{lang}: {word} -> {roman}");
        }
    }

    #[test]
    fn test_case_preservation() {
        for (lang, word) in [("sr", "љубав"), ("ru", "щука"), ("eo", "ĉiuĵaŭde")] {
            assert_eq!(
                to_roman(lang, &word.to_uppercase()),
                to_roman(lang, word).to_uppercase()
            );
        }
        assert_eq!(to_roman("sr", "ЉУБАВ"), "LJUBAV");
        assert_eq!(from_roman("sr", "LJUBAV"), "ЉУБАВ");
    }

    #[test]
    fn test_mixed_case_digraph_is_upper() {
        assert_eq!(to_roman("sr", "Љубав"), "LJubav");
    }

    #[test]
    fn test_unknown_language_is_identity() {
        assert_eq!(to_roman("de", "Straße"), "Straße");
        assert_eq!(from_roman("de", "Straße"), "Straße");
        assert!(!has_alphabet("de"));
        assert!(has_alphabet("SR"));
    }

    #[test]
    fn test_unmapped_characters_pass_through() {
        assert_eq!(to_roman("sr", "шар 42!"), "šar 42!");
        assert_eq!(to_roman("sr", "tree"), "tree");
    }

    #[test]
    fn test_canonical_lowercases() {
        assert_eq!(canonical("sr", "ШАР"), "šar");
        assert_eq!(canonical("en", "Elephant"), "elephant");
    }

    #[test]
    fn test_dangling_digraph_start_passes_through() {
        let alphabet = Alphabet::new("xx", &[("ab", "q")]).unwrap();
        assert_eq!(alphabet.to_roman("ab"), "q");
        assert_eq!(alphabet.to_roman("AB"), "Q");
        assert_eq!(alphabet.to_roman("ac"), "ac");
        assert_eq!(alphabet.to_roman("a"), "a");
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let err = Alphabet::new("xx", &[("", "a")]).unwrap_err();
        assert!(matches!(err, VortaroError::InvalidAlphabet { .. }));

        assert!(Alphabet::new("xx", &[("abc", "a")]).is_err());
        // The mirrored table must be valid too
        assert!(Alphabet::new("xx", &[("a", "xyz")]).is_err());
    }

    #[test]
    fn test_builtin_tables_load() {
        assert_eq!(alphabet_languages(), vec!["bg", "eo", "ru", "sr"]);
        for code in alphabet_languages() {
            assert!(!alphabet(code).is_identity());
            assert_eq!(alphabet(code).language(), code);
        }
    }
}
