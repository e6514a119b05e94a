//! Substring search over the fragment index.
//!
//! A query runs in four steps:
//!
//! 1. **Normalize**: the raw text is romanized once per from-language in
//!    scope. Languages whose romanized queries agree share one retrieval.
//! 2. **Candidates**: a query of at least `N` characters intersects the
//!    phrase sets of its distinct `N`-windows, smallest set first. A shorter
//!    query unions the phrases of every stored fragment that contains it.
//! 3. **Verify**: only phrases that really contain the query survive.
//! 4. **Fetch**: records of the surviving phrases, restricted to the matching
//!    from-language and the to-language filter, deduplicated and cut to the
//!    best `limit` rows.
//!
//! Highlights are computed lazily as [`SearchResults`] is iterated.
//!
//! ## Ordering
//!
//! Rows are ordered by from-word length in characters, then part of speech,
//! from-language, from-word, to-language and to-word.

use crate::error::Result;
use crate::fragment::query_windows;
use crate::storage::IndexStorage;
use crate::transliterate;
use crate::types::Definition;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use tracing::debug;

/// A search request.
///
/// # Example
/// ```
/// use vortaro_core::SearchQuery;
/// let query = SearchQuery::new("ar").from_langs(["sr"]).limit(10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    text: String,
    from_langs: Vec<String>,
    to_langs: Vec<String>,
    limit: Option<usize>,
}

impl SearchQuery {
    /// Search for `text` in every indexed from-language.
    pub fn new(text: impl Into<String>) -> Self {
        SearchQuery {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Restrict to these from-languages. Empty means all.
    pub fn from_langs<I, L>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        self.from_langs = langs.into_iter().map(|l| l.as_ref().to_lowercase()).collect();
        self
    }

    /// Restrict to these to-languages. Empty means all.
    pub fn to_langs<I, L>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        self.to_langs = langs.into_iter().map(|l| l.as_ref().to_lowercase()).collect();
        self
    }

    /// Keep only the best `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The raw query text
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A from-word split around the matched part of the query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Highlight {
    pub prefix: String,
    pub matched: String,
    pub suffix: String,
}

impl Highlight {
    fn plain(word: &str) -> Self {
        Highlight {
            prefix: word.to_string(),
            ..Default::default()
        }
    }

    /// True when part of the word is marked as matched
    pub fn is_highlighted(&self) -> bool {
        !self.matched.is_empty()
    }

    /// The three parts as a tuple
    pub fn parts(&self) -> (&str, &str, &str) {
        (&self.prefix, &self.matched, &self.suffix)
    }
}

/// One result row.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub definition: Definition,
    pub highlight: Highlight,
}

/// Ranked rows of a search, highlighted as they are taken.
#[derive(Debug)]
pub struct SearchResults {
    rows: std::vec::IntoIter<Ranked>,
    queries: Vec<String>,
    unavailable: Vec<String>,
}

impl SearchResults {
    /// Explicitly requested languages the index does not contain.
    pub fn unavailable_languages(&self) -> &[String] {
        &self.unavailable
    }
}

impl Iterator for SearchResults {
    type Item = SearchHit;

    fn next(&mut self) -> Option<SearchHit> {
        let row = self.rows.next()?;
        let highlight = highlight(
            &row.definition.from_lang,
            &row.definition.from_word,
            &self.queries[row.query],
        );
        Some(SearchHit {
            definition: row.definition,
            highlight,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for SearchResults {}

/// A record paired with the canonical query it matched.
#[derive(Debug)]
struct Ranked {
    definition: Definition,
    query: usize,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.definition.sort_key().cmp(&other.definition.sort_key())
    }
}

/// Best-first collection of at most `limit` rows.
struct TopRows {
    heap: BinaryHeap<Ranked>,
    limit: Option<usize>,
}

impl TopRows {
    fn new(limit: Option<usize>) -> Self {
        TopRows {
            heap: BinaryHeap::new(),
            limit,
        }
    }

    /// Whether `definition` would be kept if pushed now.
    fn admits(&self, definition: &Definition) -> bool {
        match self.limit {
            Some(0) => false,
            Some(limit) if self.heap.len() >= limit => self
                .heap
                .peek()
                .map_or(true, |worst| definition.sort_key() < worst.definition.sort_key()),
            _ => true,
        }
    }

    fn push(&mut self, row: Ranked) {
        match self.limit {
            Some(0) => {}
            Some(limit) if self.heap.len() >= limit => {
                if let Some(mut worst) = self.heap.peek_mut() {
                    if row < *worst {
                        *worst = row;
                    }
                }
            }
            _ => self.heap.push(row),
        }
    }

    fn into_sorted(self) -> Vec<Ranked> {
        self.heap.into_sorted_vec()
    }
}

/// Runs queries against an index.
pub struct Searcher<'a, S: IndexStorage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: IndexStorage + ?Sized> Searcher<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Searcher { storage }
    }

    /// Execute a search.
    ///
    /// Unknown languages are reported by
    /// [`SearchResults::unavailable_languages`], not as an error.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        let languages = self.storage.languages()?;

        let unavailable: Vec<String> = query
            .from_langs
            .iter()
            .filter(|l| !languages.from.contains(*l))
            .chain(query.to_langs.iter().filter(|l| !languages.to.contains(*l)))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let from_scope: Vec<&String> = if query.from_langs.is_empty() {
            languages.from.iter().collect()
        } else {
            languages
                .from
                .iter()
                .filter(|l| query.from_langs.contains(*l))
                .collect()
        };
        let to_scope: Option<FxHashSet<&str>> = if query.to_langs.is_empty() {
            None
        } else {
            Some(query.to_langs.iter().map(String::as_str).collect())
        };

        // Languages sharing a canonical query share one retrieval
        let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for lang in from_scope {
            groups
                .entry(transliterate::canonical(lang, &query.text))
                .or_default()
                .push(lang.as_str());
        }

        let mut seen = FxHashSet::default();
        let mut top = TopRows::new(query.limit);
        let mut queries = Vec::with_capacity(groups.len());

        for (canonical, langs) in groups {
            let phrases = self.matching_phrases(&canonical)?;
            debug!(query = %canonical, langs = ?langs, phrases = phrases.len(), "Phrases matched");

            let query_pos = queries.len();
            for phrase in &phrases {
                // Only rows that make the cut are copied out of storage
                self.storage.for_each_record(phrase, &mut |definition| {
                    if !langs.contains(&definition.from_lang.as_str()) {
                        return;
                    }
                    if let Some(to) = &to_scope {
                        if !to.contains(definition.to_lang.as_str()) {
                            return;
                        }
                    }
                    if !seen.insert(definition.id()) || !top.admits(definition) {
                        return;
                    }
                    top.push(Ranked {
                        definition: definition.clone(),
                        query: query_pos,
                    });
                })?;
            }
            queries.push(canonical);
        }

        Ok(SearchResults {
            rows: top.into_sorted().into_iter(),
            queries,
            unavailable,
        })
    }

    /// Canonical phrases that contain `query`, verified.
    pub fn matching_phrases(&self, query: &str) -> Result<FxHashSet<String>> {
        let candidates = self.candidates(query)?;
        Ok(candidates
            .into_iter()
            .filter(|phrase| phrase.contains(query))
            .collect())
    }

    fn candidates(&self, query: &str) -> Result<FxHashSet<String>> {
        let n = self.storage.fragment_size();

        if query.chars().count() < n {
            let mut union = FxHashSet::default();
            for fragment in self.storage.fragments_containing(query)? {
                union.extend(self.storage.phrases_for_fragment(&fragment)?);
            }
            return Ok(union);
        }

        let mut sets = Vec::new();
        for window in query_windows(query, n) {
            let phrases = self.storage.phrases_for_fragment(&window)?;
            if phrases.is_empty() {
                return Ok(FxHashSet::default());
            }
            sets.push(phrases);
        }
        sets.sort_by_key(Vec::len);

        let mut sets = sets.into_iter();
        let mut result: FxHashSet<String> = match sets.next() {
            Some(smallest) => smallest.into_iter().collect(),
            None => return Ok(FxHashSet::default()),
        };
        for set in sets {
            let set: FxHashSet<String> = set.into_iter().collect();
            result.retain(|phrase| set.contains(phrase));
            if result.is_empty() {
                break;
            }
        }
        Ok(result)
    }
}

/// Split `word` around the first case-insensitive occurrence of `query` in
/// its romanized form, each part mapped back to the original script.
///
/// When the parts do not reassemble into `word` exactly, the whole word is
/// returned unhighlighted as the prefix.
pub fn highlight(lang: &str, word: &str, query: &str) -> Highlight {
    if query.is_empty() {
        return Highlight::plain(word);
    }

    let alphabet = transliterate::alphabet(lang);
    let roman = alphabet.to_roman(word);
    let Some((start, end)) = find_caseless(&roman, query) else {
        return Highlight::plain(word);
    };

    let highlight = Highlight {
        prefix: alphabet.from_roman(&roman[..start]),
        matched: alphabet.from_roman(&roman[start..end]),
        suffix: alphabet.from_roman(&roman[end..]),
    };

    let rebuilt = [&highlight.prefix, &highlight.matched, &highlight.suffix]
        .iter()
        .map(|part| part.as_str())
        .collect::<String>();
    if rebuilt == word {
        highlight
    } else {
        debug!(word, query, "Highlight does not round-trip");
        Highlight::plain(word)
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Byte range of the first occurrence of `needle` in `haystack`, ignoring case.
fn find_caseless(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let hay: Vec<(usize, char)> = haystack.char_indices().map(|(i, c)| (i, fold(c))).collect();
    let needle: Vec<char> = needle.chars().map(fold).collect();
    if needle.is_empty() || needle.len() > hay.len() {
        return None;
    }

    (0..=hay.len() - needle.len())
        .find(|&start| {
            hay[start..start + needle.len()]
                .iter()
                .zip(&needle)
                .all(|((_, h), n)| h == n)
        })
        .map(|start| {
            let end = hay
                .get(start + needle.len())
                .map(|&(i, _)| i)
                .unwrap_or(haystack.len());
            (hay[start].0, end)
        })
}
