//! In-process search index.
//!
//! `InMemorySearchIndex` keeps one inverted index per table:
//! - Tokenization on whitespace and ASCII punctuation
//! - Case-insensitive matching (configurable)
//! - OR semantics across query tokens
//! - Ranking by summed `tf * idf`, ties broken by ascending id
//!
//! It implements the same [`SearchIndex`] boundary an external engine
//! would, so the CLI and the tests run without one.

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::search::{IndexDocument, QueryHits, SearchIndex};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Serializable contents of an [`InMemorySearchIndex`]: table -> id ->
/// word -> term frequency.
///
/// Lets a process save the index and load it again without a reindex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Entries per table.
    pub tables: BTreeMap<String, BTreeMap<EntityId, BTreeMap<String, u32>>>,
}

impl IndexSnapshot {
    /// Returns the number of entries across all tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no table has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How post text is split into searchable words.
///
/// Words break on whitespace, ASCII punctuation and any extra separators.
/// Words outside the length bounds are dropped.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    /// Shortest word kept, in characters.
    pub min_token_length: usize,
    /// Longest word kept, in characters.
    pub max_token_length: usize,
    /// Fold words to lowercase, so `Help` and `help` match.
    pub case_insensitive: bool,
    /// Characters that break words in addition to the built-in ones.
    pub extra_separators: Vec<char>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_token_length: 1,
            max_token_length: 256,
            case_insensitive: true,
            extra_separators: vec![],
        }
    }
}

impl TokenizerConfig {
    /// Same as [`TokenizerConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops words shorter than `len`.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_token_length = len;
        self
    }

    /// Drops words longer than `len`.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_token_length = len;
        self
    }

    /// Matches words only with the same case.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    /// Also breaks words on `chars`.
    #[must_use]
    pub fn with_separators(mut self, chars: &[char]) -> Self {
        self.extra_separators.extend_from_slice(chars);
        self
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| {
            c.is_whitespace() || c.is_ascii_punctuation() || self.extra_separators.contains(&c)
        })
        .filter(|token| {
            let len = token.chars().count();
            len > 0 && len >= self.min_token_length && len <= self.max_token_length
        })
        .map(|token| {
            if self.case_insensitive {
                token.to_lowercase()
            } else {
                token.to_string()
            }
        })
        .collect()
    }
}

/// Postings for one table.
#[derive(Debug, Default)]
struct TableIndex {
    /// token -> id -> term frequency.
    inverted: HashMap<String, HashMap<EntityId, u32>>,
    /// id -> distinct tokens, for replacing and removing entries.
    forward: HashMap<EntityId, HashSet<String>>,
}

impl TableIndex {
    fn remove(&mut self, id: EntityId) -> bool {
        let Some(tokens) = self.forward.remove(&id) else {
            return false;
        };

        for token in &tokens {
            if let Some(postings) = self.inverted.get_mut(token) {
                postings.remove(&id);
                if postings.is_empty() {
                    self.inverted.remove(token);
                }
            }
        }
        true
    }

    fn insert(&mut self, id: EntityId, tokens: Vec<String>) {
        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *frequencies.entry(token).or_default() += 1;
        }
        self.insert_frequencies(id, frequencies);
    }

    fn insert_frequencies(&mut self, id: EntityId, frequencies: HashMap<String, u32>) {
        self.remove(id);

        let distinct: HashSet<String> = frequencies.keys().cloned().collect();
        for (token, tf) in frequencies {
            self.inverted.entry(token).or_default().insert(id, tf);
        }
        self.forward.insert(id, distinct);
    }

    fn rank(&self, query_tokens: &[String]) -> Vec<(EntityId, f64)> {
        let documents = self.forward.len() as f64;
        let distinct: HashSet<&String> = query_tokens.iter().collect();
        let mut scores: HashMap<EntityId, f64> = HashMap::new();

        for token in distinct {
            let Some(postings) = self.inverted.get(token) else {
                continue;
            };
            let idf = (1.0 + documents / postings.len() as f64).ln();
            for (id, tf) in postings {
                *scores.entry(*id).or_default() += f64::from(*tf) * idf;
            }
        }

        let mut ranked: Vec<(EntityId, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }
}

/// A ranked full-text index held in process memory.
///
/// # Example
///
/// ```rust
/// use postboard_core::{EntityId, IndexDocument, InMemorySearchIndex, SearchIndex};
///
/// let index = InMemorySearchIndex::new();
/// let doc = IndexDocument::new(EntityId::new(7))
///     .with_field("title", "help")
///     .with_field("description", "post from john");
/// index.add_to_index("posts", &doc).unwrap();
///
/// let hits = index.query_index("posts", "john", 1, 10).unwrap();
/// assert_eq!(hits.ids, vec![EntityId::new(7)]);
/// assert_eq!(hits.total, 1);
/// ```
#[derive(Default)]
pub struct InMemorySearchIndex {
    tokenizer: TokenizerConfig,
    tables: RwLock<HashMap<String, TableIndex>>,
}

impl InMemorySearchIndex {
    /// Creates an empty index with the default tokenizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with a custom tokenizer.
    #[must_use]
    pub fn with_tokenizer(tokenizer: TokenizerConfig) -> Self {
        Self {
            tokenizer,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of entries for `table`.
    #[must_use]
    pub fn document_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map_or(0, |index| index.forward.len())
    }

    /// Returns true if `table` has an entry for `id`.
    #[must_use]
    pub fn contains(&self, table: &str, id: EntityId) -> bool {
        self.tables
            .read()
            .get(table)
            .is_some_and(|index| index.forward.contains_key(&id))
    }

    /// Returns the indexed tokens of one entry, sorted.
    #[must_use]
    pub fn tokens_for(&self, table: &str, id: EntityId) -> Option<Vec<String>> {
        let tables = self.tables.read();
        let mut tokens: Vec<String> = tables.get(table)?.forward.get(&id)?.iter().cloned().collect();
        tokens.sort();
        Some(tokens)
    }

    /// Drops every entry of `table`.
    pub fn clear_table(&self, table: &str) {
        self.tables.write().remove(table);
    }

    /// Copies the current entries out.
    #[must_use]
    pub fn snapshot(&self) -> IndexSnapshot {
        let tables = self.tables.read();
        let mut snapshot = IndexSnapshot::default();
        for (name, index) in tables.iter() {
            let entries = snapshot.tables.entry(name.clone()).or_default();
            for id in index.forward.keys() {
                entries.entry(*id).or_default();
            }
            for (token, postings) in &index.inverted {
                for (id, tf) in postings {
                    entries.entry(*id).or_default().insert(token.clone(), *tf);
                }
            }
        }
        snapshot
    }

    /// Builds an index holding the entries of `snapshot`.
    ///
    /// Entries keep the words they were indexed with, so `tokenizer` only
    /// affects later adds and queries.
    #[must_use]
    pub fn from_snapshot(tokenizer: TokenizerConfig, snapshot: IndexSnapshot) -> Self {
        let mut tables: HashMap<String, TableIndex> = HashMap::new();
        for (name, entries) in snapshot.tables {
            let index = tables.entry(name).or_default();
            for (id, frequencies) in entries {
                index.insert_frequencies(id, frequencies.into_iter().collect());
            }
        }
        Self {
            tokenizer,
            tables: RwLock::new(tables),
        }
    }
}

impl SearchIndex for InMemorySearchIndex {
    fn add_to_index(&self, table: &str, document: &IndexDocument) -> CoreResult<()> {
        let mut tokens = Vec::new();
        for (_, text) in document.fields() {
            tokens.extend(self.tokenizer.tokenize(text));
        }

        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(document.id(), tokens);
        Ok(())
    }

    fn remove_from_index(&self, table: &str, id: EntityId) -> CoreResult<()> {
        if let Some(index) = self.tables.write().get_mut(table) {
            index.remove(id);
        }
        Ok(())
    }

    fn query_index(
        &self,
        table: &str,
        expression: &str,
        page: usize,
        per_page: usize,
    ) -> CoreResult<QueryHits> {
        if page == 0 || per_page == 0 {
            return Err(CoreError::search_index(format!(
                "page and per_page must be at least 1 (got page {page}, per_page {per_page})"
            )));
        }

        let query_tokens = self.tokenizer.tokenize(expression);
        if query_tokens.is_empty() {
            return Ok(QueryHits::empty());
        }

        let tables = self.tables.read();
        let Some(index) = tables.get(table) else {
            return Ok(QueryHits::empty());
        };

        let ranked = index.rank(&query_tokens);
        let total = ranked.len() as u64;
        let ids = ranked
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|(id, _)| id)
            .collect();

        Ok(QueryHits::new(ids, total))
    }
}

impl std::fmt::Debug for InMemorySearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        let mut counts: Vec<(&String, usize)> = tables
            .iter()
            .map(|(name, index)| (name, index.forward.len()))
            .collect();
        counts.sort();
        f.debug_struct("InMemorySearchIndex")
            .field("tables", &counts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, title: &str, description: &str) -> IndexDocument {
        IndexDocument::new(EntityId::new(id))
            .with_field("title", title)
            .with_field("description", description)
    }

    fn ids(hits: &QueryHits) -> Vec<i64> {
        hits.ids.iter().map(|id| id.as_i64()).collect()
    }

    #[test]
    fn tokenize_with_punctuation() {
        let tokens = TokenizerConfig::new().tokenize("Hello, World! How are you?");
        assert_eq!(tokens, vec!["hello", "world", "how", "are", "you"]);
    }

    #[test]
    fn tokenize_case_sensitive() {
        let tokens = TokenizerConfig::new()
            .case_sensitive()
            .tokenize("Hello World HELLO");
        assert_eq!(tokens, vec!["Hello", "World", "HELLO"]);
    }

    #[test]
    fn tokenize_min_length() {
        let tokens = TokenizerConfig::new().min_length(3).tokenize("I am a robot");
        assert_eq!(tokens, vec!["robot"]);
    }

    #[test]
    fn tokenize_extra_separators() {
        let tokens = TokenizerConfig::new()
            .with_separators(&['·'])
            .tokenize("front·end");
        assert_eq!(tokens, vec!["front", "end"]);
    }

    #[test]
    fn query_matches_any_field() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "help", "post from john")).unwrap();
        index.add_to_index("posts", &doc(2, "help", "post from susan")).unwrap();

        let hits = index.query_index("posts", "john", 1, 10).unwrap();
        assert_eq!(ids(&hits), vec![1]);
        assert_eq!(hits.total, 1);

        let hits = index.query_index("posts", "HELP", 1, 10).unwrap();
        assert_eq!(ids(&hits), vec![1, 2]);
        assert_eq!(hits.total, 2);
    }

    #[test]
    fn denser_matches_rank_first() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "rust", "a post")).unwrap();
        index.add_to_index("posts", &doc(2, "rust rust", "rust all the way")).unwrap();
        index.add_to_index("posts", &doc(3, "python", "nothing here")).unwrap();

        let hits = index.query_index("posts", "rust", 1, 10).unwrap();
        assert_eq!(ids(&hits), vec![2, 1]);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "azure", "help")).unwrap();
        index.add_to_index("posts", &doc(2, "flask", "help")).unwrap();
        index.add_to_index("posts", &doc(3, "flask", "help")).unwrap();

        // "azure" occurs once, "flask" twice: doc 1 outranks the flask docs
        let hits = index.query_index("posts", "azure flask", 1, 10).unwrap();
        assert_eq!(ids(&hits), vec![1, 2, 3]);
    }

    #[test]
    fn pagination_passes_total_through() {
        let index = InMemorySearchIndex::new();
        for id in 1..=5 {
            index.add_to_index("posts", &doc(id, "help", "same")).unwrap();
        }

        let first = index.query_index("posts", "help", 1, 2).unwrap();
        let third = index.query_index("posts", "help", 3, 2).unwrap();
        let beyond = index.query_index("posts", "help", 4, 2).unwrap();

        assert_eq!(ids(&first), vec![1, 2]);
        assert_eq!(ids(&third), vec![5]);
        assert!(beyond.ids.is_empty());
        assert_eq!(first.total, 5);
        assert_eq!(beyond.total, 5);
    }

    #[test]
    fn add_replaces_previous_entry() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "hello", "world")).unwrap();
        index.add_to_index("posts", &doc(1, "goodbye", "world")).unwrap();

        assert_eq!(index.document_count("posts"), 1);
        assert_eq!(index.query_index("posts", "hello", 1, 10).unwrap().total, 0);
        assert_eq!(index.query_index("posts", "goodbye", 1, 10).unwrap().total, 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "hello", "world")).unwrap();

        index.remove_from_index("posts", EntityId::new(1)).unwrap();
        index.remove_from_index("posts", EntityId::new(1)).unwrap();
        index.remove_from_index("unknown", EntityId::new(1)).unwrap();

        assert!(!index.contains("posts", EntityId::new(1)));
        assert_eq!(index.query_index("posts", "hello", 1, 10).unwrap(), QueryHits::empty());
    }

    #[test]
    fn tables_are_isolated() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "hello", "")).unwrap();
        index.add_to_index("comments", &doc(1, "other", "")).unwrap();

        assert_eq!(index.query_index("comments", "hello", 1, 10).unwrap().total, 0);
        index.clear_table("comments");
        assert_eq!(index.document_count("comments"), 0);
        assert_eq!(index.document_count("posts"), 1);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "hello", "world")).unwrap();
        assert_eq!(index.query_index("posts", "  ,. ", 1, 10).unwrap().total, 0);
    }

    #[test]
    fn zero_page_is_rejected() {
        let index = InMemorySearchIndex::new();
        assert!(index.query_index("posts", "x", 0, 10).is_err());
        assert!(index.query_index("posts", "x", 1, 0).is_err());
    }

    #[test]
    fn tokens_for_entry() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "Help", "post from John")).unwrap();
        assert_eq!(
            index.tokens_for("posts", EntityId::new(1)).unwrap(),
            vec!["from", "help", "john", "post"]
        );
    }

    #[test]
    fn unicode_text() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "Привет мир", "")).unwrap();
        let hits = index.query_index("posts", "привет", 1, 10).unwrap();
        assert_eq!(ids(&hits), vec![1]);
    }

    #[test]
    fn snapshot_restores_ranking() {
        let index = InMemorySearchIndex::new();
        index.add_to_index("posts", &doc(1, "rust", "a post")).unwrap();
        index.add_to_index("posts", &doc(2, "rust rust", "rust all the way")).unwrap();
        index.add_to_index("posts", &doc(3, "", "")).unwrap();

        let snapshot = index.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.tables["posts"][&EntityId::new(2)]["rust"], 3);

        let restored = InMemorySearchIndex::from_snapshot(TokenizerConfig::new(), snapshot.clone());
        assert_eq!(restored.document_count("posts"), 3);
        assert_eq!(
            restored.query_index("posts", "rust", 1, 10).unwrap(),
            index.query_index("posts", "rust", 1, 10).unwrap()
        );
        assert_eq!(restored.snapshot(), snapshot);
    }
}
