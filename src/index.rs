//! Serializable in-memory full-text index.
//!
//! A plain inverted index over `title` and `body` with tf-idf scoring. The
//! whole structure round-trips through JSON so it can live inside a
//! key-value storage backend and be re-hydrated on the next startup, rather
//! than depending on a search library's internal object shape being
//! storage-safe.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::document::Document;

/// Weight multiplier for terms appearing in the title.
const TITLE_BOOST: f32 = 2.0;

/// Rendering metadata kept alongside the postings for each document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub title: String,
    pub url: String,
}

/// Inverted full-text index keyed by document id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchIndex {
    /// term -> document id -> weighted term frequency
    postings: HashMap<String, HashMap<String, f32>>,
    /// document id -> rendering metadata
    docs: HashMap<String, DocMeta>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, overwriting any existing entry with the same id.
    pub fn add(&mut self, doc: &Document) {
        if self.docs.contains_key(&doc.id) {
            self.remove_postings(&doc.id);
        }

        let mut weights: HashMap<String, f32> = HashMap::new();
        for term in tokenize(&doc.title) {
            *weights.entry(term).or_insert(0.0) += TITLE_BOOST;
        }
        for term in tokenize(&doc.body) {
            *weights.entry(term).or_insert(0.0) += 1.0;
        }

        for (term, weight) in weights {
            self.postings
                .entry(term)
                .or_default()
                .insert(doc.id.clone(), weight);
        }

        self.docs.insert(
            doc.id.clone(),
            DocMeta {
                title: doc.title.clone(),
                url: doc.url.clone(),
            },
        );
    }

    /// Full-text query returning `(document id, score)` matches, best first.
    ///
    /// Query text is treated as literal terms; unknown terms contribute
    /// nothing and an unparseable query simply tokenizes to fewer terms, so
    /// no error can surface to the caller. Ties are broken by document id to
    /// keep the ordering deterministic.
    pub fn search(&self, query: &str) -> Vec<(String, f32)> {
        let terms: HashSet<String> = tokenize(query).into_iter().collect();
        if terms.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }

        let total_docs = self.docs.len() as f32;
        let mut scores: HashMap<&str, f32> = HashMap::new();
        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = (1.0 + total_docs / postings.len() as f32).ln();
            for (doc_id, weight) in postings {
                *scores.entry(doc_id.as_str()).or_insert(0.0) += weight * idf;
            }
        }

        let mut ranked: Vec<(String, f32)> = scores
            .into_iter()
            .map(|(doc_id, score)| (doc_id.to_string(), score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }

    /// Rendering metadata for a document id, if indexed.
    pub fn meta(&self, doc_id: &str) -> Option<&DocMeta> {
        self.docs.get(doc_id)
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Serialize to a JSON string suitable for key-value storage.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("Failed to serialize index: {e}"))
    }

    /// Deserialize an index previously produced by [`SearchIndex::to_json`].
    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("Failed to deserialize index: {e}"))
    }

    /// Drop every posting pointing at `doc_id`.
    fn remove_postings(&mut self, doc_id: &str) {
        for postings in self.postings.values_mut() {
            postings.remove(doc_id);
        }
        self.postings.retain(|_, postings| !postings.is_empty());
    }
}

/// Lowercase and split on non-alphanumeric boundaries. No stemming.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, body: &str) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            url: format!("https://example.com/{id}"),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            visibility: "public".to_string(),
        }
    }

    #[test]
    fn test_tokenize_splits_and_lowercases() {
        assert_eq!(tokenize("Hello, World!"), vec!["hello", "world"]);
        assert_eq!(tokenize("  "), Vec::<String>::new());
        assert_eq!(tokenize("foo-bar_baz 42"), vec!["foo", "bar", "baz", "42"]);
    }

    #[test]
    fn test_search_matches_title_and_body() {
        let mut index = SearchIndex::new();
        index.add(&doc("1", "Hello World", "first post"));
        index.add(&doc("2", "Second Post", "nothing relevant"));

        let hits = index.search("hello");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "1");

        let hits = index.search("post");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_readd_overwrites_instead_of_duplicating() {
        let mut index = SearchIndex::new();
        index.add(&doc("1", "Hello World", "first post"));
        index.add(&doc("1", "Goodbye Moon", "rewritten"));

        assert_eq!(index.len(), 1);
        assert!(index.search("hello").is_empty());
        let hits = index.search("goodbye");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "1");
        assert_eq!(index.meta("1").unwrap().title, "Goodbye Moon");
    }

    #[test]
    fn test_title_terms_outrank_body_terms() {
        let mut index = SearchIndex::new();
        index.add(&doc("title-hit", "Rust ownership", "a short note"));
        index.add(&doc("body-hit", "Weekly digest", "some rust trivia"));

        let hits = index.search("rust");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "title-hit");
    }

    #[test]
    fn test_search_on_empty_index_is_empty() {
        let index = SearchIndex::new();
        assert!(index.search("anything").is_empty());
    }

    #[test]
    fn test_unknown_terms_score_nothing() {
        let mut index = SearchIndex::new();
        index.add(&doc("1", "Hello World", "first post"));
        assert!(index.search("absent").is_empty());
        // Punctuation-only queries tokenize to nothing.
        assert!(index.search("!!! ???").is_empty());
    }

    #[test]
    fn test_json_rehydration_preserves_matches() {
        let mut index = SearchIndex::new();
        index.add(&doc("1", "Hello World", "first post"));
        index.add(&doc("2", "Second Post", "more text"));

        let raw = index.to_json().unwrap();
        let restored = SearchIndex::from_json(&raw).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.search("hello"), index.search("hello"));
        assert_eq!(restored.meta("2").unwrap().url, "https://example.com/2");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(SearchIndex::from_json("not json").is_err());
    }
}
