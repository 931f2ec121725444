use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("valid pattern"));

/// Per-project inverted keyword index: term -> ids holding that term.
/// The reverse map (id -> terms) makes removal cheap.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    index: HashMap<String, HashSet<String>>,
    segment_terms: HashMap<String, HashSet<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, segment_id: &str, text: &str) {
        let terms = tokenize(text);
        for term in &terms {
            self.index
                .entry(term.clone())
                .or_default()
                .insert(segment_id.to_string());
        }
        self.segment_terms.insert(segment_id.to_string(), terms);
    }

    pub fn remove(&mut self, segment_id: &str) {
        let Some(terms) = self.segment_terms.remove(segment_id) else {
            return;
        };
        for term in terms {
            if let Some(ids) = self.index.get_mut(&term) {
                ids.remove(segment_id);
                if ids.is_empty() {
                    self.index.remove(&term);
                }
            }
        }
    }

    /// Conjunctive term search: ids containing every term of the query.
    /// An empty query yields the empty set.
    pub fn search(&self, query: &str) -> HashSet<String> {
        let terms = tokenize(query);
        let mut terms = terms.into_iter();
        let Some(first) = terms.next() else {
            return HashSet::new();
        };

        let mut result = self.index.get(&first).cloned().unwrap_or_default();
        for term in terms {
            if result.is_empty() {
                break;
            }
            match self.index.get(&term) {
                Some(ids) => result.retain(|id| ids.contains(id)),
                None => result.clear(),
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.segment_terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segment_terms.len()
    }
}

/// Lowercased unique word terms of a text.
fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    WORD_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}
