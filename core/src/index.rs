use crate::corpus::{Corpus, Fragment, FragmentId};
use crate::tokenizer::tokenize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_LIMIT: usize = 10;
/// Each title occurrence counts this many times toward a fragment's score.
pub const TITLE_WEIGHT: usize = 3;

/// A scored search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<'a> {
    pub score: usize,
    pub fragment: &'a Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub fragments: usize,
    pub terms: usize,
    pub postings: usize,
}

/// Term → fragment id postings over an immutable corpus.
///
/// Posting lists repeat a fragment id once per weighted occurrence, so the
/// number of times an id appears is its weight for that term.
#[derive(Debug)]
pub struct InvertedIndex {
    corpus: Arc<Corpus>,
    postings: HashMap<String, Vec<FragmentId>>,
    /// Fragment id → position in the corpus.
    positions: HashMap<FragmentId, usize>,
}

impl InvertedIndex {
    pub fn build(corpus: Arc<Corpus>) -> Self {
        let mut postings: HashMap<String, Vec<FragmentId>> = HashMap::new();
        let mut positions: HashMap<FragmentId, usize> = HashMap::with_capacity(corpus.len());

        for (pos, fragment) in corpus.fragments().iter().enumerate() {
            if positions.insert(fragment.id, pos).is_some() {
                tracing::warn!(id = fragment.id, "duplicate fragment id, later entry wins");
            }
            for term in tokenize(&fragment.title) {
                let list = postings.entry(term).or_default();
                list.extend(std::iter::repeat(fragment.id).take(TITLE_WEIGHT));
            }
            for term in tokenize(&fragment.text) {
                postings.entry(term).or_default().push(fragment.id);
            }
        }

        let index = Self { corpus, postings, positions };
        let stats = index.stats();
        tracing::info!(fragments = stats.fragments, terms = stats.terms, postings = stats.postings, "search index built");
        index
    }

    pub fn corpus(&self) -> &Arc<Corpus> { &self.corpus }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            fragments: self.corpus.len(),
            terms: self.postings.len(),
            postings: self.postings.values().map(Vec::len).sum(),
        }
    }

    /// Posting list for an already-normalized term.
    pub fn postings(&self, term: &str) -> &[FragmentId] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ranked fragments for a free-text query. A `limit` of 0 means the default.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Fragment> {
        self.search_scored(query, limit).into_iter().map(|h| h.fragment).collect()
    }

    /// Like [`search`](Self::search), keeping each hit's score.
    ///
    /// Ordered by score descending, then by shorter fragment, then by id.
    pub fn search_scored(&self, query: &str, limit: usize) -> Vec<Hit<'_>> {
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<FragmentId, usize> = HashMap::new();
        for term in &terms {
            for id in self.postings(term) {
                *scores.entry(*id).or_insert(0) += 1;
            }
        }

        let mut hits: Vec<Hit<'_>> = scores
            .into_iter()
            .filter_map(|(id, score)| {
                let pos = *self.positions.get(&id)?;
                Some(Hit { score, fragment: &self.corpus.fragments()[pos] })
            })
            .collect();
        hits.sort_by_key(|h| (Reverse(h.score), h.fragment.length, h.fragment.id));
        hits.truncate(limit);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(fragments: Vec<Fragment>) -> InvertedIndex {
        InvertedIndex::build(Arc::new(Corpus::new(fragments)))
    }

    #[test]
    fn title_terms_are_weighted() {
        let idx = index(vec![Fragment::new(4, "", "Ode de Português", "salgado", "")]);
        assert!(idx.postings("de").is_empty());
        assert_eq!(idx.postings("ode"), &[4, 4, 4]);
        assert_eq!(idx.postings("português"), &[4, 4, 4]);
        assert_eq!(idx.postings("salgado"), &[4]);
    }

    #[test]
    fn body_repetitions_accumulate() {
        let idx = index(vec![Fragment::new(1, "", "", "tabacaria tabacaria tabacaria", "")]);
        let hits = idx.search_scored("tabacaria", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 3);
    }

    #[test]
    fn repeated_query_terms_count_again() {
        let idx = index(vec![Fragment::new(1, "", "", "noite marítima", "")]);
        assert_eq!(idx.search_scored("marítima marítima", 10)[0].score, 2);
    }

    #[test]
    fn stats_count_weighted_postings() {
        let idx = index(vec![Fragment::new(1, "", "Alma", "alma viva", "")]);
        let stats = idx.stats();
        assert_eq!(stats.fragments, 1);
        assert_eq!(stats.terms, 2);
        assert_eq!(stats.postings, 5);
    }

    #[test]
    fn empty_index_returns_nothing() {
        let idx = index(Vec::new());
        assert!(idx.search("alma", 10).is_empty());
    }
}
