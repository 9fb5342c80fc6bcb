use crate::index::InvertedIndex;
use crate::kgram::{KGramError, KGramIndex};
use crate::pagerank::PageRankTable;
use crate::postings::{PostingsEntry, PostingsList};
use crate::query::{Query, QueryTerm};
use crate::rank::{self, RankContext, DEFAULT_COMBINATION_ALPHA};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Intersection,
    Phrase,
    Ranked,
}

/// Only consulted for `QueryType::Ranked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingType {
    #[default]
    TfIdf,
    #[serde(rename = "pagerank")]
    PageRank,
    Combination,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SearchError {
    #[error("query has no terms")]
    EmptyQuery,
    #[error("term {0:?} is not in the index")]
    UnknownTerm(String),
    #[error("document {0} has no length or name recorded")]
    UnknownDocument(DocId),
    #[error("no pagerank score for document {0:?}")]
    MissingPageRank(String),
    #[error(transparent)]
    KGram(#[from] KGramError),
}

/// Evaluates queries against a built index. Holds no per-query state, so one
/// searcher can serve any number of concurrent readers.
pub struct Searcher<'a> {
    index: &'a InvertedIndex,
    kgram: Option<&'a KGramIndex>,
    pagerank: Arc<PageRankTable>,
    combination_alpha: f64,
}

impl<'a> Searcher<'a> {
    /// The PageRank table may be shared between searchers through an `Arc`.
    pub fn new(index: &'a InvertedIndex, pagerank: impl Into<Arc<PageRankTable>>) -> Self {
        Self { index, kgram: None, pagerank: pagerank.into(), combination_alpha: DEFAULT_COMBINATION_ALPHA }
    }

    pub fn with_kgram_index(mut self, kgram: &'a KGramIndex) -> Self {
        self.kgram = Some(kgram);
        self
    }

    pub fn with_combination_alpha(mut self, alpha: f64) -> Self {
        self.combination_alpha = alpha;
        self
    }

    pub fn index(&self) -> &'a InvertedIndex { self.index }

    pub fn pagerank(&self) -> &PageRankTable { &self.pagerank }

    /// `Ok(None)` only for a single-term boolean query on a term that was never indexed.
    ///
    /// With a k-gram index attached, a term containing `*` stands for every
    /// vocabulary term it matches. Boolean queries treat those matches as
    /// alternatives for one query position; ranked queries score each of them.
    pub fn search(&self, query: &Query, query_type: QueryType, ranking: RankingType) -> Result<Option<PostingsList>, SearchError> {
        let terms: Vec<&str> = query.terms().iter().map(|t| t.term.as_str()).collect();
        tracing::debug!(?query_type, ?ranking, arity = terms.len(), "evaluating query");
        let result = match (query_type, terms.as_slice()) {
            (_, []) => return Err(SearchError::EmptyQuery),
            (QueryType::Intersection | QueryType::Phrase, [term]) => self.lookup(term)?.map(Cow::into_owned),
            (QueryType::Intersection, [first, rest @ ..]) => {
                let mut acc = self.postings(first)?.into_owned();
                for term in rest {
                    acc = intersect(&acc, &*self.postings(term)?);
                }
                Some(acc)
            }
            (QueryType::Phrase, [first, rest @ ..]) => {
                let mut acc = self.postings(first)?.into_owned();
                for term in rest {
                    acc = intersect_phrase(&acc, &*self.postings(term)?);
                }
                Some(acc)
            }
            (QueryType::Ranked, _) => {
                let expanded = self.expand_wildcards(query)?;
                // unseen terms contribute nothing to a ranked query
                let lists: Vec<(&PostingsList, f64)> = expanded
                    .terms()
                    .iter()
                    .filter_map(|qt| self.index.get_postings(&qt.term).map(|list| (list, qt.weight)))
                    .collect();
                let ctx = RankContext { index: self.index, pagerank: &self.pagerank, combination_alpha: self.combination_alpha };
                Some(rank::rank(ranking, &ctx, &lists)?)
            }
        };
        tracing::debug!(hits = ?result.as_ref().map(PostingsList::size), "query evaluated");
        Ok(result)
    }

    /// Replaces every wildcard term with the vocabulary terms it matches, each
    /// keeping the wildcard's weight. Needs a k-gram index; without one the
    /// query is returned unchanged.
    pub fn expand_wildcards(&self, query: &Query) -> Result<Query, SearchError> {
        let Some(kgram) = self.kgram else {
            return Ok(query.clone());
        };
        let mut expanded = Vec::with_capacity(query.terms().len());
        for qt in query.terms() {
            if !qt.term.contains('*') {
                expanded.push(qt.clone());
                continue;
            }
            let matches = kgram.wildcard(&qt.term)?;
            tracing::debug!(pattern = %qt.term, matches = matches.len(), "expanded wildcard");
            expanded.extend(matches.into_iter().map(|term| QueryTerm::new(term, qt.weight)));
        }
        Ok(query.with_terms(expanded))
    }

    /// Postings for one boolean query position. A wildcard yields the union of
    /// the postings of every term it matches, `None` when it matches nothing.
    fn lookup(&self, term: &str) -> Result<Option<Cow<'a, PostingsList>>, SearchError> {
        match self.kgram {
            Some(kgram) if term.contains('*') => {
                let lists: Vec<&PostingsList> =
                    kgram.wildcard(term)?.into_iter().filter_map(|t| self.index.get_postings(t)).collect();
                tracing::debug!(pattern = %term, matches = lists.len(), "wildcard alternatives");
                Ok((!lists.is_empty()).then(|| Cow::Owned(union(&lists))))
            }
            _ => Ok(self.index.get_postings(term).map(Cow::Borrowed)),
        }
    }

    fn postings(&self, term: &str) -> Result<Cow<'a, PostingsList>, SearchError> {
        self.lookup(term)?.ok_or_else(|| SearchError::UnknownTerm(term.to_string()))
    }
}

/// Every document in any of `lists`, by ascending docID, with the offsets of
/// all lists merged in ascending order.
pub fn union(lists: &[&PostingsList]) -> PostingsList {
    let mut merged: BTreeMap<DocId, Vec<u32>> = BTreeMap::new();
    for list in lists {
        for entry in list.iter() {
            merged.entry(entry.doc_id).or_default().extend_from_slice(&entry.offsets);
        }
    }
    merged
        .into_iter()
        .map(|(doc_id, mut offsets)| {
            offsets.sort_unstable();
            offsets.dedup();
            PostingsEntry { doc_id, score: 0.0, offsets }
        })
        .collect()
}

/// Sorted merge by ascending docID keeping documents present in both lists.
/// Entries are taken from `p1`.
pub fn intersect(p1: &PostingsList, p2: &PostingsList) -> PostingsList {
    let (e1, e2) = (p1.entries(), p2.entries());
    let mut result = PostingsList::new();
    let (mut i, mut j) = (0, 0);
    while i < e1.len() && j < e2.len() {
        let (a, b) = (&e1[i], &e2[j]);
        if a.doc_id == b.doc_id {
            result.add_entry(a.clone());
            i += 1;
            j += 1;
        } else if a.doc_id < b.doc_id {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// Like `intersect`, but a document survives only where some offset in `p2`
/// directly follows an offset in `p1`. Surviving entries carry those `p2`
/// offsets, i.e. the end positions of the phrase so far.
pub fn intersect_phrase(p1: &PostingsList, p2: &PostingsList) -> PostingsList {
    let (e1, e2) = (p1.entries(), p2.entries());
    let mut result = PostingsList::new();
    let (mut i, mut j) = (0, 0);
    while i < e1.len() && j < e2.len() {
        let (a, b) = (&e1[i], &e2[j]);
        if a.doc_id == b.doc_id {
            let offsets = adjacent_offsets(&a.offsets, &b.offsets);
            if !offsets.is_empty() {
                result.add_entry(PostingsEntry { doc_id: a.doc_id, score: 0.0, offsets });
            }
            i += 1;
            j += 1;
        } else if a.doc_id < b.doc_id {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// Offsets of `second` that are exactly one past an offset of `first`.
/// Both inputs are expected in ascending order.
fn adjacent_offsets(first: &[u32], second: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < first.len() && j < second.len() {
        let (p1, p2) = (first[i], second[j]);
        if p1.checked_add(1) == Some(p2) {
            out.push(p2);
            i += 1;
            j += 1;
        } else if p1 < p2 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(docs: &[(DocId, &[u32])]) -> PostingsList {
        docs.iter()
            .map(|&(doc_id, offsets)| PostingsEntry { doc_id, score: 0.0, offsets: offsets.to_vec() })
            .collect()
    }

    #[test]
    fn intersect_keeps_common_docs() {
        let a = list(&[(1, &[0]), (3, &[0]), (5, &[0]), (9, &[0])]);
        let b = list(&[(2, &[0]), (3, &[0]), (9, &[0]), (12, &[0])]);
        assert_eq!(intersect(&a, &b).doc_ids(), vec![3, 9]);
        assert_eq!(intersect(&b, &a).doc_ids(), vec![3, 9]);
    }

    #[test]
    fn adjacency_requires_plus_one() {
        assert_eq!(adjacent_offsets(&[0, 5, 9], &[1, 4, 10]), vec![1, 10]);
        assert!(adjacent_offsets(&[3], &[2]).is_empty());
        assert!(adjacent_offsets(&[3], &[5]).is_empty());
    }

    #[test]
    fn adjacency_at_the_top_of_the_offset_range() {
        assert!(adjacent_offsets(&[u32::MAX], &[0]).is_empty());
        assert_eq!(adjacent_offsets(&[u32::MAX - 1], &[u32::MAX]), vec![u32::MAX]);
    }

    #[test]
    fn union_merges_docs_and_offsets() {
        let a = list(&[(1, &[4]), (3, &[0, 6])]);
        let b = list(&[(2, &[1]), (3, &[2, 6])]);
        let out = union(&[&a, &b]);
        assert_eq!(out.doc_ids(), vec![1, 2, 3]);
        assert_eq!(out.lookup_by_doc_id(3).unwrap().offsets, vec![0, 2, 6]);
    }

    #[test]
    fn phrase_drops_non_adjacent_docs() {
        let a = list(&[(1, &[0, 7]), (2, &[4])]);
        let b = list(&[(1, &[8]), (2, &[2])]);
        let out = intersect_phrase(&a, &b);
        assert_eq!(out.doc_ids(), vec![1]);
        assert_eq!(out.get(0).unwrap().offsets, vec![8]);
    }
}
