//! Ranking strategies for ranked queries.
//!
//! Each strategy is a pure function from the query terms' postings and corpus
//! statistics to a fresh, score-sorted `PostingsList`. Scores of documents that
//! are reached through several terms are merged in a `ScoreAccumulator`, which
//! makes the per-strategy merge policy explicit.

use crate::index::InvertedIndex;
use crate::pagerank::PageRankTable;
use crate::postings::{PostingsEntry, PostingsList};
use crate::search::{RankingType, SearchError};
use crate::DocId;
use std::collections::HashMap;

/// Weight of tf-idf in the combined score; PageRank gets `1 - alpha`.
pub const DEFAULT_COMBINATION_ALPHA: f64 = 0.01;

/// Read-only inputs shared by all strategies.
pub struct RankContext<'a> {
    pub index: &'a InvertedIndex,
    pub pagerank: &'a PageRankTable,
    pub combination_alpha: f64,
}

/// docID → score, remembering first-seen order so ties sort deterministically.
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    order: Vec<DocId>,
    scores: HashMap<DocId, f64>,
}

impl ScoreAccumulator {
    pub fn new() -> Self { Self::default() }

    /// Adds `score` to whatever the document already has.
    pub fn add(&mut self, doc_id: DocId, score: f64) {
        match self.scores.get_mut(&doc_id) {
            Some(s) => *s += score,
            None => {
                self.order.push(doc_id);
                self.scores.insert(doc_id, score);
            }
        }
    }

    /// Keeps the first score recorded for a document; returns whether it was new.
    pub fn insert_once(&mut self, doc_id: DocId, score: f64) -> bool {
        if self.scores.contains_key(&doc_id) {
            return false;
        }
        self.order.push(doc_id);
        self.scores.insert(doc_id, score);
        true
    }

    pub fn contains(&self, doc_id: DocId) -> bool { self.scores.contains_key(&doc_id) }

    pub fn score(&self, doc_id: DocId) -> Option<f64> { self.scores.get(&doc_id).copied() }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn into_postings(self) -> PostingsList {
        let ScoreAccumulator { order, scores } = self;
        let mut list: PostingsList = order
            .into_iter()
            .map(|doc_id| PostingsEntry::with_score(doc_id, scores.get(&doc_id).copied().unwrap_or_default()))
            .collect();
        list.sort_by_score_descending();
        list
    }
}

/// Length-normalized tf-idf: `tf * ln(n / df) / doc_len`.
pub fn tf_idf(tf: usize, df: usize, n: usize, doc_len: u32) -> f64 {
    let idf = (n as f64 / df as f64).ln();
    (tf as f64 * idf) / doc_len as f64
}

/// One query term's postings and its query weight.
pub type WeightedPostings<'a> = (&'a PostingsList, f64);

pub fn rank(ranking: RankingType, ctx: &RankContext<'_>, lists: &[WeightedPostings<'_>]) -> Result<PostingsList, SearchError> {
    match ranking {
        RankingType::TfIdf => rank_tf_idf(ctx, lists),
        RankingType::PageRank => rank_pagerank(ctx, lists),
        RankingType::Combination => rank_combination(ctx, lists),
    }
}

/// A single term keeps its entries (offsets included); several terms sum their
/// scores. Each term's contribution is scaled by its query weight.
pub fn rank_tf_idf(ctx: &RankContext<'_>, lists: &[WeightedPostings<'_>]) -> Result<PostingsList, SearchError> {
    if let [(list, weight)] = lists {
        let mut scored = PostingsList::new();
        for (entry, score) in list.iter().zip(term_scores(ctx.index, list)?) {
            let mut entry = entry.clone();
            entry.score = score * weight;
            scored.add_entry(entry);
        }
        scored.sort_by_score_descending();
        return Ok(scored);
    }

    let mut acc = ScoreAccumulator::new();
    for (list, weight) in lists {
        for (entry, score) in list.iter().zip(term_scores(ctx.index, list)?) {
            acc.add(entry.doc_id, score * weight);
        }
    }
    Ok(acc.into_postings())
}

/// Each matching document counts once with its PageRank as the whole score.
/// Documents missing from the table are left out.
pub fn rank_pagerank(ctx: &RankContext<'_>, lists: &[WeightedPostings<'_>]) -> Result<PostingsList, SearchError> {
    let mut acc = ScoreAccumulator::new();
    let mut missing = 0usize;
    for (list, _) in lists {
        for entry in list.iter() {
            if acc.contains(entry.doc_id) {
                continue;
            }
            // an unknown document is an index fault, a missing score only drops the hit
            let name = document_name(ctx, entry.doc_id)?;
            match ctx.pagerank.score_for_path(name) {
                Some(score) => {
                    acc.insert_once(entry.doc_id, score);
                }
                None => missing += 1,
            }
        }
    }
    if missing > 0 {
        tracing::debug!(missing, "documents without pagerank score skipped");
    }
    Ok(acc.into_postings())
}

/// `alpha * tfidf + (1 - alpha) * pagerank`, summed over every term that reaches
/// the document, so more matching terms mean a higher score.
pub fn rank_combination(ctx: &RankContext<'_>, lists: &[WeightedPostings<'_>]) -> Result<PostingsList, SearchError> {
    let alpha = ctx.combination_alpha;
    let mut acc = ScoreAccumulator::new();
    for (list, _) in lists {
        for (entry, tfidf) in list.iter().zip(term_scores(ctx.index, list)?) {
            let pr = page_rank(ctx, entry.doc_id)?;
            acc.add(entry.doc_id, alpha * tfidf + (1.0 - alpha) * pr);
        }
    }
    Ok(acc.into_postings())
}

/// tf-idf of every entry in one term's postings, in list order.
fn term_scores(index: &InvertedIndex, list: &PostingsList) -> Result<Vec<f64>, SearchError> {
    let n = index.num_docs();
    let df = list.size();
    list.iter()
        .map(|entry| match index.document_length(entry.doc_id) {
            Some(len) if len > 0 => Ok(tf_idf(entry.tf(), df, n, len)),
            _ => Err(SearchError::UnknownDocument(entry.doc_id)),
        })
        .collect()
}

fn document_name<'i>(ctx: &RankContext<'i>, doc_id: DocId) -> Result<&'i str, SearchError> {
    ctx.index.document_name(doc_id).ok_or(SearchError::UnknownDocument(doc_id))
}

fn page_rank(ctx: &RankContext<'_>, doc_id: DocId) -> Result<f64, SearchError> {
    let name = document_name(ctx, doc_id)?;
    ctx.pagerank
        .score_for_path(name)
        .ok_or_else(|| SearchError::MissingPageRank(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tf_idf_formula() {
        let expected = (3.0 * (10.0f64 / 2.0).ln()) / 50.0;
        assert!((tf_idf(3, 2, 10, 50) - expected).abs() < 1e-9);
        // term in every document carries no weight
        assert_eq!(tf_idf(4, 10, 10, 7), 0.0);
    }

    #[test]
    fn accumulator_adds() {
        let mut acc = ScoreAccumulator::new();
        acc.add(1, 0.5);
        acc.add(2, 0.1);
        acc.add(1, 0.25);
        assert_eq!(acc.score(1), Some(0.75));
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn accumulator_insert_once_keeps_first() {
        let mut acc = ScoreAccumulator::new();
        assert!(acc.insert_once(4, 0.2));
        assert!(!acc.insert_once(4, 0.9));
        assert_eq!(acc.score(4), Some(0.2));
    }

    #[test]
    fn accumulator_sorts_descending_ties_first_seen() {
        let mut acc = ScoreAccumulator::new();
        acc.add(9, 0.1);
        acc.add(3, 0.5);
        acc.add(5, 0.1);
        let list = acc.into_postings();
        assert_eq!(list.doc_ids(), vec![3, 9, 5]);
        assert_eq!(list.lookup_by_doc_id(5).map(|e| e.score), Some(0.1));
    }

    #[test]
    fn pagerank_skips_missing_scores_but_rejects_unknown_documents() {
        let mut index = InvertedIndex::new();
        index.insert("x", 0, 0);
        index.insert("x", 1, 0);
        index.register_document(0, "docs/a.txt", 1);
        index.register_document(1, "docs/b.txt", 1);
        let mut pagerank = PageRankTable::new();
        pagerank.insert("b.txt", 0.4);
        let ctx = RankContext { index: &index, pagerank: &pagerank, combination_alpha: DEFAULT_COMBINATION_ALPHA };

        let list = index.get_postings("x").unwrap();
        assert_eq!(rank_pagerank(&ctx, &[(list, 1.0)]).unwrap().doc_ids(), vec![1]);

        index.insert("y", 2, 0);
        let ctx = RankContext { index: &index, pagerank: &pagerank, combination_alpha: DEFAULT_COMBINATION_ALPHA };
        let list = index.get_postings("y").unwrap();
        assert_eq!(rank_pagerank(&ctx, &[(list, 1.0)]).unwrap_err(), SearchError::UnknownDocument(2));
    }
}
