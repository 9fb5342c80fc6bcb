use crate::postings::PostingsList;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default weight of the original query terms during relevance feedback.
pub const DEFAULT_FEEDBACK_ALPHA: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTerm {
    pub term: String,
    pub weight: f64,
}

impl QueryTerm {
    pub fn new(term: impl Into<String>, weight: f64) -> Self { Self { term: term.into(), weight } }
}

/// Access to document contents for relevance feedback.
pub trait DocumentSource {
    /// The terms of `doc_id` as the tokenizer emits them, repeats included.
    fn document_terms(&self, doc_id: DocId) -> anyhow::Result<Vec<String>>;
}

/// A weighted bag of terms. `Clone` gives an independent deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    terms: Vec<QueryTerm>,
    alpha: f64,
}

impl Default for Query {
    fn default() -> Self { Self { terms: Vec::new(), alpha: DEFAULT_FEEDBACK_ALPHA } }
}

impl Query {
    pub fn new() -> Self { Self::default() }

    /// Whitespace separated terms, each with weight 1.0.
    pub fn parse(text: &str) -> Self {
        Self { terms: text.split_whitespace().map(|t| QueryTerm::new(t, 1.0)).collect(), ..Self::default() }
    }

    /// Sets the feedback α (original-query weight); β is always `1 - α`.
    pub fn with_feedback_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Same feedback settings, different terms.
    pub fn with_terms(&self, terms: Vec<QueryTerm>) -> Self { Self { terms, alpha: self.alpha } }

    pub fn push(&mut self, term: impl Into<String>, weight: f64) { self.terms.push(QueryTerm::new(term, weight)); }

    pub fn terms(&self) -> &[QueryTerm] { &self.terms }

    pub fn alpha(&self) -> f64 { self.alpha }

    pub fn beta(&self) -> f64 { 1.0 - self.alpha }

    /// Number of terms.
    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Manhattan length of the weight vector.
    pub fn length(&self) -> f64 { self.terms.iter().map(|t| t.weight).sum() }

    pub fn weight(&self, term: &str) -> Option<f64> { self.terms.iter().find(|t| t.term == term).map(|t| t.weight) }

    /// Rocchio-style update from user judgements.
    ///
    /// `relevant[i]` marks `results.get(i)`. Every original weight is scaled by
    /// α, then each relevant document adds β·tf/|relevant| for every term it
    /// contains. Flags past the end of `results` are ignored. Documents that
    /// cannot be read are skipped but still count towards |relevant|.
    pub fn relevance_feedback(&mut self, results: &PostingsList, relevant: &[bool], corpus: &dyn DocumentSource) {
        let judged: Vec<DocId> = results
            .iter()
            .zip(relevant)
            .filter(|(_, is_relevant)| **is_relevant)
            .map(|(entry, _)| entry.doc_id)
            .collect();

        let mut order: Vec<String> = Vec::with_capacity(self.terms.len());
        let mut weights: HashMap<String, f64> = HashMap::new();
        for qt in &self.terms {
            let scaled = qt.weight * self.alpha;
            match weights.get_mut(&qt.term) {
                Some(w) => *w += scaled,
                None => {
                    order.push(qt.term.clone());
                    weights.insert(qt.term.clone(), scaled);
                }
            }
        }

        let relevant_docs = judged.len() as f64;
        let beta = self.beta();
        for doc_id in judged {
            let terms = match corpus.document_terms(doc_id) {
                Ok(terms) => terms,
                Err(err) => {
                    tracing::warn!(doc_id, error = %err, "skipping unreadable feedback document");
                    continue;
                }
            };
            let mut tf: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *tf.entry(term).or_insert(0) += 1;
            }
            // stable order for newly discovered terms
            let mut doc_terms: Vec<(String, u32)> = tf.into_iter().collect();
            doc_terms.sort_by(|a, b| a.0.cmp(&b.0));
            for (term, count) in doc_terms {
                let delta = beta * count as f64 / relevant_docs;
                match weights.get_mut(&term) {
                    Some(w) => *w += delta,
                    None => {
                        order.push(term.clone());
                        weights.insert(term, delta);
                    }
                }
            }
        }

        self.terms = order
            .into_iter()
            .map(|term| {
                let weight = weights.get(&term).copied().unwrap_or_default();
                QueryTerm { term, weight }
            })
            .collect();
        tracing::debug!(terms = self.terms.len(), "query updated from relevance feedback");
    }
}
