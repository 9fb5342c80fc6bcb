//! Character k-gram index over the vocabulary.
//!
//! Every term is padded as `^term$` and registered under each contiguous
//! K-character substring of the padded form. Postings are term ids in
//! ascending order, which is what `intersect` relies on.

use crate::TermId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const START_MARKER: char = '^';
pub const END_MARKER: char = '$';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KGramError {
    #[error("k-gram index can't be built for K = {0}")]
    InvalidK(i64),
    #[error("cannot search k-gram index: {found}-gram {gram:?} provided instead of {expected}-gram")]
    GramLengthMismatch { gram: String, expected: usize, found: usize },
    #[error("invalid wildcard pattern {0:?}")]
    InvalidPattern(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KGramPostingsEntry {
    pub token_id: TermId,
}

#[derive(Debug)]
pub struct KGramIndex {
    k: usize,
    id2term: HashMap<TermId, String>,
    term2id: HashMap<String, TermId>,
    index: HashMap<String, Vec<KGramPostingsEntry>>,
    next_id: TermId,
}

impl KGramIndex {
    pub fn new(k: i64) -> Result<Self, KGramError> {
        if k <= 0 {
            return Err(KGramError::InvalidK(k));
        }
        Ok(Self { k: k as usize, id2term: HashMap::new(), term2id: HashMap::new(), index: HashMap::new(), next_id: 0 })
    }

    pub fn k(&self) -> usize { self.k }

    pub fn num_terms(&self) -> usize { self.term2id.len() }

    pub fn num_kgrams(&self) -> usize { self.index.len() }

    pub fn id_by_term(&self, term: &str) -> Option<TermId> { self.term2id.get(term).copied() }

    pub fn term_by_id(&self, id: TermId) -> Option<&str> { self.id2term.get(&id).map(String::as_str) }

    /// Registers `term` under all of its k-grams. Known terms are left untouched.
    pub fn insert(&mut self, term: &str) {
        if self.term2id.contains_key(term) {
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.term2id.insert(term.to_string(), id);
        self.id2term.insert(id, term.to_string());

        let entry = KGramPostingsEntry { token_id: id };
        for gram in kgrams(&padded(term), self.k) {
            let list = self.index.entry(gram).or_default();
            // ids grow monotonically, so a repeat gram of this term can only sit at the tail
            if list.last() != Some(&entry) {
                list.push(entry);
            }
        }
    }

    pub fn get_postings(&self, kgram: &str) -> Option<&[KGramPostingsEntry]> {
        self.index.get(kgram).map(Vec::as_slice)
    }

    /// Two-pointer merge of id-sorted lists. Stops as soon as either side runs out.
    pub fn intersect(&self, p1: &[KGramPostingsEntry], p2: &[KGramPostingsEntry]) -> Vec<KGramPostingsEntry> {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < p1.len() && j < p2.len() {
            let (a, b) = (p1[i].token_id, p2[j].token_id);
            if a == b {
                result.push(p1[i]);
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }
        result
    }

    /// Intersects the postings of every gram. Each gram must be exactly K characters;
    /// a gram that was never indexed empties the result.
    pub fn search<S: AsRef<str>>(&self, grams: &[S]) -> Result<Vec<KGramPostingsEntry>, KGramError> {
        let mut postings: Option<Vec<KGramPostingsEntry>> = None;
        for gram in grams {
            let gram = gram.as_ref();
            let found = gram.chars().count();
            if found != self.k {
                return Err(KGramError::GramLengthMismatch { gram: gram.to_string(), expected: self.k, found });
            }
            let next = self.get_postings(gram).unwrap_or(&[]);
            postings = Some(match postings {
                None => next.to_vec(),
                Some(acc) => self.intersect(&acc, next),
            });
        }
        Ok(postings.unwrap_or_default())
    }

    /// Convenience over `search` for a space separated gram string such as `"ab bc"`.
    pub fn search_str(&self, grams: &str) -> Result<Vec<KGramPostingsEntry>, KGramError> {
        let grams: Vec<&str> = grams.split_whitespace().collect();
        self.search(grams.as_slice())
    }

    /// Vocabulary terms matching a `*` wildcard pattern, sorted by term id.
    ///
    /// Candidates come from intersecting the k-grams of the padded literal
    /// segments; an anchored regex removes false positives such as grams that
    /// appear in the wrong order.
    pub fn wildcard(&self, pattern: &str) -> Result<Vec<&str>, KGramError> {
        let padded_pattern = padded(pattern);
        let mut grams: Vec<String> = Vec::new();
        for segment in padded_pattern.split('*') {
            for gram in kgrams(segment, self.k) {
                if !grams.contains(&gram) {
                    grams.push(gram);
                }
            }
        }

        let candidates: Vec<TermId> = if grams.is_empty() {
            // pattern too short to yield a full gram, fall back to the whole vocabulary
            let mut ids: Vec<TermId> = self.id2term.keys().copied().collect();
            ids.sort_unstable();
            ids
        } else {
            self.search(grams.as_slice())?.into_iter().map(|e| e.token_id).collect()
        };

        let re = wildcard_regex(pattern)?;
        Ok(candidates
            .into_iter()
            .filter_map(|id| self.term_by_id(id))
            .filter(|term| re.is_match(term))
            .collect())
    }
}

fn padded(term: &str) -> String {
    let mut s = String::with_capacity(term.len() + 2);
    s.push(START_MARKER);
    s.push_str(term);
    s.push(END_MARKER);
    s
}

/// Contiguous k-character windows of `s`; empty when `s` is shorter than k.
fn kgrams(s: &str, k: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < k {
        return Vec::new();
    }
    chars.windows(k).map(|w| w.iter().collect()).collect()
}

fn wildcard_regex(pattern: &str) -> Result<Regex, KGramError> {
    let body = pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
    Regex::new(&format!("^{body}$")).map_err(|_| KGramError::InvalidPattern(pattern.to_string()))
}
