use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PostingsError {
    #[error("postings index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// One document's match for one term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingsEntry {
    pub doc_id: DocId,
    pub score: f64,
    /// Token positions in insertion order.
    pub offsets: Vec<u32>,
}

impl PostingsEntry {
    pub fn new(doc_id: DocId) -> Self {
        Self { doc_id, score: 0.0, offsets: Vec::new() }
    }

    pub fn with_score(doc_id: DocId, score: f64) -> Self {
        Self { doc_id, score, offsets: Vec::new() }
    }

    pub fn add_offset(&mut self, offset: u32) { self.offsets.push(offset); }

    /// Term frequency within the document.
    pub fn tf(&self) -> usize { self.offsets.len() }
}

/// Ordered, docID-unique sequence of postings with an O(1) docID lookup.
///
/// Entries are appended in ascending docID order while the index is built;
/// ranking may later reorder them by descending score. The lookup maps a docID
/// to the entry's current position and is rebuilt whenever the order changes.
#[derive(Debug, Clone, Default)]
pub struct PostingsList {
    entries: Vec<PostingsEntry>,
    lookup: HashMap<DocId, usize>,
}

impl PostingsList {
    pub fn new() -> Self { Self::default() }

    pub fn size(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, i: usize) -> Result<&PostingsEntry, PostingsError> {
        self.entries.get(i).ok_or(PostingsError::IndexOutOfRange { index: i, len: self.entries.len() })
    }

    pub fn entries(&self) -> &[PostingsEntry] { &self.entries }

    pub fn iter(&self) -> std::slice::Iter<'_, PostingsEntry> { self.entries.iter() }

    pub fn doc_ids(&self) -> Vec<DocId> { self.entries.iter().map(|e| e.doc_id).collect() }

    /// Appends `entry`. The caller must check `lookup_by_doc_id` first; a list
    /// never holds two entries for the same document.
    pub fn add_entry(&mut self, entry: PostingsEntry) {
        debug_assert!(!self.lookup.contains_key(&entry.doc_id), "duplicate doc_id {}", entry.doc_id);
        self.lookup.insert(entry.doc_id, self.entries.len());
        self.entries.push(entry);
    }

    pub fn lookup_by_doc_id(&self, doc_id: DocId) -> Option<&PostingsEntry> {
        self.lookup.get(&doc_id).map(|&i| &self.entries[i])
    }

    pub fn lookup_by_doc_id_mut(&mut self, doc_id: DocId) -> Option<&mut PostingsEntry> {
        match self.lookup.get(&doc_id) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    /// Stable sort by descending score; equal scores keep their relative order.
    pub fn sort_by_score_descending(&mut self) {
        self.entries
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        self.reindex();
    }

    /// Drops an entry whose docID equals its immediate predecessor's.
    ///
    /// Only collapses runs, so it is a full dedup only on a docID-sorted list.
    pub fn deduplicate_adjacent(&mut self) {
        self.entries.dedup_by_key(|e| e.doc_id);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.lookup = self.entries.iter().enumerate().map(|(i, e)| (e.doc_id, i)).collect();
    }
}

impl FromIterator<PostingsEntry> for PostingsList {
    fn from_iter<I: IntoIterator<Item = PostingsEntry>>(iter: I) -> Self {
        let mut list = PostingsList::new();
        for entry in iter {
            list.add_entry(entry);
        }
        list
    }
}

impl<'a> IntoIterator for &'a PostingsList {
    type Item = &'a PostingsEntry;
    type IntoIter = std::slice::Iter<'a, PostingsEntry>;
    fn into_iter(self) -> Self::IntoIter { self.entries.iter() }
}
