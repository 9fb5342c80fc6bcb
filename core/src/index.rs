use crate::postings::{PostingsEntry, PostingsList};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    /// Path the document was read from; its last segment keys the PageRank table.
    pub name: String,
    /// Number of tokens in the document.
    pub length: u32,
}

/// Term → postings map plus per-document metadata.
///
/// Built once by a single writer, then shared read-only by searchers.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingsList>,
    docs: HashMap<DocId, DocMeta>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Records one occurrence of `term` at `offset` in `doc_id`.
    ///
    /// Offsets accumulate in call order, so out-of-order positions are kept as given.
    pub fn insert(&mut self, term: &str, doc_id: DocId, offset: u32) {
        let mut fresh = PostingsEntry::new(doc_id);
        fresh.add_offset(offset);
        if let Some(list) = self.postings.get_mut(term) {
            match list.lookup_by_doc_id_mut(doc_id) {
                Some(entry) => entry.add_offset(offset),
                None => list.add_entry(fresh),
            }
            return;
        }
        let mut list = PostingsList::new();
        list.add_entry(fresh);
        self.postings.insert(term.to_string(), list);
    }

    /// `None` means the term was never indexed, as opposed to an empty match set.
    pub fn get_postings(&self, term: &str) -> Option<&PostingsList> { self.postings.get(term) }

    pub fn register_document(&mut self, doc_id: DocId, name: impl Into<String>, length: u32) {
        self.docs.insert(doc_id, DocMeta { name: name.into(), length });
    }

    pub fn document_length(&self, doc_id: DocId) -> Option<u32> { self.docs.get(&doc_id).map(|d| d.length) }

    pub fn document_name(&self, doc_id: DocId) -> Option<&str> { self.docs.get(&doc_id).map(|d| d.name.as_str()) }

    pub fn document(&self, doc_id: DocId) -> Option<&DocMeta> { self.docs.get(&doc_id) }

    /// Corpus size N used by idf.
    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn terms(&self) -> impl Iterator<Item = &str> { self.postings.keys().map(String::as_str) }
}
