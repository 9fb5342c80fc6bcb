use crate::index::InvertedIndex;
use crate::kgram::KGramIndex;
use crate::query::{DocumentSource, Query};
use crate::tokenizer::{tokenize, TokenizerConfig};
use crate::DocId;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

/// Indexes built from one corpus directory.
pub struct Corpus {
    pub index: InvertedIndex,
    pub kgram: Option<KGramIndex>,
    pub tokenizer: TokenizerConfig,
}

/// Builds the inverted index (and a k-gram index when `kgram_k` is given)
/// from every regular file under `root`.
///
/// Files are visited in sorted path order and numbered from 0, so a corpus
/// always gets the same docIDs. Unreadable or non UTF-8 files are skipped.
pub fn build_from_dir<P: AsRef<Path>>(root: P, tokenizer: TokenizerConfig, kgram_k: Option<i64>) -> Result<Corpus> {
    let root = root.as_ref();
    if !root.exists() {
        anyhow::bail!("corpus path {} does not exist", root.display());
    }
    let mut kgram = kgram_k.map(KGramIndex::new).transpose().context("building k-gram index")?;
    let mut index = InvertedIndex::new();

    let mut files: Vec<PathBuf> = Vec::new();
    if root.is_dir() {
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    } else {
        files.push(root.to_path_buf());
    }

    let mut next_doc_id: DocId = 0;
    for file in files {
        let text = match fs::read_to_string(&file) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "skipping unreadable document");
                continue;
            }
        };
        if index_document(&mut index, kgram.as_mut(), next_doc_id, &file.to_string_lossy(), &text, &tokenizer) {
            next_doc_id += 1;
        }
    }

    tracing::info!(
        num_docs = index.num_docs(),
        num_terms = index.num_terms(),
        num_kgrams = ?kgram.as_ref().map(KGramIndex::num_kgrams),
        "corpus indexed"
    );
    Ok(Corpus { index, kgram, tokenizer })
}

/// Tokenizes `text` and feeds every term to the indexes under `doc_id`.
/// Returns `false`, leaving the indexes untouched, when the document has more
/// tokens than a length can record.
pub fn index_document(
    index: &mut InvertedIndex,
    mut kgram: Option<&mut KGramIndex>,
    doc_id: DocId,
    name: &str,
    text: &str,
    tokenizer: &TokenizerConfig,
) -> bool {
    let tokens = tokenize(text, tokenizer);
    let Some(length) = document_length(tokens.len()) else {
        tracing::warn!(document = name, tokens = tokens.len(), "skipping document too long to index");
        return false;
    };
    for (term, pos) in &tokens {
        index.insert(term, doc_id, *pos);
        if let Some(kg) = kgram.as_deref_mut() {
            kg.insert(term);
        }
    }
    index.register_document(doc_id, name, length);
    true
}

fn document_length(tokens: usize) -> Option<u32> { u32::try_from(tokens).ok() }

impl Corpus {
    /// Turns query text into terms the way documents were tokenized, so case
    /// and stemming line up with the index. Wildcard terms are only NFKC
    /// normalized and lowercased; stemming would mangle the pattern.
    pub fn parse_query(&self, text: &str) -> Query {
        let mut query = Query::new();
        for word in text.split_whitespace() {
            if word.contains('*') {
                query.push(word.nfkc().collect::<String>().to_lowercase(), 1.0);
            } else {
                for (term, _) in tokenize(word, &self.tokenizer) {
                    query.push(term, 1.0);
                }
            }
        }
        query
    }

    /// Re-reads documents from the paths recorded in the index.
    pub fn documents(&self) -> FileDocuments<'_> {
        FileDocuments { index: &self.index, tokenizer: self.tokenizer }
    }
}

pub struct FileDocuments<'a> {
    pub index: &'a InvertedIndex,
    pub tokenizer: TokenizerConfig,
}

impl DocumentSource for FileDocuments<'_> {
    fn document_terms(&self, doc_id: DocId) -> Result<Vec<String>> {
        let path = self.index.document_name(doc_id).with_context(|| format!("unknown document {doc_id}"))?;
        let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        Ok(tokenize(&text, &self.tokenizer).into_iter().map(|(term, _)| term).collect())
    }
}
