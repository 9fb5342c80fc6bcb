//! In-memory inverted index with boolean, phrase and ranked retrieval, plus a
//! character k-gram index for wildcard term lookup.

pub mod corpus;
pub mod index;
pub mod kgram;
pub mod pagerank;
pub mod postings;
pub mod query;
pub mod rank;
pub mod search;
pub mod tokenizer;

pub use index::{DocMeta, InvertedIndex};
pub use kgram::{KGramError, KGramIndex, KGramPostingsEntry};
pub use pagerank::PageRankTable;
pub use postings::{PostingsEntry, PostingsError, PostingsList};
pub use query::{DocumentSource, Query, QueryTerm};
pub use search::{QueryType, RankingType, SearchError, Searcher};

pub type DocId = u32;
pub type TermId = u32;
