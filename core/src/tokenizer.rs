use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","did","do","does","doing","down","during",
            "each","few","for","from","further","had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself","me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very","was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Term normalization applied on top of NFKC + lowercasing.
///
/// The default keeps every word unstemmed so phrase queries see the text as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenizerConfig {
    pub stem: bool,
    pub remove_stopwords: bool,
}

impl TokenizerConfig {
    pub fn stemmed() -> Self { Self { stem: true, remove_stopwords: true } }
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into (term, position). Positions count emitted tokens only,
/// so dropped stopwords leave no gap between their neighbours.
pub fn tokenize(text: &str, config: &TokenizerConfig) -> Vec<(String, u32)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    let mut pos = 0u32;
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if config.remove_stopwords && is_stopword(token) { continue; }
        let term = if config.stem { STEMMER.stem(token).to_string() } else { token.to_string() };
        tokens.push((term, pos));
        pos += 1;
    }
    tokens
}
