use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Precomputed PageRank scores keyed by document file name.
#[derive(Debug, Clone, Default)]
pub struct PageRankTable {
    scores: HashMap<String, f64>,
}

impl PageRankTable {
    pub fn new() -> Self { Self::default() }

    /// Loads `name=score` lines. An unreadable file is logged and yields an empty table.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                let table = Self::parse(&text);
                tracing::info!(path = %path.display(), entries = table.len(), "loaded pagerank scores");
                table
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read pagerank file");
                Self::default()
            }
        }
    }

    /// Lines that are not exactly `name=score` with a numeric score are skipped.
    pub fn parse(text: &str) -> Self {
        let mut scores = HashMap::new();
        for line in text.lines() {
            let parts: Vec<&str> = line.split('=').collect();
            if parts.len() != 2 { continue; }
            if let Ok(score) = parts[1].trim().parse::<f64>() {
                scores.insert(parts[0].trim().to_string(), score);
            }
        }
        Self { scores }
    }

    pub fn insert(&mut self, name: impl Into<String>, score: f64) { self.scores.insert(name.into(), score); }

    /// Score for a document path; only its last `/` segment is used as the key.
    pub fn score_for_path(&self, path: &str) -> Option<f64> {
        self.scores.get(file_name(path)).copied()
    }

    pub fn len(&self) -> usize { self.scores.len() }

    pub fn is_empty(&self) -> bool { self.scores.is_empty() }
}

pub fn file_name(path: &str) -> &str { path.rsplit('/').next().unwrap_or(path) }
