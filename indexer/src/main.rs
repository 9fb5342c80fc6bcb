use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ranksearch_core::corpus::{build_from_dir, index_document, Corpus};
use ranksearch_core::rank::DEFAULT_COMBINATION_ALPHA;
use ranksearch_core::tokenizer::TokenizerConfig;
use ranksearch_core::{InvertedIndex, KGramIndex, PageRankTable, PostingsList, Query, QueryType, RankingType, Searcher};
use std::fs;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ranksearch")]
#[command(about = "Boolean, phrase and ranked search over a document directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum QueryKind {
    Intersection,
    Phrase,
    Ranked,
}

#[derive(Clone, Copy, ValueEnum)]
enum Ranking {
    TfIdf,
    Pagerank,
    Combination,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a corpus directory and run one query against it
    Search {
        /// Corpus directory (every regular file is a document)
        #[arg(long)]
        corpus: String,
        /// Whitespace separated query terms; `*` marks a wildcard term
        #[arg(long)]
        query: String,
        #[arg(long = "type", value_enum, default_value_t = QueryKind::Intersection)]
        query_type: QueryKind,
        #[arg(long, value_enum, default_value_t = Ranking::TfIdf)]
        ranking: Ranking,
        /// File of `name=score` lines
        #[arg(long)]
        pagerank: Option<String>,
        /// Weight of tf-idf in combination ranking
        #[arg(long, default_value_t = DEFAULT_COMBINATION_ALPHA)]
        alpha: f64,
        /// K-gram length for wildcard expansion
        #[arg(long, default_value_t = 2)]
        k: i64,
        /// Stem terms and drop stopwords
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Ranks of relevant results (0-based); reruns the query after relevance feedback
        #[arg(long, value_delimiter = ',')]
        feedback: Vec<usize>,
        /// Weight of the original query terms during relevance feedback
        #[arg(long, default_value_t = 0.2)]
        feedback_alpha: f64,
    },
    /// Build a k-gram index over one file and intersect the given grams
    Kgram {
        #[arg(long)]
        file: String,
        #[arg(long, default_value_t = 3)]
        k: i64,
        /// Space separated k-grams, e.g. "ve th he"
        #[arg(long)]
        kgram: Option<String>,
        /// Wildcard pattern such as "th*r"
        #[arg(long)]
        wildcard: Option<String>,
    },
    /// Print corpus statistics
    Stats {
        #[arg(long)]
        corpus: String,
        #[arg(long, default_value_t = 2)]
        k: i64,
    },
}

impl From<QueryKind> for QueryType {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Intersection => QueryType::Intersection,
            QueryKind::Phrase => QueryType::Phrase,
            QueryKind::Ranked => QueryType::Ranked,
        }
    }
}

impl From<Ranking> for RankingType {
    fn from(ranking: Ranking) -> Self {
        match ranking {
            Ranking::TfIdf => RankingType::TfIdf,
            Ranking::Pagerank => RankingType::PageRank,
            Ranking::Combination => RankingType::Combination,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { corpus, query, query_type, ranking, pagerank, alpha, k, stem, limit, feedback, feedback_alpha } => {
            let tokenizer = if stem { TokenizerConfig::stemmed() } else { TokenizerConfig::default() };
            let corpus = build_from_dir(&corpus, tokenizer, Some(k))?;
            tracing::info!(docs = corpus.index.num_docs(), terms = corpus.index.num_terms(), "corpus ready");
            let query = corpus.parse_query(&query).with_feedback_alpha(feedback_alpha);
            let opts = SearchOpts { query_type: query_type.into(), ranking: ranking.into(), pagerank, alpha, limit, feedback };
            run_search(&corpus, query, &opts)
        }
        Commands::Kgram { file, k, kgram, wildcard } => run_kgram(&file, k, kgram.as_deref(), wildcard.as_deref()),
        Commands::Stats { corpus, k } => {
            let corpus = build_from_dir(&corpus, TokenizerConfig::default(), Some(k))?;
            let stats = serde_json::json!({
                "num_docs": corpus.index.num_docs(),
                "num_terms": corpus.index.num_terms(),
                "num_kgrams": corpus.kgram.as_ref().map(KGramIndex::num_kgrams),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

struct SearchOpts {
    query_type: QueryType,
    ranking: RankingType,
    pagerank: Option<String>,
    alpha: f64,
    limit: usize,
    feedback: Vec<usize>,
}

fn run_search(corpus: &Corpus, query: Query, opts: &SearchOpts) -> Result<()> {
    let pagerank = opts.pagerank.as_ref().map(PageRankTable::load).unwrap_or_default();
    let mut searcher = Searcher::new(&corpus.index, pagerank).with_combination_alpha(opts.alpha);
    if let Some(kgram) = &corpus.kgram {
        searcher = searcher.with_kgram_index(kgram);
    }

    let start = Instant::now();
    let results = searcher.search(&query, opts.query_type, opts.ranking)?;
    tracing::info!(hits = ?results.as_ref().map(PostingsList::size), took_ms = start.elapsed().as_millis() as u64, "query evaluated");
    print_results(&corpus.index, &query, results.as_ref(), opts.limit);

    if opts.feedback.is_empty() {
        return Ok(());
    }
    let Some(results) = results else {
        anyhow::bail!("no results to give feedback on");
    };
    let mut relevant = vec![false; results.size()];
    for &rank in &opts.feedback {
        let flag = relevant.get_mut(rank).with_context(|| format!("feedback rank {rank} is past the {} results", results.size()))?;
        *flag = true;
    }
    let mut query = searcher.expand_wildcards(&query)?;
    query.relevance_feedback(&results, &relevant, &corpus.documents());
    let start = Instant::now();
    let results = searcher.search(&query, QueryType::Ranked, opts.ranking)?;
    tracing::info!(terms = query.len(), took_ms = start.elapsed().as_millis() as u64, "feedback query evaluated");
    println!();
    print_results(&corpus.index, &query, results.as_ref(), opts.limit);
    Ok(())
}

fn print_results(index: &InvertedIndex, query: &Query, results: Option<&PostingsList>, limit: usize) {
    let terms: Vec<String> = query.terms().iter().map(|t| format!("{}:{:.3}", t.term, t.weight)).collect();
    println!("query: {}", terms.join(" "));
    let Some(results) = results else {
        println!("no such term");
        return;
    };
    println!("found {} matching document(s)", results.size());
    for entry in results.iter().take(limit) {
        let name = index.document_name(entry.doc_id).unwrap_or("?");
        println!("{:>6}  {:.5}  {}", entry.doc_id, entry.score, name);
    }
}

fn run_kgram(file: &str, k: i64, kgram: Option<&str>, wildcard: Option<&str>) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {file}"))?;
    let mut index = InvertedIndex::new();
    let mut kg = KGramIndex::new(k)?;
    if !index_document(&mut index, Some(&mut kg), 0, file, &text, &TokenizerConfig::default()) {
        anyhow::bail!("{file} has too many tokens to index");
    }
    tracing::info!(terms = kg.num_terms(), kgrams = kg.num_kgrams(), "k-gram index built");

    let terms: Vec<&str> = match (kgram, wildcard) {
        (Some(grams), _) => kg.search_str(grams)?.into_iter().filter_map(|e| kg.term_by_id(e.token_id)).collect(),
        (None, Some(pattern)) => kg.wildcard(pattern)?,
        (None, None) => anyhow::bail!("either --kgram or --wildcard is required"),
    };

    println!("Found {} posting(s)", terms.len());
    if terms.len() > 10 {
        println!("The first 10 of them are:");
    }
    for term in terms.iter().take(10) {
        println!("{term}");
    }
    Ok(())
}
