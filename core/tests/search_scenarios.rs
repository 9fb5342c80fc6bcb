use ranksearch_core::{InvertedIndex, PageRankTable, Query, QueryType, RankingType, SearchError, Searcher};

fn insert_text(index: &mut InvertedIndex, doc_id: u32, name: &str, text: &str) {
    let words: Vec<&str> = text.split_whitespace().collect();
    for (pos, w) in words.iter().enumerate() {
        index.insert(w, doc_id, pos as u32);
    }
    index.register_document(doc_id, name, words.len() as u32);
}

fn the_cat_sat() -> InvertedIndex {
    let mut index = InvertedIndex::new();
    index.insert("the", 1, 0);
    index.insert("cat", 1, 1);
    index.insert("sat", 1, 2);
    index.register_document(1, "docs/one.txt", 3);
    index
}

fn small_corpus() -> InvertedIndex {
    let mut index = InvertedIndex::new();
    insert_text(&mut index, 0, "c/a.txt", "zombie attack on the city");
    insert_text(&mut index, 1, "c/b.txt", "the zombie zombie walk");
    insert_text(&mut index, 2, "c/c.txt", "attack of the zombie attack");
    insert_text(&mut index, 3, "c/d.txt", "quiet city at night");
    index
}

fn pageranks() -> PageRankTable {
    PageRankTable::parse("a.txt=0.1\nb.txt=0.4\nc.txt=0.2\nd.txt=0.3\n")
}

#[test]
fn intersection_and_phrase_scenario() {
    let index = the_cat_sat();
    let searcher = Searcher::new(&index, PageRankTable::new());

    let hits = searcher.search(&Query::parse("the cat"), QueryType::Intersection, RankingType::TfIdf).unwrap().unwrap();
    assert_eq!(hits.doc_ids(), vec![1]);

    let hits = searcher.search(&Query::parse("the cat"), QueryType::Phrase, RankingType::TfIdf).unwrap().unwrap();
    assert_eq!(hits.doc_ids(), vec![1]);
    assert_eq!(hits.get(0).unwrap().offsets, vec![1]);

    let hits = searcher.search(&Query::parse("cat the"), QueryType::Phrase, RankingType::TfIdf).unwrap().unwrap();
    assert!(hits.is_empty());
}

#[test]
fn inserted_offsets_are_preserved() {
    let index = small_corpus();
    let zombie = index.get_postings("zombie").unwrap();
    assert_eq!(zombie.doc_ids(), vec![0, 1, 2]);
    assert_eq!(zombie.lookup_by_doc_id(1).unwrap().offsets, vec![1, 2]);
    assert_eq!(zombie.lookup_by_doc_id(2).unwrap().offsets, vec![3]);
}

#[test]
fn single_term_boolean_distinguishes_unknown() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::new());
    assert!(searcher.search(&Query::parse("vampire"), QueryType::Intersection, RankingType::TfIdf).unwrap().is_none());
    let hits = searcher.search(&Query::parse("city"), QueryType::Intersection, RankingType::TfIdf).unwrap().unwrap();
    assert_eq!(hits.doc_ids(), vec![0, 3]);
}

#[test]
fn multi_term_boolean_with_unknown_term_errors() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::new());
    let err = searcher.search(&Query::parse("zombie vampire"), QueryType::Intersection, RankingType::TfIdf).unwrap_err();
    assert_eq!(err, SearchError::UnknownTerm("vampire".into()));
    let err = searcher.search(&Query::new(), QueryType::Ranked, RankingType::TfIdf).unwrap_err();
    assert_eq!(err, SearchError::EmptyQuery);
}

#[test]
fn intersection_is_commutative() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::new());
    let ab = searcher.search(&Query::parse("zombie attack"), QueryType::Intersection, RankingType::TfIdf).unwrap().unwrap();
    let ba = searcher.search(&Query::parse("attack zombie"), QueryType::Intersection, RankingType::TfIdf).unwrap().unwrap();
    assert_eq!(ab.doc_ids(), vec![0, 2]);
    assert_eq!(ab.doc_ids(), ba.doc_ids());
}

#[test]
fn three_term_phrase_needs_consecutive_run() {
    let mut index = InvertedIndex::new();
    insert_text(&mut index, 0, "x/0", "a b c");
    insert_text(&mut index, 1, "x/1", "a b x c");
    insert_text(&mut index, 2, "x/2", "b c a b c");
    let searcher = Searcher::new(&index, PageRankTable::new());
    let hits = searcher.search(&Query::parse("a b c"), QueryType::Phrase, RankingType::TfIdf).unwrap().unwrap();
    assert_eq!(hits.doc_ids(), vec![0, 2]);
    assert_eq!(hits.lookup_by_doc_id(2).unwrap().offsets, vec![4]);
}

#[test]
fn single_term_tf_idf() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::new());
    let hits = searcher.search(&Query::parse("attack"), QueryType::Ranked, RankingType::TfIdf).unwrap().unwrap();
    let idf = (4.0f64 / 2.0).ln();
    // doc 2: tf 2, len 5; doc 0: tf 1, len 5
    assert_eq!(hits.doc_ids(), vec![2, 0]);
    assert!((hits.get(0).unwrap().score - 2.0 * idf / 5.0).abs() < 1e-9);
    assert!((hits.get(1).unwrap().score - idf / 5.0).abs() < 1e-9);
    // offsets survive single-term ranking
    assert_eq!(hits.get(0).unwrap().offsets, vec![0, 4]);
    // the index itself is untouched
    assert_eq!(index.get_postings("attack").unwrap().get(0).unwrap().score, 0.0);
}

#[test]
fn multi_term_tf_idf_sums_scores() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::new());
    let hits = searcher.search(&Query::parse("zombie city"), QueryType::Ranked, RankingType::TfIdf).unwrap().unwrap();
    let n = 4.0f64;
    let zombie = (n / 3.0).ln();
    let city = (n / 2.0).ln();
    let doc0 = zombie / 5.0 + city / 5.0;
    let doc1 = 2.0 * zombie / 4.0;
    let doc3 = city / 4.0;
    let doc2 = zombie / 5.0;
    assert_eq!(hits.size(), 4);
    assert!((hits.lookup_by_doc_id(0).unwrap().score - doc0).abs() < 1e-9);
    assert!((hits.lookup_by_doc_id(1).unwrap().score - doc1).abs() < 1e-9);
    assert!((hits.lookup_by_doc_id(2).unwrap().score - doc2).abs() < 1e-9);
    assert!((hits.lookup_by_doc_id(3).unwrap().score - doc3).abs() < 1e-9);
    let scores: Vec<f64> = hits.iter().map(|e| e.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn ranked_query_ignores_unknown_terms() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::new());
    let hits = searcher.search(&Query::parse("night vampire"), QueryType::Ranked, RankingType::TfIdf).unwrap().unwrap();
    assert_eq!(hits.doc_ids(), vec![3]);
}

#[test]
fn pagerank_counts_each_document_once() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, pageranks());
    let hits = searcher.search(&Query::parse("zombie attack"), QueryType::Ranked, RankingType::PageRank).unwrap().unwrap();
    assert_eq!(hits.doc_ids(), vec![1, 2, 0]);
    assert_eq!(hits.get(0).unwrap().score, 0.4);
    assert_eq!(hits.get(1).unwrap().score, 0.2);
    assert_eq!(hits.get(2).unwrap().score, 0.1);
}

#[test]
fn pagerank_skips_documents_without_score() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::parse("d.txt=0.3\n"));
    let hits = searcher.search(&Query::parse("city"), QueryType::Ranked, RankingType::PageRank).unwrap().unwrap();
    assert_eq!(hits.doc_ids(), vec![3]);
}

#[test]
fn combination_accumulates_per_matching_term() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, pageranks());
    let hits = searcher.search(&Query::parse("zombie attack"), QueryType::Ranked, RankingType::Combination).unwrap().unwrap();
    let n = 4.0f64;
    let zombie = (n / 3.0).ln();
    let attack = (n / 2.0).ln();
    let combine = |tfidf: f64, pr: f64| 0.01 * tfidf + 0.99 * pr;
    // docs 0 and 2 match both terms and collect two combined scores
    let doc0 = combine(zombie / 5.0, 0.1) + combine(attack / 5.0, 0.1);
    let doc1 = combine(2.0 * zombie / 4.0, 0.4);
    let doc2 = combine(zombie / 5.0, 0.2) + combine(2.0 * attack / 5.0, 0.2);
    assert!((hits.lookup_by_doc_id(0).unwrap().score - doc0).abs() < 1e-9);
    assert!((hits.lookup_by_doc_id(1).unwrap().score - doc1).abs() < 1e-9);
    assert!((hits.lookup_by_doc_id(2).unwrap().score - doc2).abs() < 1e-9);
    assert_eq!(hits.doc_ids(), vec![2, 1, 0]);
}

#[test]
fn combination_requires_pagerank_scores() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, PageRankTable::parse("a.txt=0.1\n"));
    let err = searcher.search(&Query::parse("city"), QueryType::Ranked, RankingType::Combination).unwrap_err();
    assert_eq!(err, SearchError::MissingPageRank("c/d.txt".into()));
}

#[test]
fn combination_alpha_is_configurable() {
    let index = small_corpus();
    let searcher = Searcher::new(&index, pageranks()).with_combination_alpha(1.0);
    let combined = searcher.search(&Query::parse("attack"), QueryType::Ranked, RankingType::Combination).unwrap().unwrap();
    let tfidf = searcher.search(&Query::parse("attack"), QueryType::Ranked, RankingType::TfIdf).unwrap().unwrap();
    assert_eq!(combined.doc_ids(), tfidf.doc_ids());
    for (c, t) in combined.iter().zip(tfidf.iter()) {
        assert!((c.score - t.score).abs() < 1e-12);
    }
}
