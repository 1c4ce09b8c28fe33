use fragment_core::{Corpus, Fragment, InvertedIndex};
use std::sync::Arc;

fn build(fragments: Vec<Fragment>) -> InvertedIndex {
    InvertedIndex::build(Arc::new(Corpus::new(fragments)))
}

fn ids(results: &[&Fragment]) -> Vec<i64> {
    results.iter().map(|f| f.id).collect()
}

#[test]
fn title_match_outranks_single_body_match() {
    let idx = build(vec![
        Fragment::new(2, "", "Poema", "uma vez na vida a alma sente", ""),
        Fragment::new(1, "", "Alma", "versos sem nada", ""),
    ]);
    let hits = idx.search_scored("alma", 10);
    assert_eq!(hits.len(), 2);
    assert_eq!((hits[0].fragment.id, hits[0].score), (1, 3));
    assert_eq!((hits[1].fragment.id, hits[1].score), (2, 1));
}

#[test]
fn equal_scores_prefer_shorter_fragments() {
    let idx = build(vec![
        Fragment::new(1, "", "", "sonho longo demais com muitas palavras", ""),
        Fragment::new(2, "", "", "sonho curto", ""),
        Fragment::new(3, "", "", "sonho médio aqui", ""),
    ]);
    assert_eq!(ids(&idx.search("sonho", 10)), vec![2, 3, 1]);
}

#[test]
fn empty_and_punctuation_queries_return_nothing() {
    let idx = build(vec![Fragment::new(1, "", "Alma", "alma", "")]);
    assert!(idx.search("", 10).is_empty());
    assert!(idx.search("!!!", 10).is_empty());
    assert!(idx.search("the and", 10).is_empty());
}

#[test]
fn zero_limit_uses_default() {
    let fragments: Vec<Fragment> = (0..15).map(|i| Fragment::new(i, "", "", format!("alma {}", "x".repeat(i as usize)), "")).collect();
    let idx = build(fragments);
    assert_eq!(idx.search("alma", 0), idx.search("alma", 10));
    assert_eq!(idx.search("alma", 0).len(), 10);
    assert_eq!(idx.search("alma", 3).len(), 3);
}

#[test]
fn repeated_searches_are_deterministic() {
    let fragments: Vec<Fragment> = (0..50)
        .map(|i| Fragment::new(i, "", if i % 7 == 0 { "Noite" } else { "" }, format!("noite {} estrelas", "z".repeat((i % 5) as usize)), ""))
        .collect();
    let idx = build(fragments);
    let first = ids(&idx.search("noite estrelas", 25));
    for _ in 0..10 {
        assert_eq!(ids(&idx.search("noite estrelas", 25)), first);
    }
}

#[test]
fn postings_only_reference_corpus_ids() {
    let idx = build(vec![Fragment::new(10, "", "Tabacaria", "não sou nada", ""), Fragment::new(20, "", "", "nunca serei nada", "")]);
    let known: Vec<i64> = idx.corpus().fragments().iter().map(|f| f.id).collect();
    for term in ["tabacaria", "sou", "nada", "nunca", "serei"] {
        assert!(idx.postings(term).iter().all(|id| known.contains(id)));
    }
}

#[test]
fn unknown_terms_contribute_nothing() {
    let idx = build(vec![Fragment::new(1, "", "", "mensagem", "")]);
    assert_eq!(ids(&idx.search("mensagem inexistente", 10)), vec![1]);
    assert!(idx.search("inexistente", 10).is_empty());
}
