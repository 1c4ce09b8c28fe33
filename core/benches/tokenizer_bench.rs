use criterion::{criterion_group, criterion_main, Criterion};
use fragment_core::tokenizer::tokenize;
use fragment_core::{Corpus, Fragment, InvertedIndex};
use std::sync::Arc;

const TEXT: &str = "Ó mar salgado, quanto do teu sal são lágrimas de Portugal! \
Por te cruzarmos, quantas mães choraram, quantos filhos em vão rezaram! \
Quantas noivas ficaram por casar para que fosses nosso, ó mar!";

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_poem", |b| b.iter(|| tokenize(TEXT)));
}

fn bench_search(c: &mut Criterion) {
    let fragments: Vec<Fragment> = (0..2_000).map(|i| Fragment::new(i, "", format!("Fragmento {i}"), TEXT, "")).collect();
    let index = InvertedIndex::build(Arc::new(Corpus::new(fragments)));
    c.bench_function("search_mar_sal", |b| b.iter(|| index.search("mar sal lágrimas", 10)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
