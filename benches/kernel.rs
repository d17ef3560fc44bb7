mod common;

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use kmersearch::{Alphabet, DiagonalDistanceEngine, KernelMode, Sequence, SimilarityMatrix};

use common::random_dna;

fn window_distance_bench(c: &mut Criterion) {
    let alphabet = Alphabet::dna();
    let mut rng = fastrand::Rng::with_seed(7);
    let query = Sequence::new("q", Vec::new(), &random_dna(&mut rng, 1_000), &alphabet);
    let subject = Sequence::new("s", Vec::new(), &random_dna(&mut rng, 1_000), &alphabet);
    let matrix = SimilarityMatrix::match_mismatch(alphabet, 0, 1);

    let mut group = c.benchmark_group("window_distances_1k_x_1k");
    group.throughput(Throughput::Elements(1_000 * 1_000));
    for (label, mode) in [("symbols", KernelMode::Symbols), ("digrams", KernelMode::Digrams)] {
        let engine = DiagonalDistanceEngine::new(matrix.clone(), mode).expect("dna has a digram table");
        group.bench_function(label, |b| {
            b.iter(|| black_box(engine.window_distances(black_box(&query), black_box(&subject), 8)));
        });
    }
    group.finish();
}

fn aligned_distance_bench(c: &mut Criterion) {
    let alphabet = Alphabet::protein();
    let mut rng = fastrand::Rng::with_seed(11);
    let residues: String = (0..64)
        .map(|_| alphabet.chars()[rng.usize(..alphabet.len())])
        .collect();
    let a = Sequence::new("a", Vec::new(), &residues, &alphabet);
    let b = Sequence::new("b", Vec::new(), &residues.chars().rev().collect::<String>(), &alphabet);
    let engine = DiagonalDistanceEngine::symbols(SimilarityMatrix::blosum62());

    c.bench_function("aligned_distance_blosum62_k16", |bench| {
        let x = a.kmer(0, 16).unwrap();
        let y = b.kmer(0, 16).unwrap();
        bench.iter(|| black_box(engine.aligned_distance(black_box(x), black_box(y))));
    });
}

criterion_group!(benches, window_distance_bench, aligned_distance_bench);
criterion_main!(benches);
