//! End-to-end clustering throughput: dense Euclidean and sparse spherical.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use kmeans_core::prelude::*;

fn generate_dense(num: usize, dim: usize) -> Vec<Vector> {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    let mut rng = ChaCha8Rng::seed_from_u64(2000 + num as u64 + dim as u64);
    (0..num)
        .map(|_| Vector::dense((0..dim).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect()))
        .collect()
}

fn generate_sparse(num: usize, dim: usize, nnz: usize) -> Vec<Vector> {
    use rand::seq::index::sample;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    let mut rng = ChaCha8Rng::seed_from_u64(3000 + num as u64 + dim as u64 + nnz as u64);
    (0..num)
        .map(|_| {
            let mut idx: Vec<u32> = sample(&mut rng, dim, nnz.min(dim))
                .into_iter()
                .map(|i| i as u32)
                .collect();
            idx.sort_unstable();
            let values: Vec<f32> = (0..idx.len()).map(|_| rng.gen::<f32>()).collect();
            let mut v = Vector::sparse(idx, values).unwrap();
            v.normalize_as_unit_vector();
            v
        })
        .collect()
}

fn bench_dense_kmeans(c: &mut Criterion) {
    let dim = 32;
    let k = 16;
    for &size in &[500usize, 2000] {
        let data = generate_dense(size, dim);
        c.bench_with_input(
            BenchmarkId::new("dense_kmeans", size),
            &size,
            |b, _| {
                b.iter(|| {
                    let mut owned = data.clone();
                    let kmeans = KMeans::new(KMeansConfig::new());
                    let result = kmeans.cluster(&mut owned, k, 1).unwrap();
                    black_box(result);
                });
            },
        );
    }
}

fn bench_spherical_sparse_kmeans(c: &mut Criterion) {
    let dim = 4096;
    let nnz = 64;
    let k = 16;
    for &size in &[500usize, 2000] {
        let data = generate_sparse(size, dim, nnz);
        c.bench_with_input(
            BenchmarkId::new("spherical_sparse_kmeans", size),
            &size,
            |b, _| {
                b.iter(|| {
                    let mut owned = data.clone();
                    let kmeans = KMeans::new(KMeansConfig::new().with_spherical(true));
                    let result = kmeans.cluster(&mut owned, k, 1).unwrap();
                    black_box(result);
                });
            },
        );
    }
}

criterion_group!(benches, bench_dense_kmeans, bench_spherical_sparse_kmeans);
criterion_main!(benches);
