//! Layered upper-bound dot-product index over unit-length sparse vectors.
//!
//! Given a query vector and a threshold λ, `nearby` returns a superset of
//! every indexed vector whose true dot product with the query is ≥ λ — the
//! superset guarantee is exact (no false negatives); candidates that don't
//! actually clear λ are the caller's problem to filter out via a real dot
//! product, which every method here already does before returning a scored
//! result.
//!
//! The per-layer registration strategy (§4.2 of the design this crate
//! follows) has no direct analogue in the corpus this crate was grounded on;
//! it's built from the math basis directly (Cauchy–Schwarz on unit vectors:
//! a query can only reach λ against v by concentrating mass on v's
//! highest-value coordinates) and checked against brute force in the test
//! suite below and in the index exactness integration tests.

mod pool;

use std::collections::HashMap;

use crate::error::{ClusterError, Result};
use crate::vector::SparseVector;

use pool::{CounterPool, IdSetPool};

/// Tolerance used when comparing accumulated squared sums against λ² /
/// 1-λ² bounds; keeps the register/stop decisions from flipping on
/// floating-point noise right at the boundary.
const WINDOW_EPS: f32 = 1e-6;

struct Layer {
    lambda: f32,
    /// coordinate → [(vector_id, min_occurrences)]
    token_map: HashMap<u32, Vec<(u32, u32)>>,
}

/// Layered upper-bound index. All indexed vectors must be unit-length and
/// sparse; see [`DotProductIndex::add`] for the rejection rules.
pub struct DotProductIndex {
    layers: Vec<Layer>,
    /// coordinate → ids of every indexed vector with a non-zero value there.
    global_inverted: HashMap<u32, Vec<u32>>,
    vectors: HashMap<u32, SparseVector>,
    max_id: u32,
    counter_pool: CounterPool,
    id_set_pool: IdSetPool,
}

impl DotProductIndex {
    /// `thresholds` need not be sorted; they are sorted ascending and must
    /// all be non-negative. The smallest may be 0, which degenerates that
    /// layer into a plain inverted index and disables the counting pre-pass
    /// for queries resolved against it.
    pub fn new(mut thresholds: Vec<f32>) -> Result<Self> {
        if thresholds.is_empty() {
            return Err(ClusterError::InvalidParameter(
                "DotProductIndex requires at least one threshold layer".into(),
            ));
        }
        for &t in &thresholds {
            if t < 0.0 {
                return Err(ClusterError::NegativeThreshold(t));
            }
        }
        thresholds.sort_by(|a, b| a.partial_cmp(b).unwrap());
        thresholds.dedup();

        let layers = thresholds
            .into_iter()
            .map(|lambda| Layer {
                lambda,
                token_map: HashMap::new(),
            })
            .collect();

        Ok(DotProductIndex {
            layers,
            global_inverted: HashMap::new(),
            vectors: HashMap::new(),
            max_id: 0,
            counter_pool: CounterPool::new(),
            id_set_pool: IdSetPool::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    pub fn vector_by_id(&self, id: u32) -> Option<&SparseVector> {
        self.vectors.get(&id)
    }

    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.token_map.clear();
        }
        self.global_inverted.clear();
        self.vectors.clear();
        self.max_id = 0;
    }

    /// Replace the index contents with `entries` in one pass.
    pub fn set(&mut self, entries: &[(SparseVector, u32)]) -> Result<()> {
        self.clear();
        for (v, id) in entries {
            self.add(v, *id)?;
        }
        Ok(())
    }

    pub fn add(&mut self, v: &SparseVector, id: u32) -> Result<()> {
        if v.squared_sum() < 1e-20 {
            return Err(ClusterError::ZeroVectorIndexed);
        }
        if !v.is_unit_length() {
            return Err(ClusterError::NonUnitVectorIndexed);
        }

        self.vectors.insert(id, v.clone());
        self.max_id = self.max_id.max(id);

        for &coord in v.indices() {
            self.global_inverted.entry(coord).or_default().push(id);
        }

        // Coordinates sorted by |value| descending; the build walk below
        // consumes them from the top down per the Cauchy-Schwarz argument.
        let mut order: Vec<usize> = (0..v.nnz()).collect();
        order.sort_by(|&a, &b| {
            v.values()[b]
                .abs()
                .partial_cmp(&v.values()[a].abs())
                .unwrap()
        });
        let squared: Vec<f32> = v.values().iter().map(|x| x * x).collect();

        for layer in &mut self.layers {
            if layer.lambda <= WINDOW_EPS {
                // Degenerate layer: plain inverted index, one entry per
                // coordinate, no counting pre-pass needed at query time.
                for &coord in v.indices() {
                    layer.token_map.entry(coord).or_default().push((id, 1));
                }
                continue;
            }

            register_layer(layer, v, &order, &squared, id);
        }

        Ok(())
    }

    /// Given unit-or-less query `q` and `lambda >= 0`, return a superset of
    /// `{ id : q . v_id >= lambda }`.
    pub fn nearby(&self, q: &SparseVector, lambda: f32) -> Result<Vec<u32>> {
        if lambda < 0.0 {
            return Err(ClusterError::NegativeThreshold(lambda));
        }
        if q.nnz() == 0 {
            return Ok(Vec::new());
        }

        let layer = self.layers.iter().rev().find(|l| l.lambda <= lambda);
        let layer = match layer {
            Some(l) => l,
            None => return Ok(self.exhaustive_candidates(q)),
        };

        if q.nnz() == 1 {
            let coord = q.indices()[0];
            let ids = layer
                .token_map
                .get(&coord)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|&&(_, min_occ)| min_occ == 1)
                        .map(|&(id, _)| id)
                        .collect()
                })
                .unwrap_or_default();
            return Ok(ids);
        }

        let skip_threshold = (self.vectors.len() / 4).max(3);
        let mut counts = self.counter_pool.acquire();
        let mut offset: u32 = 0;

        for &coord in q.indices() {
            if let Some(ids) = self.global_inverted.get(&coord) {
                if ids.len() >= skip_threshold {
                    offset += 1;
                    continue;
                }
                for &id in ids {
                    *counts.entry(id).or_insert(0) += 1;
                }
            }
        }

        let mut seen = self.id_set_pool.acquire();
        let mut result = Vec::new();
        let q_len = q.nnz() as u32;

        'outer: for &coord in q.indices() {
            if let Some(entries) = layer.token_map.get(&coord) {
                for &(id, min_occ) in entries {
                    if seen.contains(&id) {
                        continue;
                    }
                    let admitted = min_occ == 1
                        || (min_occ <= q_len
                            && counts.get(&id).copied().unwrap_or(0)
                                >= min_occ.saturating_sub(offset));
                    if admitted {
                        seen.insert(id);
                        result.push(id);
                        if result.len() == self.vectors.len() {
                            break 'outer;
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    fn exhaustive_candidates(&self, q: &SparseVector) -> Vec<u32> {
        let mut seen = self.id_set_pool.acquire();
        let mut result = Vec::new();
        for &coord in q.indices() {
            if let Some(ids) = self.global_inverted.get(&coord) {
                for &id in ids {
                    if seen.insert(id) {
                        result.push(id);
                    }
                }
            }
        }
        result
    }

    /// Top-k candidates by true dot product, starting from the highest
    /// layer clearing `lambda_min` and descending until enough candidates
    /// clear their stop's threshold to guarantee the top-k are correct.
    pub fn k_nearest(&self, q: &SparseVector, k: usize, lambda_min: f32) -> Result<Vec<(u32, f32)>> {
        if lambda_min < 0.0 {
            return Err(ClusterError::NegativeThreshold(lambda_min));
        }
        if q.nnz() == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let mut stops: Vec<f32> = self
            .layers
            .iter()
            .map(|l| l.lambda)
            .filter(|&l| l >= lambda_min)
            .collect();
        stops.sort_by(|a, b| b.partial_cmp(a).unwrap());

        for &lam in &stops {
            let candidates = self.nearby(q, lam)?;
            let mut scored = self.score_candidates(&candidates, q, lam);
            if scored.len() >= k {
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
                scored.truncate(k);
                return Ok(scored);
            }
        }

        let candidates = self.exhaustive_candidates(q);
        let mut scored = self.score_candidates(&candidates, q, lambda_min);
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        scored.truncate(k);
        Ok(scored)
    }

    fn score_candidates(&self, ids: &[u32], q: &SparseVector, min_score: f32) -> Vec<(u32, f32)> {
        ids.iter()
            .filter_map(|&id| {
                let v = self.vectors.get(&id)?;
                let dp = v.dot_product(q);
                (dp >= min_score).then_some((id, dp))
            })
            .collect()
    }

    /// Best single candidate, or `None` if no indexed vector has a positive
    /// dot product with `q`.
    pub fn nearest(&self, q: &SparseVector) -> Result<Option<(u32, f32)>> {
        let top = self.k_nearest(q, 1, 0.0)?;
        Ok(top.into_iter().find(|&(_, dp)| dp > 0.0))
    }
}

/// Register `v`'s coordinates into `layer` per the sliding-window rule: a
/// coordinate whose |value| already clears λ registers with
/// `min_occurrences = 1`; otherwise we extend a window toward smaller
/// values until the window's squared-sum reaches λ², and register the
/// window's size as the minimum number of concurrent coordinate matches
/// needed.
fn register_layer(layer: &mut Layer, v: &SparseVector, order: &[usize], squared: &[f32], id: u32) {
    let lambda = layer.lambda;
    let lambda_sq = lambda * lambda;
    let n = order.len();

    let mut cum_from_top = 0.0_f32;
    let mut window_end = 0usize;
    let mut window_sum = 0.0_f32;

    for idx in 0..n {
        if cum_from_top > 1.0 - lambda_sq + WINDOW_EPS {
            break;
        }

        let pos = order[idx];
        let coord = v.indices()[pos];
        let abs_val = v.values()[pos].abs();
        if abs_val <= WINDOW_EPS {
            break;
        }

        if abs_val >= lambda {
            layer.token_map.entry(coord).or_default().push((id, 1));
            if window_end <= idx {
                window_end = idx + 1;
                window_sum += squared[pos];
            }
            cum_from_top += squared[pos];
            continue;
        }

        if window_end <= idx {
            window_end = idx;
            window_sum = 0.0;
        }
        while window_sum < lambda_sq - WINDOW_EPS && window_end < n {
            window_sum += squared[order[window_end]];
            window_end += 1;
        }

        let window_count = (window_end - idx) as u32;
        layer.token_map.entry(coord).or_default().push((id, window_count));

        cum_from_top += squared[pos];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn unit(indices: Vec<u32>, values: Vec<f32>) -> SparseVector {
        let mut v = SparseVector::new(indices, values).unwrap();
        v.normalize_as_unit_vector();
        v
    }

    #[test]
    fn rejects_zero_and_non_unit_vectors() {
        let mut idx = DotProductIndex::new(vec![0.0, 0.5]).unwrap();
        let zero = SparseVector::new(vec![1], vec![0.0]).unwrap();
        assert!(matches!(
            idx.add(&zero, 1).unwrap_err(),
            ClusterError::ZeroVectorIndexed
        ));
        let non_unit = SparseVector::new(vec![1], vec![2.0]).unwrap();
        assert!(matches!(
            idx.add(&non_unit, 2).unwrap_err(),
            ClusterError::NonUnitVectorIndexed
        ));
    }

    #[test]
    fn zero_threshold_layer_matches_all_positive_dots() {
        let mut idx = DotProductIndex::new(vec![0.0]).unwrap();
        let a = unit(vec![1, 2], vec![1.0, 1.0]);
        let b = unit(vec![2, 3], vec![1.0, 1.0]);
        let c = unit(vec![9], vec![1.0]);
        idx.add(&a, 0).unwrap();
        idx.add(&b, 1).unwrap();
        idx.add(&c, 2).unwrap();

        let q = unit(vec![2], vec![1.0]);
        let result = idx.nearby(&q, 0.0).unwrap();
        let mut result_sorted = result.clone();
        result_sorted.sort();
        assert_eq!(result_sorted, vec![0, 1]);
    }

    #[test]
    fn nearby_is_exact_superset_against_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let dim = 200u32;
        let mut idx = DotProductIndex::new(vec![0.0, 0.05, 0.25, 0.4, 0.6]).unwrap();
        let mut stored = Vec::new();

        for id in 0..300u32 {
            let nnz = rng.gen_range(3..15);
            let mut coords: Vec<u32> = Vec::new();
            while coords.len() < nnz {
                let c = rng.gen_range(0..dim);
                if !coords.contains(&c) {
                    coords.push(c);
                }
            }
            let values: Vec<f32> = coords.iter().map(|_| rng.gen_range(-1.0..1.0)).collect();
            let v = unit(coords, values);
            idx.add(&v, id).unwrap();
            stored.push((id, v));
        }

        for lambda in [0.05_f32, 0.25, 0.4, 0.6] {
            for _ in 0..10 {
                let nnz = rng.gen_range(3..15);
                let mut coords: Vec<u32> = Vec::new();
                while coords.len() < nnz {
                    let c = rng.gen_range(0..dim);
                    if !coords.contains(&c) {
                        coords.push(c);
                    }
                }
                let values: Vec<f32> = coords.iter().map(|_| rng.gen_range(-1.0..1.0)).collect();
                let q = unit(coords, values);

                let candidates = idx.nearby(&q, lambda).unwrap();
                let candidate_set: std::collections::HashSet<u32> =
                    candidates.into_iter().collect();

                for (id, v) in &stored {
                    if v.dot_product(&q) >= lambda {
                        assert!(
                            candidate_set.contains(id),
                            "false negative at lambda={lambda} id={id}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn k_nearest_matches_brute_force_top_k() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut idx = DotProductIndex::new(vec![0.0, 0.2]).unwrap();
        let mut stored = Vec::new();
        for id in 0..100u32 {
            let coords: Vec<u32> = (0..5).map(|_| rng.gen_range(0..50)).collect();
            let coords: Vec<u32> = coords.into_iter().collect::<std::collections::BTreeSet<_>>().into_iter().collect();
            let values: Vec<f32> = coords.iter().map(|_| rng.gen_range(0.1..1.0)).collect();
            let v = unit(coords, values);
            idx.add(&v, id).unwrap();
            stored.push((id, v));
        }

        let q = unit(vec![1, 2, 3], vec![0.5, 0.5, 0.5]);
        let k = 5;
        let got = idx.k_nearest(&q, k, 0.0).unwrap();

        let mut brute: Vec<(u32, f32)> = stored
            .iter()
            .map(|(id, v)| (*id, v.dot_product(&q)))
            .filter(|&(_, dp)| dp > 0.0)
            .collect();
        brute.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        brute.truncate(k);

        assert_eq!(got.len(), brute.len());
        for ((_, got_score), (_, brute_score)) in got.iter().zip(brute.iter()) {
            assert!((got_score - brute_score).abs() < 1e-4);
        }
    }

    #[test]
    fn nearest_returns_none_when_no_positive_dot() {
        let mut idx = DotProductIndex::new(vec![0.0]).unwrap();
        let a = unit(vec![1], vec![1.0]);
        idx.add(&a, 0).unwrap();
        let q = unit(vec![2], vec![1.0]);
        assert_eq!(idx.nearest(&q).unwrap(), None);
    }

    #[test]
    fn negative_threshold_rejected() {
        let idx = DotProductIndex::new(vec![0.0]).unwrap();
        let q = unit(vec![1], vec![1.0]);
        assert!(matches!(
            idx.nearby(&q, -0.1).unwrap_err(),
            ClusterError::NegativeThreshold(_)
        ));
    }
}
