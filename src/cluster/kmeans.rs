//! The k-Means / Spherical k-Means driver: init, assign, update, prune,
//! converge.

use std::collections::HashMap;

use rand::Rng;
use rayon::prelude::*;

#[cfg(feature = "logging")]
use log::{debug, trace, warn};

use crate::cluster::{
    distortion, get_cluster_counts, point_distance, prune_empty_clusters, validate_uniform_storage,
};
use crate::config::KMeansConfig;
use crate::error::{ClusterError, Result};
use crate::index::DotProductIndex;
use crate::vector::{DenseVector, SparseVector, Vector};

/// Layer thresholds used when rebuilding the index over centroids each
/// iteration of indexed reassignment.
const INDEX_LAYERS: [f32; 5] = [0.0, 0.1, 0.25, 0.5, 0.75];

pub struct KMeans {
    pub config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        KMeans { config }
    }

    /// Cluster `data` into `k` groups, keeping the best of `num_runs`
    /// independent runs (lowest total distortion). If `spherical`, every
    /// vector in `data` is normalized to unit length in place before the
    /// first run.
    pub fn cluster(
        &self,
        data: &mut [Vector],
        k: usize,
        num_runs: usize,
    ) -> Result<(Vec<usize>, Vec<Vector>)> {
        if k < 1 {
            return Err(ClusterError::InvalidParameter("k must be >= 1".into()));
        }
        if num_runs < 1 {
            return Err(ClusterError::InvalidParameter(
                "num_runs must be >= 1".into(),
            ));
        }
        let (is_sparse, dim) = validate_uniform_storage(data)?;

        if self.config.spherical {
            data.par_iter_mut().for_each(|v| v.normalize_as_unit_vector());
        }

        let mut rng = rand::thread_rng();
        let mut best: Option<(Vec<usize>, Vec<Vector>, f32)> = None;

        for _run in 0..num_runs {
            let (labels, centroids) = self.cluster_run(data, k, is_sparse, dim, &mut rng)?;
            let d = distortion(self.config.spherical, data, &labels, &centroids)?;
            #[cfg(feature = "logging")]
            debug!("run {_run}: k={} distortion={d}", centroids.len());

            let better = match &best {
                Some((_, _, best_d)) => d < *best_d,
                None => true,
            };
            if better {
                best = Some((labels, centroids, d));
            }
        }

        let (labels, centroids, _) = best.expect("num_runs >= 1 guarantees at least one run");
        Ok((labels, centroids))
    }

    /// Assign every point in `data` to its nearest of `centroids`, without
    /// running any clustering. Exposed since it's part of the external API
    /// surface (a caller may want to relabel new data against a fitted
    /// model).
    pub fn get_clustering(&self, data: &[Vector], centroids: &[Vector]) -> Result<Vec<usize>> {
        self.assign_exhaustive(data, centroids)
    }

    fn cluster_run(
        &self,
        full_data: &[Vector],
        k_requested: usize,
        is_sparse: bool,
        dim: Option<usize>,
        rng: &mut impl Rng,
    ) -> Result<(Vec<usize>, Vec<Vector>)> {
        let full_n = full_data.len();
        if k_requested >= full_n {
            // Each point becomes its own centroid.
            return Ok(((0..full_n).collect(), full_data.to_vec()));
        }

        // Run the iterations on a random sample of `data`, then (below) do a
        // single final full-data assignment against the converged centroids.
        let use_sampling = self.config.sampling_ratio > 0.0 && self.config.sampling_ratio < 1.0;
        let sample_owned: Vec<Vector>;
        let data: &[Vector] = if use_sampling {
            let sample_size = ((full_n as f32 * self.config.sampling_ratio).ceil() as usize)
                .clamp(k_requested, full_n);
            let mut idxs: Vec<usize> = (0..full_n).collect();
            for i in (1..idxs.len()).rev() {
                let j = rng.gen_range(0..=i);
                idxs.swap(i, j);
            }
            idxs.truncate(sample_size);
            sample_owned = idxs.into_iter().map(|i| full_data[i].clone()).collect();
            #[cfg(feature = "logging")]
            debug!(
                "sampling_ratio={}: running iterations on {} of {} points",
                self.config.sampling_ratio,
                sample_owned.len(),
                full_n
            );
            &sample_owned
        } else {
            full_data
        };
        let n = data.len();

        let mut centroids = self.init_centroids(data, k_requested, rng)?;
        let mut k = centroids.len();
        let mut labels = self.assign_exhaustive(data, &centroids)?;

        let mut sparse_state: Option<SparseAccumState> = if is_sparse && self.config.spherical {
            Some(SparseAccumState::build(data, &labels, k))
        } else {
            None
        };

        let max_iters = 10 * n.max(1);
        let mut converged = false;
        let mut exhausted_iterations = true;

        for _iter in 0..max_iters {
            let old_centroids = centroids.clone();

            centroids = if let Some(state) = &sparse_state {
                state.materialize()
            } else {
                self.recompute_full(data, &labels, k, is_sparse, dim)
            };

            let pre_prune_len = centroids.len();
            centroids = prune_empty_clusters(centroids, &mut labels);
            if centroids.len() != pre_prune_len {
                if let Some(state) = &mut sparse_state {
                    state.prune(&get_cluster_counts(&labels, pre_prune_len));
                }
            }
            k = centroids.len();

            let changed: Vec<bool> = if self.config.clusters_changed_map {
                (0..k)
                    .map(|c| {
                        c >= old_centroids.len()
                            || !centroids[c].value_equals(&old_centroids[c], 1e-6)
                    })
                    .collect()
            } else {
                vec![true; k]
            };

            if self.config.clusters_changed_map && !changed.iter().any(|&c| c) {
                #[cfg(feature = "logging")]
                trace!("iteration {_iter}: no centroid changed, terminating");
                exhausted_iterations = false;
                break;
            }

            let mut sum_sq = 0.0_f32;
            for c in 0..k.min(old_centroids.len()) {
                sum_sq += centroids[c]
                    .squared_euclidean_distance(&old_centroids[c])
                    .unwrap_or(0.0);
            }
            if sum_sq <= self.config.convergence_tolerance {
                converged = true;
            }

            if k <= 1 {
                exhausted_iterations = false;
                break;
            }

            let (new_labels, changes) = self.reassign(data, &labels, &centroids, &changed, is_sparse)?;
            let change_count = changes.len();
            #[cfg(feature = "logging")]
            trace!("iteration {_iter}: {change_count} label changes, converged={converged}");

            if let Some(state) = &mut sparse_state {
                if change_count <= self.config.max_changes_for_differential {
                    state.apply_differential(data, &changes)?;
                } else {
                    *state = SparseAccumState::build(data, &new_labels, k);
                }
            }

            labels = new_labels;

            if converged || change_count == 0 {
                exhausted_iterations = false;
                break;
            }
        }

        if exhausted_iterations {
            #[cfg(feature = "logging")]
            warn!("k-means did not converge within {max_iters} iterations; returning last assignment");
        }

        if use_sampling {
            let final_labels = self.assign_exhaustive(full_data, &centroids)?;
            return Ok((final_labels, centroids));
        }

        Ok((labels, centroids))
    }

    fn init_centroids(
        &self,
        data: &[Vector],
        k: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<Vector>> {
        if !self.config.plus_plus_init {
            let mut idxs: Vec<usize> = (0..data.len()).collect();
            // Fisher-Yates without replacement.
            for i in (1..idxs.len()).rev() {
                let j = rng.gen_range(0..=i);
                idxs.swap(i, j);
            }
            return Ok(idxs.into_iter().take(k).map(|i| data[i].clone()).collect());
        }

        let mut centroids = Vec::with_capacity(k);
        let first = rng.gen_range(0..data.len());
        centroids.push(data[first].clone());

        let mut dist: Vec<f32> = data
            .iter()
            .map(|x| point_distance(self.config.spherical, x, &centroids[0]))
            .collect::<Result<Vec<_>>>()?;

        while centroids.len() < k {
            let total: f32 = dist.iter().sum();
            if total < 1e-5 {
                #[cfg(feature = "logging")]
                debug!(
                    "k-means++ mass saturated at {} of {} requested centroids",
                    centroids.len(),
                    k
                );
                break;
            }

            let mut target = rng.gen::<f32>() * total;
            let mut chosen = dist.len() - 1;
            for (i, &d) in dist.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }

            centroids.push(data[chosen].clone());
            let newest = centroids.last().unwrap();
            for (i, d) in dist.iter_mut().enumerate() {
                let nd = point_distance(self.config.spherical, &data[i], newest)?;
                if nd < *d {
                    *d = nd;
                }
            }
        }

        Ok(centroids)
    }

    fn assign_exhaustive(&self, data: &[Vector], centroids: &[Vector]) -> Result<Vec<usize>> {
        data.par_iter()
            .map(|x| self.nearest_centroid(x, centroids, None))
            .collect()
    }

    fn nearest_centroid(
        &self,
        x: &Vector,
        centroids: &[Vector],
        restrict_to: Option<&[bool]>,
    ) -> Result<usize> {
        let mut best_idx = 0;
        let mut best_dist = f32::INFINITY;
        for (i, c) in centroids.iter().enumerate() {
            if let Some(mask) = restrict_to {
                if !mask[i] {
                    continue;
                }
            }
            let d = point_distance(self.config.spherical, x, c)?;
            if d < best_dist {
                best_dist = d;
                best_idx = i;
            }
        }
        Ok(best_idx)
    }

    fn recompute_full(
        &self,
        data: &[Vector],
        labels: &[usize],
        k: usize,
        is_sparse: bool,
        dim: Option<usize>,
    ) -> Vec<Vector> {
        if is_sparse {
            recompute_sparse(data, labels, k, self.config.spherical)
        } else {
            let dim = dim.expect("dense data has a dimension");
            recompute_dense(data, labels, k, dim, self.config.spherical)
        }
    }

    /// For each point, scan either every centroid or (when
    /// `clusters_changed_map` is active) only the changed centroids plus the
    /// point's own current one. Uses the upper-bound index instead of a
    /// full scan when spherical + sparse + `k` large enough to amortize the
    /// rebuild.
    fn reassign(
        &self,
        data: &[Vector],
        labels: &[usize],
        centroids: &[Vector],
        changed: &[bool],
        is_sparse: bool,
    ) -> Result<(Vec<usize>, Vec<(usize, usize, usize)>)> {
        let k = centroids.len();
        let use_index = self.config.indexed_means
            && self.config.spherical
            && is_sparse
            && k >= self.config.min_clusters_for_indexed_means
            && centroids.iter().all(|c| c.squared_sum() > 1e-12);

        let index = if use_index {
            let mut idx = DotProductIndex::new(INDEX_LAYERS.to_vec())?;
            for (i, c) in centroids.iter().enumerate() {
                idx.add(c.as_sparse().expect("sparse centroid"), i as u32)?;
            }
            Some(idx)
        } else {
            None
        };

        let restrict_mask: Option<Vec<bool>> = if self.config.clusters_changed_map {
            Some(changed.to_vec())
        } else {
            None
        };

        let results: Vec<usize> = data
            .par_iter()
            .zip(labels.par_iter())
            .map(|(x, &cur)| -> Result<usize> {
                if let Some(idx) = &index {
                    self.best_via_index(x, cur, centroids, idx)
                } else {
                    let mut mask = restrict_mask.clone();
                    if let Some(m) = mask.as_mut() {
                        m[cur] = true;
                    }
                    self.nearest_centroid(x, centroids, mask.as_deref())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut new_labels = Vec::with_capacity(data.len());
        let mut changes = Vec::new();
        for (i, (&cur, &chosen)) in labels.iter().zip(results.iter()).enumerate() {
            new_labels.push(chosen);
            if chosen != cur {
                changes.push((cur, chosen, i));
            }
        }
        Ok((new_labels, changes))
    }

    fn best_via_index(
        &self,
        x: &Vector,
        cur: usize,
        centroids: &[Vector],
        index: &DotProductIndex,
    ) -> Result<usize> {
        let q = match x.as_sparse() {
            Some(s) => s,
            None => return Ok(cur),
        };
        let max_sim = x.dot_product(&centroids[cur])?;
        let candidates = index.nearby(q, max_sim.max(0.0))?;

        let mut best_idx = cur;
        let mut best_sim = max_sim;
        for id in candidates {
            let c = id as usize;
            if c == cur {
                continue;
            }
            let sim = x.dot_product(&centroids[c])?;
            if sim > best_sim {
                best_sim = sim;
                best_idx = c;
            }
        }
        Ok(best_idx)
    }
}

fn recompute_dense(
    data: &[Vector],
    labels: &[usize],
    k: usize,
    dim: usize,
    spherical: bool,
) -> Vec<Vector> {
    let (sums, counts) = data
        .par_iter()
        .zip(labels.par_iter())
        .fold(
            || (vec![vec![0.0f32; dim]; k], vec![0usize; k]),
            |(mut sums, mut counts), (x, &label)| {
                let dense = x.as_dense().expect("dense recompute requires dense data");
                for (i, v) in dense.values().iter().enumerate() {
                    sums[label][i] += v;
                }
                counts[label] += 1;
                (sums, counts)
            },
        )
        .reduce(
            || (vec![vec![0.0f32; dim]; k], vec![0usize; k]),
            |(mut sa, mut ca), (sb, cb)| {
                for c in 0..k {
                    for i in 0..dim {
                        sa[c][i] += sb[c][i];
                    }
                    ca[c] += cb[c];
                }
                (sa, ca)
            },
        );

    sums.into_iter()
        .zip(counts)
        .map(|(mut sum, count)| {
            if !spherical && count > 0 {
                let inv = 1.0 / count as f32;
                for v in sum.iter_mut() {
                    *v *= inv;
                }
            }
            let mut v = DenseVector::new(sum);
            if spherical {
                v.normalize_as_unit_vector();
            }
            Vector::Dense(v)
        })
        .collect()
}

fn recompute_sparse(data: &[Vector], labels: &[usize], k: usize, spherical: bool) -> Vec<Vector> {
    (0..k)
        .into_par_iter()
        .map(|c| {
            let mut acc: HashMap<u32, f32> = HashMap::new();
            let mut count = 0usize;
            for (x, &label) in data.iter().zip(labels.iter()) {
                if label == c {
                    let sparse = x.as_sparse().expect("sparse recompute requires sparse data");
                    for (&coord, &val) in sparse.indices().iter().zip(sparse.values().iter()) {
                        *acc.entry(coord).or_insert(0.0) += val;
                    }
                    count += 1;
                }
            }
            if !spherical && count > 0 {
                let inv = 1.0 / count as f32;
                for v in acc.values_mut() {
                    *v *= inv;
                }
            }
            let mut v = SparseVector::from_mapping(&acc);
            if spherical {
                v.normalize_as_unit_vector();
            }
            Vector::Sparse(v)
        })
        .collect()
}

/// Per-cluster sparse accumulators for the differential centroid update
/// (§4.3): rather than re-sweeping all of `data` every iteration, each
/// assignment change subtracts the moved point from its old cluster's
/// accumulator and adds it to the new one.
struct SparseAccumState {
    accumulators: Vec<HashMap<u32, f32>>,
    sizes: Vec<usize>,
    /// 0 = unchanged since last materialize, 1 = touched.
    touched: Vec<bool>,
    previous: Vec<Vector>,
    spherical: bool,
}

impl SparseAccumState {
    fn build(data: &[Vector], labels: &[usize], k: usize) -> Self {
        let mut accumulators = vec![HashMap::new(); k];
        let mut sizes = vec![0usize; k];
        for (x, &label) in data.iter().zip(labels.iter()) {
            let sparse = x.as_sparse().expect("sparse accumulator requires sparse data");
            for (&coord, &val) in sparse.indices().iter().zip(sparse.values().iter()) {
                *accumulators[label].entry(coord).or_insert(0.0) += val;
            }
            sizes[label] += 1;
        }
        SparseAccumState {
            accumulators,
            sizes,
            touched: vec![true; k],
            previous: vec![Vector::sparse(vec![], vec![]).unwrap(); k],
            spherical: true,
        }
    }

    fn materialize(&self) -> Vec<Vector> {
        self.accumulators
            .iter()
            .enumerate()
            .map(|(c, acc)| {
                if !self.touched[c] && c < self.previous.len() {
                    return self.previous[c].clone();
                }
                let mut v = SparseVector::from_mapping(acc);
                if self.spherical {
                    v.normalize_as_unit_vector();
                }
                Vector::Sparse(v)
            })
            .collect()
    }

    fn apply_differential(
        &mut self,
        data: &[Vector],
        changes: &[(usize, usize, usize)],
    ) -> Result<()> {
        for t in self.touched.iter_mut() {
            *t = false;
        }
        for &(from, to, idx) in changes {
            let sparse = data[idx]
                .as_sparse()
                .expect("sparse accumulator requires sparse data");
            for (&coord, &val) in sparse.indices().iter().zip(sparse.values().iter()) {
                match self.accumulators[from].get_mut(&coord) {
                    Some(acc) => *acc -= val,
                    None => return Err(ClusterError::MissingAccumulatorCoordinate(coord)),
                }
                *self.accumulators[to].entry(coord).or_insert(0.0) += val;
            }
            self.sizes[from] = self.sizes[from].saturating_sub(1);
            self.sizes[to] += 1;
            self.touched[from] = true;
            self.touched[to] = true;
        }
        Ok(())
    }

    fn prune(&mut self, counts_before_prune: &[usize]) {
        let keep: Vec<usize> = counts_before_prune
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, _)| i)
            .collect();
        self.accumulators = keep.iter().map(|&i| self.accumulators[i].clone()).collect();
        self.sizes = keep.iter().map(|&i| self.sizes[i]).collect();
        self.touched = vec![true; keep.len()];
        self.previous = vec![Vector::sparse(vec![], vec![]).unwrap(); keep.len()];
    }
}
