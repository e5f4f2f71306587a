//! DBSCAN built on the same upper-bound dot-product index, for sparse
//! unit-length inputs under cosine distance (or plain squared Euclidean,
//! selectable via [`crate::config::DistanceMethod`]).

use rayon::prelude::*;

use crate::config::{DbscanConfig, DistanceMethod};
use crate::error::{ClusterError, Result};
use crate::index::DotProductIndex;
use crate::vector::Vector;

const NOISE: i64 = -1;

pub struct DbScan {
    pub config: DbscanConfig,
}

impl DbScan {
    pub fn new(config: DbscanConfig) -> Self {
        DbScan { config }
    }

    /// Cluster `data`; returns a label per point (`-1` for noise) and the
    /// size of each non-noise cluster.
    pub fn cluster(&self, data: &[Vector]) -> Result<(Vec<i64>, Vec<usize>)> {
        if data.is_empty() {
            return Err(ClusterError::EmptyData);
        }

        let all_sparse = data.iter().all(Vector::is_sparse);
        let threshold = 1.0 - self.config.max_distance;

        let neighbors: Vec<Vec<usize>> = if all_sparse
            && matches!(self.config.distance_method, DistanceMethod::Cosine)
        {
            self.neighbors_via_index(data, threshold)?
        } else {
            self.neighbors_exhaustive(data)?
        };

        let is_core: Vec<bool> = neighbors
            .iter()
            .map(|n| n.len() + 1 >= self.config.min_num_samples)
            .collect();

        let mut labels = vec![NOISE; data.len()];
        let mut next_cluster = 0i64;

        for start in 0..data.len() {
            if labels[start] != NOISE || !is_core[start] {
                continue;
            }
            let cluster_id = next_cluster;
            next_cluster += 1;

            let mut stack = vec![start];
            labels[start] = cluster_id;

            while let Some(p) = stack.pop() {
                if !is_core[p] {
                    continue;
                }
                for &q in &neighbors[p] {
                    if labels[q] == NOISE {
                        labels[q] = cluster_id;
                        if is_core[q] {
                            stack.push(q);
                        }
                    }
                }
            }
        }

        let k = next_cluster.max(0) as usize;
        let mut sizes = vec![0usize; k];
        for &l in &labels {
            if l != NOISE {
                sizes[l as usize] += 1;
            }
        }

        Ok((labels, sizes))
    }

    fn neighbors_exhaustive(&self, data: &[Vector]) -> Result<Vec<Vec<usize>>> {
        let method = self.config.distance_method;
        let max_distance = self.config.max_distance;
        (0..data.len())
            .into_par_iter()
            .map(|i| -> Result<Vec<usize>> {
                let mut neighbors = Vec::new();
                for j in 0..data.len() {
                    if i == j {
                        continue;
                    }
                    let d = match method {
                        DistanceMethod::Euclidean => {
                            data[i].squared_euclidean_distance(&data[j])?
                        }
                        DistanceMethod::Cosine => data[i].cosine_distance(&data[j])?,
                    };
                    if d <= max_distance {
                        neighbors.push(j);
                    }
                }
                Ok(neighbors)
            })
            .collect()
    }

    fn neighbors_via_index(&self, data: &[Vector], threshold: f32) -> Result<Vec<Vec<usize>>> {
        let mut index = DotProductIndex::new(vec![0.0, threshold.max(0.0)])?;
        for (i, v) in data.iter().enumerate() {
            index.add(v.as_sparse().expect("checked all_sparse above"), i as u32)?;
        }

        (0..data.len())
            .into_par_iter()
            .map(|i| -> Result<Vec<usize>> {
                let q = data[i].as_sparse().expect("checked all_sparse above");
                let candidates = index.nearby(q, threshold.max(0.0))?;
                let mut neighbors = Vec::new();
                for id in candidates {
                    let j = id as usize;
                    if j == i {
                        continue;
                    }
                    if data[i].cosine_distance(&data[j])? <= self.config.max_distance {
                        neighbors.push(j);
                    }
                }
                Ok(neighbors)
            })
            .collect()
    }
}
