//! k-Means / Spherical k-Means driver and the DBSCAN variant built on the
//! same upper-bound index.

pub mod dbscan;
pub mod kmeans;

use crate::error::{ClusterError, Result};
use crate::vector::Vector;

pub use dbscan::DbScan;
pub use kmeans::KMeans;

/// Distance between a point and a centroid in the geometry the driver was
/// configured with (cosine for spherical, squared Euclidean otherwise).
pub(crate) fn point_distance(spherical: bool, point: &Vector, centroid: &Vector) -> Result<f32> {
    if spherical {
        point.cosine_distance(centroid)
    } else {
        point.squared_euclidean_distance(centroid)
    }
}

/// Confirm every vector in `data` is the same storage kind, and (for dense
/// storage) the same dimension. Returns `(is_sparse, dense_dim)`.
pub(crate) fn validate_uniform_storage(data: &[Vector]) -> Result<(bool, Option<usize>)> {
    if data.is_empty() {
        return Err(ClusterError::EmptyData);
    }
    let is_sparse = data[0].is_sparse();
    let dense_dim = data[0].as_dense().map(|d| d.dim());

    for v in data.iter() {
        if v.is_sparse() != is_sparse {
            return Err(ClusterError::MixedStorageLayout);
        }
        if let (Some(expected), Some(d)) = (dense_dim, v.as_dense()) {
            if d.dim() != expected {
                return Err(ClusterError::DimensionMismatch {
                    expected,
                    actual: d.dim(),
                });
            }
        }
    }

    Ok((is_sparse, dense_dim))
}

/// Sum, over every point, of its distance to its assigned centroid: cosine
/// for spherical, rooted (not squared) Euclidean otherwise. This differs
/// from [`point_distance`], which stays squared for seeding/assignment/
/// convergence — only run-selection scoring roots it.
pub(crate) fn distortion(
    spherical: bool,
    data: &[Vector],
    labels: &[usize],
    centroids: &[Vector],
) -> Result<f32> {
    let mut total = 0.0;
    for (x, &label) in data.iter().zip(labels.iter()) {
        let d = point_distance(spherical, x, &centroids[label])?;
        total += if spherical { d } else { d.sqrt() };
    }
    Ok(total)
}

/// Count of points assigned to each of the `k` clusters.
pub fn get_cluster_counts(labels: &[usize], k: usize) -> Vec<usize> {
    let mut counts = vec![0usize; k];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

/// Excise empty clusters and renumber the survivors consecutively in a
/// single pass. Returns the new centroid set and rewrites `labels` in
/// place.
pub(crate) fn prune_empty_clusters(
    centroids: Vec<Vector>,
    labels: &mut [usize],
) -> Vec<Vector> {
    let k = centroids.len();
    let counts = get_cluster_counts(labels, k);

    let mut remap = vec![usize::MAX; k];
    let mut next = 0usize;
    for (old, &count) in counts.iter().enumerate() {
        if count > 0 {
            remap[old] = next;
            next += 1;
        }
    }

    if next == k {
        return centroids;
    }

    for label in labels.iter_mut() {
        *label = remap[*label];
    }

    centroids
        .into_iter()
        .enumerate()
        .filter(|(old, _)| remap[*old] != usize::MAX)
        .map(|(_, c)| c)
        .collect()
}
