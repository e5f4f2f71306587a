//! k-Means and Spherical k-Means clustering over dense and sparse vectors.
//!
//! The crate is organized around a storage-agnostic [`vector::Vector`]
//! type, a layered upper-bound dot-product index
//! ([`index::DotProductIndex`]) that makes nearest-centroid assignment
//! sub-linear for high-dimensional sparse data, and two drivers built on
//! top of both: [`cluster::kmeans::KMeans`] and
//! [`cluster::dbscan::DbScan`].
//!
//! # Design
//!
//! - **Dense mode** clusters under squared Euclidean distance with
//!   k-means++ seeding and a full centroid recompute each iteration.
//! - **Spherical mode** clusters sparse, unit-length vectors under cosine
//!   distance. Nearest-centroid assignment is delegated to
//!   [`index::DotProductIndex`], which exploits Cauchy-Schwarz to prune
//!   centroids that cannot beat the current best match, and centroid
//!   updates apply a differential accumulator instead of summing every
//!   point from scratch when few labels changed.
//! - **DBSCAN** reuses the same index to compute neighborhoods for
//!   cosine-mode sparse data, falling back to an exhaustive scan
//!   otherwise.
//!
//! # Quick start
//!
//! ```
//! use kmeans_core::prelude::*;
//!
//! let mut data = vec![
//!     Vector::dense(vec![0.0, 0.0]),
//!     Vector::dense(vec![0.1, -0.1]),
//!     Vector::dense(vec![10.0, 10.0]),
//!     Vector::dense(vec![9.8, 10.2]),
//! ];
//!
//! let kmeans = KMeans::new(KMeansConfig::new());
//! let (labels, centroids) = kmeans.cluster(&mut data, 2, 4).unwrap();
//!
//! assert_eq!(centroids.len(), 2);
//! assert_eq!(labels[0], labels[1]);
//! assert_eq!(labels[2], labels[3]);
//! assert_ne!(labels[0], labels[2]);
//! ```
//!
//! Sparse, cosine-geometry data is clustered the same way, just with
//! `with_spherical(true)` and [`vector::Vector::sparse`] inputs.

pub mod cluster;
pub mod config;
pub mod error;
pub mod index;
#[cfg(feature = "persistence")]
pub mod persistence;
pub mod simd;
pub mod vector;

pub use error::{ClusterError, Result};

/// Re-exports of the crate's public surface, for `use kmeans_core::prelude::*;`.
pub mod prelude {
    pub use crate::cluster::dbscan::DbScan;
    pub use crate::cluster::get_cluster_counts;
    pub use crate::cluster::kmeans::KMeans;
    pub use crate::config::{DbscanConfig, DistanceMethod, KMeansConfig};
    pub use crate::error::{ClusterError, Result};
    pub use crate::index::DotProductIndex;
    pub use crate::vector::{DenseVector, SparseVector, Vector};
}
