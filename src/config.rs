//! Builder-style configuration for the k-Means and DBSCAN drivers.

/// Distance method used by [`crate::cluster::dbscan::DbScan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMethod {
    Euclidean,
    Cosine,
}

/// Tunables for [`crate::cluster::kmeans::KMeans`]. Defaults match the
/// reference system's observed behavior.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub plus_plus_init: bool,
    pub spherical: bool,
    pub clusters_changed_map: bool,
    pub indexed_means: bool,
    pub sampling_ratio: f32,
    pub max_changes_for_differential: usize,
    pub convergence_tolerance: f32,
    pub min_clusters_for_indexed_means: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig {
            plus_plus_init: true,
            spherical: false,
            clusters_changed_map: true,
            indexed_means: true,
            sampling_ratio: 1.0,
            max_changes_for_differential: 1000,
            convergence_tolerance: 1e-4,
            min_clusters_for_indexed_means: 120,
        }
    }
}

impl KMeansConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plus_plus_init(mut self, value: bool) -> Self {
        self.plus_plus_init = value;
        self
    }

    pub fn with_spherical(mut self, value: bool) -> Self {
        self.spherical = value;
        self
    }

    pub fn with_clusters_changed_map(mut self, value: bool) -> Self {
        self.clusters_changed_map = value;
        self
    }

    pub fn with_indexed_means(mut self, value: bool) -> Self {
        self.indexed_means = value;
        self
    }

    pub fn with_sampling_ratio(mut self, value: f32) -> Self {
        self.sampling_ratio = value;
        self
    }

    pub fn with_max_changes_for_differential(mut self, value: usize) -> Self {
        self.max_changes_for_differential = value;
        self
    }

    pub fn with_convergence_tolerance(mut self, value: f32) -> Self {
        self.convergence_tolerance = value;
        self
    }

    pub fn with_min_clusters_for_indexed_means(mut self, value: usize) -> Self {
        self.min_clusters_for_indexed_means = value;
        self
    }
}

/// Tunables for [`crate::cluster::dbscan::DbScan`].
#[derive(Debug, Clone)]
pub struct DbscanConfig {
    pub max_distance: f32,
    pub min_num_samples: usize,
    pub distance_method: DistanceMethod,
}

impl Default for DbscanConfig {
    fn default() -> Self {
        DbscanConfig {
            max_distance: 0.5,
            min_num_samples: 5,
            distance_method: DistanceMethod::Cosine,
        }
    }
}

impl DbscanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_distance(mut self, value: f32) -> Self {
        self.max_distance = value;
        self
    }

    pub fn with_min_num_samples(mut self, value: usize) -> Self {
        self.min_num_samples = value;
        self
    }

    pub fn with_distance_method(mut self, value: DistanceMethod) -> Self {
        self.distance_method = value;
        self
    }
}
