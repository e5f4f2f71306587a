//! Error types for kmeans-core.

use std::fmt;

/// Errors that can occur while building vectors, indexing them, or running a
/// clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// A sparse vector was constructed with a repeated coordinate index.
    DuplicateSparseIndex(u32),
    /// Dense/sparse storage or dimension mismatch between operands.
    DimensionMismatch { expected: usize, actual: usize },
    /// Mixed dense and sparse vectors were passed to an operation that
    /// requires uniform storage (e.g. `KMeans::cluster`).
    MixedStorageLayout,
    /// A zero vector was added to a [`crate::index::DotProductIndex`].
    ZeroVectorIndexed,
    /// A non-unit-length vector was added to the index.
    NonUnitVectorIndexed,
    /// `nearby`/`k_nearest`/`nearest` was called with a negative threshold.
    NegativeThreshold(f32),
    /// The differential centroid update tried to subtract a coordinate that
    /// was never added to the accumulator. Indicates a bookkeeping bug
    /// upstream, not a user error.
    MissingAccumulatorCoordinate(u32),
    /// A numeric parameter was out of its valid range (e.g. `k < 1`).
    InvalidParameter(String),
    /// No data points were supplied.
    EmptyData,
    /// Other error (for extensibility).
    Other(String),
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterError::DuplicateSparseIndex(idx) => {
                write!(f, "duplicate sparse coordinate index: {}", idx)
            }
            ClusterError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            ClusterError::MixedStorageLayout => {
                write!(f, "mixed dense and sparse vectors in the same dataset")
            }
            ClusterError::ZeroVectorIndexed => write!(f, "zero vector added to index"),
            ClusterError::NonUnitVectorIndexed => write!(f, "non-unit vector added to index"),
            ClusterError::NegativeThreshold(lambda) => {
                write!(f, "negative threshold unsupported: {}", lambda)
            }
            ClusterError::MissingAccumulatorCoordinate(idx) => {
                write!(f, "subtract of absent coordinate: {}", idx)
            }
            ClusterError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            ClusterError::EmptyData => write!(f, "no data points supplied"),
            ClusterError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for ClusterError {}

pub type Result<T> = std::result::Result<T, ClusterError>;
