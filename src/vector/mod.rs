//! Dense/sparse vector abstraction, SIMD-backed arithmetic, and the sparse
//! coordinate hash index.

mod cache;
pub mod dense;
mod hash_index;
pub mod sparse;

use std::collections::HashMap;

pub use dense::DenseVector;
pub use sparse::SparseVector;

use crate::error::{ClusterError, Result};

/// Either a dense or sparse vector. Most call sites operate through this
/// enum rather than the concrete `DenseVector`/`SparseVector` types so that
/// `KMeans`/`DbScan` can accept either storage uniformly.
#[derive(Debug, Clone)]
pub enum Vector {
    Dense(DenseVector),
    Sparse(SparseVector),
}

impl Vector {
    pub fn dense(values: Vec<f32>) -> Self {
        Vector::Dense(DenseVector::new(values))
    }

    pub fn sparse(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        Ok(Vector::Sparse(SparseVector::new(indices, values)?))
    }

    pub fn sparse_from_mapping(map: &HashMap<u32, f32>) -> Self {
        Vector::Sparse(SparseVector::from_mapping(map))
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Vector::Sparse(_))
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Vector::Dense(_))
    }

    pub fn as_dense(&self) -> Option<&DenseVector> {
        match self {
            Vector::Dense(d) => Some(d),
            Vector::Sparse(_) => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseVector> {
        match self {
            Vector::Sparse(s) => Some(s),
            Vector::Dense(_) => None,
        }
    }

    pub fn squared_sum(&self) -> f32 {
        match self {
            Vector::Dense(d) => d.squared_sum(),
            Vector::Sparse(s) => s.squared_sum(),
        }
    }

    pub fn max_abs_value(&self) -> f32 {
        match self {
            Vector::Dense(d) => d.max_abs_value(),
            Vector::Sparse(s) => s.max_abs_value(),
        }
    }

    pub fn is_unit_length(&self) -> bool {
        match self {
            Vector::Dense(d) => d.is_unit_length(),
            Vector::Sparse(s) => s.is_unit_length(),
        }
    }

    pub fn multiply_with(&mut self, s: f32) {
        match self {
            Vector::Dense(d) => d.multiply_with(s),
            Vector::Sparse(s_) => s_.multiply_with(s),
        }
    }

    pub fn divide_by(&mut self, s: f32) -> Result<()> {
        match self {
            Vector::Dense(d) => d.divide_by(s),
            Vector::Sparse(s_) => s_.divide_by(s),
        }
    }

    pub fn normalize_as_unit_vector(&mut self) {
        match self {
            Vector::Dense(d) => d.normalize_as_unit_vector(),
            Vector::Sparse(s) => s.normalize_as_unit_vector(),
        }
    }

    /// Dot product, dispatching on the storage combination of `self` and
    /// `other`. Fails on a dense/sparse mismatch only when shapes can't be
    /// reconciled implicitly (dense↔sparse is handled directly).
    pub fn dot_product(&self, other: &Vector) -> Result<f32> {
        match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => Ok(a.dot_product(b)),
            (Vector::Sparse(a), Vector::Sparse(b)) => Ok(a.dot_product(b)),
            (Vector::Sparse(a), Vector::Dense(b)) => Ok(a.dot_product_dense(b)),
            (Vector::Dense(a), Vector::Sparse(b)) => Ok(b.dot_product_dense(a)),
        }
    }

    pub fn squared_euclidean_distance(&self, other: &Vector) -> Result<f32> {
        match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => Ok(a.squared_euclidean_distance(b)),
            (Vector::Sparse(a), Vector::Sparse(b)) => Ok(a.squared_euclidean_distance(b)),
            (Vector::Sparse(a), Vector::Dense(b)) => {
                let dim = b.dim();
                Ok(a.to_dense(dim).squared_euclidean_distance(b))
            }
            (Vector::Dense(a), Vector::Sparse(b)) => {
                let dim = a.dim();
                Ok(a.squared_euclidean_distance(&b.to_dense(dim)))
            }
        }
    }

    pub fn cosine_distance(&self, other: &Vector) -> Result<f32> {
        if !self.is_unit_length() || !other.is_unit_length() {
            return Err(ClusterError::NonUnitVectorIndexed);
        }
        Ok(1.0 - self.dot_product(other)?)
    }

    pub fn to_sparse(&self, eps: f32) -> SparseVector {
        match self {
            Vector::Dense(d) => d.to_sparse(eps),
            Vector::Sparse(s) => s.clone(),
        }
    }

    pub fn to_dense(&self, size: usize) -> DenseVector {
        match self {
            Vector::Dense(d) => d.clone(),
            Vector::Sparse(s) => s.to_dense(size),
        }
    }

    /// Max-norm comparison across any combination of dense/sparse shapes.
    pub fn value_equals(&self, other: &Vector, eps: f32) -> bool {
        match (self, other) {
            (Vector::Dense(a), Vector::Dense(b)) => a.value_equals(b, eps),
            (Vector::Sparse(a), Vector::Sparse(b)) => a.value_equals(b, eps),
            (Vector::Sparse(a), Vector::Dense(b)) => a.value_equals_dense(b, eps),
            (Vector::Dense(a), Vector::Sparse(b)) => b.value_equals_dense(a, eps),
        }
    }
}
