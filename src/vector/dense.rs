//! Dense vector storage: every coordinate held explicitly.

use crate::error::{ClusterError, Result};
use crate::simd;
use crate::vector::cache::Cached;

/// A fixed-dimension array of float values, coordinate `i` at position `i`.
#[derive(Debug)]
pub struct DenseVector {
    values: Vec<f32>,
    squared_sum: Cached<f32>,
    max_abs_value: Cached<f32>,
    is_unit: Cached<bool>,
}

impl DenseVector {
    pub fn new(values: Vec<f32>) -> Self {
        DenseVector {
            values,
            squared_sum: Cached::new(0.0),
            max_abs_value: Cached::new(0.0),
            is_unit: Cached::new(false),
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Bounds-checked lookup; out-of-range coordinates are implicitly zero.
    #[inline]
    pub fn value_at(&self, coord: usize) -> f32 {
        self.values.get(coord).copied().unwrap_or(0.0)
    }

    pub fn squared_sum(&self) -> f32 {
        let values = &self.values;
        self.squared_sum.get_or_compute(|| simd::squared_sum(values))
    }

    pub fn max_abs_value(&self) -> f32 {
        let values = &self.values;
        self.max_abs_value.get_or_compute(|| {
            values.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()))
        })
    }

    /// True within `2e-5` of a unit-length vector.
    pub fn is_unit_length(&self) -> bool {
        let squared = self.squared_sum();
        self.is_unit.get_or_compute(|| (squared - 1.0).abs() <= 2e-5)
    }

    fn invalidate_caches(&self) {
        self.squared_sum.invalidate();
        self.max_abs_value.invalidate();
        self.is_unit.invalidate();
    }

    pub fn multiply_with(&mut self, s: f32) {
        simd::scale_in_place(&mut self.values, s);
        self.invalidate_caches();
    }

    pub fn divide_by(&mut self, s: f32) -> Result<()> {
        if s == 0.0 {
            return Err(ClusterError::InvalidParameter(
                "divide_by called with zero divisor".into(),
            ));
        }
        self.multiply_with(1.0 / s);
        Ok(())
    }

    pub fn dot_product(&self, other: &DenseVector) -> f32 {
        simd::dot(&self.values, &other.values)
    }

    pub fn squared_euclidean_distance(&self, other: &DenseVector) -> f32 {
        simd::squared_euclidean_distance(&self.values, &other.values)
    }

    /// `1 - dot_product(other)`; both vectors must already be unit-length.
    pub fn cosine_distance(&self, other: &DenseVector) -> Result<f32> {
        if !self.is_unit_length() || !other.is_unit_length() {
            return Err(ClusterError::NonUnitVectorIndexed);
        }
        Ok(1.0 - self.dot_product(other))
    }

    /// No-op if already unit-length (within `2e-5`) or effectively zero.
    pub fn normalize_as_unit_vector(&mut self) {
        let squared = self.squared_sum();
        if squared < 1e-20 || (squared - 1.0).abs() <= 2e-5 {
            return;
        }
        let norm = squared.sqrt();
        self.multiply_with(1.0 / norm);
    }

    /// Convert to a sparse vector, dropping coordinates with `|value| < eps`.
    pub fn to_sparse(&self, eps: f32) -> super::sparse::SparseVector {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (i, &v) in self.values.iter().enumerate() {
            if v.abs() >= eps {
                indices.push(i as u32);
                values.push(v);
            }
        }
        super::sparse::SparseVector::new(indices, values)
            .expect("indices generated in ascending order from a dense scan are unique")
    }

    pub fn value_equals(&self, other: &DenseVector, eps: f32) -> bool {
        if self.values.len() != other.values.len() {
            return false;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Clone for DenseVector {
    fn clone(&self) -> Self {
        DenseVector {
            values: self.values.clone(),
            squared_sum: self.squared_sum.clone(),
            max_abs_value: self.max_abs_value.clone(),
            is_unit: self.is_unit.clone(),
        }
    }
}
