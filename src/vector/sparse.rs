//! Sparse vector storage: only non-zero coordinates kept, indexed for O(1)
//! expected random lookup by coordinate.

use std::collections::HashMap;

use crate::error::{ClusterError, Result};
use crate::simd;
use crate::vector::cache::Cached;
use crate::vector::dense::DenseVector;
use crate::vector::hash_index::CoordIndex;

/// Parallel `(coordinate, value)` arrays, sorted ascending by coordinate with
/// unique coordinates, plus a hash index for O(1) expected `value_at`.
#[derive(Debug)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
    index: CoordIndex,
    squared_sum: Cached<f32>,
    max_abs_value: Cached<f32>,
    is_unit: Cached<bool>,
}

impl SparseVector {
    /// Build from parallel `(index, value)` arrays in any order. Fails if any
    /// coordinate repeats.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        assert_eq!(
            indices.len(),
            values.len(),
            "indices and values must be the same length"
        );

        let mut pairs: Vec<(u32, f32)> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|(idx, _)| *idx);

        for w in pairs.windows(2) {
            if w[0].0 == w[1].0 {
                return Err(ClusterError::DuplicateSparseIndex(w[0].0));
            }
        }

        let (indices, values): (Vec<u32>, Vec<f32>) = pairs.into_iter().unzip();
        let index = CoordIndex::build(&indices);

        Ok(SparseVector {
            indices,
            values,
            index,
            squared_sum: Cached::new(0.0),
            max_abs_value: Cached::new(0.0),
            is_unit: Cached::new(false),
        })
    }

    /// Build from a coordinate → value mapping (duplicate keys impossible by
    /// construction, so this constructor cannot fail).
    pub fn from_mapping(map: &HashMap<u32, f32>) -> Self {
        let mut pairs: Vec<(u32, f32)> = map.iter().map(|(&k, &v)| (k, v)).collect();
        pairs.sort_by_key(|(idx, _)| *idx);
        let (indices, values): (Vec<u32>, Vec<f32>) = pairs.into_iter().unzip();
        let index = CoordIndex::build(&indices);
        SparseVector {
            indices,
            values,
            index,
            squared_sum: Cached::new(0.0),
            max_abs_value: Cached::new(0.0),
            is_unit: Cached::new(false),
        }
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    fn position_of(&self, coord: u32) -> Option<u32> {
        self.index.position_of(coord, &self.indices)
    }

    /// O(1) expected lookup; coordinates the vector doesn't carry are zero.
    #[inline]
    pub fn value_at(&self, coord: u32) -> f32 {
        match self.position_of(coord) {
            Some(pos) => self.values[pos as usize],
            None => 0.0,
        }
    }

    /// Overwrite the value at `coord`, which must already be one of this
    /// vector's coordinates — a sparse vector cannot gain new non-zero
    /// coordinates after construction. Invalidates cached aggregates.
    pub fn set(&mut self, coord: u32, value: f32) -> Result<()> {
        match self.position_of(coord) {
            Some(pos) => {
                self.values[pos as usize] = value;
                self.invalidate_caches();
                Ok(())
            }
            None => Err(ClusterError::MissingAccumulatorCoordinate(coord)),
        }
    }

    pub fn squared_sum(&self) -> f32 {
        let values = &self.values;
        self.squared_sum.get_or_compute(|| simd::squared_sum(values))
    }

    pub fn max_abs_value(&self) -> f32 {
        let values = &self.values;
        self.max_abs_value
            .get_or_compute(|| values.iter().fold(0.0_f32, |acc, v| acc.max(v.abs())))
    }

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

    /// Iterate the smaller operand's coordinates and probe the larger's hash
    /// index, bounding work to `min(|self|, |other|)`.
    pub fn dot_product(&self, other: &SparseVector) -> f32 {
        simd::sparse_dot(&self.indices, &self.values, &other.indices, &other.values)
    }

    /// Sparse × (coordinate → value) dot product, probing `other`'s hash
    /// index for each of `self`'s coordinates.
    pub fn dot_product_dense(&self, other: &DenseVector) -> f32 {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&c, &v)| v * other.value_at(c as usize))
            .sum()
    }

    /// Starts from the larger operand's squared sum and walks the smaller
    /// operand's coordinates, replacing each shared term: subtract the
    /// larger's `vᵢ²` and add `(aᵢ - bᵢ)²`. Clamped to 0 to cancel rounding.
    pub fn squared_euclidean_distance(&self, other: &SparseVector) -> f32 {
        let (smaller, larger) = if self.nnz() <= other.nnz() {
            (self, other)
        } else {
            (other, self)
        };

        let mut total = larger.squared_sum();
        for (k, &coord) in smaller.indices.iter().enumerate() {
            let s_val = smaller.values[k];
            let l_val = larger.value_at(coord);
            total -= l_val * l_val;
            let diff = s_val - l_val;
            total += diff * diff;
        }
        total.max(0.0)
    }

    /// `1 - dot_product(other)`; both vectors must already be unit-length.
    pub fn cosine_distance(&self, other: &SparseVector) -> Result<f32> {
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

    pub fn to_dense(&self, size: usize) -> DenseVector {
        let mut values = vec![0.0_f32; size];
        for (&coord, &v) in self.indices.iter().zip(self.values.iter()) {
            if (coord as usize) < size {
                values[coord as usize] = v;
            }
        }
        DenseVector::new(values)
    }

    pub fn value_equals(&self, other: &SparseVector, eps: f32) -> bool {
        for (&coord, &v) in self.indices.iter().zip(self.values.iter()) {
            if (v - other.value_at(coord)).abs() > eps {
                return false;
            }
        }
        // Coverage in the other direction: coordinates `other` has that
        // `self` is implicitly zero at.
        for (&coord, &v) in other.indices.iter().zip(other.values.iter()) {
            if (v - self.value_at(coord)).abs() > eps {
                return false;
            }
        }
        true
    }

    pub fn value_equals_dense(&self, other: &DenseVector, eps: f32) -> bool {
        for (&coord, &v) in self.indices.iter().zip(self.values.iter()) {
            if (v - other.value_at(coord as usize)).abs() > eps {
                return false;
            }
        }
        for i in 0..other.dim() {
            if !self.indices.contains(&(i as u32)) && other.value_at(i).abs() > eps {
                return false;
            }
        }
        true
    }
}

impl Clone for SparseVector {
    fn clone(&self) -> Self {
        SparseVector {
            indices: self.indices.clone(),
            values: self.values.clone(),
            index: self.index.clone(),
            squared_sum: self.squared_sum.clone(),
            max_abs_value: self.max_abs_value.clone(),
            is_unit: self.is_unit.clone(),
        }
    }
}
