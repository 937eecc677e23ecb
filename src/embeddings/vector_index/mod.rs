#[cfg(test)]
mod tests;

use tracing::debug;

use super::Embedding;
use crate::{CinemateError, Result};

/// Vectors ready to be written as a flat L2 index.
///
/// Row `i` of the index belongs to row `i` of the metadata it is persisted with.
/// All vectors share one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Embedding>,
}

impl VectorIndex {
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[inline]
    pub fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }

    /// Row-major copy of every vector, as stored in a fixed-size list column
    #[inline]
    pub fn flat_values(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.vectors.len() * self.dimension);
        for vector in &self.vectors {
            flat.extend_from_slice(vector);
        }
        flat
    }
}

/// Build a flat index over `vectors`, keeping their order.
///
/// Fails with [`CinemateError::DimensionMismatch`] on the first vector whose
/// length differs from the first one.
#[inline]
pub fn build_index(vectors: Vec<Embedding>) -> Result<VectorIndex> {
    let dimension = vectors.first().map_or(0, Vec::len);

    if !vectors.is_empty() && dimension == 0 {
        return Err(CinemateError::InvalidInput(
            "cannot index zero-length vectors".to_string(),
        ));
    }

    if let Some((row, vector)) = vectors
        .iter()
        .enumerate()
        .find(|(_, v)| v.len() != dimension)
    {
        return Err(CinemateError::DimensionMismatch {
            row,
            expected: dimension,
            found: vector.len(),
        });
    }

    debug!(
        "Built flat index with {} vectors of dimension {}",
        vectors.len(),
        dimension
    );

    Ok(VectorIndex { dimension, vectors })
}
