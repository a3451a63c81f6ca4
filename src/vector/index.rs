//! In-memory nearest-neighbor index over note embeddings.
//!
//! Exhaustive cosine search. Vaults hold thousands of notes, not millions, so
//! a linear scan per query is fast enough and keeps results exact.

use std::collections::HashMap;

/// Errors that can occur during index operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot index an empty vector")]
    EmptyVector,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: u64,
    /// Cosine distance, `1 - cos`; 0 is identical direction
    pub distance: f32,
}

/// Cosine-distance index keyed by note id.
///
/// The first inserted vector fixes the dimension for the index's lifetime.
#[derive(Debug, Default)]
pub struct NearestNeighborIndex {
    vectors: HashMap<u64, Vec<f32>>,
    dimensions: Option<usize>,
}

impl NearestNeighborIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension of indexed vectors, once known.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.vectors.contains_key(&id)
    }

    /// Insert or replace the vector for `id`.
    pub fn insert(&mut self, id: u64, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        self.check_dimensions(embedding.len())?;
        self.dimensions = Some(embedding.len());
        self.vectors.insert(id, embedding);
        Ok(())
    }

    /// The `k` nearest ids by cosine distance, nearest first.
    ///
    /// Equal distances are ordered by ascending id so results are stable.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimensions(query.len())?;

        let query_norm = l2_norm(query);
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .map(|(id, embedding)| Neighbor {
                id: *id,
                distance: cosine_distance(query, query_norm, embedding),
            })
            .collect();

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn check_dimensions(&self, got: usize) -> Result<(), IndexError> {
        match self.dimensions {
            Some(expected) if expected != got => {
                Err(IndexError::DimensionMismatch { expected, got })
            }
            _ => Ok(()),
        }
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// `1 - cos(query, target)`; a zero-norm side is orthogonal to everything.
fn cosine_distance(query: &[f32], query_norm: f32, target: &[f32]) -> f32 {
    let target_norm = l2_norm(target);
    if query_norm < f32::EPSILON || target_norm < f32::EPSILON {
        return 1.0;
    }
    let dot: f32 = query.iter().zip(target).map(|(a, b)| a * b).sum();
    1.0 - dot / (query_norm * target_norm)
}
