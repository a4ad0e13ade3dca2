//! Embedding value type.

use serde::{Deserialize, Serialize};

/// A unit-normalized embedding vector.
///
/// Normalization happens once at construction so cosine similarity
/// reduces to a dot product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    /// Build an embedding, normalizing to unit length. A zero vector is
    /// kept as-is.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values }
    }

    /// Wrap a vector that is already unit-normalized.
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Cosine similarity in [-1, 1]. Mismatched dimensions score 0.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}
