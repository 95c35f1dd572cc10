//! In-memory vector index with cosine similarity search.
//!
//! Mirrors the query semantics of the managed backend (descending score,
//! label `$in` filter) without any persistence. Contents are lost on restart.

use std::sync::RwLock;

use super::{IndexError, Match, ProblemRecord, VectorIndex};

pub struct MemoryIndex {
    records: RwLock<Vec<ProblemRecord>>,
    /// Expected embedding dimensions
    dimensions: usize,
}

impl MemoryIndex {
    /// Create a new empty index with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            dimensions,
        }
    }

    /// Get the number of records in the index.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute L2 norm of a vector.
    fn l2_norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Compute cosine similarity between two vectors.
    /// Assumes query_norm is precomputed for efficiency.
    fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
        let target_norm = Self::l2_norm(target);
        if target_norm < f32::EPSILON || query_norm < f32::EPSILON {
            return 0.0;
        }

        let dot_product: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
        dot_product / (query_norm * target_norm)
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert(&self, record: ProblemRecord) -> Result<(), IndexError> {
        if record.values.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: record.values.len(),
            });
        }

        let mut records = self.records.write().expect("records lock poisoned");

        // upsert semantics: replace an existing record with the same id
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            records.push(record);
        }

        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&[String]>,
    ) -> Result<Vec<Match>, IndexError> {
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }

        let query_norm = Self::l2_norm(vector);
        let records = self.records.read().expect("records lock poisoned");

        let mut matches: Vec<Match> = records
            .iter()
            .filter(|record| {
                // `$in` semantics: an empty filter list admits nothing
                filter
                    .map(|labels| record.metadata.labels.iter().any(|l| labels.contains(l)))
                    .unwrap_or(true)
            })
            .map(|record| Match {
                id: record.id.clone(),
                score: Self::cosine_similarity(vector, &record.values, query_norm),
                metadata: record.metadata.clone(),
            })
            .collect();

        // Sort by score descending
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);

        Ok(matches)
    }
}
