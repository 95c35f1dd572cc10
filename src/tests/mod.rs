//! Integration tests for the policy layer and the HTTP surface.
//!
//! These run against the in-memory index and a deterministic stub embedder,
//! so no model download or network access is needed.

mod web;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{Embedder, EmbeddingError};
use crate::index::MemoryIndex;
use crate::problems::ProblemBank;

/// Embedding dimension used throughout the tests.
pub const DIMS: usize = 4;

/// Deterministic embedder: known texts map to hand-built vectors, anything
/// else gets a stable hash-derived unit vector.
pub struct StubEmbedder {
    map: HashMap<String, Vec<f32>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), DIMS);
        self.map.insert(text.to_string(), vector);
        self
    }

    fn hash_vector(text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = Vec::with_capacity(DIMS);
        for i in 0..DIMS {
            let mut hasher = DefaultHasher::new();
            (text, i).hash(&mut hasher);
            vector.push((hasher.finish() % 2000) as f32 / 1000.0 - 1.0);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        vector.iter().map(|x| x / norm).collect()
    }
}

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .map
            .get(text)
            .cloned()
            .unwrap_or_else(|| Self::hash_vector(text)))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Build a bank over a fresh in-memory index, returning both so tests can
/// inspect the index directly.
pub fn test_bank(embedder: StubEmbedder) -> (ProblemBank, Arc<MemoryIndex>) {
    let mut config = Config::default();
    config.index.dimension = DIMS;

    let index = Arc::new(MemoryIndex::new(DIMS));
    let bank = ProblemBank::new(Arc::new(embedder), index.clone(), &config);

    (bank, index)
}
