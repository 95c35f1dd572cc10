//! Vector index abstraction.
//!
//! The nearest-neighbor search, persistence, and index construction are owned
//! by the backend; this module only defines the seam the policy layer talks
//! through.
//!
//! - `pinecone`: managed serverless index reached over REST
//! - `memory`: in-process cosine index for local runs and tests

mod memory;
mod pinecone;

pub use memory::MemoryIndex;
pub use pinecone::PineconeIndex;

use serde::{Deserialize, Deserializer, Serialize};

/// Metadata stored alongside every vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemMetadata {
    /// Original problem text, used for exact-duplicate and self-match checks
    #[serde(default)]
    pub text: String,

    /// Labels are always written as a list. Reads still tolerate a bare
    /// string persisted by older clients.
    #[serde(default, deserialize_with = "string_or_list")]
    pub labels: Vec<String>,
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Labels {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Labels::deserialize(deserializer)? {
        Labels::One(label) => vec![label],
        Labels::Many(labels) => labels,
    })
}

/// A record to be upserted into the index.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ProblemMetadata,
}

/// A transient query result. Exists only within a single request.
#[derive(Debug, Clone, Deserialize)]
pub struct Match {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: ProblemMetadata,
}

/// Errors from index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("index api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("index host missing for '{0}'")]
    MissingHost(String),

    #[error("http error: {0:?}")]
    Http(#[from] reqwest::Error),
}

/// Trait for vector index backends.
///
/// `query` returns matches ordered by descending similarity score. When
/// `filter` is given, only records whose stored labels intersect the filter
/// set are candidates.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, record: ProblemRecord) -> Result<(), IndexError>;

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&[String]>,
    ) -> Result<Vec<Match>, IndexError>;
}
