#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("text must not be empty")]
    EmptyText,

    #[error("invalid api key")]
    InvalidApiKey,

    #[error("malformed batch line (expected 'label1,label2:text'): {0:?}")]
    MalformedLine(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] crate::index::IndexError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
