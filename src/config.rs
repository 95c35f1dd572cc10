use serde::{Deserialize, Serialize};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Default embedding model; produces 384-dimension vectors
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Minimum similarity score for a match to contribute labels
const DEFAULT_LABEL_THRESHOLD: f32 = 0.74;
/// Neighbors examined during label assignment
const DEFAULT_LABEL_TOP_K: usize = 4;
/// Above this score a text-identical neighbor counts as a duplicate
const DEFAULT_DEDUP_THRESHOLD: f32 = 0.96;
/// Neighbors returned by similar-problem search
const DEFAULT_SEARCH_TOP_K: usize = 3;

const DEFAULT_INDEX_NAME: &str = "myindex";
const DEFAULT_INDEX_CLOUD: &str = "aws";
const DEFAULT_INDEX_REGION: &str = "us-east-1";
const DEFAULT_DIMENSION: usize = 384;

/// Configuration for the local embedding model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Directory to cache downloaded model files (models/ subdirectory)
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            cache_dir: ".".to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_cache_dir() -> String {
    ".".to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

/// Configuration for label assignment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabelingConfig {
    /// Minimum similarity score [0.0, 1.0] for a neighbor to contribute labels
    #[serde(default = "default_label_threshold")]
    pub threshold: f32,

    /// Number of neighbors to examine
    #[serde(default = "default_label_top_k")]
    pub top_k: usize,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LABEL_THRESHOLD,
            top_k: DEFAULT_LABEL_TOP_K,
        }
    }
}

fn default_label_threshold() -> f32 {
    DEFAULT_LABEL_THRESHOLD
}

fn default_label_top_k() -> usize {
    DEFAULT_LABEL_TOP_K
}

/// Configuration for duplicate suppression on store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Score above which a text-identical top-1 neighbor is treated as a duplicate
    #[serde(default = "default_dedup_threshold")]
    pub threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DEDUP_THRESHOLD,
        }
    }
}

fn default_dedup_threshold() -> f32 {
    DEFAULT_DEDUP_THRESHOLD
}

/// Configuration for filtered similarity search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of neighbors to return
    #[serde(default = "default_search_top_k")]
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_SEARCH_TOP_K,
        }
    }
}

fn default_search_top_k() -> usize {
    DEFAULT_SEARCH_TOP_K
}

/// Which vector index backend to use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// In-process index, lost on restart. For local runs and tests.
    Memory,
    /// Managed serverless index reached over REST.
    Pinecone,
}

/// Configuration for the vector index
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_backend")]
    pub backend: IndexBackend,

    #[serde(default = "default_index_name")]
    pub name: String,

    #[serde(default = "default_index_cloud")]
    pub cloud: String,

    #[serde(default = "default_index_region")]
    pub region: String,

    /// Embedding vector dimension; must match the embedding model
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Memory,
            name: DEFAULT_INDEX_NAME.to_string(),
            cloud: DEFAULT_INDEX_CLOUD.to_string(),
            region: DEFAULT_INDEX_REGION.to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }
}

fn default_index_backend() -> IndexBackend {
    IndexBackend::Memory
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_index_cloud() -> String {
    DEFAULT_INDEX_CLOUD.to_string()
}

fn default_index_region() -> String {
    DEFAULT_INDEX_REGION.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            embedding: EmbeddingConfig::default(),
            labeling: LabelingConfig::default(),
            dedup: DedupConfig::default(),
            search: SearchConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl Config {
    fn validate(&self) {
        if !(0.0..=1.0).contains(&self.labeling.threshold) {
            panic!(
                "labeling.threshold must be between 0.0 and 1.0, got {}",
                self.labeling.threshold
            );
        }

        if !(0.0..=1.0).contains(&self.dedup.threshold) {
            panic!(
                "dedup.threshold must be between 0.0 and 1.0, got {}",
                self.dedup.threshold
            );
        }

        if self.labeling.top_k == 0 {
            panic!("labeling.top_k must be greater than 0");
        }

        if self.search.top_k == 0 {
            panic!("search.top_k must be greater than 0");
        }

        if self.index.dimension == 0 {
            panic!("index.dimension must be greater than 0");
        }

        if self.embedding.download_timeout_secs == 0 {
            panic!("embedding.download_timeout_secs must be greater than 0");
        }
    }

    pub fn load_with(path: &str) -> Self {
        // create new if does not exist
        if !std::path::Path::new(path).exists() {
            std::fs::write(path, serde_yml::to_string(&Self::default()).unwrap())
                .expect("failed to write default config");
        }

        let config_str = std::fs::read_to_string(path).expect("failed to read config file");
        let config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            std::fs::write(path, serde_yml::to_string(&config).unwrap())
                .expect("failed to write config file");
        }

        config
    }
}
