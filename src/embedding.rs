//! Embedding providers
//!
//! Two logical providers coexist: a node provider embedding paragraph and
//! query text (dimension `node_embedding_dim`), and a relation provider
//! embedding containment contexts (dimension `relation_embedding_dim`).
//!
//! Uses a trait-based backend (`Embedder`) so production code can use
//! fastembed-rs while tests use deterministic table-driven embedders. A
//! provider must be deterministic for a given text; vectors are normalized
//! by the caller before cosine scoring.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::LexGraphConfig;
use crate::error::{RetrievalError, RetrievalResult};

/// Error type for embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedding model returned no results
    #[error("embedding returned no results")]
    EmptyResult,

    /// Model loading or inference failed
    #[error("embedding model error: {0}")]
    ModelError(String),

    /// The provider is temporarily unreachable
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// The input exceeds the provider's size limit
    #[error("input of {length} chars exceeds the provider limit of {limit}")]
    OversizeInput { length: usize, limit: usize },
}

/// Trait for embedding text into vectors.
///
/// Implementations handle model loading and inference; calls may cross a
/// process boundary and therefore suspend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimension of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, returning one vector per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors.pop().ok_or(EmbeddingError::EmptyResult)
    }
}

/// The node/relation provider pair the engine runs with.
#[derive(Clone)]
pub struct EmbeddingProviders {
    pub node: Arc<dyn Embedder>,
    pub relation: Arc<dyn Embedder>,
}

impl EmbeddingProviders {
    pub fn new(node: Arc<dyn Embedder>, relation: Arc<dyn Embedder>) -> Self {
        Self { node, relation }
    }

    /// Check provider dimensions against the configuration.
    ///
    /// A mismatch is a programmer error and fails at startup, never per query.
    pub fn validate(&self, config: &LexGraphConfig) -> RetrievalResult<()> {
        if self.node.dimension() != config.node_embedding_dim {
            return Err(RetrievalError::ConfigInvalid(format!(
                "node provider produces {}-dim vectors, config expects {}",
                self.node.dimension(),
                config.node_embedding_dim
            )));
        }
        if self.relation.dimension() != config.relation_embedding_dim {
            return Err(RetrievalError::ConfigInvalid(format!(
                "relation provider produces {}-dim vectors, config expects {}",
                self.relation.dimension(),
                config.relation_embedding_dim
            )));
        }
        Ok(())
    }
}

/// Cosine similarity between two vectors.
///
/// Returns `None` for zero-norm inputs or a non-finite result, so degenerate
/// vectors surface as a skipped edge rather than a NaN cost.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let sim = dot / (norm_a * norm_b);
    sim.is_finite().then_some(sim)
}

/// Normalize a vector to unit length in place. Zero vectors are left as-is.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// FastEmbedEmbedder — production embedder behind `embeddings` feature
// ---------------------------------------------------------------------------

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{Embedder, EmbeddingError};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Production embedder backed by fastembed (ONNX Runtime).
    ///
    /// Wraps `fastembed::TextEmbedding` in a `Mutex` because its `embed`
    /// method requires `&mut self`, while the `Embedder` trait uses `&self`.
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
        dimension: usize,
    }

    impl FastEmbedEmbedder {
        /// Create a new FastEmbedEmbedder with a specific model.
        pub fn new(model: EmbeddingModel, dimension: usize) -> Result<Self, EmbeddingError> {
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            Ok(Self {
                model: Mutex::new(embedding),
                dimension,
            })
        }

        /// Create a FastEmbedEmbedder with the default multilingual model.
        pub fn default_model() -> Result<Self, EmbeddingError> {
            Self::new(EmbeddingModel::MultilingualE5Base, 768)
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedEmbedder {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
            let mut model = self.model.lock().map_err(|_| {
                EmbeddingError::ModelError("embedding model mutex poisoned".to_string())
            })?;
            let embeddings = model
                .embed(owned, None)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            if embeddings.is_empty() {
                return Err(EmbeddingError::EmptyResult);
            }
            Ok(embeddings)
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;
