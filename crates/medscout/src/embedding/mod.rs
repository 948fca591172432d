//! Text embedding backends.
//!
//! The store treats embedding as an opaque text -> fixed-length vector call;
//! [`LlamaEmbedder`] reaches a llama-server style `/v1/embeddings` endpoint
//! and [`HashingEmbedder`] is a deterministic offline stand-in.
pub mod hashing;
pub mod llama;

pub use hashing::HashingEmbedder;
pub use llama::LlamaEmbedder;

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Default output dimension assumed by the storage schema
pub const EMBEDDING_DIM: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
