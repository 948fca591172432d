//! Deterministic bag-of-words embedder.
//!
//! Each lowercase alphanumeric token is hashed with blake3 into one of
//! `dimension` buckets; the bucket counts are L2-normalized. Counts are
//! never negative, so two texts sharing a token always score above zero.
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::embedding::Embedder;
use crate::error::EmbeddingError;

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"[a-z0-9]+").unwrap();
}

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.dimension as u64) as usize
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for token in TOKEN_REGEX.find_iter(&lowered) {
            vector[self.bucket(token.as_str())] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing-bow"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}
