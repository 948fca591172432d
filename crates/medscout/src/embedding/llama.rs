//! HTTP embedder for llama-server compatible `/v1/embeddings` endpoints
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::error::EmbeddingError;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct LlamaEmbedder {
    backend_url: String,
    model: String,
    dimension: usize,
    http_client: reqwest::Client,
}

impl LlamaEmbedder {
    pub fn new(
        backend_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let backend_url = backend_url.into().trim_end_matches('/').to_string();
        info!("Embedding backend: {}", backend_url);
        Ok(Self {
            backend_url,
            model: model.into(),
            dimension,
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.backend_url)
    }
}

#[async_trait]
impl Embedder for LlamaEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };
        let response = self
            .http_client
            .post(self.embeddings_url())
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }
        let embedding_response: EmbeddingResponse = response.json().await?;
        let embedding = embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::Empty)?;
        debug!("Generated embedding (dim={})", embedding.len());
        Ok(embedding)
    }
}
