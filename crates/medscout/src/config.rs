use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::embedding::EMBEDDING_DIM;
use crate::label_source::{openfda::DEFAULT_BASE_URL, DEFAULT_SEARCH_LIMIT};
use crate::retrieval::OrchestratorConfig;
use crate::similarity_store::{SimilarityStoreConfig, DEFAULT_ANN_MIN_ENTRIES, DEFAULT_SIMILARITY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// llama-server `/v1/embeddings`
    Llama,
    /// Offline bag-of-words hashing
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "llama" => Ok(EmbeddingBackend::Llama),
            "hashing" => Ok(EmbeddingBackend::Hashing),
            other => Err(anyhow!("Unknown EMBEDDING_BACKEND '{}': expected 'llama' or 'hashing'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub fda_api_key: String,
    pub fda_base_url: String,
    pub db_path: PathBuf,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub similarity_threshold: f32,
    pub search_limit: usize,
    pub external_limit: usize,
    pub http_timeout_seconds: u64,
    pub ann_min_entries: usize,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take defaults
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let fda_api_key = get("FDA_API_KEY")
            .context("FDA_API_KEY environment variable not set. Please set it in your .env file")?;

        let config = Self {
            fda_api_key,
            fda_base_url: get("FDA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            db_path: PathBuf::from(get("DB_PATH").unwrap_or_else(|| "data/medscout.db".into())),
            embedding_backend: get("EMBEDDING_BACKEND")
                .unwrap_or_else(|| "llama".into())
                .parse()?,
            embedding_url: get("EMBEDDING_URL").unwrap_or_else(|| "http://127.0.0.1:8081".into()),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or_else(|| "all-MiniLM-L6-v2".into()),
            embedding_dim: parse_or(&get, "EMBEDDING_DIM", EMBEDDING_DIM)?,
            similarity_threshold: parse_or(&get, "SIMILARITY_THRESHOLD", DEFAULT_SIMILARITY_THRESHOLD)?,
            search_limit: parse_or(&get, "SEARCH_LIMIT", DEFAULT_SEARCH_LIMIT)?,
            external_limit: parse_or(&get, "EXTERNAL_LIMIT", DEFAULT_SEARCH_LIMIT)?,
            http_timeout_seconds: parse_or(&get, "HTTP_TIMEOUT_SECONDS", 30)?,
            ann_min_entries: parse_or(&get, "ANN_MIN_ENTRIES", DEFAULT_ANN_MIN_ENTRIES)?,
            log_dir: PathBuf::from(get("LOG_DIR").unwrap_or_else(|| "logs".into())),
        };

        if config.embedding_dim == 0 {
            return Err(anyhow!("EMBEDDING_DIM must be positive"));
        }
        if !(-1.0..=1.0).contains(&config.similarity_threshold) {
            return Err(anyhow!(
                "SIMILARITY_THRESHOLD must lie in [-1, 1], got {}",
                config.similarity_threshold
            ));
        }
        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn store_config(&self) -> SimilarityStoreConfig {
        SimilarityStoreConfig {
            similarity_threshold: self.similarity_threshold,
            ann_min_entries: self.ann_min_entries,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            search_limit: self.search_limit,
            external_limit: self.external_limit,
        }
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- openFDA: {}", self.fda_base_url);
        info!("- Database: {}", self.db_path.display());
        info!("- Embedding Backend: {:?}", self.embedding_backend);
        info!("- Embedding URL: {}", self.embedding_url);
        info!("- Embedding Model: {} ({} dims)", self.embedding_model, self.embedding_dim);
        info!("- Similarity Threshold: {}", self.similarity_threshold);
        info!("- Limits: {} cached, {} external", self.search_limit, self.external_limit);
        info!("- HTTP Timeout: {}s", self.http_timeout_seconds);
        info!("- ANN Min Entries: {}", self.ann_min_entries);
        info!("- Log Dir: {}", self.log_dir.display());
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    /// Helper function to create a test Config with default values
    fn create_test_config() -> Config {
        from_map(&[("FDA_API_KEY", "test-key")]).unwrap()
    }

    #[test]
    fn test_config_creation_with_default_values() {
        let config = create_test_config();
        assert_eq!(config.fda_api_key, "test-key");
        assert_eq!(config.fda_base_url, "https://api.fda.gov/drug");
        assert_eq!(config.embedding_backend, EmbeddingBackend::Llama);
        assert_eq!(config.embedding_dim, 384);
        assert_eq!(config.search_limit, 5);
        assert_eq!(config.external_limit, 5);
        assert_eq!(config.ann_min_entries, 1000);
        assert!((config.similarity_threshold - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = from_map(&[]).unwrap_err();
        assert!(err.to_string().contains("FDA_API_KEY"));
        assert!(from_map(&[("FDA_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = from_map(&[
            ("FDA_API_KEY", "k"),
            ("EMBEDDING_BACKEND", "Hashing"),
            ("SIMILARITY_THRESHOLD", "0.5"),
            ("SEARCH_LIMIT", "3"),
            ("HTTP_TIMEOUT_SECONDS", "7"),
            ("DB_PATH", "/tmp/meds.db"),
        ])
        .unwrap();
        assert_eq!(config.embedding_backend, EmbeddingBackend::Hashing);
        assert_eq!(config.store_config().similarity_threshold, 0.5);
        assert_eq!(config.orchestrator_config().search_limit, 3);
        assert_eq!(config.http_timeout(), Duration::from_secs(7));
        assert_eq!(config.db_path, PathBuf::from("/tmp/meds.db"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = from_map(&[("FDA_API_KEY", "k"), ("SEARCH_LIMIT", "many")]).unwrap_err();
        assert!(err.to_string().contains("SEARCH_LIMIT"));
        assert!(from_map(&[("FDA_API_KEY", "k"), ("EMBEDDING_BACKEND", "onnx")]).is_err());
        assert!(from_map(&[("FDA_API_KEY", "k"), ("SIMILARITY_THRESHOLD", "1.5")]).is_err());
        assert!(from_map(&[("FDA_API_KEY", "k"), ("EMBEDDING_DIM", "0")]).is_err());
    }

    #[test]
    fn test_config_clone() {
        let config1 = create_test_config();
        let config2 = config1.clone();
        assert_eq!(config1.fda_api_key, config2.fda_api_key);
        assert_eq!(config1.db_path, config2.db_path);
    }
}
