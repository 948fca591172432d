//! Test doubles shared by the store and orchestrator suites
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::EmbeddingError;
use crate::label_source::LabelSource;
use crate::medication_db::{MedicationDatabase, MedicationRecord};
use crate::similarity_store::{SimilarityStore, SimilarityStoreConfig};

/// Maps text to the vector of the first rule whose keyword it contains
pub struct KeywordEmbedder {
    dimension: usize,
    rules: Vec<(String, Vec<f32>)>,
    fallback: Vec<f32>,
}

impl KeywordEmbedder {
    pub fn new(dimension: usize, fallback: Vec<f32>) -> Self {
        Self { dimension, rules: Vec::new(), fallback }
    }

    pub fn rule(mut self, keyword: &str, vector: Vec<f32>) -> Self {
        self.rules.push((keyword.to_lowercase(), vector));
        self
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lowered = text.to_lowercase();
        Ok(self
            .rules
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, vector)| vector.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn dimension(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "failing-test"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("backend offline".to_string()))
    }
}

/// Label source returning canned records and counting calls
#[derive(Default)]
pub struct StubLabelSource {
    pub records: Vec<MedicationRecord>,
    pub interactions: Vec<String>,
    pub search_calls: AtomicUsize,
    pub last_terms: Mutex<Vec<String>>,
}

impl StubLabelSource {
    pub fn with_records(records: Vec<MedicationRecord>) -> Self {
        Self { records, ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LabelSource for StubLabelSource {
    async fn search_by_symptoms(&self, terms: &[String], limit: usize) -> Vec<MedicationRecord> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_terms.lock() {
            *last = terms.to_vec();
        }
        self.records.iter().take(limit).cloned().collect()
    }

    async fn get_interactions(&self, _drug_name: &str) -> Vec<String> {
        self.interactions.clone()
    }
}

pub fn record(brand: &str, generic: &str, indications: &str) -> MedicationRecord {
    MedicationRecord {
        brand_name: brand.to_string(),
        generic_name: generic.to_string(),
        indications: indications.to_string(),
        warnings: "No warnings available".to_string(),
        dosage: "No dosage information available".to_string(),
    }
}

pub fn store_with(embedder: Arc<dyn Embedder>) -> SimilarityStore {
    store_with_config(embedder, SimilarityStoreConfig::default())
}

pub fn store_with_config(embedder: Arc<dyn Embedder>, config: SimilarityStoreConfig) -> SimilarityStore {
    let database = Arc::new(MedicationDatabase::new_in_memory().unwrap());
    SimilarityStore::new(database, embedder, config).unwrap()
}
