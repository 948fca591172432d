//! Retrieval protocol between the similarity store and the label source.
//!
//! A query is answered from the cache when possible. On a miss the label
//! source is searched once, every returned record is cached, and the cache
//! is searched again. If the re-search still finds nothing above the
//! threshold, the raw records are returned unranked.
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::label_source::{LabelSource, DEFAULT_SEARCH_LIMIT};
use crate::medication_db::{MedicationRecord, SimilarMedication};
use crate::similarity_store::SimilarityStore;
use crate::utils::TextUtils;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum cached results returned per query
    pub search_limit: usize,
    /// Maximum records requested from the label source on a miss
    pub external_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            search_limit: DEFAULT_SEARCH_LIMIT,
            external_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    /// Ranked results found in the cache on the first search
    Cached(Vec<SimilarMedication>),
    /// Ranked results found after caching `cached` new label records
    Recached {
        results: Vec<SimilarMedication>,
        cached: usize,
    },
    /// Label records in source order; none scored above the threshold
    Unranked(Vec<MedicationRecord>),
    NoResults,
}

impl RetrievalOutcome {
    pub fn is_empty(&self) -> bool {
        match self {
            RetrievalOutcome::Cached(results) => results.is_empty(),
            RetrievalOutcome::Recached { results, .. } => results.is_empty(),
            RetrievalOutcome::Unranked(records) => records.is_empty(),
            RetrievalOutcome::NoResults => true,
        }
    }
}

pub struct RetrievalOrchestrator {
    store: Arc<SimilarityStore>,
    label_source: Arc<dyn LabelSource>,
    config: OrchestratorConfig,
}

impl RetrievalOrchestrator {
    pub fn new(
        store: Arc<SimilarityStore>,
        label_source: Arc<dyn LabelSource>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            label_source,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SimilarityStore> {
        &self.store
    }

    /// Answer one query. Never fails: store errors are logged and treated
    /// as an empty cache, label-source failures as no records.
    pub async fn retrieve(&self, query: &str) -> RetrievalOutcome {
        let query = TextUtils::normalize_whitespace(query);
        if query.is_empty() {
            return RetrievalOutcome::NoResults;
        }
        info!("Processing query: {}", query);

        let cached = self.search_cache(&query).await;
        if !cached.is_empty() {
            info!("Answered '{}' from cache ({} results)", query, cached.len());
            return RetrievalOutcome::Cached(cached);
        }

        info!("No cached results found, querying label source");
        let terms = vec![query.to_string()];
        let records = self
            .label_source
            .search_by_symptoms(&terms, self.config.external_limit)
            .await;
        if records.is_empty() {
            return RetrievalOutcome::NoResults;
        }

        let mut newly_cached = 0;
        for record in &records {
            match self.store.cache(record).await {
                Ok(_) => newly_cached += 1,
                Err(e) => warn!(
                    "Failed to cache {} / {}: {}",
                    record.brand_name, record.generic_name, e
                ),
            }
        }
        debug!("Cached {} of {} label records", newly_cached, records.len());

        let results = self.search_cache(&query).await;
        if !results.is_empty() {
            return RetrievalOutcome::Recached {
                results,
                cached: newly_cached,
            };
        }
        info!("No cached record cleared the threshold, returning label results as-is");
        RetrievalOutcome::Unranked(records)
    }

    /// Interaction notes for a drug, straight from the label source
    pub async fn interactions(&self, drug_name: &str) -> Vec<String> {
        self.label_source.get_interactions(drug_name.trim()).await
    }

    async fn search_cache(&self, query: &str) -> Vec<SimilarMedication> {
        match self.store.find_similar(query, self.config.search_limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Similarity search failed for '{}': {}", query, e);
                Vec::new()
            }
        }
    }
}
