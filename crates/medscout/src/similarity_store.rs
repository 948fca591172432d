//! Similarity store: cached drug labels searchable by embedding similarity,
//! plus the query history and per-query rankings.
//!
//! `cache` and `find_similar` each run in a single transaction. The
//! in-memory vector indices only change after that transaction commits, so a
//! failed operation leaves both the database and the indices as they were.
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::error::{StoreError, StoreResult};
use crate::medication_db::{
    cosine_similarity, vector_index::sort_by_similarity, CacheEntry, MedicationDatabase,
    MedicationRecord, MedicationStore, QueryEvent, QueryLog, ResultRanking, SimilarMedication,
    SimilarQuery, StoreStats, VectorIndex,
};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;

/// Cache size at which candidate generation switches to the HNSW index
pub const DEFAULT_ANN_MIN_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub struct SimilarityStoreConfig {
    /// Results at or below this cosine similarity are dropped
    pub similarity_threshold: f32,
    /// Use approximate candidates once an index holds this many vectors;
    /// 0 means always
    pub ann_min_entries: usize,
}

impl Default for SimilarityStoreConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            ann_min_entries: DEFAULT_ANN_MIN_ENTRIES,
        }
    }
}

pub struct SimilarityStore {
    database: Arc<MedicationDatabase>,
    embedder: Arc<dyn Embedder>,
    config: SimilarityStoreConfig,
    medication_index: Mutex<VectorIndex>,
    query_index: Mutex<VectorIndex>,
}

fn lock_index(index: &Mutex<VectorIndex>) -> StoreResult<MutexGuard<'_, VectorIndex>> {
    index
        .lock()
        .map_err(|_| StoreError::Index("vector index lock poisoned".to_string()))
}

impl SimilarityStore {
    /// Wrap an open database and load both vector columns into memory
    pub fn new(
        database: Arc<MedicationDatabase>,
        embedder: Arc<dyn Embedder>,
        config: SimilarityStoreConfig,
    ) -> StoreResult<Self> {
        let dimension = embedder.dimension();
        let mut medication_index = VectorIndex::new(dimension);
        let mut query_index = VectorIndex::new(dimension);

        let (entries, events) = database.with_connection(|conn| {
            Ok((MedicationStore::all_entries(conn)?, QueryLog::all_events(conn)?))
        })?;
        for entry in entries {
            if let Err(e) = medication_index.upsert(&entry.id, entry.embedding) {
                warn!("Skipping cached medication {} in index: {}", entry.id, e);
            }
        }
        for event in events {
            if let Err(e) = query_index.upsert(&event.id, event.embedding) {
                debug!("Skipping query {} in index: {}", event.id, e);
            }
        }
        info!(
            "Similarity store ready: {} medications, {} past queries (model {}, dim {})",
            medication_index.len(),
            query_index.len(),
            embedder.model_name(),
            dimension
        );

        Ok(Self {
            database,
            embedder,
            config,
            medication_index: Mutex::new(medication_index),
            query_index: Mutex::new(query_index),
        })
    }

    pub fn database(&self) -> &Arc<MedicationDatabase> {
        &self.database
    }

    fn use_approximate(&self, indexed: usize) -> bool {
        indexed >= self.config.ann_min_entries
    }

    async fn embed_checked(&self, text: &str) -> StoreResult<Vec<f32>> {
        let embedding = self.embedder.embed(text).await?;
        let expected = self.embedder.dimension();
        if embedding.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    /// Insert the record, or update the entry with the same brand and
    /// generic name in place.
    pub async fn cache(&self, record: &MedicationRecord) -> StoreResult<CacheEntry> {
        let embedding = self.embed_checked(&record.embedding_text()).await?;
        let entry = self
            .database
            .with_transaction(|tx| MedicationStore::upsert_with_tx(tx, record, &embedding))?;

        if let Err(e) = lock_index(&self.medication_index)
            .and_then(|mut index| index.upsert(&entry.id, entry.embedding.clone()))
        {
            warn!("Cached {} but failed to update vector index: {}", entry.id, e);
        }
        debug!("Cached medication {} / {}", record.brand_name, record.generic_name);
        Ok(entry)
    }

    /// `find_similar_with_threshold` using the configured threshold
    pub async fn find_similar(
        &self,
        query_text: &str,
        limit: usize,
    ) -> StoreResult<Vec<SimilarMedication>> {
        self.find_similar_with_threshold(query_text, limit, self.config.similarity_threshold)
            .await
    }

    /// Ranks cached medications against the query, keeps the top `limit`,
    /// then drops any at or below `threshold`. The limit is applied before
    /// the threshold, so fewer than `limit` results may come back even when
    /// more entries would clear the threshold.
    ///
    /// Logs one query event and one ranking per returned result. On error
    /// nothing from this attempt is recorded.
    pub async fn find_similar_with_threshold(
        &self,
        query_text: &str,
        limit: usize,
        threshold: f32,
    ) -> StoreResult<Vec<SimilarMedication>> {
        let query_embedding = self.embed_checked(query_text).await?;

        let candidate_ids = {
            let mut index = lock_index(&self.medication_index)?;
            debug!("Found {} medications in cache", index.len());
            if self.use_approximate(index.len()) {
                Some(index.nearest_ids(&query_embedding, limit)?)
            } else {
                None
            }
        };

        let (event, results) = self.database.with_transaction(|tx| {
            let event = QueryLog::insert_event_with_tx(tx, query_text, &query_embedding)?;

            let candidates = match &candidate_ids {
                Some(ids) => {
                    let mut entries = Vec::with_capacity(ids.len());
                    for id in ids {
                        if let Some(entry) = MedicationStore::find_by_id(tx, id)? {
                            entries.push(entry);
                        }
                    }
                    entries
                }
                None => MedicationStore::all_entries(tx)?,
            };

            let mut scored: Vec<SimilarMedication> = candidates
                .into_iter()
                .map(|entry| SimilarMedication {
                    similarity: cosine_similarity(&query_embedding, &entry.embedding),
                    medication_id: entry.id,
                    record: entry.record,
                })
                .collect();
            sort_by_similarity(&mut scored, |m| m.similarity);
            scored.truncate(limit);
            scored.retain(|m| m.similarity > threshold);

            for (position, result) in scored.iter().enumerate() {
                QueryLog::insert_ranking_with_tx(
                    tx,
                    &event.id,
                    &result.medication_id,
                    result.similarity,
                    position as i64 + 1,
                )?;
            }
            QueryLog::set_results_count_with_tx(tx, &event.id, scored.len() as i64)?;
            Ok((event, scored))
        })?;

        if results.is_empty() {
            debug!("No medications above similarity threshold {:.2}", threshold);
        }
        for result in &results {
            debug!("- {}: {:.3}", result.record.brand_name, result.similarity);
        }

        if let Err(e) = lock_index(&self.query_index)
            .and_then(|mut index| index.upsert(&event.id, event.embedding))
        {
            warn!("Logged query {} but failed to index it: {}", event.id, e);
        }
        Ok(results)
    }

    /// Previous queries closest to `text`, most similar first. Read-only:
    /// this lookup is not itself logged.
    pub async fn find_similar_queries(
        &self,
        text: &str,
        limit: usize,
    ) -> StoreResult<Vec<SimilarQuery>> {
        let embedding = self.embed_checked(text).await?;
        let scored = {
            let mut index = lock_index(&self.query_index)?;
            let approximate = self.use_approximate(index.len());
            index.search(&embedding, limit, approximate)?
        };

        self.database.with_connection(|conn| {
            let mut similar = Vec::with_capacity(scored.len());
            for (query_id, similarity) in scored {
                if let Some(event) = QueryLog::find_event(conn, &query_id)? {
                    similar.push(SimilarQuery {
                        query_id,
                        query_text: event.query_text,
                        results_count: event.results_count,
                        similarity,
                    });
                }
            }
            Ok(similar)
        })
    }

    pub fn recent_queries(&self, limit: usize) -> StoreResult<Vec<QueryEvent>> {
        self.database
            .with_connection(|conn| QueryLog::recent_events(conn, limit))
    }

    pub fn rankings_for_query(&self, query_id: &str) -> StoreResult<Vec<ResultRanking>> {
        self.database
            .with_connection(|conn| QueryLog::rankings_for_query(conn, query_id))
    }

    pub fn get_medication(
        &self,
        brand_name: &str,
        generic_name: &str,
    ) -> StoreResult<Option<CacheEntry>> {
        self.database
            .with_connection(|conn| MedicationStore::find_by_names(conn, brand_name, generic_name))
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let index_type = {
            let index = lock_index(&self.medication_index)?;
            if self.use_approximate(index.len()) { "HNSW" } else { "Linear" }
        };
        self.database.get_stats(index_type)
    }
}
