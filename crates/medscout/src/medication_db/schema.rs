//! Row types for the medication cache, query history and result rankings
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized drug label. Every field is populated; missing label
/// fields are replaced with placeholder text before a record is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub brand_name: String,
    pub generic_name: String,
    pub indications: String,
    pub warnings: String,
    pub dosage: String,
}

impl MedicationRecord {
    /// Text the cache embeds for this record.
    pub fn embedding_text(&self) -> String {
        format!("{} {} {}", self.brand_name, self.generic_name, self.indications)
    }
}

/// Persisted medication plus its embedding. Unique on (brand_name, generic_name).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub id: String,
    pub record: MedicationRecord,
    pub embedding: Vec<f32>,
    pub raw_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One similarity search attempt. `results_count` is `None` only while the
/// attempt's transaction is still open.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub id: String,
    pub query_text: String,
    pub embedding: Vec<f32>,
    pub results_count: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRanking {
    pub id: String,
    pub query_id: String,
    pub medication_id: String,
    pub similarity_score: f32,
    /// 1-based, ordered by descending similarity
    pub rank: i64,
    pub created_at: DateTime<Utc>,
}

/// A cached medication surfaced by a similarity search
#[derive(Debug, Clone)]
pub struct SimilarMedication {
    pub medication_id: String,
    pub record: MedicationRecord,
    pub similarity: f32,
}

/// A previous query surfaced by query-history similarity
#[derive(Debug, Clone)]
pub struct SimilarQuery {
    pub query_id: String,
    pub query_text: String,
    pub results_count: Option<i64>,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_medications: i64,
    pub total_queries: i64,
    pub total_rankings: i64,
    pub database_size_bytes: i64,
    pub index_type: String,
}
