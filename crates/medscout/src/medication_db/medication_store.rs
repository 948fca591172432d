//! Row-level operations on `medication_cache`.
//!
//! Every function takes a connection (usually an open transaction) so the
//! caller decides the transaction scope.
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::medication_db::schema::{CacheEntry, MedicationRecord};

const ENTRY_COLUMNS: &str =
    "id, brand_name, generic_name, embedding, raw_data, created_at, updated_at";

pub struct MedicationStore;

impl MedicationStore {
    /// Insert a new entry for the record's (brand_name, generic_name) pair,
    /// or update the existing one in place.
    pub fn upsert_with_tx(
        tx: &Connection,
        record: &MedicationRecord,
        embedding: &[f32],
    ) -> StoreResult<CacheEntry> {
        let embedding_bytes = bincode::serialize(embedding)?;
        let raw_data = serde_json::to_value(record)?;
        let raw_text = serde_json::to_string(&raw_data)?;
        let now = Utc::now();

        if let Some(existing) =
            Self::find_by_names(tx, &record.brand_name, &record.generic_name)?
        {
            tx.execute(
                "UPDATE medication_cache
                 SET indications = ?1, embedding = ?2, raw_data = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    record.indications,
                    embedding_bytes,
                    raw_text,
                    now.to_rfc3339(),
                    existing.id
                ],
            )?;
            debug!("Updated cached medication {} ({})", record.brand_name, existing.id);
            return Ok(CacheEntry {
                id: existing.id,
                record: record.clone(),
                embedding: embedding.to_vec(),
                raw_data,
                created_at: existing.created_at,
                updated_at: now,
            });
        }

        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO medication_cache
             (id, brand_name, generic_name, indications, embedding, raw_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id,
                record.brand_name,
                record.generic_name,
                record.indications,
                embedding_bytes,
                raw_text,
                now.to_rfc3339(),
            ],
        )?;
        debug!("Inserted cached medication {} ({})", record.brand_name, id);
        Ok(CacheEntry {
            id,
            record: record.clone(),
            embedding: embedding.to_vec(),
            raw_data,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn find_by_names(
        conn: &Connection,
        brand_name: &str,
        generic_name: &str,
    ) -> StoreResult<Option<CacheEntry>> {
        let sql = format!(
            "SELECT {} FROM medication_cache WHERE brand_name = ?1 AND generic_name = ?2",
            ENTRY_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![brand_name, generic_name], row_to_entry)
            .optional()?)
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> StoreResult<Option<CacheEntry>> {
        let sql = format!("SELECT {} FROM medication_cache WHERE id = ?1", ENTRY_COLUMNS);
        Ok(conn.query_row(&sql, [id], row_to_entry).optional()?)
    }

    /// Every cached entry, for exhaustive similarity scans and index loads
    pub fn all_entries(conn: &Connection) -> StoreResult<Vec<CacheEntry>> {
        let sql = format!("SELECT {} FROM medication_cache", ENTRY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(conn: &Connection) -> StoreResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM medication_cache", [], |row| row.get(0))?)
    }
}

fn row_to_entry(row: &Row) -> rusqlite::Result<CacheEntry> {
    let embedding_bytes: Vec<u8> = row.get(3)?;
    let embedding: Vec<f32> = bincode::deserialize(&embedding_bytes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Blob, e))?;

    let raw_text: String = row.get(4)?;
    let raw_data: serde_json::Value = serde_json::from_str(&raw_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let record: MedicationRecord = serde_json::from_value(raw_data.clone()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(CacheEntry {
        id: row.get(0)?,
        record: MedicationRecord {
            brand_name: row.get(1)?,
            generic_name: row.get(2)?,
            ..record
        },
        embedding,
        raw_data,
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
    })
}

pub(crate) fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medication_db::MedicationDatabase;

    fn record(brand: &str, generic: &str, indications: &str) -> MedicationRecord {
        MedicationRecord {
            brand_name: brand.to_string(),
            generic_name: generic.to_string(),
            indications: indications.to_string(),
            warnings: "No warnings available".to_string(),
            dosage: "No dosage information available".to_string(),
        }
    }

    #[test]
    fn test_insert_then_read_back() {
        let db = MedicationDatabase::new_in_memory().unwrap();
        let entry = db
            .with_transaction(|tx| {
                MedicationStore::upsert_with_tx(tx, &record("Migrin", "migrinol", "treats migraine"), &[0.5, 0.5])
            })
            .unwrap();

        let loaded = db
            .with_connection(|conn| MedicationStore::find_by_id(conn, &entry.id))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.record, entry.record);
        assert_eq!(loaded.embedding, vec![0.5, 0.5]);
        assert_eq!(loaded.raw_data["warnings"], "No warnings available");
    }

    #[test]
    fn test_upsert_updates_same_pair() {
        let db = MedicationDatabase::new_in_memory().unwrap();
        let first = db
            .with_transaction(|tx| MedicationStore::upsert_with_tx(tx, &record("A", "B", "old"), &[1.0, 0.0]))
            .unwrap();
        let second = db
            .with_transaction(|tx| {
                MedicationStore::upsert_with_tx(tx, &record("A", "B", "updated text"), &[0.0, 1.0])
            })
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);

        let entries = db.with_connection(MedicationStore::all_entries).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.indications, "updated text");
        assert_eq!(entries[0].embedding, vec![0.0, 1.0]);
    }

    #[test]
    fn test_pair_identity_is_both_names() {
        let db = MedicationDatabase::new_in_memory().unwrap();
        db.with_transaction(|tx| MedicationStore::upsert_with_tx(tx, &record("A", "B", "x"), &[1.0]))
            .unwrap();
        db.with_transaction(|tx| MedicationStore::upsert_with_tx(tx, &record("A", "C", "x"), &[1.0]))
            .unwrap();
        assert_eq!(db.with_connection(MedicationStore::count).unwrap(), 2);
        assert!(db
            .with_connection(|conn| MedicationStore::find_by_names(conn, "A", "Z"))
            .unwrap()
            .is_none());
    }
}
