//! Append-only query history and per-query result rankings
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::medication_db::medication_store::parse_timestamp;
use crate::medication_db::schema::{QueryEvent, ResultRanking};

const QUERY_COLUMNS: &str = "id, query_text, embedding, results_count, created_at";

pub struct QueryLog;

impl QueryLog {
    /// Record a search attempt with no result count yet
    pub fn insert_event_with_tx(
        tx: &Connection,
        query_text: &str,
        embedding: &[f32],
    ) -> StoreResult<QueryEvent> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        tx.execute(
            "INSERT INTO query_history (id, query_text, embedding, results_count, created_at)
             VALUES (?1, ?2, ?3, NULL, ?4)",
            params![id, query_text, bincode::serialize(embedding)?, now.to_rfc3339()],
        )?;
        Ok(QueryEvent {
            id,
            query_text: query_text.to_string(),
            embedding: embedding.to_vec(),
            results_count: None,
            created_at: now,
        })
    }

    pub fn set_results_count_with_tx(tx: &Connection, query_id: &str, count: i64) -> StoreResult<()> {
        tx.execute(
            "UPDATE query_history SET results_count = ?1 WHERE id = ?2",
            params![count, query_id],
        )?;
        Ok(())
    }

    pub fn insert_ranking_with_tx(
        tx: &Connection,
        query_id: &str,
        medication_id: &str,
        similarity_score: f32,
        rank: i64,
    ) -> StoreResult<ResultRanking> {
        let ranking = ResultRanking {
            id: Uuid::new_v4().to_string(),
            query_id: query_id.to_string(),
            medication_id: medication_id.to_string(),
            similarity_score,
            rank,
            created_at: Utc::now(),
        };
        tx.execute(
            "INSERT INTO search_results
             (id, query_id, medication_id, similarity_score, rank, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ranking.id,
                ranking.query_id,
                ranking.medication_id,
                ranking.similarity_score as f64,
                ranking.rank,
                ranking.created_at.to_rfc3339(),
            ],
        )?;
        Ok(ranking)
    }

    pub fn find_event(conn: &Connection, query_id: &str) -> StoreResult<Option<QueryEvent>> {
        let sql = format!("SELECT {} FROM query_history WHERE id = ?1", QUERY_COLUMNS);
        Ok(conn.query_row(&sql, [query_id], row_to_event).optional()?)
    }

    /// Most recent attempts first
    pub fn recent_events(conn: &Connection, limit: usize) -> StoreResult<Vec<QueryEvent>> {
        let sql = format!(
            "SELECT {} FROM query_history ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            QUERY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let events = stmt
            .query_map([limit as i64], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    pub fn all_events(conn: &Connection) -> StoreResult<Vec<QueryEvent>> {
        let sql = format!("SELECT {} FROM query_history", QUERY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Rankings for one query, rank 1 first
    pub fn rankings_for_query(conn: &Connection, query_id: &str) -> StoreResult<Vec<ResultRanking>> {
        let mut stmt = conn.prepare(
            "SELECT id, query_id, medication_id, similarity_score, rank, created_at
             FROM search_results WHERE query_id = ?1 ORDER BY rank ASC",
        )?;
        let rankings = stmt
            .query_map([query_id], |row| {
                let score: f64 = row.get(3)?;
                Ok(ResultRanking {
                    id: row.get(0)?,
                    query_id: row.get(1)?,
                    medication_id: row.get(2)?,
                    similarity_score: score as f32,
                    rank: row.get(4)?,
                    created_at: parse_timestamp(row, 5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rankings)
    }

    pub fn count_events(conn: &Connection) -> StoreResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM query_history", [], |row| row.get(0))?)
    }

    pub fn count_rankings(conn: &Connection) -> StoreResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM search_results", [], |row| row.get(0))?)
    }
}

fn row_to_event(row: &Row) -> rusqlite::Result<QueryEvent> {
    let embedding_bytes: Vec<u8> = row.get(2)?;
    let embedding: Vec<f32> = bincode::deserialize(&embedding_bytes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Blob, e))?;
    let created_at: DateTime<Utc> = parse_timestamp(row, 4)?;
    Ok(QueryEvent {
        id: row.get(0)?,
        query_text: row.get(1)?,
        embedding,
        results_count: row.get(3)?,
        created_at,
    })
}
