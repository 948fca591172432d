//! Medication database module - SQLite-based storage for cached labels, query history and rankings
pub mod migration;
pub mod medication_store;
pub mod query_log;
pub mod schema;
pub mod vector_index;

pub use medication_store::MedicationStore;
pub use migration::MigrationManager;
pub use query_log::QueryLog;
pub use schema::*;
pub use vector_index::{cosine_similarity, VectorIndex};

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{info, warn};

use crate::error::StoreResult;

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
                                  PRAGMA busy_timeout = 5000;";

/// Pooled handle over the cache database. Constructed explicitly and
/// passed to whoever needs it; there is no process-global engine.
pub struct MedicationDatabase {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl MedicationDatabase {
    /// Open (or create) the database file and bring the schema up to date
    pub fn new(db_path: &Path) -> StoreResult<Self> {
        info!("Opening medication database at: {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                    | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            )
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
        let pool = Pool::builder().max_size(10).build(manager)?;

        {
            let mut conn = pool.get()?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }
        info!("Medication database initialized successfully");
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Single-connection in-memory database. The connection is never
    /// recycled, since dropping it would drop the data.
    pub fn new_in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(manager)?;
        {
            let mut conn = pool.get()?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }
        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn get_conn(&self) -> StoreResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run `f` inside one IMMEDIATE transaction. Commits on `Ok`, rolls
    /// back on `Err`; an uncommitted transaction is also rolled back on drop.
    pub fn with_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback failed after error '{}': {}", e, rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Run a read-only closure on a pooled connection
    pub fn with_connection<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }

    pub fn get_stats(&self, index_type: &str) -> StoreResult<StoreStats> {
        let conn = self.get_conn()?;
        migration::get_database_stats(&conn, index_type)
    }
}

impl Drop for MedicationDatabase {
    fn drop(&mut self) {
        if let Ok(conn) = self.pool.get() {
            let _ = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn count_queries(db: &MedicationDatabase) -> i64 {
        db.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM query_history", [], |row| row.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = MedicationDatabase::new_in_memory().unwrap();
        db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO query_history (id, query_text, embedding, created_at)
                 VALUES ('q1', 'migraine', x'00', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        assert_eq!(count_queries(&db), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = MedicationDatabase::new_in_memory().unwrap();
        let result: StoreResult<()> = db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO query_history (id, query_text, embedding, created_at)
                 VALUES ('q1', 'migraine', x'00', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Err(StoreError::Index("forced failure".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(count_queries(&db), 0);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = MedicationDatabase::new_in_memory().unwrap();
        let result = db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO search_results (id, query_id, medication_id, similarity_score, rank, created_at)
                 VALUES ('r1', 'missing-query', 'missing-med', 0.9, 1, '2024-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn test_file_database_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("medications.db");
        {
            let db = MedicationDatabase::new(&path).unwrap();
            db.with_transaction(|tx| {
                tx.execute(
                    "INSERT INTO query_history (id, query_text, embedding, created_at)
                     VALUES ('q1', 'cough', x'00', '2024-01-01T00:00:00Z')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }
        let reopened = MedicationDatabase::new(&path).unwrap();
        assert_eq!(count_queries(&reopened), 1);
        assert_eq!(reopened.get_stats("Linear").unwrap().total_queries, 1);
    }
}
