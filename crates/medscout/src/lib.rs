pub mod config;
pub mod embedding;
pub mod error;
pub mod interactive;
pub mod label_source;
pub mod medication_db;
pub mod retrieval;
pub mod similarity_store;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
mod test_support;

// Public API exports
pub use config::{Config, EmbeddingBackend};
pub use embedding::{Embedder, HashingEmbedder, LlamaEmbedder};
pub use error::{EmbeddingError, LabelSourceError, StoreError, StoreResult};
pub use label_source::{LabelSource, OpenFdaClient};
pub use medication_db::{MedicationDatabase, MedicationRecord, SimilarMedication};
pub use retrieval::{OrchestratorConfig, RetrievalOrchestrator, RetrievalOutcome};
pub use similarity_store::{SimilarityStore, SimilarityStoreConfig};
