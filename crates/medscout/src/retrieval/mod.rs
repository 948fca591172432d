//! Cache-first retrieval: similarity store first, openFDA on a miss
pub mod display;
pub mod orchestrator;

pub use orchestrator::{OrchestratorConfig, RetrievalOrchestrator, RetrievalOutcome};
