//! External drug-label source.
//!
//! Implementations fail open: transport and HTTP errors are logged and turn
//! into empty or placeholder results, never into errors for the caller.
pub mod openfda;
pub mod response;

pub use openfda::OpenFdaClient;
pub use response::{
    LabelResponse, LabelResult, OpenFdaFields, INTERACTIONS_ERROR, NO_DOSAGE, NO_INDICATION,
    NO_INTERACTIONS, NO_WARNINGS, UNKNOWN_NAME,
};

use async_trait::async_trait;

use crate::medication_db::MedicationRecord;

/// Default number of labels requested per symptom search
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

#[async_trait]
pub trait LabelSource: Send + Sync {
    /// Labels whose indications match every term, at most `limit` of them
    async fn search_by_symptoms(&self, terms: &[String], limit: usize) -> Vec<MedicationRecord>;

    /// Interaction notes for the first label matching `drug_name` by brand
    /// or generic name
    async fn get_interactions(&self, drug_name: &str) -> Vec<String>;
}
