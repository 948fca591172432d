//! Typed openFDA label response and its normalization into records
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::medication_db::MedicationRecord;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const NO_INDICATION: &str = "No indication available";
pub const NO_WARNINGS: &str = "No warnings available";
pub const NO_DOSAGE: &str = "No dosage information available";
pub const NO_INTERACTIONS: &str = "No interaction information available";
pub const INTERACTIONS_ERROR: &str = "Error retrieving interaction information";

#[derive(Debug, Default, Deserialize)]
pub struct LabelResponse {
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: Vec<LabelResult>,
}

/// One label. Every field may be absent; openFDA sends text sections as
/// arrays of strings, but a bare string or `null` is accepted too.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LabelResult {
    #[serde(default, deserialize_with = "lenient_fields")]
    pub openfda: OpenFdaFields,
    #[serde(default, deserialize_with = "lenient_text")]
    pub indications_and_usage: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub warnings: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dosage_and_administration: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub drug_interactions: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct OpenFdaFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub brand_name: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub generic_name: Option<Vec<String>>,
}

/// Entries that are not label objects are dropped; the rest of the batch
/// survives.
fn lenient_results<'de, D>(deserializer: D) -> Result<Vec<LabelResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value(value) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Skipping malformed label result {}: {}", position, e);
                None
            }
        })
        .collect())
}

fn lenient_fields<'de, D>(deserializer: D) -> Result<OpenFdaFields, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// String arrays as sent, a bare string as a one-element list, anything
/// else as absent. Non-string array items are dropped.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(vec![text]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// First non-blank entry of an optional section, or the placeholder
fn first_or(section: &Option<Vec<String>>, placeholder: &str) -> String {
    section
        .as_ref()
        .and_then(|values| values.first())
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

impl LabelResult {
    pub fn to_record(&self) -> MedicationRecord {
        MedicationRecord {
            brand_name: first_or(&self.openfda.brand_name, UNKNOWN_NAME),
            generic_name: first_or(&self.openfda.generic_name, UNKNOWN_NAME),
            indications: first_or(&self.indications_and_usage, NO_INDICATION),
            warnings: first_or(&self.warnings, NO_WARNINGS),
            dosage: first_or(&self.dosage_and_administration, NO_DOSAGE),
        }
    }

    /// Interaction notes, or the placeholder singleton when absent
    pub fn interactions(&self) -> Vec<String> {
        match &self.drug_interactions {
            Some(notes) if !notes.is_empty() => notes.clone(),
            _ => vec![NO_INTERACTIONS.to_string()],
        }
    }
}
