//! Terminal rendering of retrieval outcomes
use std::io::{self, Write};

use crate::medication_db::MedicationRecord;
use crate::retrieval::RetrievalOutcome;
use crate::utils::TextUtils;

/// Characters of indications and warnings shown per medication
pub const PREVIEW_CHARS: usize = 200;

pub const NO_RESULTS_MESSAGE: &str = "No medications found for your query.";

pub const CACHE_MISS_MESSAGE: &str = "No cached results found, querying FDA API...";

pub const DISCLAIMER: [&str; 2] = [
    "Disclaimer: These recommendations are for informational purposes only.",
    "Always consult with a healthcare professional before taking any medication.",
];

fn write_record<W: Write>(out: &mut W, record: &MedicationRecord, similarity: Option<f32>) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Medication: {}", record.brand_name)?;
    writeln!(out, "Generic Name: {}", record.generic_name)?;
    if let Some(similarity) = similarity {
        writeln!(out, "Similarity Score: {:.2}", similarity)?;
    }
    writeln!(out, "Indications: {}", TextUtils::preview(&record.indications, PREVIEW_CHARS))?;
    writeln!(out, "Warnings: {}", TextUtils::preview(&record.warnings, PREVIEW_CHARS))?;
    writeln!(out, "{}", "-".repeat(30))
}

fn write_header<W: Write>(out: &mut W, source: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Recommended Medications (from {}):", source)?;
    writeln!(out, "{}", "-".repeat(50))
}

/// Anything not served straight from the cache is prefixed with the
/// cache-miss notice.
pub fn write_outcome<W: Write>(out: &mut W, outcome: &RetrievalOutcome) -> io::Result<()> {
    if !matches!(outcome, RetrievalOutcome::Cached(_)) {
        writeln!(out)?;
        writeln!(out, "{}", CACHE_MISS_MESSAGE)?;
    }
    if outcome.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", NO_RESULTS_MESSAGE)?;
        return Ok(());
    }
    match outcome {
        RetrievalOutcome::Cached(results) => {
            write_header(out, "cache")?;
            for result in results {
                write_record(out, &result.record, Some(result.similarity))?;
            }
        }
        RetrievalOutcome::Recached { results, .. } => {
            write_header(out, "newly cached data")?;
            for result in results {
                write_record(out, &result.record, Some(result.similarity))?;
            }
        }
        RetrievalOutcome::Unranked(records) => {
            write_header(out, "FDA")?;
            for record in records {
                write_record(out, record, None)?;
            }
        }
        RetrievalOutcome::NoResults => {}
    }
    Ok(())
}

pub fn write_interactions<W: Write>(out: &mut W, drug_name: &str, notes: &[String]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Drug Interactions for {}:", drug_name)?;
    writeln!(out, "{}", "-".repeat(50))?;
    for note in notes {
        writeln!(out, "{}", note)?;
    }
    Ok(())
}

pub fn write_disclaimer<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out)?;
    for line in DISCLAIMER {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
