//! openFDA drug label client (`/drug/label.json`)
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::LabelSourceError;
use crate::label_source::response::{LabelResponse, LabelResult, INTERACTIONS_ERROR, NO_INTERACTIONS};
use crate::label_source::LabelSource;
use crate::medication_db::MedicationRecord;

pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov/drug";

pub struct OpenFdaClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenFdaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LabelSourceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("openFDA client using {}", base_url);
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    fn label_url(&self) -> String {
        format!("{}/label.json", self.base_url)
    }

    /// `indications_and_usage:"a" AND indications_and_usage:"b"`
    pub fn symptom_search_expression(terms: &[String]) -> String {
        terms
            .iter()
            .map(|term| sanitize_term(term))
            .filter(|term| !term.is_empty())
            .map(|term| format!("indications_and_usage:\"{}\"", term))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// `openfda.brand_name:"x" OR openfda.generic_name:"x"`
    pub fn interaction_search_expression(drug_name: &str) -> String {
        let name = sanitize_term(drug_name);
        format!(
            "openfda.brand_name:\"{}\" OR openfda.generic_name:\"{}\"",
            name, name
        )
    }

    /// Raw label search. A 404 is openFDA's "no matches" and yields an
    /// empty list rather than an error.
    pub async fn fetch_labels(
        &self,
        search: &str,
        limit: usize,
    ) -> Result<Vec<LabelResult>, LabelSourceError> {
        debug!("openFDA search: {} (limit {})", search, limit);
        let limit_param = limit.to_string();
        let response = self
            .http_client
            .get(self.label_url())
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("search", search),
                ("limit", limit_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("openFDA returned no matches for {}", search);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabelSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: LabelResponse = serde_json::from_str(&body)?;
        Ok(parsed.results)
    }
}

// Double quotes would terminate the quoted search value early
fn sanitize_term(term: &str) -> String {
    term.replace('"', "").trim().to_string()
}

#[async_trait]
impl LabelSource for OpenFdaClient {
    async fn search_by_symptoms(&self, terms: &[String], limit: usize) -> Vec<MedicationRecord> {
        let search = Self::symptom_search_expression(terms);
        if search.is_empty() || limit == 0 {
            return Vec::new();
        }
        match self.fetch_labels(&search, limit).await {
            Ok(results) => {
                let records: Vec<MedicationRecord> =
                    results.iter().take(limit).map(LabelResult::to_record).collect();
                info!("openFDA returned {} label(s) for {:?}", records.len(), terms);
                records
            }
            Err(e) => {
                warn!("Error querying openFDA API: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_interactions(&self, drug_name: &str) -> Vec<String> {
        let search = Self::interaction_search_expression(drug_name);
        match self.fetch_labels(&search, 1).await {
            Ok(results) => results
                .first()
                .map(LabelResult::interactions)
                .unwrap_or_else(|| vec![NO_INTERACTIONS.to_string()]),
            Err(e) => {
                warn!("Error querying openFDA API: {}", e);
                vec![INTERACTIONS_ERROR.to_string()]
            }
        }
    }
}
