use std::collections::BTreeMap;
use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::Region;
use crate::backend::{BackendError, BackendReply};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Company {
    /// Name of the company
    pub name: String,
    /// Url of the company
    pub url: String,
    /// A comprehensive 5-paragraph description of the company that explains its business
    /// operations and demonstrates how it relates to the specified capabilities or shows
    /// similarity to the provided companies.
    pub description: String,
    /// Country where the company is based
    pub country: String,
    /// Industry of the company
    pub industry: String,
    /// Size of the company
    pub size: String,
    /// Year the company was founded
    pub founded: String,
}

/// Answer shape requested from every company search call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompanySearchResult {
    /// The search strategy used to find the companies
    pub search_strategy: String,
    pub companies: Vec<Company>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompanyCapabilities {
    /// A comprehensive description of the company that explains its business operations,
    /// what it does, the different products and services it offers.
    pub description: String,
    /// A list of the products and services the company offers, with a detailed description
    /// of each.
    pub products_and_services_info: String,
    /// The reasoning for the capabilities of the company, ensuring the capabilities best
    /// represent the company's business operations and will be useful for the search to
    /// find more similar companies.
    pub extraction_reasoning: String,
    /// Up to 5 capabilities which best represent the company's business operations and will
    /// be useful for the search to find more similar companies.
    pub identified_capabilities: Vec<String>,
}

/// Which first-pass companies matter and what to add to second-pass queries.
/// Lives only for the duration of one deep search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueryRefinement {
    /// A full list of companies that are relevant to the query.
    pub relevant_companies: Vec<String>,
    /// Additional query to improve the search. Goal is to have returned result more relevant
    /// to our needs of finding companies that are related to the specified capabilities.
    pub additional_query: String,
}

/// A company search reply after schema validation.
#[derive(Debug, Clone)]
pub enum SearchReply {
    Structured(CompanySearchResult),
    RawFallback(Value),
}

impl From<BackendReply> for SearchReply {
    fn from(reply: BackendReply) -> Self {
        match reply {
            BackendReply::Structured(value) => {
                match CompanySearchResult::deserialize(&value) {
                    Ok(result) => SearchReply::Structured(result),
                    Err(_) => SearchReply::RawFallback(value),
                }
            }
            BackendReply::Text(text) => SearchReply::RawFallback(Value::String(text)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("reply did not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("backend answered with free text instead of structured data")]
    Unstructured,

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("country search panicked: {0}")]
    TaskPanicked(String),
}

/// Decodes a schema-constrained reply into `T`.
pub(crate) fn decode<T: DeserializeOwned>(reply: BackendReply) -> Result<T, FinderError> {
    match reply {
        BackendReply::Structured(value) => Ok(serde_json::from_value(value)?),
        BackendReply::Text(_) => Err(FinderError::Unstructured),
    }
}

/// Pre-merge figures of a deep search, kept apart from the post-merge `total_found`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepSearchStats {
    pub initial_total_found: usize,
    pub refined_total_found: usize,
    pub relevant_companies: Vec<String>,
    pub additional_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySearchResult {
    pub companies: Vec<Company>,
    pub total_found: usize,
    pub search_queries_used: Vec<String>,
    pub successful_searches: usize,
    pub total_searches: usize,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_search: Option<DeepSearchStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryFailure {
    pub error: String,
    pub companies: Vec<Company>,
    pub total_found: usize,
}

impl CountryFailure {
    pub fn new(error: &FinderError) -> Self {
        Self {
            error: error.to_string(),
            companies: Vec::new(),
            total_found: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CountryOutcome {
    Completed(CountrySearchResult),
    Failed(CountryFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionSearchResult {
    pub region: Region,
    pub companies: Vec<Company>,
    pub total_found: usize,
    pub countries_searched: Vec<String>,
    pub successful_countries: usize,
    pub total_countries: usize,
    pub country_results: BTreeMap<String, CountryOutcome>,
    pub total_searches: usize,
    pub total_successful_searches: usize,
    pub summary: String,
}
