use serde::{Deserialize, Serialize};

pub mod tvdb;

pub use tvdb::SeriesHit;

/// Incoming body of the show search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ShowRequest {
    pub description: String,
}

/// Canonical metadata for one series as returned by the metadata service
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRecord {
    /// Bare detail-lookup id, without any type prefix
    pub id: String,
    pub name: String,
    pub overview: Option<String>,
    pub network: Option<String>,
    pub first_aired: Option<String>,
    pub rating: Option<f64>,
    pub image: Option<String>,
}

/// A verified show plus its generated blurb, returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedShow {
    pub id: String,
    pub name: String,
    pub original_description: Option<String>,
    pub casual_description: String,
    pub first_aired: Option<String>,
    pub network: Option<String>,
    pub rating: Option<f64>,
    pub image: Option<String>,
}

impl EnrichedShow {
    pub fn from_record(record: ShowRecord, casual_description: String) -> Self {
        Self {
            id: record.id,
            name: record.name,
            original_description: record.overview,
            casual_description,
            first_aired: record.first_aired,
            network: record.network,
            rating: record.rating,
            image: record.image,
        }
    }
}

/// Result of one search pipeline run
///
/// Exactly one shape is produced per request: verified shows, or a single
/// narrative message when none could be verified.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Shows(Vec<EnrichedShow>),
    Fallback { message: String },
}

/// Wire shape of a successful search response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<EnrichedShow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Shows(results) => Self {
                results,
                message: None,
            },
            SearchOutcome::Fallback { message } => Self {
                results: Vec::new(),
                message: Some(message),
            },
        }
    }
}
