use serde::Deserialize;
use std::{collections::HashMap, fmt::Display};

use super::ShowRecord;

// ============================================================================
// TheTVDB v4 API Types
// ============================================================================

/// Every v4 response wraps its payload in `{ "status": ..., "data": ... }`
#[derive(Debug, Deserialize)]
pub struct TvdbEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct TvdbLoginData {
    pub token: String,
}

/// TheTVDB ids arrive as strings in search results ("series-81189") and as
/// integers in detail records
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TvdbId {
    Numeric(u64),
    Text(String),
}

impl Display for TvdbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TvdbId::Numeric(id) => write!(f, "{}", id),
            TvdbId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// Raw entry of GET /search
#[derive(Debug, Clone, Deserialize)]
pub struct TvdbSearchResult {
    pub id: TvdbId,
    #[serde(default)]
    pub name: Option<String>,
}

/// One candidate match from a metadata search, in service order
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesHit {
    /// Id exactly as the search returned it, possibly type-prefixed
    pub id: String,
    pub name: Option<String>,
}

impl From<TvdbSearchResult> for SeriesHit {
    fn from(result: TvdbSearchResult) -> Self {
        Self {
            id: result.id.to_string(),
            name: result.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvdbNetwork {
    pub name: String,
}

/// Raw payload of GET /series/{id}/extended
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvdbSeriesDetails {
    pub id: TvdbId,
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub overviews: Option<HashMap<String, String>>,
    #[serde(default)]
    pub first_aired: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub original_network: Option<TvdbNetwork>,
    #[serde(default)]
    pub latest_network: Option<TvdbNetwork>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<TvdbSeriesDetails> for ShowRecord {
    fn from(mut details: TvdbSeriesDetails) -> Self {
        let overview = non_empty(details.overview)
            .or_else(|| details.overviews.as_mut().and_then(|o| o.remove("eng")));
        let network = details
            .original_network
            .or(details.latest_network)
            .map(|n| n.name);

        ShowRecord {
            id: details.id.to_string(),
            name: details.name,
            overview: non_empty(overview),
            network: non_empty(network),
            first_aired: non_empty(details.first_aired),
            rating: details.score,
            image: non_empty(details.image),
        }
    }
}
