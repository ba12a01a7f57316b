/// TheTVDB v4 provider
///
/// API Flow:
/// 1. Login: POST /login with the API key → bearer token (held for the client's lifetime)
/// 2. Search: GET /search?query=...&type=series → ids such as "series-81189"
/// 3. Details: GET /series/{id}/extended?short=true → overview, network, air date, score, image
///
/// Tokens are valid for a month; a 401 on a data call triggers one re-login.
use crate::{
    error::{AppError, AppResult},
    models::{
        tvdb::{TvdbEnvelope, TvdbLoginData, TvdbSearchResult, TvdbSeriesDetails},
        SeriesHit, ShowRecord,
    },
    services::providers::MetadataProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct TvdbProvider {
    http_client: HttpClient,
    api_key: String,
    pin: Option<String>,
    api_url: String,
    token: Arc<RwLock<Option<String>>>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    apikey: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pin: Option<&'a str>,
}

impl TvdbProvider {
    pub fn new(
        api_key: String,
        pin: Option<String>,
        api_url: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            pin,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Exchanges the API key for a bearer token
    async fn login(&self) -> AppResult<String> {
        let url = format!("{}/login", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .json(&LoginRequest {
                apikey: &self.api_key,
                pin: self.pin.as_deref(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, provider = "tvdb", "Login failed");
            return Err(AppError::ExternalApi(format!(
                "TVDB login returned status {}: {}",
                status, body
            )));
        }

        let envelope: TvdbEnvelope<TvdbLoginData> = response.json().await?;
        tracing::info!(provider = "tvdb", "Obtained TVDB access token");

        Ok(envelope.data.token)
    }

    /// Returns the current token, logging in first if none is held
    async fn token(&self) -> AppResult<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut guard = self.token.write().await;
        // Another task may have logged in while we waited for the write lock
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        let token = self.login().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Authorized GET returning the decoded JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let mut retried = false;

        loop {
            let token = self.token().await?;

            let response = self
                .http_client
                .get(url)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await?;

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !retried {
                tracing::warn!(provider = "tvdb", "Token rejected, logging in again");
                self.token.write().await.take();
                retried = true;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(AppError::NotFound(format!("TVDB resource {}", url)));
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ExternalApi(format!(
                    "TVDB API returned status {}: {}",
                    status, body
                )));
            }

            return Ok(response.json().await?);
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TvdbProvider {
    async fn search_series(&self, name: &str) -> AppResult<Vec<SeriesHit>> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/search", self.api_url);
        let envelope: TvdbEnvelope<Option<Vec<TvdbSearchResult>>> = self
            .get_json(&url, &[("query", name), ("type", "series")])
            .await?;

        let hits: Vec<SeriesHit> = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(SeriesHit::from)
            .collect();

        tracing::debug!(
            query = %name,
            results = hits.len(),
            provider = "tvdb",
            "Series search completed"
        );

        Ok(hits)
    }

    async fn get_series(&self, id: &str) -> AppResult<ShowRecord> {
        let url = format!("{}/series/{}/extended", self.api_url, id);
        let envelope: TvdbEnvelope<TvdbSeriesDetails> =
            self.get_json(&url, &[("short", "true")]).await?;

        let record = ShowRecord::from(envelope.data);

        tracing::debug!(
            series_id = %record.id,
            name = %record.name,
            provider = "tvdb",
            "Series details fetched"
        );

        Ok(record)
    }

    fn name(&self) -> &'static str {
        "tvdb"
    }
}
