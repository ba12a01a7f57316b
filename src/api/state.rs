use std::sync::Arc;

use crate::{
    config::{BlurbMode, Config},
    error::AppResult,
    services::{
        providers::{CompletionProvider, MetadataProvider, OpenAiProvider, TvdbProvider},
        recommendations::ShowSearchPipeline,
    },
};

/// Shared application state
///
/// Holds only the stateless upstream clients behind the search pipeline;
/// nothing request-specific outlives its request.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ShowSearchPipeline>,
}

impl AppState {
    /// Creates state around explicit providers
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        metadata: Arc<dyn MetadataProvider>,
        max_candidates: usize,
        blurb_mode: BlurbMode,
    ) -> Self {
        tracing::info!(
            completion = completion.name(),
            metadata = metadata.name(),
            max_candidates,
            blurb_mode = ?blurb_mode,
            "Search pipeline configured"
        );

        Self {
            pipeline: Arc::new(ShowSearchPipeline::new(
                completion,
                metadata,
                max_candidates,
                blurb_mode,
            )),
        }
    }

    /// Builds the OpenAI and TheTVDB clients from configuration
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let timeout = std::time::Duration::from_secs(config.upstream_timeout_secs);

        let completion = OpenAiProvider::new(
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
            config.openai_model.clone(),
            config.openai_temperature,
            timeout,
        )?;

        let metadata = TvdbProvider::new(
            config.tvdb_api_key.clone(),
            config.tvdb_pin.clone(),
            config.tvdb_api_url.clone(),
            timeout,
        )?;

        Ok(Self::new(
            Arc::new(completion),
            Arc::new(metadata),
            config.max_candidates,
            config.blurb_mode,
        ))
    }
}
