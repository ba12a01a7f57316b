/// External service abstractions
///
/// The pipeline talks to two upstream services: a text-completion model that
/// proposes and describes shows, and a TV metadata catalog that verifies them.
/// Both sit behind traits so the orchestration can be exercised without the
/// network.
use crate::{
    error::AppResult,
    models::{SeriesHit, ShowRecord},
};

pub mod openai;
pub mod tvdb;

pub use openai::OpenAiProvider;
pub use tvdb::TvdbProvider;

/// Trait for text-completion providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a system instruction plus one user turn and return the reply text
    ///
    /// Fails on transport, auth or quota errors, and when the reply has no content.
    async fn complete(&self, system: &str, user: &str) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Trait for TV metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search series by name
    ///
    /// Returns matches in relevance order; an empty list means no match.
    async fn search_series(&self, name: &str) -> AppResult<Vec<SeriesHit>>;

    /// Fetch the full record for a bare (unprefixed) series id
    async fn get_series(&self, id: &str) -> AppResult<ShowRecord>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Throwaway local HTTP server for exercising the real clients
#[cfg(test)]
pub(crate) async fn serve_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{}", address)
}
