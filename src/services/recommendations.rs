use std::{future::Future, sync::Arc};

use tokio::task::JoinSet;

use crate::{
    config::BlurbMode,
    error::{AppError, AppResult},
    models::{EnrichedShow, SearchOutcome},
    services::{
        candidates::{generate_candidates, validate_description},
        enrichment::{self, SkipReason},
        providers::{CompletionProvider, MetadataProvider},
    },
};

/// System instruction for the fallback message call
pub const FALLBACK_SYSTEM_PROMPT: &str = "You're a friendly TV expert. Write a helpful message suggesting these specific shows \
and why they match what they're looking for.";

/// Returned when the model suggested nothing usable, without a further completion call
pub const EMPTY_CANDIDATES_MESSAGE: &str = "Sorry, I couldn't come up with any shows for that description. \
Try describing the kind of show you want in a bit more detail.";

/// Generates personalized show recommendations from a free-text description
///
/// Pipeline per request:
/// 1. Ask the completion service for candidate titles (bounded to `max_candidates`)
/// 2. Enrich every candidate concurrently against the metadata service
/// 3. Keep the survivors in candidate order
/// 4. If none survive, ask the completion service for a single fallback message
///
/// Per-candidate failures never fail the request; only candidate generation and
/// fallback composition can.
pub struct ShowSearchPipeline {
    completion: Arc<dyn CompletionProvider>,
    metadata: Arc<dyn MetadataProvider>,
    max_candidates: usize,
    blurb_mode: BlurbMode,
}

impl ShowSearchPipeline {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        metadata: Arc<dyn MetadataProvider>,
        max_candidates: usize,
        blurb_mode: BlurbMode,
    ) -> Self {
        Self {
            completion,
            metadata,
            max_candidates,
            blurb_mode,
        }
    }

    pub async fn search(&self, description: &str) -> AppResult<SearchOutcome> {
        let description = validate_description(description)?;

        let candidates =
            generate_candidates(self.completion.as_ref(), description, self.max_candidates)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Candidate generation failed");
                    e
                })?;

        if candidates.is_empty() {
            tracing::warn!("Completion reply contained no usable show names");
            return Ok(SearchOutcome::Fallback {
                message: EMPTY_CANDIDATES_MESSAGE.to_string(),
            });
        }

        let shows = self.aggregate(&candidates, description).await;

        if !shows.is_empty() {
            return Ok(SearchOutcome::Shows(shows));
        }

        tracing::info!(
            candidates = candidates.len(),
            "No candidate could be enriched, composing fallback message"
        );

        let message = compose_fallback(self.completion.as_ref(), description, &candidates)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Fallback composition failed");
                e
            })?;

        Ok(SearchOutcome::Fallback { message })
    }

    /// Enriches all candidates and returns the survivors in candidate order
    pub async fn aggregate(&self, candidates: &[String], description: &str) -> Vec<EnrichedShow> {
        let shows = match self.blurb_mode {
            BlurbMode::Concurrent => self.enrich_concurrently(candidates, description).await,
            BlurbMode::Sequential => self.enrich_with_context(candidates, description).await,
        };

        tracing::info!(
            attempted = candidates.len(),
            enriched = shows.len(),
            skipped = candidates.len() - shows.len(),
            mode = ?self.blurb_mode,
            "Enrichment finished"
        );

        shows
    }

    /// One task per candidate covering search, details and blurb
    ///
    /// Blurbs get no prior-shows context: every task starts before any blurb exists.
    async fn enrich_concurrently(
        &self,
        candidates: &[String],
        description: &str,
    ) -> Vec<EnrichedShow> {
        let description: Arc<str> = Arc::from(description);

        let outcomes = fan_out(candidates, |name| {
            let completion = Arc::clone(&self.completion);
            let metadata = Arc::clone(&self.metadata);
            let description = Arc::clone(&description);
            async move {
                enrichment::enrich(
                    completion.as_ref(),
                    metadata.as_ref(),
                    &name,
                    &description,
                    "",
                )
                .await
            }
        })
        .await;

        candidates
            .iter()
            .zip(outcomes)
            .filter_map(|(name, outcome)| keep_or_log(name, outcome))
            .collect()
    }

    /// Concurrent lookups, then blurbs one at a time in candidate order
    ///
    /// Each blurb prompt lists the shows already described so the model can
    /// draw connections between picks.
    async fn enrich_with_context(
        &self,
        candidates: &[String],
        description: &str,
    ) -> Vec<EnrichedShow> {
        let records = fan_out(candidates, |name| {
            let metadata = Arc::clone(&self.metadata);
            async move { enrichment::resolve_show(metadata.as_ref(), &name).await }
        })
        .await;

        let mut shows: Vec<EnrichedShow> = Vec::with_capacity(candidates.len());

        for (name, record) in candidates.iter().zip(records) {
            let Some(record) = keep_or_log(name, record) else {
                continue;
            };

            let context = enrichment::prior_shows_context(&shows);
            let outcome =
                enrichment::describe_show(self.completion.as_ref(), record, description, &context)
                    .await;

            if let Some(show) = keep_or_log(name, outcome) {
                shows.push(show);
            }
        }

        shows
    }
}

/// Runs one task per candidate and waits for all of them
///
/// Outcomes come back in candidate order regardless of completion order. A task
/// that panics counts as a failed candidate. Dropping the returned future aborts
/// any tasks still running.
async fn fan_out<T, F, Fut>(candidates: &[String], task: F) -> Vec<Result<T, SkipReason>>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, SkipReason>> + Send + 'static,
{
    let mut set = JoinSet::new();

    for (index, name) in candidates.iter().enumerate() {
        let future = task(name.clone());
        set.spawn(async move { (index, future.await) });
    }

    let mut slots: Vec<Option<Result<T, SkipReason>>> =
        std::iter::repeat_with(|| None).take(candidates.len()).collect();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => tracing::error!(error = %e, "Enrichment task join error"),
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(SkipReason::Failed(AppError::Internal(
                    "enrichment task did not complete".to_string(),
                )))
            })
        })
        .collect()
}

/// Unwraps a successful outcome, logging and dropping a skipped candidate
fn keep_or_log<T>(candidate: &str, outcome: Result<T, SkipReason>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(SkipReason::NotFound(_)) => {
            tracing::info!(candidate = %candidate, "No metadata match, skipping candidate");
            None
        }
        Err(SkipReason::Failed(e)) => {
            tracing::warn!(candidate = %candidate, error = %e, "Enrichment failed, skipping candidate");
            None
        }
    }
}

/// Asks for one friendly message recommending the unverified candidate names
pub async fn compose_fallback(
    completion: &dyn CompletionProvider,
    description: &str,
    candidates: &[String],
) -> AppResult<String> {
    let user = format!(
        "Request: {}\nShows to recommend: {}",
        description,
        candidates.join(", ")
    );

    completion.complete(FALLBACK_SYSTEM_PROMPT, &user).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeriesHit, ShowRecord};
    use crate::services::candidates::CANDIDATES_SYSTEM_PROMPT;
    use crate::services::providers::{MockCompletionProvider, MockMetadataProvider};
    use std::sync::Mutex;

    fn record(id: &str, name: &str) -> ShowRecord {
        ShowRecord {
            id: id.to_string(),
            name: name.to_string(),
            overview: Some(format!("{} overview", name)),
            network: Some("HBO".to_string()),
            first_aired: Some("2010-01-01".to_string()),
            rating: Some(8.0),
            image: None,
        }
    }

    /// Metadata mock that knows every show except the listed misses
    fn catalog_except(misses: &'static [&'static str]) -> MockMetadataProvider {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_search_series().returning(move |name| {
            if misses.iter().any(|m| *m == name) {
                Ok(vec![])
            } else {
                Ok(vec![SeriesHit {
                    id: format!("series-{}", name.len()),
                    name: Some(name.to_string()),
                }])
            }
        });
        metadata.expect_get_series().returning(|id| {
            let name = match id {
                "12" => "Breaking Bad",
                "8" => "The Wire",
                "5" => "Fargo",
                other => other,
            };
            Ok(record(id, name))
        });
        metadata
    }

    /// Completion mock answering the candidate call with `reply` and blurbs with "Blurb for ..."
    fn completion_with(reply: &'static str) -> MockCompletionProvider {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().returning(move |system, user| {
            if system == CANDIDATES_SYSTEM_PROMPT {
                Ok(reply.to_string())
            } else if system == FALLBACK_SYSTEM_PROMPT {
                Ok(format!("Fallback: {}", user))
            } else {
                let title = user
                    .lines()
                    .find_map(|l| l.strip_prefix("Title: "))
                    .unwrap_or("?");
                Ok(format!("Blurb for {}", title))
            }
        });
        completion
    }

    fn pipeline(
        completion: MockCompletionProvider,
        metadata: MockMetadataProvider,
        mode: BlurbMode,
    ) -> ShowSearchPipeline {
        ShowSearchPipeline::new(Arc::new(completion), Arc::new(metadata), 3, mode)
    }

    fn names(outcome: &SearchOutcome) -> Vec<String> {
        match outcome {
            SearchOutcome::Shows(shows) => shows.iter().map(|s| s.name.clone()).collect(),
            SearchOutcome::Fallback { .. } => vec![],
        }
    }

    #[tokio::test]
    async fn test_all_candidates_enriched_in_order() {
        let pipeline = pipeline(
            completion_with("1. Breaking Bad\n2. The Wire\n3. Fargo"),
            catalog_except(&[]),
            BlurbMode::Concurrent,
        );

        let outcome = pipeline.search("crime dramas").await.unwrap();

        assert_eq!(names(&outcome), vec!["Breaking Bad", "The Wire", "Fargo"]);
        if let SearchOutcome::Shows(shows) = outcome {
            assert_eq!(shows[0].id, "12");
            assert_eq!(shows[0].casual_description, "Blurb for Breaking Bad");
        }
    }

    #[tokio::test]
    async fn test_search_miss_is_skipped() {
        let pipeline = pipeline(
            completion_with("Breaking Bad\nGhost Show\nFargo"),
            catalog_except(&["Ghost Show"]),
            BlurbMode::Concurrent,
        );

        let outcome = pipeline.search("crime dramas").await.unwrap();
        assert_eq!(names(&outcome), vec!["Breaking Bad", "Fargo"]);
    }

    #[tokio::test]
    async fn test_only_first_three_candidates_dispatched() {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_search_series()
            .times(3)
            .returning(|_| Ok(vec![]));
        metadata.expect_get_series().never();

        let pipeline = pipeline(
            completion_with("One\nTwo\nThree\nFour\nFive"),
            metadata,
            BlurbMode::Concurrent,
        );

        let outcome = pipeline.search("anything").await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Fallback { .. }));
    }

    #[tokio::test]
    async fn test_all_failed_triggers_fallback_with_all_names() {
        let pipeline = pipeline(
            completion_with("Breaking Bad\nThe Wire\nFargo"),
            catalog_except(&["Breaking Bad", "The Wire", "Fargo"]),
            BlurbMode::Concurrent,
        );

        let outcome = pipeline.search("crime dramas").await.unwrap();

        assert_eq!(
            outcome,
            SearchOutcome::Fallback {
                message: "Fallback: Request: crime dramas\nShows to recommend: Breaking Bad, The Wire, Fargo"
                    .to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_detail_failures_trigger_fallback() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_search_series().returning(|_| {
            Ok(vec![SeriesHit {
                id: "series-1".to_string(),
                name: None,
            }])
        });
        metadata
            .expect_get_series()
            .returning(|_| Err(AppError::ExternalApi("TVDB API returned status 503".to_string())));

        let pipeline = pipeline(completion_with("Fargo\nThe Wire"), metadata, BlurbMode::Concurrent);

        let outcome = pipeline.search("anthology crime").await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Fallback { message } if message.contains("Fargo, The Wire")));
    }

    #[tokio::test]
    async fn test_generation_failure_makes_no_metadata_calls() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .times(1)
            .returning(|_, _| Err(AppError::ExternalApi("invalid api key".to_string())));

        let mut metadata = MockMetadataProvider::new();
        metadata.expect_search_series().never();
        metadata.expect_get_series().never();

        let pipeline = pipeline(completion, metadata, BlurbMode::Concurrent);

        let err = pipeline.search("anything").await.unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_fallback_failure_is_error() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().returning(|system, _| {
            if system == CANDIDATES_SYSTEM_PROMPT {
                Ok("Fargo".to_string())
            } else {
                Err(AppError::ExternalApi("quota exceeded".to_string()))
            }
        });

        let pipeline = pipeline(completion, catalog_except(&["Fargo"]), BlurbMode::Concurrent);

        let err = pipeline.search("anything").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_candidate_list_skips_fallback_call() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok("\n1.\n- \n".to_string()));

        let mut metadata = MockMetadataProvider::new();
        metadata.expect_search_series().never();

        let pipeline = pipeline(completion, metadata, BlurbMode::Concurrent);

        let outcome = pipeline.search("anything").await.unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::Fallback {
                message: EMPTY_CANDIDATES_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_blank_description_rejected_before_upstream() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().never();

        let pipeline = pipeline(completion, MockMetadataProvider::new(), BlurbMode::Concurrent);

        let result = pipeline.search("   ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_concurrent_mode_sends_no_prior_context() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&prompts);

        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().returning(move |system, user| {
            if system == CANDIDATES_SYSTEM_PROMPT {
                return Ok("Breaking Bad\nThe Wire".to_string());
            }
            recorded.lock().unwrap().push(user.to_string());
            Ok("Blurb".to_string())
        });

        let pipeline = pipeline(completion, catalog_except(&[]), BlurbMode::Concurrent);
        pipeline.search("crime").await.unwrap();

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().all(|p| !p.contains("Previously recommended")));
    }

    #[tokio::test]
    async fn test_sequential_mode_threads_prior_context() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&prompts);

        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().returning(move |system, user| {
            if system == CANDIDATES_SYSTEM_PROMPT {
                return Ok("Breaking Bad\nGhost Show\nThe Wire".to_string());
            }
            recorded.lock().unwrap().push(user.to_string());
            let title = user
                .lines()
                .find_map(|l| l.strip_prefix("Title: "))
                .unwrap_or("?")
                .to_string();
            Ok(format!("Blurb for {}", title))
        });

        let pipeline = pipeline(
            completion,
            catalog_except(&["Ghost Show"]),
            BlurbMode::Sequential,
        );

        let outcome = pipeline.search("crime").await.unwrap();
        assert_eq!(names(&outcome), vec!["Breaking Bad", "The Wire"]);

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("Previously recommended"));
        assert!(prompts[1].contains(
            "Previously recommended shows:\n- Breaking Bad: Blurb for Breaking Bad..."
        ));
        assert!(prompts[1].contains("Title: The Wire"));
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order_and_isolates_panics() {
        let candidates: Vec<String> = vec!["slow".into(), "boom".into(), "fast".into()];

        let outcomes = fan_out(&candidates, |name| async move {
            match name.as_str() {
                "slow" => {
                    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                    Ok(name)
                }
                "boom" => panic!("task blew up"),
                _ => Ok(name),
            }
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().unwrap(), "slow");
        assert!(matches!(outcomes[1], Err(SkipReason::Failed(AppError::Internal(_)))));
        assert_eq!(outcomes[2].as_ref().unwrap(), "fast");
    }
}
