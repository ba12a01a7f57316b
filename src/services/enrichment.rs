use crate::{
    error::AppError,
    models::{EnrichedShow, ShowRecord},
    services::providers::{CompletionProvider, MetadataProvider},
};

/// Type-prefix tokens carried by search ids but not accepted by the detail lookup
const SERIES_ID_PREFIXES: &[&str] = &["series-"];

/// How many characters of an earlier blurb are quoted in the prior-shows context
const PRIOR_BLURB_CHARS: usize = 200;

/// System instruction for the per-show blurb call
pub const BLURB_SYSTEM_PROMPT: &str = "You're having a casual conversation about TV shows with a friend. \
When describing a show:\n\
- Talk to them directly, in second person\n\
- Reference similarities or differences to previously mentioned shows if any are listed\n\
- Don't repeat points already made about earlier shows\n\
- Don't put the show's title in quotes\n\
- Use casual, friendly language but stay direct, without fluff\n\
- Stay focused on why this specific show matches their request";

/// Why a candidate did not make it into the results
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("no series matched '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Failed(#[from] AppError),
}

/// Strips a known type prefix from a search id
///
/// "series-12345" becomes "12345"; ids without a known prefix pass through.
pub fn normalize_series_id(raw: &str) -> &str {
    SERIES_ID_PREFIXES
        .iter()
        .find_map(|prefix| raw.strip_prefix(prefix))
        .unwrap_or(raw)
}

/// Verifies a candidate against the metadata service
///
/// Takes the first search hit, normalizes its id, then fetches the full record.
pub async fn resolve_show(
    metadata: &dyn MetadataProvider,
    name: &str,
) -> Result<ShowRecord, SkipReason> {
    let hits = metadata.search_series(name).await?;

    let Some(first) = hits.into_iter().next() else {
        return Err(SkipReason::NotFound(name.to_string()));
    };

    let series_id = normalize_series_id(&first.id);
    tracing::debug!(candidate = %name, series_id = %series_id, "Fetching series details");

    Ok(metadata.get_series(series_id).await?)
}

/// Builds the "Previously recommended shows" block from earlier successes
pub fn prior_shows_context(shows: &[EnrichedShow]) -> String {
    if shows.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = shows
        .iter()
        .map(|show| {
            let excerpt: String = show.casual_description.chars().take(PRIOR_BLURB_CHARS).collect();
            format!("- {}: {}...", show.name, excerpt)
        })
        .collect();

    format!("Previously recommended shows:\n{}", lines.join("\n"))
}

/// User turn for the blurb call
pub fn blurb_prompt(record: &ShowRecord, request_description: &str, prior_context: &str) -> String {
    let unknown = "Unknown";
    let mut prompt = format!("They asked for: {}\n\n", request_description);

    if !prior_context.is_empty() {
        prompt.push_str(prior_context);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!(
        "Now telling them about:\nTitle: {}\nOverview: {}\nNetwork: {}\nFirst Aired: {}",
        record.name,
        record.overview.as_deref().unwrap_or(unknown),
        record.network.as_deref().unwrap_or(unknown),
        record.first_aired.as_deref().unwrap_or(unknown),
    ));

    prompt
}

/// Writes the casual blurb for a verified show and assembles the final entry
pub async fn describe_show(
    completion: &dyn CompletionProvider,
    record: ShowRecord,
    request_description: &str,
    prior_context: &str,
) -> Result<EnrichedShow, SkipReason> {
    let prompt = blurb_prompt(&record, request_description, prior_context);
    let casual_description = completion.complete(BLURB_SYSTEM_PROMPT, &prompt).await?;

    Ok(EnrichedShow::from_record(record, casual_description))
}

/// Full enrichment of one candidate: search, detail fetch, blurb
pub async fn enrich(
    completion: &dyn CompletionProvider,
    metadata: &dyn MetadataProvider,
    name: &str,
    request_description: &str,
    prior_context: &str,
) -> Result<EnrichedShow, SkipReason> {
    let record = resolve_show(metadata, name).await?;
    describe_show(completion, record, request_description, prior_context).await
}
