use crate::{
    error::{AppError, AppResult},
    services::providers::CompletionProvider,
};

/// System instruction for the candidate generation call
pub const CANDIDATES_SYSTEM_PROMPT: &str = "You're a TV show expert. List 5 specific shows similar to what they're looking for. \
Return ONLY the show titles without any numbers, dashes or quotes. One show per line.";

/// Characters stripped from both ends of every reply line
const LIST_MARKER_CHARS: &[char] = &['-', ' ', '.', '"', '\'', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Parses a completion reply into cleaned show names
///
/// Each line is trimmed of whitespace and list markers (digits, dots, dashes,
/// quotes) at both ends; lines left empty are dropped. Smart quotes, bullets
/// and `1)` style numbering are stripped as well.
pub fn parse_candidates(raw: &str) -> Vec<String> {
    raw.lines()
        .map(clean_line)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_line(line: &str) -> &str {
    line.trim().trim_matches(|c: char| {
        c.is_whitespace()
            || LIST_MARKER_CHARS.contains(&c)
            || matches!(c, ')' | '*' | '•' | '“' | '”' | '‘' | '’')
    })
}

/// Asks the completion service for candidate titles and keeps the first `max`
///
/// Exactly one completion call. Fails only when that call fails.
pub async fn generate_candidates(
    completion: &dyn CompletionProvider,
    description: &str,
    max: usize,
) -> AppResult<Vec<String>> {
    let reply = completion
        .complete(CANDIDATES_SYSTEM_PROMPT, description)
        .await?;

    let mut names = parse_candidates(&reply);
    let parsed = names.len();
    names.truncate(max);

    tracing::info!(
        parsed,
        kept = names.len(),
        candidates = ?names,
        "Candidate shows generated"
    );

    Ok(names)
}

/// Rejects descriptions that would give the model nothing to work with
pub fn validate_description(description: &str) -> AppResult<&str> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "description cannot be empty".to_string(),
        ));
    }
    Ok(trimmed)
}
