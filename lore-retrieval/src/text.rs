//! Character-budget truncation shared by ingestion and synthesis.

/// Cut `text` after `max_chars` characters, on a char boundary.
///
/// The budget is counted in characters, not tokens. Callers size their
/// budgets with enough margin that dense text still fits provider token
/// limits.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
