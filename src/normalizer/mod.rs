/// Response normalizer
///
/// Turns raw candidate text into structured content. Parsing is attempted
/// on the full text first, then on the widest `{ ... }` span, which covers
/// replies wrapped in prose or markdown fences.
pub mod lesson_plan;

use crate::error::{AppError, AppResult};
use serde::de::DeserializeOwned;

/// Parse raw text into `T`, recovering JSON embedded in surrounding text
pub fn normalize<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    match serde_json::from_str::<T>(raw.trim()) {
        Ok(value) => return Ok(value),
        Err(e) => tracing::debug!(error = %e, "direct parse failed, trying brace span"),
    }

    let span = widest_brace_span(raw).ok_or_else(|| {
        tracing::warn!(len = raw.len(), "no JSON object found in AI response");
        AppError::UnparsableResponse
    })?;

    serde_json::from_str::<T>(span).map_err(|e| {
        tracing::warn!(error = %e, "failed to parse extracted JSON");
        AppError::UnparsableResponse
    })
}

/// Text from the first `{` to the last `}` inclusive
pub fn widest_brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Split text into blank-line separated segments, dropping empty ones
pub fn split_segments(raw: &str) -> Vec<String> {
    raw.replace("\r\n", "\n")
        .split("\n\n")
        .map(|segment| segment.trim_matches('\n'))
        .filter(|segment| !segment.trim().is_empty())
        .map(String::from)
        .collect()
}
