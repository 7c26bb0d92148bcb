//! Terminal presentation of recommendations and JD input.

use std::io::Read;
use std::path::Path;

use crate::client::Recommendation;

/// Number of JD characters shown in a selector entry.
pub const PREVIEW_CHARS: usize = 60;

/// One line of the selector list: `"<title> - <first 60 chars>..."`.
pub fn selector_label(recommendation: &Recommendation) -> String {
    let preview: String = recommendation.jd.chars().take(PREVIEW_CHARS).collect();
    format!("{} - {preview}...", recommendation.title)
}

/// Numbered selector list, starting at 1.
pub fn selector_list(recommendations: &[Recommendation]) -> Vec<String> {
    recommendations
        .iter()
        .enumerate()
        .map(|(i, rec)| format!("{}. {}", i + 1, selector_label(rec)))
        .collect()
}

/// Select the 1-based `pick` from a recommendation list.
pub fn pick(recommendations: &[Recommendation], pick: usize) -> Option<&Recommendation> {
    pick.checked_sub(1).and_then(|i| recommendations.get(i))
}

/// Read JD text from an inline value, a file, or a reader, and trim it.
pub fn read_jd(
    inline: Option<String>,
    file: Option<&Path>,
    stdin: impl Read,
) -> std::io::Result<String> {
    let text = match (inline, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => std::io::read_to_string(stdin)?,
    };
    Ok(text.trim().to_string())
}
