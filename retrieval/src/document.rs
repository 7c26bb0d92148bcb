//! Title-weighted document and query text.
//!
//! Indexed documents repeat the title before the body so that similarity is
//! dominated by the title; queries repeat the position name the same number
//! of times.

/// Separates the repeated title from the JD body in an indexed document.
pub const TITLE_SEPARATOR: &str = " - ";

/// Id of the document built from the record at `index` in the corpus.
pub fn document_id(index: usize) -> String {
    format!("jd_{index}")
}

fn repeat_words(text: &str, times: usize) -> String {
    vec![text; times.max(1)].join(" ")
}

/// Build the indexed text for a record.
pub fn weighted_document(title: &str, jd: &str, weight: usize) -> String {
    format!("{}{TITLE_SEPARATOR}{jd}", repeat_words(title, weight))
}

/// Build the query text for a position name.
pub fn weighted_query(position: &str, weight: usize) -> String {
    repeat_words(position, weight)
}

/// Recover the JD body from an indexed document.
///
/// Everything up to and including the first separator is dropped. Text with
/// no separator is returned unchanged.
pub fn strip_title_prefix(document: &str) -> &str {
    document
        .split_once(TITLE_SEPARATOR)
        .map_or(document, |(_, body)| body)
}
