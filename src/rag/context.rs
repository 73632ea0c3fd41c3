//! Context assembly from retrieved documents
//!
//! Pure formatting only. Each document becomes a fixed three-line block
//! and blocks are joined by one blank line, preserving input order.

use crate::models::RetrievedDocument;

/// Assemble retrieved documents into the context string fed to the
/// generation prompt. Empty input yields an empty string.
#[must_use]
pub fn assemble_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(format_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_block(document: &RetrievedDocument) -> String {
    format!(
        "Source: {}\nContent: {}\nURL: {}",
        document.title, document.text, document.url
    )
}
