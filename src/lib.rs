pub mod error;
pub mod heading;
pub mod lang;
pub mod layout;
pub mod logging;
pub mod outline;
pub mod parse;
pub mod stats;
pub mod title;

use lopdf::Document;
use tracing::info;

use crate::error::OutlineError;
use crate::heading::{identify_headings, ScoreWeights};
use crate::lang::LanguageProfile;
use crate::layout::collect_document_lines;
use crate::outline::DocumentOutline;
use crate::parse::{get_document_text, get_embedded_outline, page_dimensions};
use crate::title::detect_title;

/// Extract a document's title and outline from PDF bytes.
///
/// When the document carries its own outline tree it is used verbatim and
/// the heuristic analysis never runs. Otherwise the outline is inferred
/// from typography and layout; documents whose typography offers no signal
/// yield an empty outline without error.
///
/// # Arguments
/// * `pdf_bytes` - The PDF file contents as bytes
/// * `lang` - Compiled language settings (numbered-heading stripping)
/// * `weights` - Score weights for the heading heuristics
pub fn extract_outline(
    pdf_bytes: &[u8],
    lang: &LanguageProfile,
    weights: &ScoreWeights,
) -> Result<DocumentOutline, OutlineError> {
    let doc = parse::load_document_mem(pdf_bytes)?;
    extract_outline_from_document(&doc, lang, weights)
}

/// Same as [`extract_outline`], for an already-loaded document.
pub fn extract_outline_from_document(
    doc: &Document,
    lang: &LanguageProfile,
    weights: &ScoreWeights,
) -> Result<DocumentOutline, OutlineError> {
    let pages = get_document_text(doc);
    let lines = collect_document_lines(&pages);
    let title = detect_title(page_dimensions(doc), &lines);

    let embedded = get_embedded_outline(doc);
    if !embedded.is_empty() {
        info!(
            entries = embedded.len(),
            "document carries its own outline, using it directly"
        );
        return Ok(DocumentOutline {
            title,
            outline: outline::from_embedded(&embedded),
        });
    }

    if lines.is_empty() {
        return Err(OutlineError::EmptyDocument);
    }

    info!(
        lines = lines.len(),
        "no embedded outline, running heuristic analysis"
    );
    let entries = identify_headings(&lines, &title, lang, weights);
    Ok(DocumentOutline {
        title,
        outline: entries,
    })
}
