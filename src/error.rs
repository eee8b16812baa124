use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by outline extraction.
///
/// `Config` and `UnsupportedLanguage` are fatal to a batch run and are
/// raised before any document is opened. `DocumentOpen` and `EmptyDocument`
/// are scoped to a single document; callers skip the document and continue.
#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("failed to read language configuration '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("language '{0}' is not present in the language configuration")]
    UnsupportedLanguage(String),

    #[error("failed to open document: {0}")]
    DocumentOpen(#[from] lopdf::Error),

    #[error("document contains no text lines and no embedded outline")]
    EmptyDocument,
}
