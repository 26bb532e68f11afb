use std::path::Path;

use lopdf::Document;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{0}")]
    Parse(#[from] lopdf::Error),
    #[error("the document is encrypted")]
    Encrypted,
}

/// Number of pages in the PDF at `path`.
pub fn count_pages(path: &Path) -> Result<u32, DocumentError> {
    let document = Document::load(path)?;
    if document.is_encrypted() {
        return Err(DocumentError::Encrypted);
    }
    Ok(document.get_pages().len() as u32)
}
