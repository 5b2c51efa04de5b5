//! Resume text and profile-link extraction.
//!
//! The file extension alone decides which extractor runs: `.pdf` goes to the
//! page-oriented extractor, `.docx` to the word-processing extractor.

use std::path::Path;

use thiserror::Error;

pub mod docx;
pub mod links;
pub mod pdf;

/// Text pulled out of a resume plus the distinct profile links found in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    pub links: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Error: No file uploaded.")]
    NoFile,

    #[error("Error: Unsupported file type. Please upload a PDF or DOCX.")]
    UnsupportedFileType,

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

impl ExtractionError {
    /// Stable machine-readable code for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::NoFile => "NO_FILE",
            ExtractionError::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            ExtractionError::File(_) => "FILE_ERROR",
            ExtractionError::Pdf(_) => "PDF_EXTRACTION_FAILED",
            ExtractionError::Docx(_) => "DOCX_EXTRACTION_FAILED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Case-insensitive lookup on the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }
}

/// Routes `path` to the matching extractor. Blocking: reads the whole file.
pub fn extract_from_file(path: Option<&Path>) -> Result<ExtractionResult, ExtractionError> {
    let path = path.ok_or(ExtractionError::NoFile)?;

    match DocumentKind::from_path(path) {
        Some(DocumentKind::Pdf) => pdf::extract_pdf(path),
        Some(DocumentKind::Docx) => docx::extract_docx(path),
        None => Err(ExtractionError::UnsupportedFileType),
    }
}
