//! PDF text and link extraction.
//!
//! Extraction runs an ordered chain of [`PdfStrategy`] implementations over the
//! raw bytes. The first strategy that succeeds wins; a failed strategy's partial
//! output is never merged into the next one's.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::links::LinkSet;
use crate::extraction::{ExtractionError, ExtractionResult};

#[derive(Debug, Error)]
pub enum PdfStrategyError {
    #[error("failed to load document: {0}")]
    Load(String),

    #[error("failed to extract text from page {page}: {message}")]
    PageText { page: u32, message: String },

    #[error("failed to extract text: {0}")]
    Text(String),
}

/// One way of turning PDF bytes into text and links.
pub trait PdfStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, PdfStrategyError>;
}

/// Page-by-page extraction with lopdf. Also reads `/URI` actions from link
/// annotations, which catches profile links that are not visible as text.
pub struct LopdfStrategy;

impl PdfStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, PdfStrategyError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfStrategyError::Load(e.to_string()))?;

        let mut text = String::new();
        let mut links = LinkSet::new();

        for (page_num, page_id) in doc.get_pages() {
            let page_text =
                doc.extract_text(&[page_num])
                    .map_err(|e| PdfStrategyError::PageText {
                        page: page_num,
                        message: e.to_string(),
                    })?;
            links.scan(&page_text);
            text.push_str(&page_text);
            text.push('\n');

            for uri in link_annotation_uris(&doc, page_id) {
                links.scan(&uri);
            }
        }

        Ok(ExtractionResult {
            text,
            links: links.into_vec(),
        })
    }
}

/// Page-by-page extraction with pdf-extract. More forgiving about fonts and
/// encodings; does not look at annotations.
pub struct PdfExtractStrategy;

impl PdfStrategy for PdfExtractStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, PdfStrategyError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| PdfStrategyError::Text(e.to_string()))?;

        let mut text = String::new();
        let mut links = LinkSet::new();
        for page_text in &pages {
            links.scan(page_text);
            text.push_str(page_text);
            text.push('\n');
        }

        Ok(ExtractionResult {
            text,
            links: links.into_vec(),
        })
    }
}

pub struct PdfExtractor {
    strategies: Vec<Box<dyn PdfStrategy>>,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(vec![Box::new(LopdfStrategy), Box::new(PdfExtractStrategy)])
    }
}

impl PdfExtractor {
    pub fn new(strategies: Vec<Box<dyn PdfStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let mut last_failure: Option<String> = None;

        for strategy in &self.strategies {
            // pdf parsers panic on some malformed input; a panic counts as a failed attempt.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| strategy.extract(bytes)));
            let failure = match outcome {
                Ok(Ok(mut result)) => {
                    result.text = result.text.trim().to_string();
                    debug!(
                        "PDF extracted with {}: {} chars, {} profile links",
                        strategy.name(),
                        result.text.chars().count(),
                        result.links.len()
                    );
                    return Ok(result);
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("parser panicked: {}", panic_message(payload.as_ref())),
            };
            warn!("PDF strategy {} failed: {}", strategy.name(), failure);
            last_failure = Some(failure);
        }

        Err(ExtractionError::Pdf(last_failure.unwrap_or_else(|| {
            "no extraction strategy configured".to_string()
        })))
    }
}

/// Reads `path` into memory and extracts it with the default strategy chain.
pub fn extract_pdf(path: &Path) -> Result<ExtractionResult, ExtractionError> {
    let bytes = std::fs::read(path)?;
    PdfExtractor::default().extract(&bytes)
}

/// URIs of every `/Link` annotation with a `/URI` action on the page.
fn link_annotation_uris(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Some(Object::Array(annots)) = page.get(b"Annots").ok().and_then(|o| resolve(doc, o))
    else {
        return Vec::new();
    };

    annots
        .iter()
        .filter_map(|annot| match resolve(doc, annot) {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        })
        .filter(|dict| matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Link"))
        .filter_map(|dict| match dict.get(b"A").ok().and_then(|a| resolve(doc, a)) {
            Some(Object::Dictionary(action)) => action.get(b"URI").ok(),
            _ => None,
        })
        .filter_map(|uri| match resolve(doc, uri) {
            Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
