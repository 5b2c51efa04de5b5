//! DOCX text and link extraction.
//!
//! Reads `word/document.xml` out of the archive and walks it with quick-xml.
//! Body paragraphs come first, in document order, followed by every top-level
//! table cell (row by row, cell by cell).

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::extraction::links::LinkSet;
use crate::extraction::{ExtractionError, ExtractionResult};

const DOCUMENT_PART: &str = "word/document.xml";

/// Text content of a document body, split the way Word structures it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DocxBody {
    pub paragraphs: Vec<String>,
    /// tables → rows → cell text
    pub tables: Vec<Vec<Vec<String>>>,
}

pub fn extract_docx(path: &Path) -> Result<ExtractionResult, ExtractionError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let xml = read_document_part(&bytes)?;
    let body = parse_document_xml(&xml)?;
    Ok(body_to_result(&body))
}

fn read_document_part(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("Failed to open archive: {e}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::Docx(format!("Missing {DOCUMENT_PART}: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(format!("Failed to read {DOCUMENT_PART}: {e}")))?;
    Ok(xml)
}

fn body_to_result(body: &DocxBody) -> ExtractionResult {
    let mut text = String::new();
    let mut links = LinkSet::new();

    let cells = body.tables.iter().flatten().flatten();
    for chunk in body.paragraphs.iter().chain(cells) {
        text.push_str(chunk);
        text.push('\n');
        links.scan(chunk);
    }

    ExtractionResult {
        text: text.trim().to_string(),
        links: links.into_vec(),
    }
}

/// Parses the main document part.
///
/// Only paragraphs that are direct children of `w:body` count as paragraphs,
/// and only tables that are direct children of `w:body` count as tables. A
/// cell's text is its own paragraphs joined with `\n`; tables nested inside a
/// cell and text boxes anchored in runs are skipped.
pub fn parse_document_xml(xml: &str) -> Result<DocxBody, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut body = DocxBody::default();

    let mut in_body = false;
    // open w:tbl elements; 1 means we're inside a top-level table
    let mut table_depth = 0usize;
    // open w:p elements; text is only collected at depth 1
    let mut paragraph_depth = 0usize;
    let mut in_text = false;

    let mut paragraph = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_paragraphs: Vec<String> = Vec::new();
    let mut in_cell = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ExtractionError::Docx(format!("Malformed document XML: {e}")))?;

        match event {
            Event::Start(ref e) => match e.name().as_ref() {
                b"w:body" => in_body = true,
                b"w:tbl" if in_body && paragraph_depth == 0 => {
                    table_depth += 1;
                    if table_depth == 1 {
                        body.tables.push(Vec::new());
                    }
                }
                b"w:tr" if table_depth == 1 => row.clear(),
                b"w:tc" if table_depth == 1 => {
                    in_cell = true;
                    cell_paragraphs.clear();
                }
                b"w:p" if in_body => {
                    paragraph_depth += 1;
                    if paragraph_depth == 1 {
                        paragraph.clear();
                    }
                }
                b"w:t" if collecting(paragraph_depth, table_depth, in_cell) => in_text = true,
                _ => push_run_break(e, &mut paragraph, paragraph_depth, table_depth, in_cell),
            },

            Event::Empty(ref e) => {
                push_run_break(e, &mut paragraph, paragraph_depth, table_depth, in_cell);
                if e.name().as_ref() == b"w:p" && in_body && paragraph_depth == 0 {
                    // <w:p/> is an empty paragraph
                    if table_depth == 0 {
                        body.paragraphs.push(String::new());
                    } else if table_depth == 1 && in_cell {
                        cell_paragraphs.push(String::new());
                    }
                }
            }

            Event::Text(ref e) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| ExtractionError::Docx(format!("Malformed text run: {e}")))?;
                paragraph.push_str(&text);
            }

            Event::CData(ref e) if in_text => {
                paragraph.push_str(&String::from_utf8_lossy(e.as_ref()));
            }

            Event::End(ref e) => match e.name().as_ref() {
                b"w:body" => in_body = false,
                b"w:t" => in_text = false,
                b"w:p" if paragraph_depth > 0 => {
                    if paragraph_depth == 1 {
                        let text = std::mem::take(&mut paragraph);
                        if table_depth == 0 {
                            body.paragraphs.push(text);
                        } else if table_depth == 1 && in_cell {
                            cell_paragraphs.push(text);
                        }
                    }
                    paragraph_depth -= 1;
                }
                b"w:tc" if table_depth == 1 => {
                    row.push(cell_paragraphs.join("\n"));
                    in_cell = false;
                }
                b"w:tr" if table_depth == 1 => {
                    if let Some(table) = body.tables.last_mut() {
                        table.push(std::mem::take(&mut row));
                    }
                }
                b"w:tbl" if table_depth > 0 && paragraph_depth == 0 => table_depth -= 1,
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}

/// True when run text belongs to a body paragraph or a top-level table cell.
fn collecting(paragraph_depth: usize, table_depth: usize, in_cell: bool) -> bool {
    paragraph_depth == 1 && (table_depth == 0 || (table_depth == 1 && in_cell))
}

fn push_run_break(
    e: &BytesStart<'_>,
    paragraph: &mut String,
    paragraph_depth: usize,
    table_depth: usize,
    in_cell: bool,
) {
    if !collecting(paragraph_depth, table_depth, in_cell) {
        return;
    }
    match e.name().as_ref() {
        b"w:tab" => paragraph.push('\t'),
        b"w:br" | b"w:cr" => paragraph.push('\n'),
        _ => {}
    }
}
