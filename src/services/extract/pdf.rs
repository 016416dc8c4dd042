//! PDF text extraction.
//!
//! Documents are parsed with `lopdf` and their pages' text is joined line by
//! line. Pages that cannot be decoded are skipped. Files that do not parse,
//! or yield no text at all, fall back to printable runs of the raw bytes.

use super::text::printable_runs;
use super::{Extractor, invalid_data};
use lopdf::Document;
use std::io::{self, Read};

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, reader: &mut dyn Read, filename: &str) -> io::Result<String> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if !data.starts_with(b"%PDF") {
            return Err(invalid_data("missing %PDF header"));
        }

        let text = match Document::load_mem(&data) {
            Ok(doc) => page_text(&doc, filename),
            Err(err) => {
                log::debug!("Cannot parse PDF {filename}: {err}");
                String::new()
            }
        };

        if text.trim().is_empty() {
            return Ok(printable_runs(&data, 4));
        }
        Ok(text)
    }
}

fn page_text(doc: &Document, filename: &str) -> String {
    let mut text = String::new();
    for page in doc.get_pages().into_keys() {
        match doc.extract_text(&[page]) {
            Ok(page_text) => {
                text.push_str(page_text.trim_end_matches('\n'));
                text.push('\n');
            }
            Err(err) => log::debug!("Skipping page {page} of {filename}: {err}"),
        }
    }
    text
}
