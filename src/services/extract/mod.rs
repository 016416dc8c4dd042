//! Content extractors selected by file extension.
//!
//! Every extractor turns a byte stream into plain text for content matching.
//! Callers bound the stream themselves (see [`MAX_CONTENT_BYTES`]).

pub mod office;
pub mod pdf;
pub mod text;

use std::io::{self, Read};

pub use office::{DocxExtractor, XlsxExtractor};
pub use pdf::PdfExtractor;
pub use text::{StringsExtractor, TextExtractor};

/// Most bytes read from one candidate file for content matching (10 MiB)
pub const MAX_CONTENT_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions whose bytes are matched as text without further parsing
pub const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".ini", ".cfg", ".config", ".conf", ".ps1", ".psm1", ".bat", ".cmd", ".sh",
    ".json", ".xml", ".yaml", ".yml", ".csv", ".log", ".env", ".properties", ".toml", ".py",
    ".vbs", ".sql", ".htm", ".html", ".php", ".asp", ".aspx",
];

/// Text extraction capability
pub trait Extractor: Send + Sync {
    fn extract(&self, reader: &mut dyn Read, filename: &str) -> io::Result<String>;
}

/// Closed set of extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Text,
    Strings,
    Docx,
    Xlsx,
    Pdf,
}

static TEXT: TextExtractor = TextExtractor;
static STRINGS: StringsExtractor = StringsExtractor::new(4);
static DOCX: DocxExtractor = DocxExtractor;
static XLSX: XlsxExtractor = XlsxExtractor;
static PDF: PdfExtractor = PdfExtractor;

impl ExtractorKind {
    /// Pick an extractor from the file's lowercase extension.
    ///
    /// Unknown and legacy binary formats get printable-run extraction.
    #[must_use]
    pub fn for_filename(filename: &str) -> Self {
        let ext = filename
            .rfind('.')
            .map(|idx| filename[idx..].to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            ".docx" => ExtractorKind::Docx,
            ".xlsx" => ExtractorKind::Xlsx,
            ".pdf" => ExtractorKind::Pdf,
            ".doc" | ".xls" => ExtractorKind::Strings,
            ext if TEXT_EXTENSIONS.contains(&ext) => ExtractorKind::Text,
            _ => ExtractorKind::Strings,
        }
    }

    #[must_use]
    pub fn extractor(self) -> &'static dyn Extractor {
        match self {
            ExtractorKind::Text => &TEXT,
            ExtractorKind::Strings => &STRINGS,
            ExtractorKind::Docx => &DOCX,
            ExtractorKind::Xlsx => &XLSX,
            ExtractorKind::Pdf => &PDF,
        }
    }
}

/// Extract text from `reader` with the extractor for `filename`.
pub fn extract_text(reader: &mut dyn Read, filename: &str) -> io::Result<String> {
    ExtractorKind::for_filename(filename)
        .extractor()
        .extract(reader, filename)
}

pub(crate) fn invalid_data<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}
