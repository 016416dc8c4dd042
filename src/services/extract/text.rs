//! Plain text and printable-run (`strings`-style) extraction.

use super::Extractor;
use std::io::{self, Read};

/// Reads the stream as text; invalid UTF-8 is replaced, never rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn extract(&self, reader: &mut dyn Read, _filename: &str) -> io::Result<String> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

/// Keeps runs of printable ASCII at least `min_len` bytes long, one per line.
#[derive(Debug, Clone, Copy)]
pub struct StringsExtractor {
    min_len: usize,
}

impl StringsExtractor {
    #[must_use]
    pub const fn new(min_len: usize) -> Self {
        Self { min_len }
    }
}

impl Default for StringsExtractor {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Extractor for StringsExtractor {
    fn extract(&self, reader: &mut dyn Read, _filename: &str) -> io::Result<String> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(printable_runs(&data, self.min_len))
    }
}

/// Collect printable ASCII runs (bytes 32..=126) of at least `min_len`.
pub(crate) fn printable_runs(data: &[u8], min_len: usize) -> String {
    let min_len = min_len.max(1);
    let mut out = String::new();
    for run in data.split(|b| !(32..127).contains(b)) {
        if run.len() >= min_len {
            // Printable ASCII is valid UTF-8.
            out.extend(run.iter().map(|&b| b as char));
            out.push('\n');
        }
    }
    out
}
