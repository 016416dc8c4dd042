//! Office Open XML (`.docx`, `.xlsx`) text extraction.

use super::{Extractor, invalid_data};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{self, Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

/// Cap on one decompressed archive member
const MAX_MEMBER_BYTES: u64 = 64 * 1024 * 1024;

type Archive = ZipArchive<Cursor<Vec<u8>>>;

fn open_archive(reader: &mut dyn Read) -> io::Result<Archive> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    ZipArchive::new(Cursor::new(data)).map_err(invalid_data)
}

fn read_member(archive: &mut Archive, name: &str) -> io::Result<Option<Vec<u8>>> {
    let member = match archive.by_name(name) {
        Ok(member) => member,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(invalid_data(err)),
    };
    let mut data = Vec::new();
    member.take(MAX_MEMBER_BYTES).read_to_end(&mut data)?;
    Ok(Some(data))
}

fn unescaped(text: &quick_xml::events::BytesText<'_>) -> io::Result<String> {
    text.unescape()
        .map(|t| t.into_owned())
        .map_err(invalid_data)
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Word documents: the text runs of `word/document.xml`, one paragraph per line
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn extract(&self, reader: &mut dyn Read, _filename: &str) -> io::Result<String> {
        let mut archive = open_archive(reader)?;
        let document = read_member(&mut archive, "word/document.xml")?
            .ok_or_else(|| invalid_data("missing word/document.xml"))?;
        document_text(&document)
    }
}

fn document_text(xml: &[u8]) -> io::Result<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid_data)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&unescaped(&t)?),
            Event::CData(t) if in_text => out.push_str(&String::from_utf8_lossy(&t)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Workbooks: every sheet's cells, space separated, one row per line
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxExtractor;

impl Extractor for XlsxExtractor {
    fn extract(&self, reader: &mut dyn Read, _filename: &str) -> io::Result<String> {
        let mut archive = open_archive(reader)?;
        let shared = match read_member(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => shared_strings(&xml)?,
            None => Vec::new(),
        };

        let mut sheets: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| {
                let number = name
                    .strip_prefix("xl/worksheets/sheet")?
                    .strip_suffix(".xml")?
                    .parse()
                    .ok()?;
                Some((number, name.to_string()))
            })
            .collect();
        sheets.sort();

        let mut out = String::new();
        for (_, name) in sheets {
            if let Some(xml) = read_member(&mut archive, &name)? {
                sheet_text(&xml, &shared, &mut out)?;
            }
        }
        Ok(out)
    }
}

fn shared_strings(xml: &[u8]) -> io::Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid_data)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&unescaped(&t)?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

fn sheet_text(xml: &[u8], shared: &[String], out: &mut String) -> io::Result<()> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut cell_type: Option<String> = None;
    let mut value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid_data)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"c" => {
                    cell_type = attribute(&e, b"t");
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let resolved = match cell_type.as_deref() {
                        Some("s") => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|idx| shared.get(idx))
                            .cloned()
                            .unwrap_or_default(),
                        _ => std::mem::take(&mut value),
                    };
                    out.push_str(&resolved);
                    out.push(' ');
                }
                b"row" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_value => value.push_str(&unescaped(&t)?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}
