//! Unit tests for content extraction feeding the matcher

use crate::fixtures::{MemoryFs, content_matcher, report_options};
use lootspider::services::budget::ConcurrencyBudget;
use lootspider::services::extract::{ExtractorKind, extract_text};
use lootspider::services::sink::memory::MemorySink;
use lootspider::services::walker::Walker;
use lootspider::{DedupStore, MatchReason, Origin};
use proptest::prelude::*;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

fn docx(body: &str) -> Vec<u8> {
    let xml = format!(
        r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>{body}</w:t></w:r></w:p></w:body></w:document>"#
    );
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

proptest! {
    #[test]
    fn extraction_is_idempotent(data in prop::collection::vec(any::<u8>(), 0..512)) {
        for name in ["a.txt", "b.bin", "c.doc"] {
            let first = extract_text(&mut data.as_slice(), name).unwrap();
            let second = extract_text(&mut data.as_slice(), name).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn strings_output_is_printable(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let text = extract_text(&mut data.as_slice(), "blob.bin").unwrap();
        prop_assert!(text.bytes().all(|b| b == b'\n' || (32..127).contains(&b)));
    }
}

#[test]
fn unknown_extensions_use_printable_runs() {
    assert_eq!(ExtractorKind::for_filename("dump.dmp"), ExtractorKind::Strings);
    assert_eq!(ExtractorKind::for_filename("no_extension"), ExtractorKind::Strings);
    assert_eq!(ExtractorKind::for_filename("web.Config"), ExtractorKind::Text);

    let mut data: &[u8] = b"\x00\x01\x02ab\x00password=letmein\xff\xfe";
    let text = extract_text(&mut data, "dump.dmp").unwrap();
    assert_eq!(text.trim_end(), "password=letmein");
}

#[test]
fn office_documents_are_matched_on_their_text() {
    let fs = MemoryFs::new([
        ("HR/onboarding.docx", docx("Initial password is Welcome1")),
        ("HR/handbook.docx", docx("Be kind")),
    ]);
    let matcher = content_matcher(&["password"]);
    let opts = report_options();
    let dedup = DedupStore::new();
    let sink = MemorySink::new();
    let walker = Walker::new(
        &opts,
        &matcher,
        &fs,
        &dedup,
        &sink,
        ConcurrencyBudget::owned(2),
        Origin::new("fs01", "Shared"),
    );

    let stats = walker.walk(".");

    let results = sink.results();
    assert_eq!(stats.content_checks, 2);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, "HR/onboarding.docx");
    assert_eq!(
        results[0].reason,
        MatchReason::Content("Initial password is Welcome1".to_string())
    );
}
