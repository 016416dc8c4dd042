//! Integration tests for single-root scans

use crate::fixtures::{
    MemoryFs, content_matcher, download_options, files_under, report_options, write_file_sync,
};
use lootspider::services::budget::ConcurrencyBudget;
use lootspider::services::sink::memory::MemorySink;
use lootspider::services::walker::Walker;
use lootspider::{DedupStore, LootLayout, MatchConfig, MatchReason, Matcher, Origin};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

#[test]
fn test_content_match_is_downloaded_and_reported() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("share");
    let loot = temp_dir.path().join("loot");
    write_file_sync(root.join("secrets.txt"), b"db_password=hunter2\n").unwrap();
    write_file_sync(root.join("readme.txt"), b"nothing to see\n").unwrap();

    let matcher = content_matcher(&["password"]);
    let dedup = DedupStore::new();
    let sink = MemorySink::new();
    let opts = download_options(&loot, LootLayout::Flat);

    let stats = lootspider::scan_path(&root, &opts, &matcher, &dedup, &sink).unwrap();

    let results = sink.results();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.path.ends_with("secrets.txt"));
    assert_eq!(
        result.reason,
        MatchReason::Content("db_password=hunter2".to_string())
    );
    assert!(result.reason.to_string().starts_with("Content:"));

    let expected = hex::encode(Sha256::digest(b"db_password=hunter2\n"));
    assert_eq!(result.hash.as_deref(), Some(expected.as_str()));
    assert_eq!(result.size, Some(20));
    assert_eq!(result.host, "Local");
    assert!(!result.timestamp.is_empty());

    let looted = files_under(&loot);
    assert_eq!(looted.len(), 1);
    assert!(
        looted[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_share_secrets.txt")
    );
    assert_eq!(stats.downloads, 1);
    assert_eq!(stats.duplicates, 0);
    assert_eq!(stats.content_checks, 2);
}

#[test]
fn test_filename_and_content_matches_report_once() {
    let fs = MemoryFs::new([
        ("a.txt", b"password=1".as_slice()),
        ("b.txt", b"nothing".as_slice()),
        ("logs/c.log", b"line one\npassword=2".as_slice()),
        // Also contains the content term; the filename check wins.
        ("keys/id_rsa", b"password".as_slice()),
    ]);
    let config = MatchConfig {
        filenames: vec!["^id_rsa$".to_string()],
        content: vec!["password".to_string()],
        ..MatchConfig::default().without_excludes()
    };
    let matcher = Matcher::new(&config).unwrap();
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
        Origin::new("10.0.0.5", "Data"),
    );

    let stats = walker.walk(".");

    let found: Vec<(String, MatchReason)> = sink
        .results()
        .into_iter()
        .map(|r| (r.path, r.reason))
        .collect();
    assert_eq!(
        found,
        vec![
            ("a.txt".to_string(), MatchReason::Content("password=1".to_string())),
            ("keys/id_rsa".to_string(), MatchReason::Filename),
            ("logs/c.log".to_string(), MatchReason::Content("password=2".to_string())),
        ]
    );
    assert_eq!(stats.matches, 3);
    assert_eq!(stats.content_checks, 3);
    assert!(sink.results().iter().all(|r| r.hash.is_none()));
    assert!(sink.results().iter().all(|r| r.share == "Data"));
}

#[test]
fn test_extension_only_reports_every_admitted_file_once() {
    let fs = MemoryFs::new([
        ("a.TXT", b"x".as_slice()),
        ("b.log", b"y".as_slice()),
        ("deep/c.txt", b"z".as_slice()),
        ("noext", b"w".as_slice()),
    ]);
    let config = MatchConfig {
        extensions: vec!["txt".to_string()],
        ..MatchConfig::default().without_excludes()
    };
    let matcher = Matcher::new(&config).unwrap();
    let opts = report_options();
    let dedup = DedupStore::new();
    let sink = MemorySink::new();
    let walker = Walker::new(
        &opts,
        &matcher,
        &fs,
        &dedup,
        &sink,
        ConcurrencyBudget::owned(1),
        Origin::default(),
    );

    let stats = walker.walk(".");

    let results = sink.results();
    let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["a.TXT", "deep/c.txt"]);
    assert!(results.iter().all(|r| r.reason == MatchReason::ExtensionAll));
    assert_eq!(stats.files_considered, 2);
    assert_eq!(stats.content_checks, 0);
}

#[test]
fn test_unreadable_file_is_skipped_silently() {
    let fs = MemoryFs::new([
        ("locked.txt", b"password".as_slice()),
        ("open.txt", b"password".as_slice()),
    ])
    .deny("locked.txt");
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
        Origin::default(),
    );

    let stats = walker.walk(".");

    let paths: Vec<String> = sink.results().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["open.txt"]);
    assert_eq!(stats.content_checks, 2);
    assert_eq!(stats.matches, 1);
}

#[test]
fn test_structured_layout_mirrors_share_paths() {
    let temp_dir = TempDir::new().unwrap();
    let loot = temp_dir.path().join("loot");
    let fs = MemoryFs::new([("Users/alice/creds.txt", b"password: x".as_slice())]);
    let matcher = content_matcher(&["password"]);
    let opts = download_options(&loot, LootLayout::Structured);
    let dedup = DedupStore::new();
    let sink = MemorySink::new();
    let walker = Walker::new(
        &opts,
        &matcher,
        &fs,
        &dedup,
        &sink,
        ConcurrencyBudget::owned(2),
        Origin::new("10.0.0.7", "C$"),
    );

    let stats = walker.walk(".");

    assert_eq!(stats.downloads, 1);
    let expected = loot.join("10.0.0.7").join("C$").join("Users/alice/creds.txt");
    assert_eq!(files_under(&loot), vec![expected.clone()]);
    assert_eq!(std::fs::read(expected).unwrap(), b"password: x");
}

#[test]
fn test_scan_path_rejects_missing_or_file_root() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("plain.txt");
    write_file_sync(&file, b"x").unwrap();

    let matcher = content_matcher(&["x"]);
    let dedup = DedupStore::new();
    let sink = MemorySink::new();
    let opts = report_options();

    let missing = lootspider::scan_path(
        temp_dir.path().join("missing"),
        &opts,
        &matcher,
        &dedup,
        &sink,
    );
    assert!(matches!(missing, Err(lootspider::Error::InvalidInput(_))));

    let not_dir = lootspider::scan_path(&file, &opts, &matcher, &dedup, &sink);
    assert!(matches!(not_dir, Err(lootspider::Error::InvalidInput(_))));
}

fn filename_matcher(pattern: &str) -> Matcher {
    let config = MatchConfig {
        filenames: vec![pattern.to_string()],
        ..MatchConfig::default().without_excludes()
    };
    Matcher::new(&config).unwrap()
}

#[test]
fn test_unopenable_match_is_reported_without_hash() {
    let temp_dir = TempDir::new().unwrap();
    let loot = temp_dir.path().join("loot");
    let fs = MemoryFs::new([
        ("creds.txt", b"sa:Passw0rd".as_slice()),
        ("creds.ini", b"[db]\npass=x".as_slice()),
    ])
    .deny("creds.txt");
    let matcher = filename_matcher("^creds");
    let opts = download_options(&loot, LootLayout::Flat);
    let dedup = DedupStore::new();
    let sink = MemorySink::new();
    let walker = Walker::new(
        &opts,
        &matcher,
        &fs,
        &dedup,
        &sink,
        ConcurrencyBudget::owned(2),
        Origin::new("fs02", "IT"),
    );

    let stats = walker.walk(".");

    let results = sink.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].path, "creds.ini");
    assert!(results[0].hash.is_some());
    assert_eq!(results[1].path, "creds.txt");
    assert_eq!(results[1].reason, MatchReason::Filename);
    assert_eq!(results[1].hash, None);
    assert_eq!(results[1].size, None);

    assert_eq!(stats.matches, 2);
    assert_eq!(stats.downloads, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(files_under(&loot), vec![loot.join("creds.ini")]);
    assert_eq!(dedup.len(), 1);
}

#[test]
fn test_interrupted_download_leaves_no_partial_file() {
    let temp_dir = TempDir::new().unwrap();
    let loot = temp_dir.path().join("loot");
    let fs = MemoryFs::new([("backup.kdbx", vec![0x5a; 256 * 1024])]).fail_midway("backup.kdbx");
    let matcher = filename_matcher(r"\.kdbx$");
    let opts = download_options(&loot, LootLayout::Structured);
    let dedup = DedupStore::new();
    let sink = MemorySink::new();
    let walker = Walker::new(
        &opts,
        &matcher,
        &fs,
        &dedup,
        &sink,
        ConcurrencyBudget::owned(2),
        Origin::new("fs02", "Backups"),
    );

    let stats = walker.walk(".");

    let results = sink.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].hash, None);
    assert_eq!(stats.downloads, 0);
    assert_eq!(stats.errors, 1);
    assert!(files_under(&loot).is_empty());
    assert!(dedup.is_empty());
}
