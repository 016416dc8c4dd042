//! Integration tests for content-hash deduplication of loot

use crate::fixtures::{MemoryFs, content_matcher, download_options, files_under, write_file_sync};
use lootspider::services::budget::ConcurrencyBudget;
use lootspider::services::sink::memory::MemorySink;
use lootspider::services::walker::Walker;
use lootspider::{DedupStore, LootLayout, Origin};
use tempfile::TempDir;

#[test]
fn test_second_scan_of_same_content_is_a_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("share");
    let loot = temp_dir.path().join("loot");
    write_file_sync(root.join("secrets.txt"), b"password=swordfish").unwrap();

    let matcher = content_matcher(&["password"]);
    let dedup = DedupStore::new();
    let opts = download_options(&loot, LootLayout::Flat);

    let first_sink = MemorySink::new();
    let first = lootspider::scan_path(&root, &opts, &matcher, &dedup, &first_sink).unwrap();
    let second_sink = MemorySink::new();
    let second = lootspider::scan_path(&root, &opts, &matcher, &dedup, &second_sink).unwrap();

    assert_eq!(first.downloads, 1);
    assert_eq!(first.duplicates, 0);
    assert_eq!(second.downloads, 0);
    assert_eq!(second.duplicates, 1);

    // The duplicate is still reported, with the same hash.
    let first_hash = first_sink.results()[0].hash.clone();
    let second_hash = second_sink.results()[0].hash.clone();
    assert!(first_hash.is_some());
    assert_eq!(first_hash, second_hash);

    let looted = files_under(&loot);
    assert_eq!(looted.len(), 1);
    assert_eq!(std::fs::read(&looted[0]).unwrap(), b"password=swordfish");
    assert_eq!(dedup.len(), 1);
}

#[test]
fn test_identical_files_in_one_walk_keep_one_copy() {
    let temp_dir = TempDir::new().unwrap();
    let loot = temp_dir.path().join("loot");
    let fs = MemoryFs::new([
        ("backup/web.config", b"connection password=abc".as_slice()),
        ("live/web.config", b"connection password=abc".as_slice()),
        ("other/app.config", b"password=different".as_slice()),
    ]);
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
        ConcurrencyBudget::owned(3),
        Origin::new("fileserver", "Backups"),
    );

    let stats = walker.walk(".");

    assert_eq!(stats.matches, 3);
    assert_eq!(stats.downloads, 2);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(files_under(&loot).len(), 2);

    let results = sink.results();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].path, "backup/web.config");
    assert_eq!(results[1].path, "live/web.config");
    assert_eq!(results[0].hash, results[1].hash);
    assert_ne!(results[0].hash, results[2].hash);
}

#[test]
fn test_dedup_store_reports_first_sighting_only() {
    let dedup = DedupStore::new();
    assert!(dedup.is_empty());
    assert!(!dedup.is_duplicate("aa"));
    assert!(dedup.is_duplicate("aa"));
    assert!(!dedup.is_duplicate("bb"));
    assert_eq!(dedup.len(), 2);
}

#[test]
fn test_failed_copy_does_not_mark_content_as_captured() {
    let temp_dir = TempDir::new().unwrap();
    let loot = temp_dir.path().join("loot");
    // The flat destination of `a.txt` is taken by a directory, so keeping it fails.
    std::fs::create_dir_all(loot.join("a.txt")).unwrap();

    let matcher = content_matcher(&["password"]);
    let opts = download_options(&loot, LootLayout::Flat);
    let dedup = DedupStore::new();

    let walk = |fs: &MemoryFs, sink: &MemorySink| {
        Walker::new(
            &opts,
            &matcher,
            fs,
            &dedup,
            sink,
            ConcurrencyBudget::owned(2),
            Origin::new("fs01", "Public"),
        )
        .walk(".")
    };

    let blocked = MemoryFs::new([("a.txt", b"password=1".as_slice())]);
    let first_sink = MemorySink::new();
    let first = walk(&blocked, &first_sink);
    assert_eq!(first.downloads, 0);
    assert_eq!(first.errors, 1);
    assert_eq!(first_sink.results()[0].hash, None);
    assert!(dedup.is_empty());

    let same_content = MemoryFs::new([("b.txt", b"password=1".as_slice())]);
    let second_sink = MemorySink::new();
    let second = walk(&same_content, &second_sink);
    assert_eq!(second.downloads, 1);
    assert_eq!(second.duplicates, 0);
    assert!(second_sink.results()[0].hash.is_some());

    assert_eq!(files_under(&loot), vec![loot.join("b.txt")]);
    assert_eq!(std::fs::read(loot.join("b.txt")).unwrap(), b"password=1");
    assert_eq!(dedup.len(), 1);
}
