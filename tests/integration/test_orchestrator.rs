//! Integration tests for multi-target runs

use crate::fixtures::{
    FakeConnector, FakeHost, MemoryFs, content_matcher, download_options, files_under,
    report_options, write_file_sync,
};
use lootspider::io::state::ResumeState;
use lootspider::services::fs::remote::{Credentials, MountedShareConnector};
use lootspider::services::orchestrator::{Orchestrator, RunOptions};
use lootspider::services::sink::memory::MemorySink;
use lootspider::services::targets::Target;
use lootspider::{LootLayout, MatchConfig, MatchReason, Matcher, RunSummary};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn single_share_host(file: &str) -> FakeHost {
    FakeHost::new().share("Data", MemoryFs::new([(file, b"password=1".as_slice())]))
}

fn run_with(
    connector: Arc<FakeConnector>,
    options: RunOptions,
    matcher: Matcher,
    ids: &[&str],
) -> (RunSummary, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let targets: Vec<Target> = ids.iter().map(|id| Target::classify(id)).collect();
    let orchestrator =
        Orchestrator::new(options, Arc::new(matcher), sink.clone()).with_connector(connector);
    let summary = orchestrator.run(&targets).unwrap();
    (summary, sink)
}

fn report_run() -> RunOptions {
    RunOptions {
        scan: report_options(),
        ..RunOptions::default()
    }
}

#[test]
fn test_one_concurrent_host_never_overlaps() {
    let connector = Arc::new(
        FakeConnector::new()
            .host("10.0.0.1", single_share_host("a.txt"))
            .host("10.0.0.2", single_share_host("b.txt"))
            .host("10.0.0.3", single_share_host("c.txt"))
            .with_connect_delay(Duration::from_millis(30)),
    );
    let options = RunOptions {
        concurrent_hosts: 1,
        ..report_run()
    };

    let (summary, sink) = run_with(
        connector.clone(),
        options,
        content_matcher(&["password"]),
        &["10.0.0.1", "10.0.0.2", "10.0.0.3"],
    );

    assert_eq!(connector.peak_sessions(), 1);
    assert_eq!(summary.targets, 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(sink.len(), 3);
}

#[test]
fn test_remote_shares_skip_ipc_and_carry_origin() {
    let temp_dir = TempDir::new().unwrap();
    let loot = temp_dir.path().join("loot");
    let host = FakeHost::new()
        .share("C$", MemoryFs::new([("Users/a/creds.txt", b"password: x".as_slice())]))
        .share("IPC$", MemoryFs::new([("pipe", b"password".as_slice())]))
        .share("Data", MemoryFs::new([("db.ini", b"PASSWORD=y".as_slice())]));
    let connector = Arc::new(FakeConnector::new().host("10.0.0.9", host));
    let options = RunOptions {
        scan: download_options(&loot, LootLayout::Structured),
        ..RunOptions::default()
    };

    let (summary, sink) = run_with(
        connector.clone(),
        options,
        content_matcher(&["password"]),
        &["10.0.0.9"],
    );

    let mut mounted = connector.mounted();
    mounted.sort();
    assert_eq!(mounted, vec!["10.0.0.9/C$", "10.0.0.9/Data"]);

    let results = sink.results();
    let origins: Vec<(&str, &str, &str)> = results
        .iter()
        .map(|r| (r.host.as_str(), r.share.as_str(), r.path.as_str()))
        .collect();
    assert_eq!(
        origins,
        vec![
            ("10.0.0.9", "C$", "Users/a/creds.txt"),
            ("10.0.0.9", "Data", "db.ini"),
        ]
    );
    assert!(results.iter().all(|r| r.hash.is_some()));

    assert_eq!(
        files_under(&loot),
        vec![
            loot.join("10.0.0.9/C$/Users/a/creds.txt"),
            loot.join("10.0.0.9/Data/db.ini"),
        ]
    );
    assert_eq!(summary.stats.downloads, 2);
}

#[test]
fn test_signing_failure_fails_target_but_records_it() {
    let temp_dir = TempDir::new().unwrap();
    let state_path = temp_dir.path().join("state.json");
    let resume = Arc::new(ResumeState::load(&state_path).unwrap());
    let connector = Arc::new(
        FakeConnector::new()
            .host("dc01", single_share_host("a.txt").signing_required())
            .host("fs01", single_share_host("b.txt")),
    );

    let sink = Arc::new(MemorySink::new());
    let orchestrator = Orchestrator::new(
        report_run(),
        Arc::new(content_matcher(&["password"])),
        sink.clone(),
    )
    .with_connector(connector)
    .with_resume(resume.clone());
    let summary = orchestrator
        .run(&[Target::classify("dc01"), Target::classify("fs01")])
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "dc01");
    assert!(summary.failed[0].1.contains("Signing required"));
    assert_eq!(sink.len(), 1);

    // Failed targets still count as attempted.
    assert!(resume.is_completed("dc01"));
    assert!(resume.is_completed("fs01"));
    let reloaded = ResumeState::load(&state_path).unwrap();
    assert_eq!(reloaded.completed(), vec!["dc01", "fs01"]);
}

#[test]
fn test_explicit_share_names_bypass_listing() {
    let connector = Arc::new(
        FakeConnector::new().host("dc01", single_share_host("a.txt").signing_required()),
    );
    let options = RunOptions {
        share_names: vec!["Data".to_string(), "ipc$".to_string()],
        ..report_run()
    };

    let (summary, sink) = run_with(
        connector.clone(),
        options,
        content_matcher(&["password"]),
        &["dc01"],
    );

    assert!(summary.failed.is_empty());
    assert_eq!(connector.mounted(), vec!["dc01/Data"]);
    assert_eq!(sink.results()[0].reason, MatchReason::Content("password=1".into()));
}

#[test]
fn test_io_timeout_reaches_transport() {
    let connector = Arc::new(FakeConnector::new().host("fs01", single_share_host("a.txt")));
    let options = RunOptions {
        io_timeout: Some(Duration::from_secs(7)),
        ..report_run()
    };

    run_with(connector.clone(), options, content_matcher(&["x"]), &["fs01"]);

    assert_eq!(connector.timeouts(), vec![Some(Duration::from_secs(7))]);
}

#[test]
fn test_kerberos_ccache_is_rejected_before_connecting() {
    let connector = Arc::new(FakeConnector::new().host("fs01", single_share_host("a.txt")));
    let options = RunOptions {
        credentials: Credentials {
            username: "alice".to_string(),
            ccache: Some("/tmp/krb5cc_1000".into()),
            ..Credentials::default()
        },
        ..report_run()
    };

    let (summary, sink) = run_with(connector.clone(), options, content_matcher(&["x"]), &["fs01"]);

    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].1.contains("Kerberos"));
    assert!(connector.timeouts().is_empty());
    assert!(sink.is_empty());
}

#[test]
fn test_unreachable_host_does_not_stop_others() {
    let connector = Arc::new(FakeConnector::new().host("fs01", single_share_host("a.txt")));

    let (summary, sink) = run_with(
        connector,
        report_run(),
        content_matcher(&["password"]),
        &["fs01", "ghost"],
    );

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed[0].0, "ghost");
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_default_transport_points_at_mount_root() {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = Orchestrator::new(
        report_run(),
        Arc::new(content_matcher(&["x"])),
        sink.clone(),
    );

    let summary = orchestrator.run(&[Target::classify("10.1.1.1")]).unwrap();

    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].1.contains("--mount-root"));
}

#[test]
fn test_mounted_shares_are_scanned_per_host() {
    let temp_dir = TempDir::new().unwrap();
    let mounts = temp_dir.path().join("mnt");
    write_file_sync(mounts.join("host1/Share1/docs/file.txt"), b"api password").unwrap();
    write_file_sync(mounts.join("host1/IPC$/ignored.txt"), b"password").unwrap();

    let sink = Arc::new(MemorySink::new());
    let orchestrator = Orchestrator::new(
        report_run(),
        Arc::new(content_matcher(&["password"])),
        sink.clone(),
    )
    .with_connector(Arc::new(MountedShareConnector::new(&mounts)));

    let summary = orchestrator.run(&[Target::classify("host1")]).unwrap();

    assert!(summary.failed.is_empty());
    let results = sink.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].host, "host1");
    assert_eq!(results[0].share, "Share1");
    assert_eq!(results[0].path, "docs/file.txt");
}

#[test]
fn test_local_and_blanket_targets_in_one_run() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("local");
    write_file_sync(root.join("one.cfg"), b"a").unwrap();
    write_file_sync(root.join("two.txt"), b"b").unwrap();
    let id = root.to_string_lossy().to_string();

    let config = MatchConfig {
        extensions: vec![".cfg".to_string()],
        ..MatchConfig::default().without_excludes()
    };
    let connector = Arc::new(FakeConnector::new());
    let (summary, sink) = run_with(
        connector,
        report_run(),
        Matcher::new(&config).unwrap(),
        &[id.as_str()],
    );

    assert_eq!(summary.completed, 1);
    let results = sink.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].reason, MatchReason::ExtensionAll);
    assert_eq!(results[0].host, "Local");
    assert_eq!(results[0].share, id);
    assert!(results[0].path.ends_with("one.cfg"));
}
