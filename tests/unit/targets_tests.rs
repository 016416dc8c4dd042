//! Unit tests for target resolution

use lootspider::services::targets::{Target, TargetKind, expand_cidr, resolve_targets};
use std::fs;
use tempfile::TempDir;

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_target_file_with_comments_ranges_and_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    let list = temp_dir.path().join("targets.txt");
    fs::write(
        &list,
        "# office network\n10.0.0.1\n\n  fs01.corp.local  \n192.168.5.0/31\n10.0.0.1\n",
    )
    .unwrap();

    let targets = resolve_targets(&args(&[list.to_str().unwrap(), "fs01.corp.local"]), None).unwrap();
    let ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();

    assert_eq!(
        ids,
        vec!["10.0.0.1", "fs01.corp.local", "192.168.5.0", "192.168.5.1"]
    );
    assert!(targets.iter().all(|t| !t.is_local()));
}

#[test]
fn test_directory_argument_is_local() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap().to_string();

    let targets = resolve_targets(&args(&[&dir, "10.1.1.1"]), None).unwrap();

    assert_eq!(targets[0], Target {
        id: dir.clone(),
        kind: TargetKind::Local(temp_dir.path().to_path_buf()),
    });
    assert_eq!(targets[1].kind, TargetKind::Remote("10.1.1.1".to_string()));
}

#[test]
fn test_cidr_argument_expands_in_order() {
    let targets = resolve_targets(&args(&["10.9.0.0/30"]), None).unwrap();
    let ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();

    assert_eq!(ids, vec!["10.9.0.0", "10.9.0.1", "10.9.0.2", "10.9.0.3"]);
}

#[test]
fn test_oversized_range_in_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let list = temp_dir.path().join("targets.txt");
    fs::write(&list, "10.0.0.0/8\n").unwrap();

    assert!(resolve_targets(&args(&[list.to_str().unwrap()]), None).is_err());
}

#[test]
fn test_host_names_are_not_ranges() {
    assert_eq!(expand_cidr("fileserver").unwrap(), None);
    assert_eq!(expand_cidr("10.0.0.1").unwrap(), None);
    assert_eq!(expand_cidr("share/path").unwrap(), None);
}
