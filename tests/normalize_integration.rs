//! Directory flattening through the binary.

mod common;

use assert_cmd::Command;
use common::Workspace;
use std::fs;

fn archive_sweeper() -> Command {
    Command::cargo_bin("archive-sweeper").unwrap()
}

#[test]
fn test_single_child_is_promoted() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.path("outer/inner")).unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(ws.path("outer/inner").join(name), name).unwrap();
    }

    archive_sweeper().arg("-n").arg(&ws.root).assert().success();

    assert!(!ws.path("outer").exists());
    for name in ["a.txt", "b.txt", "c.txt"] {
        assert!(ws.path("inner").join(name).exists());
    }
}

#[test]
fn test_multi_entry_directory_untouched() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.path("p/a")).unwrap();
    fs::write(ws.path("p/readme.txt"), "x").unwrap();

    let output = archive_sweeper()
        .args(["-n", "--json"])
        .arg(&ws.root)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["dirs_ignored"], 1);
    assert_eq!(stats["dirs_reorganized"], 0);
    assert!(ws.path("p/a").is_dir());
    assert!(ws.path("p/readme.txt").exists());
}

#[test]
fn test_archive_nesting_collapses_to_fixed_point() {
    let ws = Workspace::new();
    ws.zip(
        "bundle.zip",
        &[("outer/", b""), ("outer/inner/", b""), ("outer/inner/file.txt", b"data")],
    );

    archive_sweeper().arg("-n").arg(&ws.root).assert().success();

    assert_eq!(fs::read_to_string(ws.path("inner/file.txt")).unwrap(), "data");
    assert!(!ws.path("bundle").exists());
    assert!(!ws.path("outer").exists());
}

#[test]
fn test_single_pass_moves_one_level() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.path("a/b/c")).unwrap();
    fs::write(ws.path("a/b/c/one.txt"), "1").unwrap();
    fs::write(ws.path("a/b/c/two.txt"), "2").unwrap();

    archive_sweeper()
        .args(["-n", "--single-pass"])
        .arg(&ws.root)
        .assert()
        .success();

    assert!(ws.path("b/c/one.txt").exists());
    assert!(!ws.path("a").exists());

    archive_sweeper().arg("-n").arg(&ws.root).assert().success();
    assert!(ws.path("c/two.txt").exists());
    assert!(!ws.path("b").exists());
}

#[test]
fn test_second_run_changes_nothing() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.path("outer/inner")).unwrap();
    fs::write(ws.path("outer/inner/a.txt"), "a").unwrap();
    fs::write(ws.path("outer/inner/b.txt"), "b").unwrap();
    fs::write(ws.path(".DS_Store"), "x").unwrap();

    archive_sweeper().arg("-n").arg(&ws.root).assert().success();

    let output = archive_sweeper()
        .args(["-n", "--json"])
        .arg(&ws.root)
        .output()
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["files_removed"], 0);
    assert_eq!(stats["dirs_removed"], 0);
    assert_eq!(stats["dirs_reorganized"], 0);
}
