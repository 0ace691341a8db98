#![allow(missing_docs)]
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Command;

use app_test_harness::PackagedApp;

/// Build a small `.tar.gz` assembly with a single `bin/app` launch script.
fn build_assembly(dir: &tempfile::TempDir) -> PathBuf {
    let bin_dir = dir.path().join("app-1.0").join("bin");
    fs::create_dir_all(&bin_dir).unwrap();

    let script = bin_dir.join("app");
    fs::write(&script, "#!/bin/sh\necho packaged hello\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let archive = dir.path().join("app-1.0-bin.tar.gz");
    let status = Command::new("tar")
        .arg("-C")
        .arg(dir.path())
        .arg("-czf")
        .arg(&archive)
        .arg("app-1.0")
        .status()
        .unwrap();
    assert!(status.success());
    archive
}

#[test]
fn extracts_assembly_and_runs_its_app() {
    let dir = tempfile::TempDir::new().unwrap();
    let archive = build_assembly(&dir);

    let app = PackagedApp::extract(&archive, "app-1.0").unwrap();
    let mut executor = app.executor("app");
    executor.execute().unwrap();

    executor.assert_line_of_output("packaged hello").unwrap();
    executor.assert_no_more_output().unwrap();
    executor.assert_normal_exit().unwrap();
}

#[test]
fn extraction_of_garbage_archive_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let archive = dir.path().join("broken.tar.gz");
    fs::write(&archive, "this is not a tar archive").unwrap();

    assert!(PackagedApp::extract(&archive, "broken").is_err());
}
