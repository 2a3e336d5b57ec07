//! Corruption detection and schema version gating on real files.

use std::fs;
use std::path::{Path, PathBuf};

use ptimer::{create, extract, CreateOptions, PackageError, PipelineError};

fn build_container(dir: &Path) -> PathBuf {
    let script = dir.join("p.timer");
    fs::write(
        &script,
        r#"
        step a { title "A" duration 60 }
        step b { duration 120 }
        "#,
    )
    .expect("write script");
    let container = dir.join("p.ptimer");
    create(&script, &container, CreateOptions::default()).expect("create");
    container
}

fn expect_corrupt(result: Result<PathBuf, PipelineError>) {
    match result {
        Err(PipelineError::Package(PackageError::Corrupt(_))) => {}
        other => panic!("expected corrupt-package error, got {other:?}"),
    }
}

#[test]
fn truncated_container_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let container = build_container(dir.path());
    let bytes = fs::read(&container).expect("read");

    for keep in [bytes.len() - 1, bytes.len() - 40, 12, 4, 0] {
        fs::write(&container, &bytes[..keep]).expect("truncate");
        expect_corrupt(extract(&container, &dir.path().join("out")));
    }
}

#[test]
fn flipped_byte_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let container = build_container(dir.path());
    let mut bytes = fs::read(&container).expect("read");

    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&container, &bytes).expect("rewrite");
    expect_corrupt(extract(&container, &dir.path().join("out")));
}

#[test]
fn unknown_version_is_a_schema_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let container = build_container(dir.path());
    let mut bytes = fs::read(&container).expect("read");

    // Version marker higher than anything this build knows.
    bytes[4] = 0xFF;
    bytes[5] = 0xFF;
    fs::write(&container, &bytes).expect("rewrite");

    match extract(&container, &dir.path().join("out")) {
        Err(PipelineError::Package(PackageError::SchemaVersion { found, supported })) => {
            assert_eq!(found, 0xFFFF);
            assert!(found > supported);
        }
        other => panic!("expected schema-version error, got {other:?}"),
    }
}

#[test]
fn garbage_file_is_corrupt_not_a_panic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let container = dir.path().join("garbage.ptimer");
    fs::write(&container, b"not a container at all, definitely long enough")
        .expect("write garbage");
    expect_corrupt(extract(&container, &dir.path().join("out")));
}

#[test]
fn missing_container_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    match extract(&dir.path().join("absent.ptimer"), &dir.path().join("out")) {
        Err(PipelineError::Package(PackageError::Io { path, .. })) => {
            assert!(path.ends_with("absent.ptimer"));
        }
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn extract_failure_writes_nothing_to_the_destination() {
    let dir = tempfile::tempdir().expect("tempdir");
    let container = build_container(dir.path());
    let bytes = fs::read(&container).expect("read");
    fs::write(&container, &bytes[..bytes.len() - 3]).expect("truncate");

    let out = dir.path().join("out");
    expect_corrupt(extract(&container, &out));
    assert!(!out.exists(), "reader failure must precede any writes");
}
