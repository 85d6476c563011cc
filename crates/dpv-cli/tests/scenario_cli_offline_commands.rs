//! Commands that never touch the network.
//!
//! - `checksum` prints both console renderings for any payload encoding
//! - `parse` lists every record of a capture in order
//! - `config-hash` is stable across runs of the same layers

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn dpv() -> Command {
    Command::cargo_bin("dpv").unwrap()
}

#[test]
fn checksum_accepts_base64_hex_and_text() {
    dpv()
        .args(["checksum", "--base64", "AQIDBA=="])
        .assert()
        .success()
        .stdout(predicate::str::contains("crc32_dec=3057449933"))
        .stdout(predicate::str::contains("crc32_hex=B63CFBCD"));

    dpv()
        .args(["checksum", "--hex", "01020304"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base64=AQIDBA=="));

    dpv()
        .args(["checksum", "--text", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("crc32_hex=3610A686"));
}

#[test]
fn checksum_rejects_bad_base64() {
    dpv()
        .args(["checksum", "--base64", "not base64!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid base64"));
}

#[test]
fn parse_lists_records_from_stdin() {
    let capture = "\
boot noise
[DataPoint] Location: '/a' Quality: 'OK' Data: '10'
[DataPoint] Location: '/a' Quality: 'OK' Data: '20'
END LOOP ----------------------------------------
";
    dpv()
        .args(["parse", "--input", "-"])
        .write_stdin(capture)
        .assert()
        .success()
        .stdout(predicate::str::contains("records=2"))
        .stdout(predicate::str::contains(
            "record=1 kind=scalar location=/a quality=OK data=20",
        ));
}

#[test]
fn parse_fails_on_malformed_record() {
    dpv()
        .args(["parse"])
        .write_stdin("[DataPoint] Location: '/a' Data: '10'\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed record"));
}

#[test]
fn config_hash_is_stable_for_the_same_layers() {
    let mut base = NamedTempFile::new().unwrap();
    writeln!(base, "device:\n  device_id: dev-1\nstream:\n  name: incremental").unwrap();
    let path = base.path().to_string_lossy().to_string();

    let first = dpv().args(["config-hash", &path]).output().unwrap();
    let second = dpv().args(["config-hash", &path]).output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let stdout = String::from_utf8(first.stdout).unwrap();
    assert!(stdout.starts_with("config_hash="));
    assert!(stdout.contains(r#""device_id":"dev-1""#));
}

#[test]
fn config_hash_rejects_literal_password() {
    let mut base = NamedTempFile::new().unwrap();
    writeln!(base, "cloud:\n  credentials_env:\n    password: hunter2").unwrap();
    let path = base.path().to_string_lossy().to_string();

    dpv()
        .args(["config-hash", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("hunter2").not());
}
