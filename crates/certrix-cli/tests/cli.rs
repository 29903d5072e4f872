//! End-to-end tests of the `certrix` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use certrix_pki::archive::read_entries;

fn certrix() -> Command {
    let mut cmd = Command::cargo_bin("certrix").unwrap();
    for var in [
        "CERTRIX_CA_KEY_PEM",
        "CERTRIX_CA_CERT_PEM",
        "CERTRIX_CA_COMMON_NAME",
        "CERTRIX_CA_ORGANIZATION",
        "CERTRIX_CA_COUNTRY",
        "CERTRIX_WORKERS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Generates a bundle for `cn` and returns its CSR.
fn generate_csr(dir: &Path, cn: &str) -> Vec<u8> {
    certrix()
        .args(["generate", "--cn", cn, "--out-dir"])
        .arg(dir)
        .assert()
        .success();
    let archive = fs::read(dir.join(format!("{cn}_certs.zip"))).unwrap();
    read_entries(&archive)
        .unwrap()
        .into_iter()
        .find(|e| e.name.ends_with(".csr"))
        .unwrap()
        .data
}

#[test]
fn help_lists_commands() {
    certrix()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("renew-bulk"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn generate_writes_bundle() {
    let dir = tempfile::tempdir().unwrap();
    certrix()
        .args(["generate", "--cn", "api.example.com", "--org", "Example", "--out-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Subject:     CN=api.example.com, O=Example"));

    assert!(dir.path().join("api.example.com_certs.zip").exists());
}

#[test]
fn generate_rejects_blank_cn() {
    let dir = tempfile::tempdir().unwrap();
    certrix()
        .args(["generate", "--cn", "!!!", "--out-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: CN required"));
}

#[test]
fn preview_reads_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let csr = generate_csr(dir.path(), "stdin-host");

    certrix()
        .args(["--format", "json", "preview", "-"])
        .write_stdin(csr)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"pasted\""))
        .stdout(predicate::str::contains("\"CN\": \"stdin-host\""));
}

#[test]
fn renew_writes_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let csr = generate_csr(dir.path(), "orders_v2");
    let input = dir.path().join("orders.csr");
    fs::write(&input, csr).unwrap();
    let out = dir.path().join("out");

    certrix()
        .arg("renew")
        .arg(&input)
        .args(["--years", "4", "--out-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("orders.cer"));

    let der = fs::read(out.join("orders.cer")).unwrap();
    assert_eq!(der[0], 0x30);
}

#[test]
fn renew_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("junk.csr");
    fs::write(&input, b"garbage").unwrap();

    certrix()
        .arg("renew")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid CSR"));
}

#[test]
fn renew_bulk_writes_archive() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = certrix_pki::archive::ArchiveBuilder::new();
    builder.insert("a.csr", generate_csr(dir.path(), "alpha"));
    builder.insert("b.der", b"broken".to_vec());
    let input = dir.path().join("batch.zip");
    fs::write(&input, builder.finish().unwrap()).unwrap();

    certrix()
        .arg("renew-bulk")
        .arg(&input)
        .args(["--workers", "2", "--out-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed:    1"))
        .stdout(predicate::str::contains("Failed:    1"));

    let archive = fs::read(dir.path().join("renewed_1_certs.zip")).unwrap();
    let names: Vec<_> = read_entries(&archive)
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["alpha.cer"]);
}
