use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const MODERN: &str = "Android/media/com.whatsapp/WhatsApp/Media/.Statuses";

fn seed(root: &Path) {
    let dir = root.join(MODERN);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("IMG-1.jpg"), b"image bytes").unwrap();
    fs::write(dir.join("VID-1.mp4"), b"video bytes").unwrap();
    fs::write(dir.join("notes.txt"), b"ignored").unwrap();
}

fn statuskeepctl(workdir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("statuskeepctl");
    cmd.current_dir(workdir)
        .env_remove("STATUSKEEP_CONFIG_PATH")
        .env_remove("STATUSKEEP_CONFIG_JSON")
        .env_remove("STATUSKEEP_STORAGE_ROOT")
        .env_remove("STATUSKEEP_MANAGE_ALL_FILES")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn scan_json_lists_detected_statuses() {
    let device = tempfile::tempdir().unwrap();
    seed(device.path());

    statuskeepctl(device.path())
        .arg("--root")
        .arg(device.path())
        .arg("scan")
        .arg("--json")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("IMG-1.jpg")
                .and(predicate::str::contains("VID-1.mp4"))
                .and(predicate::str::contains("notes.txt").not()),
        );
}

#[test]
fn download_copies_into_save_directory() {
    let device = tempfile::tempdir().unwrap();
    seed(device.path());

    statuskeepctl(device.path())
        .arg("--root")
        .arg(device.path())
        .arg("download")
        .arg("IMG-1.jpg")
        .assert()
        .success()
        .stdout(predicate::str::contains("saved"));

    let saved = device.path().join("Download/StatusSaver/IMG-1.jpg");
    assert_eq!(fs::read(saved).unwrap(), b"image bytes");
}

#[test]
fn unknown_name_fails() {
    let device = tempfile::tempdir().unwrap();
    seed(device.path());

    statuskeepctl(device.path())
        .arg("--root")
        .arg(device.path())
        .arg("download")
        .arg("IMG-404.jpg")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no recent status named"));
}

#[test]
fn paths_reports_modern_and_legacy_sources() {
    let device = tempfile::tempdir().unwrap();
    seed(device.path());

    statuskeepctl(device.path())
        .arg("--root")
        .arg(device.path())
        .arg("paths")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Modern")
                .and(predicate::str::contains("Legacy"))
                .and(predicate::str::contains("missing"))
                .and(predicate::str::contains("Download/StatusSaver")),
        );
}
