use am_core::db::init_archive;
use am_core::store::RecordStore;
use am_core::store_sqlite::SqliteStore;
use am_core::types::{MessageRecord, PartyRecord, ThreadRecord};
use std::path::Path;
use std::process::Command;

fn seed(path: &Path, identity: &str, messages: &[(&str, Option<i64>, i64)]) {
    drop(init_archive(path).expect("init archive"));
    let mut store = SqliteStore::open(path).expect("open archive");
    store.begin().expect("begin");
    store
        .insert_party(&PartyRecord {
            skypename: "alice".to_string(),
            ..Default::default()
        })
        .expect("party");
    let thread_id = store
        .insert_thread(&ThreadRecord {
            identity: identity.to_string(),
            kind: Some(2),
            ..Default::default()
        })
        .expect("thread");
    for (body, remote_id, timestamp) in messages {
        store
            .insert_message(&MessageRecord {
                thread_id: Some(thread_id),
                author: Some("alice".to_string()),
                body: Some(body.to_string()),
                kind: Some(61),
                remote_id: *remote_id,
                timestamp: *timestamp,
                ..Default::default()
            })
            .expect("message");
    }
    store.commit().expect("commit");
}

fn message_count(path: &Path) -> usize {
    SqliteStore::open_read_only(path)
        .expect("reopen")
        .messages()
        .expect("messages")
        .len()
}

fn fixture() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
    let root = tempfile::tempdir().expect("tempdir");
    let source = root.path().join("source");
    let target = root.path().join("target");
    seed(
        &source.join("main.db"),
        "#alice/$room",
        &[("hello", Some(100), 1_000), ("later", Some(101), 1_002), ("no key", None, 5_000)],
    );
    seed(&target.join("main.db"), "#alice/$room", &[("hello", Some(100), 1_001)]);
    (root, source, target)
}

#[test]
fn cli_merge_prints_summary_and_is_idempotent() {
    let (_root, source, target) = fixture();
    let bin = env!("CARGO_BIN_EXE_am_cli");

    let first = Command::new(bin)
        .args([
            "merge",
            "--source",
            source.to_string_lossy().as_ref(),
            "--target",
            target.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run merge");
    assert!(first.status.success(), "stderr: {}", String::from_utf8_lossy(&first.stderr));
    let stdout = String::from_utf8(first.stdout).expect("utf8 merge");
    assert!(stdout.contains("3 messages read, 2 messages added."), "{}", stdout);
    assert_eq!(message_count(&target.join("main.db")), 3);

    let second = Command::new(bin)
        .args([
            "merge",
            "--source",
            source.to_string_lossy().as_ref(),
            "--target",
            target.to_string_lossy().as_ref(),
            "--json",
        ])
        .output()
        .expect("run second merge");
    assert!(second.status.success(), "stderr: {}", String::from_utf8_lossy(&second.stderr));
    let audit: serde_json::Value = serde_json::from_slice(&second.stdout).expect("json audit");
    assert_eq!(audit["added"], 0);
    assert_eq!(audit["duplicates"], 3);
    assert_eq!(message_count(&target.join("main.db")), 3);
}

#[test]
fn cli_merge_pretend_saves_nothing() {
    let (_root, source, target) = fixture();
    let bin = env!("CARGO_BIN_EXE_am_cli");

    let out = Command::new(bin)
        .args([
            "merge",
            "--source",
            source.to_string_lossy().as_ref(),
            "--target",
            target.to_string_lossy().as_ref(),
            "--pretend",
        ])
        .output()
        .expect("run pretend merge");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).expect("utf8 merge");
    assert!(stdout.contains("Saving nothing."));
    assert_eq!(message_count(&target.join("main.db")), 1);
}

#[test]
fn cli_merge_rejects_same_source_and_target() {
    let (_root, source, _target) = fixture();
    let bin = env!("CARGO_BIN_EXE_am_cli");

    let out = Command::new(bin)
        .args([
            "merge",
            "--source",
            source.to_string_lossy().as_ref(),
            "--target",
            source.join("main.db").to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run merge");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("AM_CONFIG_INVALID"), "stderr: {}", stderr);
}

#[test]
fn cli_merge_rejects_negative_leeway() {
    let (_root, source, target) = fixture();
    let bin = env!("CARGO_BIN_EXE_am_cli");

    let out = Command::new(bin)
        .args([
            "merge",
            "--source",
            source.to_string_lossy().as_ref(),
            "--target",
            target.to_string_lossy().as_ref(),
            "--timestamp-leeway=-5",
        ])
        .output()
        .expect("run merge");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("AM_CONFIG_INVALID"));
    assert_eq!(message_count(&target.join("main.db")), 1);
}

#[test]
fn cli_merge_reports_missing_archive() {
    let root = tempfile::tempdir().expect("tempdir");
    let bin = env!("CARGO_BIN_EXE_am_cli");

    let out = Command::new(bin)
        .args([
            "merge",
            "--source",
            root.path().join("absent").to_string_lossy().as_ref(),
            "--target",
            root.path().join("also-absent").to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run merge");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("AM_CONFIG_INVALID"));
}

#[test]
fn cli_check_passes_on_healthy_profile() {
    let (_root, source, _target) = fixture();
    let bin = env!("CARGO_BIN_EXE_am_cli");

    let out = Command::new(bin)
        .args(["check", "--profile", source.to_string_lossy().as_ref()])
        .output()
        .expect("run check");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).expect("utf8 check");
    assert!(stdout.contains("1 contacts, 1 conversations, 3 messages."));
}
