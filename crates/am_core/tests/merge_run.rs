use am_core::config::MergeConfig;
use am_core::fingerprint::FingerprintIndex;
use am_core::run::run_merge;
use am_core::store::RecordStore;
use am_core::store_memory::MemoryStore;
use am_core::types::{MessageId, MessageRecord, PartyRecord, ThreadId, ThreadRecord, THREAD_KIND_GROUP};

fn party(id: i64, skypename: &str) -> PartyRecord {
    PartyRecord {
        id,
        skypename: skypename.to_string(),
        ..Default::default()
    }
}

fn thread(id: i64, identity: &str) -> ThreadRecord {
    ThreadRecord {
        id: ThreadId(id),
        identity: identity.to_string(),
        kind: Some(THREAD_KIND_GROUP),
        ..Default::default()
    }
}

fn msg(id: i64, thread: i64, body: &str, remote_id: Option<i64>, timestamp: i64) -> MessageRecord {
    MessageRecord {
        id: MessageId(id),
        thread_id: Some(ThreadId(thread)),
        author: Some("alice".to_string()),
        body: Some(body.to_string()),
        kind: Some(61),
        remote_id,
        timestamp,
        ..Default::default()
    }
}

fn source_store() -> MemoryStore {
    MemoryStore::new()
        .with_party(party(1, "alice"))
        .with_party(party(2, "bob"))
        .with_thread(thread(1, "#alice/$shared"))
        .with_thread(thread(2, "#alice/$only-source"))
        .with_message(msg(1, 1, "hello", Some(100), 1_000))
        .with_message(msg(2, 1, "again", Some(101), 1_100))
        .with_message(msg(3, 2, "private", Some(200), 2_000))
        .with_message(msg(4, 2, "no key", None, 2_500))
}

fn target_store() -> MemoryStore {
    MemoryStore::new()
        .with_party(party(1, "alice"))
        .with_thread(thread(1, "#alice/$other"))
        .with_thread(thread(2, "#alice/$shared"))
        .with_message(msg(1, 2, "hello", Some(100), 1_003))
        .with_message(msg(2, 1, "unrelated", Some(900), 500))
}

#[test]
fn merge_adds_missing_records_and_commits_once() {
    let source = source_store();
    let mut target = target_store();

    let audit = run_merge(&source, &mut target, &MergeConfig::default()).expect("merge");

    assert_eq!(audit.parties_added, 1);
    assert_eq!(audit.threads_added, 1);
    assert_eq!(audit.checked, 4);
    assert_eq!(audit.added, 3);
    assert_eq!(audit.duplicates, 1);
    assert!(audit.is_balanced());
    assert_eq!(target.commit_count(), 1);
    assert!(!target.in_transaction());

    let parties: Vec<String> = target
        .parties()
        .expect("parties")
        .into_iter()
        .map(|p| p.skypename)
        .collect();
    assert_eq!(parties, vec!["alice".to_string(), "bob".to_string()]);

    let threads = target.threads().expect("threads");
    assert_eq!(threads.len(), 3);
    let private = threads
        .iter()
        .find(|t| t.identity == "#alice/$only-source")
        .expect("new thread");

    let messages = target.messages().expect("messages");
    assert_eq!(messages.len(), 5);
    let again = messages
        .iter()
        .find(|m| m.body.as_deref() == Some("again"))
        .expect("again");
    assert_eq!(again.thread_id, Some(ThreadId(2)));
    let no_key = messages
        .iter()
        .find(|m| m.body.as_deref() == Some("no key"))
        .expect("no key");
    assert_eq!(no_key.thread_id, Some(private.id));
    assert_eq!(no_key.remote_id, Some(4));
    assert_eq!(no_key.synthesized_from, Some(4));
}

#[test]
fn second_merge_of_same_source_adds_nothing() {
    let source = source_store();
    let mut target = target_store();

    run_merge(&source, &mut target, &MergeConfig::default()).expect("first merge");
    let after_first = target.messages().expect("messages");

    let audit = run_merge(&source, &mut target, &MergeConfig::default()).expect("second merge");
    assert_eq!(audit.parties_added, 0);
    assert_eq!(audit.threads_added, 0);
    assert_eq!(audit.added, 0);
    assert_eq!(audit.duplicates, 4);
    assert_eq!(target.messages().expect("messages"), after_first);
}

#[test]
fn merged_target_keeps_fingerprint_and_key_unique() {
    let source = source_store();
    let mut target = target_store();

    run_merge(&source, &mut target, &MergeConfig::default()).expect("merge");
    FingerprintIndex::build(target.messages().expect("messages")).expect("still unique");
}

#[test]
fn pretend_classifies_everything_and_saves_nothing() {
    let source = source_store();
    let mut target = target_store();
    let before = target.messages().expect("messages");

    let config = MergeConfig {
        pretend: true,
        ..MergeConfig::default()
    };
    let audit = run_merge(&source, &mut target, &config).expect("pretend merge");

    assert!(audit.pretend);
    assert_eq!(audit.added, 3);
    assert_eq!(audit.parties_added, 1);
    assert_eq!(target.commit_count(), 0);
    assert!(!target.in_transaction());
    assert_eq!(target.messages().expect("messages"), before);
    assert_eq!(target.parties().expect("parties").len(), 1);
    assert_eq!(target.threads().expect("threads").len(), 2);
}

#[test]
fn duplicate_key_in_target_aborts_without_changes() {
    let source = source_store();
    let mut target = target_store().with_message(msg(3, 2, "hello", Some(100), 1_004));

    let err = run_merge(&source, &mut target, &MergeConfig::default()).expect_err("duplicate");
    assert_eq!(err.code, "AM_INDEX_DUPLICATE_KEY");
    assert_eq!(target.commit_count(), 0);
    assert!(!target.in_transaction());
    // Parties and threads were inserted before the index failed; they must be gone.
    assert_eq!(target.parties().expect("parties").len(), 1);
    assert_eq!(target.threads().expect("threads").len(), 2);
}

#[test]
fn orphan_message_in_source_is_rejected_before_any_write() {
    let mut orphan = msg(9, 1, "lost", Some(999), 3_000);
    orphan.thread_id = None;
    let source = source_store().with_message(orphan);
    let mut target = target_store();

    let err = run_merge(&source, &mut target, &MergeConfig::default()).expect_err("orphan");
    assert_eq!(err.code, "AM_ORPHAN_MESSAGE");
    assert_eq!(err.details["side"], "source");
    assert!(!target.in_transaction());
    assert_eq!(target.parties().expect("parties").len(), 1);
}

#[test]
fn orphan_message_in_target_is_rejected() {
    let mut orphan = msg(9, 1, "lost", Some(999), 3_000);
    orphan.thread_id = None;
    let source = source_store();
    let mut target = target_store().with_message(orphan);

    let err = run_merge(&source, &mut target, &MergeConfig::default()).expect_err("orphan");
    assert_eq!(err.code, "AM_ORPHAN_MESSAGE");
    assert_eq!(err.details["side"], "target");
}

#[test]
fn message_pointing_at_unknown_thread_rolls_back() {
    let source = source_store().with_message(msg(9, 42, "dangling", Some(999), 3_000));
    let mut target = target_store();

    let err = run_merge(&source, &mut target, &MergeConfig::default()).expect_err("untranslated");
    assert_eq!(err.code, "AM_THREAD_UNTRANSLATED");
    assert_eq!(target.commit_count(), 0);
    assert_eq!(target.threads().expect("threads").len(), 2);
    assert_eq!(target.messages().expect("messages").len(), 2);
}

#[test]
fn invalid_config_is_rejected_before_touching_target() {
    let source = source_store();
    let mut target = target_store();
    let config = MergeConfig {
        timestamp_leeway_secs: -1,
        ..MergeConfig::default()
    };

    let err = run_merge(&source, &mut target, &config).expect_err("config");
    assert_eq!(err.code, "AM_CONFIG_INVALID");
    assert!(!target.in_transaction());
}

#[test]
fn empty_source_is_a_no_op() {
    let source = MemoryStore::new();
    let mut target = target_store();

    let audit = run_merge(&source, &mut target, &MergeConfig::default()).expect("merge");
    assert_eq!(audit.checked, 0);
    assert_eq!(audit.added, 0);
    assert_eq!(audit.closest_gap_secs, None);
    assert_eq!(target.messages().expect("messages").len(), 2);
}

#[test]
fn authorless_message_in_source_aborts_before_any_write() {
    let mut authorless = msg(9, 1, "who", Some(999), 3_000);
    authorless.author = None;
    let source = source_store().with_message(authorless);
    let mut target = target_store();

    let err = run_merge(&source, &mut target, &MergeConfig::default()).expect_err("authorless");
    assert_eq!(err.code, "AM_AUTHORLESS_MESSAGE");
    assert_eq!(err.details["side"], "source");
    assert_eq!(err.details["message_id"], 9);
    assert!(!target.in_transaction());
    assert_eq!(target.commit_count(), 0);
    assert_eq!(target.messages().expect("messages").len(), 2);
}

#[test]
fn authorless_message_in_target_aborts_before_any_write() {
    let mut authorless = msg(9, 1, "who", Some(999), 3_000);
    authorless.author = Some(String::new());
    let source = source_store();
    let mut target = target_store().with_message(authorless);

    let err = run_merge(&source, &mut target, &MergeConfig::default()).expect_err("authorless");
    assert_eq!(err.code, "AM_AUTHORLESS_MESSAGE");
    assert_eq!(err.details["side"], "target");
    assert_eq!(target.commit_count(), 0);
    assert_eq!(target.parties().expect("parties").len(), 1);
}
