mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{TestBed, creds_for, record, wait_until};
use drumbeat_engine::{LoopExit, SubmitRequest, resume_all};

#[tokio::test(start_paused = true)]
async fn test_fresh_task_walks_sequence_and_persists_progress() {
    let bed = TestBed::new("fresh-walk");
    let handle = bed.engine.spawn_fresh(record("u1", &["hello", "goodbye"], 0));

    let m = Arc::clone(&bed.messenger);
    wait_until(move || m.sent().len() >= 3).await;
    // let the loop finish persisting the third send
    tokio::time::sleep(Duration::from_millis(20)).await;

    let sent = bed.messenger.sent();
    let texts: Vec<&str> = sent.iter().map(|s| s.message.as_str()).collect();
    assert_eq!(&texts[..3], &["Team hello", "Team goodbye", "Team hello"]);
    assert!(sent.iter().all(|s| s.target_id == "900100"));

    let records = bed.engine.ledger().load_all().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].account_id, "u1");
    assert_eq!(records[0].cursor, 1);
    assert!(records[0].last_send_at.is_some());

    assert!(bed.engine.cancel("u1").await);
    assert_eq!(handle.await.unwrap(), LoopExit::Cancelled);
    assert!(bed.engine.ledger().load_all().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_submit_authenticates_and_starts_loop() {
    let bed = TestBed::new("submit");
    let request = SubmitRequest {
        credentials: creds_for("u7"),
        cadence_secs: 5,
        message_prefix: "Team".into(),
        target_id: "900100".into(),
        messages: vec!["hello".into(), "".into(), "goodbye  ".into()],
    };
    let account_id = bed.engine.submit(request).await.unwrap();
    assert_eq!(account_id, "u7");

    let m = Arc::clone(&bed.messenger);
    wait_until(move || m.sent().len() >= 2).await;
    let sent = bed.messenger.sent();
    // the blank line is dropped and trailing whitespace trimmed
    assert_eq!(sent[0].message, "Team hello");
    assert_eq!(sent[1].message, "Team goodbye");

    // submission login plus the loop's own login
    assert!(bed.messenger.login_attempts().len() >= 2);
    assert!(bed.engine.is_active("u7"));
    // the refreshed fingerprint was written back
    assert_eq!(bed.engine.devices().load().client_id, "scripted-device");

    bed.engine.cancel("u7").await;
}

#[tokio::test(start_paused = true)]
async fn test_submit_rejects_bad_credential_material() {
    let bed = TestBed::new("submit-creds");
    let request = SubmitRequest {
        credentials: "no delimiters here".into(),
        cadence_secs: 5,
        message_prefix: "Team".into(),
        target_id: "900100".into(),
        messages: vec!["hello".into()],
    };
    let err = bed.engine.submit(request).await.unwrap_err();
    assert!(err.to_string().contains("validation failed"));
    assert!(bed.messenger.login_attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_loop_for_same_account_bows_out() {
    let bed = TestBed::new("dup");
    let h1 = bed.engine.spawn_fresh(record("u1", &["hello"], 0));
    let m = Arc::clone(&bed.messenger);
    wait_until(move || m.sent().len() >= 1).await;

    let h2 = bed.engine.spawn_fresh(record("u1", &["hello"], 0));
    assert_eq!(h2.await.unwrap(), LoopExit::AlreadyRunning);

    // the first loop is untouched
    assert!(bed.engine.is_active("u1"));
    assert!(bed.engine.cancel("u1").await);
    assert_eq!(h1.await.unwrap(), LoopExit::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_auth_budget_two_attempts_then_task_removed() {
    let bed = TestBed::new("auth-budget");
    let rec = record("u1", &["hello"], 0);
    bed.engine.ledger().save_all(&[rec.clone()]).await.unwrap();
    bed.messenger.script_logins("u1", &[false, false]);

    let exit = bed.engine.spawn_fresh(rec).await.unwrap();
    assert_eq!(exit, LoopExit::AuthFailed);

    let attempts = bed.messenger.login_attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1].at - attempts[0].at >= Duration::from_secs(3));

    assert!(!bed.engine.is_active("u1"));
    assert!(bed.engine.ledger().load_all().await.is_empty());
    assert!(bed.messenger.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_auth_retry_succeeds_on_second_attempt() {
    let bed = TestBed::new("auth-retry-ok");
    bed.messenger.script_logins("u1", &[false, true]);

    bed.engine.spawn_fresh(record("u1", &["hello"], 0));
    let m = Arc::clone(&bed.messenger);
    wait_until(move || m.sent().len() >= 1).await;

    assert_eq!(bed.messenger.login_attempts().len(), 2);
    assert_eq!(bed.messenger.sent()[0].message, "Team hello");
    bed.engine.cancel("u1").await;
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_ends_task_for_good() {
    let bed = TestBed::new("send-fatal");
    bed.messenger.script_sends("u1", &[true, false]);
    let handle = bed.engine.spawn_fresh(record("u1", &["hello", "goodbye"], 0));
    assert_eq!(handle.await.unwrap(), LoopExit::SendFailed);

    // only the scripted success landed, and the record is gone
    assert_eq!(bed.messenger.sent().len(), 1);
    assert!(!bed.engine.is_active("u1"));
    assert!(bed.engine.ledger().load_all().await.is_empty());

    // a later startup finds nothing to replay
    let logins_before = bed.messenger.login_attempts().len();
    resume_all(Arc::clone(&bed.engine)).await;
    assert_eq!(bed.messenger.login_attempts().len(), logins_before);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_lands_before_next_send() {
    let bed = TestBed::new("cancel-wait");
    let handle = bed.engine.spawn_fresh(record("u1", &["hello"], 0));
    let m = Arc::clone(&bed.messenger);
    wait_until(move || m.sent().len() >= 1).await;

    assert!(bed.engine.cancel("u1").await);
    // a second cancel finds nothing to stop
    assert!(!bed.engine.cancel("u1").await);

    assert_eq!(handle.await.unwrap(), LoopExit::Cancelled);
    assert_eq!(bed.messenger.sent().len(), 1);
    assert!(!bed.engine.is_active("u1"));
}
