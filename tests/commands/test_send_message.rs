//! Tests for the send command, end to end against the fake service

use std::collections::HashSet;
use std::fs;

use tempfile::tempdir;

use telegram_sender::auth::AuthOutcome;
use telegram_sender::client::PeerHandle;
use telegram_sender::commands::send_message::run_with;
use telegram_sender::config::DEFAULT_MESSAGE;
use telegram_sender::error::Error;
use telegram_sender::sender::{MessageSender, RandomIdGenerator};
use telegram_sender::session::{SessionKey, SessionStore};

use crate::support::{
    connector, request, CountingIds, FakeClient, FakeService, ScriptedPrompt, ALICE_ID, CODE,
    PHONE,
};

fn session_path(dir: &std::path::Path) -> std::path::PathBuf {
    SessionStore::open(dir)
        .unwrap()
        .path_for(&SessionKey::from_phone(PHONE))
}

#[tokio::test]
async fn test_fresh_login_persists_session_and_sends() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();
    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);

    let report = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap();

    assert!(matches!(report.auth, AuthOutcome::LoggedIn(_)));
    assert_eq!(report.peer.id, ALICE_ID);
    assert_eq!(prompt.codes_asked, 1);
    assert_eq!(prompt.passwords_asked, 0);

    let stored = fs::read(session_path(dir.path())).unwrap();
    assert!(!stored.is_empty());

    let sent = service.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].peer.id, ALICE_ID);
    assert_eq!(sent[0].text, DEFAULT_MESSAGE);
    assert_eq!(sent[0].random_id, 1);
    assert_eq!(report.sent.random_id, 1);
}

#[tokio::test]
async fn test_second_run_reuses_session_without_prompts() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();

    let mut first = ScriptedPrompt::new(PHONE).with_code(CODE);
    run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut first,
        CountingIds::default(),
    )
    .await
    .unwrap();
    let auth_calls = service.auth_calls();
    let stored = fs::read(session_path(dir.path())).unwrap();

    let mut second = ScriptedPrompt::new(PHONE);
    let report = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut second,
        CountingIds::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.auth, AuthOutcome::Reused);
    assert_eq!(second.prompts(), 0);
    assert_eq!(service.auth_calls(), auth_calls);
    assert_eq!(service.session_checks(), 1);
    assert_eq!(service.sent().len(), 2);
    assert_eq!(fs::read(session_path(dir.path())).unwrap(), stored);
}

#[tokio::test]
async fn test_unknown_username_is_peer_not_found() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();

    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);
    run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap();
    let stored = fs::read(session_path(dir.path())).unwrap();

    let mut prompt = ScriptedPrompt::new(PHONE);
    let err = run_with(
        &request("ghost"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::PeerNotFound(_)));
    assert!(err.to_string().contains("ghost"));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(service.sent().len(), 1);
    assert_eq!(fs::read(session_path(dir.path())).unwrap(), stored);
}

#[tokio::test]
async fn test_username_forms_resolve_to_same_peer() {
    let service = FakeService::new().shared();

    for username in ["alice", "@alice", "t.me/alice", "https://t.me/alice/"] {
        let dir = tempdir().unwrap();
        let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);
        let report = run_with(
            &request(username),
            dir.path(),
            connector(&service),
            &mut prompt,
            CountingIds::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            report.peer,
            PeerHandle {
                id: ALICE_ID,
                kind: telegram_sender::PeerKind::User,
                username: "alice".to_string(),
            },
            "{}",
            username
        );
    }
}

#[tokio::test]
async fn test_rejected_session_triggers_fresh_login() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();

    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);
    run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap();
    let revoked = fs::read(session_path(dir.path())).unwrap();
    service.revoke_sessions();

    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);
    let report = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap();

    assert!(matches!(report.auth, AuthOutcome::LoggedIn(_)));
    assert_eq!(prompt.codes_asked, 1);
    assert_eq!(service.session_checks(), 1);
    assert_ne!(fs::read(session_path(dir.path())).unwrap(), revoked);
}

#[tokio::test]
async fn test_garbage_session_file_triggers_fresh_login() {
    let dir = tempdir().unwrap();
    fs::write(session_path(dir.path()), b"not a session").unwrap();
    let service = FakeService::new().shared();

    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);
    let report = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap();

    assert!(matches!(report.auth, AuthOutcome::LoggedIn(_)));
    assert_ne!(
        fs::read(session_path(dir.path())).unwrap(),
        b"not a session".to_vec()
    );
}

#[tokio::test]
async fn test_two_factor_login() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().with_password("hunter2").shared();
    let mut prompt = ScriptedPrompt::new(PHONE)
        .with_code(CODE)
        .with_password("hunter2");

    let report = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap();

    assert!(matches!(report.auth, AuthOutcome::LoggedIn(_)));
    assert_eq!(prompt.codes_asked, 1);
    assert_eq!(prompt.passwords_asked, 1);
    assert!(session_path(dir.path()).exists());
    assert_eq!(service.sent().len(), 1);
}

#[tokio::test]
async fn test_wrong_password_is_auth_error() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().with_password("hunter2").shared();
    let mut prompt = ScriptedPrompt::new(PHONE)
        .with_code(CODE)
        .with_password("letmein");

    let err = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(!session_path(dir.path()).exists());
    assert!(service.sent().is_empty());
}

#[tokio::test]
async fn test_wrong_code_is_auth_error() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();
    let mut prompt = ScriptedPrompt::new(PHONE).with_code("000000");

    let err = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert!(!session_path(dir.path()).exists());
    assert_eq!(service.resolves(), 0);
    assert!(service.sent().is_empty());
}

#[tokio::test]
async fn test_unregistered_phone_is_sign_up_required() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().unregistered().shared();
    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);

    let err = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::SignUpRequired));
    assert_eq!(err.exit_code(), 4);
    assert!(!session_path(dir.path()).exists());
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().offline().shared();
    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);

    let err = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(prompt.codes_asked, 0);
    assert!(!session_path(dir.path()).exists());
}

#[tokio::test]
async fn test_rejected_send_keeps_new_session() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().rejecting_sends("USER_IS_BLOCKED").shared();
    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);

    let err = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Send(_)));
    assert_eq!(err.exit_code(), 7);
    assert!(session_path(dir.path()).exists());
}

#[tokio::test]
async fn test_blank_message_is_rejected_before_any_activity() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();

    for text in ["", "   ", "\n\t"] {
        let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);
        let mut req = request("alice");
        req.text = text.to_string();

        let err = run_with(
            &req,
            dir.path(),
            connector(&service),
            &mut prompt,
            CountingIds::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Usage(_)), "{:?}", text);
        assert_eq!(err.exit_code(), 2);
        assert_eq!(prompt.prompts(), 0);
    }

    assert_eq!(service.connects(), 0);
    assert_eq!(service.auth_calls(), 0);
    assert_eq!(service.resolves(), 0);
    assert!(service.sent().is_empty());
    assert!(!session_path(dir.path()).exists());
}

#[tokio::test]
async fn test_locked_session_fails_before_connecting() {
    let dir = tempdir().unwrap();
    let store = SessionStore::open(dir.path()).unwrap();
    let _held = store.lock(&SessionKey::from_phone(PHONE)).unwrap();

    let service = FakeService::new().shared();
    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);
    let err = run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::SessionLocked));
    assert_eq!(err.exit_code(), 10);
    assert_eq!(service.connects(), 0);
    assert_eq!(prompt.prompts(), 0);
}

#[tokio::test]
async fn test_lock_is_released_after_run() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();
    let mut prompt = ScriptedPrompt::new(PHONE).with_code(CODE);

    run_with(
        &request("alice"),
        dir.path(),
        connector(&service),
        &mut prompt,
        CountingIds::default(),
    )
    .await
    .unwrap();

    let store = SessionStore::open(dir.path()).unwrap();
    assert!(store.lock(&SessionKey::from_phone(PHONE)).is_ok());
}

#[tokio::test]
async fn test_phones_get_separate_sessions() {
    let dir = tempdir().unwrap();
    let service = FakeService::new().shared();

    for phone in ["15550000", "15550001"] {
        let mut prompt = ScriptedPrompt::new(phone).with_code(CODE);
        let mut req = request("alice");
        req.phone = phone.to_string();
        run_with(
            &req,
            dir.path(),
            connector(&service),
            &mut prompt,
            CountingIds::default(),
        )
        .await
        .unwrap();
    }

    let store = SessionStore::open(dir.path()).unwrap();
    let a = fs::read(store.path_for(&SessionKey::from_phone("15550000"))).unwrap();
    let b = fs::read(store.path_for(&SessionKey::from_phone("15550001"))).unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_random_ids_are_distinct_across_sends() {
    let service = FakeService::new().shared();
    let client = FakeClient::signed_in(service.clone());
    let peer = PeerHandle {
        id: ALICE_ID,
        kind: telegram_sender::PeerKind::User,
        username: "alice".to_string(),
    };

    let mut sender = MessageSender::new(RandomIdGenerator::new());
    for _ in 0..200 {
        sender.send(&client, &peer, "hi").await.unwrap();
    }

    let ids: HashSet<i64> = service.sent().iter().map(|m| m.random_id).collect();
    assert_eq!(ids.len(), 200);
}
