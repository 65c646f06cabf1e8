//! Session lifecycle end to end: setup, turns against mock upstreams, persistence.

use kxpert_engine::{
    EMPTY_RESPONSE_MESSAGE, IMAGE_REPLY_TEXT, Outcome, SessionState, SessionStore, SettingsError,
};
use kxpert_types::{MediaKind, Provider, ProviderConfig, Sender, Theme};
use wiremock::MockServer;

use crate::common::{
    GEMINI_TEST_KEY, MockConnector, forbid_requests, gemini_config, mount_error,
    mount_gemini_blocked, mount_gemini_reply, mount_openai_image, openai_config, session,
};

#[tokio::test]
async fn each_turn_adds_user_and_assistant_entries() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "# Answer\nIt is **42**.").await;
    let mut session = session(MockConnector::new(Some(&server), None), gemini_config());

    session.submit_turn("what is the answer?", None).await;
    session.submit_turn("and again?", None).await;

    let senders: Vec<Sender> = session.history().iter().map(|t| t.sender).collect();
    assert_eq!(
        senders,
        vec![Sender::User, Sender::Assistant, Sender::User, Sender::Assistant]
    );
    assert_eq!(session.history().turns()[1].text, "# Answer\nIt is **42**.");
}

#[tokio::test]
async fn empty_response_is_recorded_as_assistant_message() {
    let server = MockServer::start().await;
    mount_gemini_blocked(&server).await;
    let mut session = session(MockConnector::new(Some(&server), None), gemini_config());

    let outcome = session.submit_turn("tell me something", None).await.unwrap();

    assert!(outcome.is_failure());
    let last = session.history().last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert_eq!(last.text, EMPTY_RESPONSE_MESSAGE);
}

#[tokio::test]
async fn failures_can_stay_out_of_history() {
    let server = MockServer::start().await;
    mount_error(&server, "/images/generations", 500, "server melted").await;
    let mut session = session(MockConnector::new(None, Some(&server)), openai_config())
        .with_persist_failures(false);

    let outcome = session
        .submit_turn("draw a picture of a volcano", None)
        .await
        .unwrap();

    let Outcome::Failure { message, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("server melted"));
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history().turns()[0].sender, Sender::User);
}

#[tokio::test]
async fn generated_image_is_stored_as_media() {
    let server = MockServer::start().await;
    mount_openai_image(&server, "https://cdn.example/volcano.png").await;
    let mut session = session(MockConnector::new(None, Some(&server)), openai_config());

    session.submit_turn("draw a picture of a volcano", None).await;

    let reply = session.history().last().unwrap();
    assert_eq!(reply.text, IMAGE_REPLY_TEXT);
    let media = reply.media.as_ref().unwrap();
    assert_eq!(media.url, "https://cdn.example/volcano.png");
    assert_eq!(media.kind, MediaKind::GeneratedImage);
}

#[tokio::test]
async fn skipped_setup_cannot_chat_until_key_is_saved() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "Now I can talk.").await;
    let mut session = SessionState::new(
        MockConnector::new(Some(&server), None),
        ProviderConfig::default(),
        Theme::Light,
    );
    session.skip_setup();
    assert_eq!(session.api_status(), "No Key");

    let outcome = session.submit_turn("hello", None).await.unwrap();
    assert!(matches!(outcome, Outcome::Failure { .. }));

    assert_eq!(
        session.save_settings(Provider::Gemini, "", Theme::Dark),
        Err(SettingsError::EmptyApiKey)
    );
    session
        .save_settings(Provider::Gemini, GEMINI_TEST_KEY, Theme::Dark)
        .unwrap();

    let outcome = session.submit_turn("hello", None).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::ChatReply {
            text: "Now I can talk.".to_string()
        }
    );
    assert_eq!(session.theme(), Theme::Dark);
}

#[tokio::test]
async fn blank_input_never_reaches_upstream() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;
    let mut session = session(MockConnector::new(Some(&server), None), gemini_config());

    assert!(session.submit_turn("", None).await.is_none());
    assert!(session.submit_turn(" \n\t", None).await.is_none());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn restart_restores_history_and_settings() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "Stored reply").await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let connector = MockConnector::new(Some(&server), None);

    let mut first = SessionState::restore(
        connector.clone(),
        SessionStore::new(&path),
        ProviderConfig::default(),
        Theme::Light,
    );
    first.complete_setup(Provider::Gemini, GEMINI_TEST_KEY);
    first.set_theme(Theme::Dark);
    first.submit_turn("persist this", None).await;

    let mut second = SessionState::restore(
        connector,
        SessionStore::new(&path),
        ProviderConfig::default(),
        Theme::Light,
    );
    assert!(second.is_setup_complete());
    assert_eq!(second.theme(), Theme::Dark);
    assert_eq!(second.api_status(), "Gemini");
    assert_eq!(second.history(), first.history());

    second.clear();
    let third = SessionState::restore(
        MockConnector::new(None, None),
        SessionStore::new(&path),
        ProviderConfig::default(),
        Theme::Light,
    );
    assert!(third.history().is_empty());
}
