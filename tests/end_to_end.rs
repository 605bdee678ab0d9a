//! Drives the HTTP client and ballot session against a live sandbox server.
#![cfg(feature = "sandbox")]

use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use rocket::Shutdown;

use votesphere_client::{
    model::{Ballot, BallotToken},
    sandbox::{self, Sandbox},
    BallotSession, ClientConfig, Error, HttpBallotApi, MemoryStore, SessionState, TokenStore,
};

struct Server {
    config: ClientConfig,
    tokens: Vec<String>,
    shutdown: Shutdown,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.clone().notify();
    }
}

/// Launch a sandbox on a free port, issuing `tokens` ballot tokens up front.
async fn launch(fixture: Option<&Path>, tokens: usize) -> Server {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut figment = rocket::Config::figment()
        .merge(("address", "127.0.0.1"))
        .merge(("port", port))
        .merge(("log_level", "off"));
    if let Some(fixture) = fixture {
        figment = figment.merge(("sandbox_ballot", fixture));
    }

    let rocket = sandbox::build_from(figment).ignite().await.unwrap();
    let sandbox = rocket.state::<Sandbox>().unwrap();
    let tokens = (0..tokens).map(|_| sandbox.issue_token()).collect();
    let shutdown = rocket.shutdown();
    tokio::spawn(rocket.launch());

    // Wait for the server to come up.
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Server {
        config: ClientConfig::default().with_api_url(format!("http://127.0.0.1:{port}/api")),
        tokens,
        shutdown,
    }
}

fn session(server: &Server) -> (BallotSession<HttpBallotApi, MemoryStore>, MemoryStore) {
    let store = MemoryStore::default();
    let api = HttpBallotApi::new(&server.config).unwrap();
    (BallotSession::new(api, store.clone()), store)
}

#[tokio::test]
async fn vote_then_token_is_spent() {
    let server = launch(None, 1).await;
    let token = &server.tokens[0];

    let (session, store) = session(&server);
    store.set("ballotToken", token).unwrap();
    assert_eq!(session.open(None).await.unwrap(), SessionState::Ready);
    assert_eq!(session.ballot(), Ballot::example());

    session.select_candidate("pos-president", "cand-brian").unwrap();
    session.select_candidate("pos-secretary", "cand-carol").unwrap();
    let receipt = session.submit().await.unwrap();
    assert_eq!(receipt.votes_cast, 2);
    assert_eq!(receipt.message.as_deref(), Some("Vote cast successfully"));
    assert_eq!(session.state(), SessionState::Submitted);
    assert_eq!(store.get("ballotToken").unwrap(), None);

    // A second session holding the same token is sent back to verification.
    let (again, _) = self::session(&server);
    let err = again.open(BallotToken::new(token.as_str())).await.unwrap_err();
    assert!(matches!(err, Error::ConsumedToken));
    assert_eq!(again.state(), SessionState::Redirecting);
}

#[tokio::test]
async fn unknown_token_is_invalid() {
    let server = launch(None, 0).await;

    let (session, store) = session(&server);
    store.set("ballotToken", "forged").unwrap();
    let err = session.open(None).await.unwrap_err();

    assert!(matches!(err, Error::InvalidToken));
    assert_eq!(session.state(), SessionState::Redirecting);
    assert_eq!(store.get("ballotToken").unwrap(), None);
}

#[tokio::test]
async fn closed_window_reported_and_token_kept() {
    let mut ballot = Ballot::example();
    ballot.positions[1].voting_closes = Some(Utc::now() - chrono::Duration::minutes(5));
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("ballot.json");
    std::fs::write(&fixture, serde_json::to_vec(&ballot).unwrap()).unwrap();
    let server = launch(Some(&fixture), 1).await;

    let (session, store) = session(&server);
    session
        .open(BallotToken::new(server.tokens[0].as_str()))
        .await
        .unwrap();
    session.select_candidate("pos-president", "cand-alice").unwrap();
    session.select_candidate("pos-secretary", "cand-david").unwrap();
    let err = session.submit().await.unwrap_err();

    match err {
        Error::WindowClosed { positions, message } => {
            assert_eq!(positions, vec!["General Secretary".to_string()]);
            assert!(message.contains("General Secretary"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.selections().len(), 2);
    // The handoff token was never persisted, and nothing was cleared.
    assert_eq!(store.get("ballotToken").unwrap(), None);
}

#[tokio::test]
async fn unreachable_backend_fails_to_load() {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = ClientConfig::default().with_api_url(format!("http://127.0.0.1:{port}/api"));
    let session = BallotSession::new(HttpBallotApi::new(&config).unwrap(), MemoryStore::default());

    let err = session.open(BallotToken::new("tok")).await.unwrap_err();

    assert!(matches!(err, Error::Load(_)));
    assert_eq!(session.state(), SessionState::LoadFailed);
}

#[cfg(feature = "otp")]
#[tokio::test]
async fn otp_rejections_surface() {
    use votesphere_client::verification::Verifier;

    let server = launch(None, 0).await;
    let store = MemoryStore::default();
    let verifier = Verifier::new(&server.config, store.clone()).unwrap();

    verifier.request_otp("2021/BSE/001").await.unwrap();
    assert!(matches!(verifier.request_otp("  ").await, Err(Error::Otp(_))));

    // Another registration number has no pending OTP.
    let err = verifier
        .confirm_otp("2021/BSE/002", &"123456".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Otp(msg) if msg == "Invalid or expired OTP"));
    assert_eq!(store.get("ballotToken").unwrap(), None);
}
