//! Fakes injected into tests by `#[session_test]`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::{ApiError, ApiErrorBody, BallotApi, CastVoteResponse};
use crate::model::{Ballot, BallotToken, CastVoteRequest};
use crate::session::BallotSession;
use crate::store::MemoryStore;

/// Token seeded into the store by `#[session_test(open)]`.
pub const TOKEN: &str = "test-ballot-token";

pub type Session = BallotSession<MockBallotApi, MemoryStore>;

type Scripted<T> = Result<T, (u16, ApiErrorBody)>;

#[derive(Debug, Default)]
struct MockState {
    /// `None` serves [`Ballot::example`].
    ballot: Option<Scripted<Ballot>>,
    /// Replies to successive casts; an empty queue accepts the ballot.
    casts: VecDeque<Scripted<CastVoteResponse>>,
    fetch_log: Vec<String>,
    cast_log: Vec<CastVoteRequest>,
    gate: Option<Arc<Notify>>,
}

/// Scriptable in-memory [`BallotApi`] that records every call. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockBallotApi {
    state: Arc<Mutex<MockState>>,
}

impl MockBallotApi {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn serve_ballot(&self, ballot: Ballot) {
        self.lock().ballot = Some(Ok(ballot));
    }

    pub fn fail_fetch(&self, status: u16, body: ApiErrorBody) {
        self.lock().ballot = Some(Err((status, body)));
    }

    pub fn fail_next_cast(&self, status: u16, body: ApiErrorBody) {
        self.lock().casts.push_back(Err((status, body)));
    }

    pub fn accept_next_cast(&self, message: &str) {
        self.lock().casts.push_back(Ok(CastVoteResponse {
            message: Some(message.to_string()),
        }));
    }

    /// Make casts wait until the returned handle is notified.
    pub fn hold_casts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().gate = Some(gate.clone());
        gate
    }

    /// Tokens passed to `fetch_ballot`, in call order.
    pub fn fetches(&self) -> Vec<String> {
        self.lock().fetch_log.clone()
    }

    /// Requests passed to `cast_vote`, in call order.
    pub fn casts(&self) -> Vec<CastVoteRequest> {
        self.lock().cast_log.clone()
    }
}

#[async_trait]
impl BallotApi for MockBallotApi {
    async fn fetch_ballot(&self, token: &BallotToken) -> Result<Ballot, ApiError> {
        let mut state = self.lock();
        state.fetch_log.push(token.expose().to_string());
        match state.ballot.clone() {
            None => Ok(Ballot::example()),
            Some(Ok(ballot)) => Ok(ballot),
            Some(Err((status, body))) => Err(ApiError::rejected(status, body)),
        }
    }

    async fn cast_vote(&self, request: &CastVoteRequest) -> Result<CastVoteResponse, ApiError> {
        let (reply, gate) = {
            let mut state = self.lock();
            state.cast_log.push(request.clone());
            let reply = state.casts.pop_front();
            (reply, state.gate.clone())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match reply {
            None => Ok(CastVoteResponse::default()),
            Some(Ok(response)) => Ok(response),
            Some(Err((status, body))) => Err(ApiError::rejected(status, body)),
        }
    }
}
