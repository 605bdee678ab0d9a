//! The ballot session controller: one ballot token in, one cast ballot out.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::api::{
    classify::{classify_cast, classify_fetch},
    BallotApi,
};
use crate::error::{Error, Result};
use crate::model::{
    Ballot, BallotToken, Candidate, CastVoteRequest, Position, Receipt, Selection, SelectionSet,
};
use crate::store::{TokenStore, DEFAULT_TOKEN_KEY};

/// States in the ballot session lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, no token resolved yet.
    Idle,
    /// Ballot fetch in flight.
    Loading,
    /// The ballot could not be fetched; the token is kept for a retry.
    LoadFailed,
    /// There are no positions to vote on.
    NoElections,
    /// Positions exist but no candidate has been approved for any of them.
    Empty,
    /// Accepting selections.
    Ready,
    /// Ballot cast in flight.
    Submitting,
    /// The ballot was accepted and the token consumed.
    Submitted,
    /// The token is missing, invalid or used; the voter must verify again.
    Redirecting,
}

impl SessionState {
    /// No further operation is possible in this session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NoElections | Self::Submitted | Self::Redirecting)
    }

    fn accepts_selections(self) -> bool {
        matches!(self, Self::Ready | Self::Empty)
    }
}

/// Non-fatal notices about the loaded ballot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Positions exist but no candidate is approved yet.
    NoApprovedCandidates,
}

struct Inner {
    state: SessionState,
    token: Option<BallotToken>,
    ballot: Ballot,
    selections: SelectionSet,
    step: usize,
    advisory: Option<Advisory>,
    closed_positions: Vec<String>,
}

/// Drives a single voter through one ballot.
///
/// All methods take `&self`, so a session can be shared between the code
/// reacting to user input and a task awaiting a submission. The internal lock
/// is never held across a network call.
pub struct BallotSession<A, S> {
    api: A,
    store: S,
    token_key: String,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
}

impl<A: BallotApi, S: TokenStore> BallotSession<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self::with_token_key(api, store, DEFAULT_TOKEN_KEY)
    }

    /// Use `token_key` as the persistence slot instead of [`DEFAULT_TOKEN_KEY`].
    pub fn with_token_key(api: A, store: S, token_key: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            api,
            store,
            token_key: token_key.into(),
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                token: None,
                ballot: Ballot::default(),
                selections: SelectionSet::default(),
                step: 0,
                advisory: None,
                closed_positions: Vec::new(),
            }),
            state_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, inner: &mut Inner, state: SessionState) {
        debug!("Ballot session {:?} -> {:?}", inner.state, state);
        inner.state = state;
        // Nobody may be listening any more; the session carries on regardless.
        self.state_tx.send_replace(state);
    }

    /// Forget the token both in memory and in the persistence slot.
    fn purge_token(&self, inner: &mut Inner) {
        inner.token = None;
        if let Err(e) = self.store.clear(&self.token_key) {
            error!("Failed to clear the stored ballot token: {e}");
        }
    }

    /// Resolve the ballot token and fetch the ballot.
    ///
    /// A `handoff` token from the verification step takes precedence over the
    /// persistence slot. Opening a session whose load failed retries the load.
    pub async fn open(&self, handoff: Option<BallotToken>) -> Result<SessionState> {
        if self.state() == SessionState::LoadFailed {
            return self.reload().await;
        }

        let token = {
            let mut inner = self.lock();
            match inner.state {
                SessionState::Idle => {}
                state if state.is_terminal() => return Err(Error::SessionEnded(state)),
                state => return Err(Error::WrongState(state)),
            }

            let token = match handoff {
                Some(token) => Some(token),
                None => self
                    .store
                    .get(&self.token_key)?
                    .and_then(BallotToken::new),
            };
            let Some(token) = token else {
                warn!("No ballot token available, re-verification required");
                self.transition(&mut inner, SessionState::Redirecting);
                return Err(Error::NoToken);
            };

            inner.token = Some(token.clone());
            self.transition(&mut inner, SessionState::Loading);
            token
        };
        self.load(token).await
    }

    /// Retry fetching the ballot after a load failure.
    pub async fn reload(&self) -> Result<SessionState> {
        let token = {
            let mut inner = self.lock();
            match inner.state {
                SessionState::LoadFailed => {}
                state if state.is_terminal() => return Err(Error::SessionEnded(state)),
                state => return Err(Error::WrongState(state)),
            }
            let token = inner.token.clone().ok_or(Error::NoToken)?;
            self.transition(&mut inner, SessionState::Loading);
            token
        };
        self.load(token).await
    }

    async fn load(&self, token: BallotToken) -> Result<SessionState> {
        let result = self.api.fetch_ballot(&token).await;

        let mut inner = self.lock();
        match result {
            Ok(ballot) => {
                let state = if ballot.positions.is_empty() {
                    info!("No positions are open for voting");
                    SessionState::NoElections
                } else if ballot.candidates.is_empty() {
                    warn!("No approved candidates available for voting yet");
                    inner.advisory = Some(Advisory::NoApprovedCandidates);
                    SessionState::Empty
                } else {
                    info!(
                        "Loaded ballot with {} positions and {} candidates",
                        ballot.positions.len(),
                        ballot.candidates.len()
                    );
                    SessionState::Ready
                };
                inner.ballot = ballot;
                inner.step = 0;
                self.transition(&mut inner, state);
                Ok(state)
            }
            Err(e) => {
                let err = classify_fetch(e);
                if err.requires_reverification() {
                    warn!("Ballot token rejected: {err}");
                    self.purge_token(&mut inner);
                    self.transition(&mut inner, SessionState::Redirecting);
                } else {
                    warn!("{err}");
                    self.transition(&mut inner, SessionState::LoadFailed);
                }
                Err(err)
            }
        }
    }

    /// Choose `candidate_id` for `position_id`, or clear the position if that
    /// candidate was already chosen.
    pub fn select_candidate(&self, position_id: &str, candidate_id: &str) -> Result<Selection> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Submitting => return Err(Error::SubmissionInFlight),
            state if state.accepts_selections() => {}
            state if state.is_terminal() => return Err(Error::SessionEnded(state)),
            state => return Err(Error::WrongState(state)),
        }
        if !inner.ballot.has_candidate(position_id, candidate_id) {
            return Err(Error::UnknownSelection {
                position: position_id.to_string(),
                candidate: candidate_id.to_string(),
            });
        }

        let selection = inner.selections.toggle(position_id, candidate_id);
        debug!("{selection:?} {candidate_id} for {position_id}");
        Ok(selection)
    }

    /// Cast the ballot. Every position must have a selection.
    pub async fn submit(&self) -> Result<Receipt> {
        let request = {
            let mut inner = self.lock();
            match inner.state {
                SessionState::Submitting => return Err(Error::SubmissionInFlight),
                SessionState::Ready | SessionState::Empty => {}
                state if state.is_terminal() => return Err(Error::SessionEnded(state)),
                state => return Err(Error::WrongState(state)),
            }

            let missing = inner
                .selections
                .missing(&inner.ballot.positions)
                .into_iter()
                .map(|p| p.name.clone())
                .collect::<Vec<_>>();
            if !missing.is_empty() {
                return Err(Error::IncompleteBallot { missing });
            }

            let token = inner.token.clone().ok_or(Error::NoToken)?;
            let request = CastVoteRequest {
                token,
                votes: inner.selections.to_votes(),
            };
            inner.closed_positions.clear();
            self.transition(&mut inner, SessionState::Submitting);
            request
        };

        info!("Casting ballot with {} votes", request.votes.len());
        let result = self.api.cast_vote(&request).await;

        let mut inner = self.lock();
        match result {
            Ok(response) => {
                info!("Ballot accepted");
                self.purge_token(&mut inner);
                self.transition(&mut inner, SessionState::Submitted);
                Ok(Receipt {
                    votes_cast: request.votes.len(),
                    message: response.message,
                })
            }
            Err(e) => {
                let err = classify_cast(e);
                match &err {
                    Error::ConsumedToken | Error::InvalidToken => {
                        warn!("Ballot token rejected: {err}");
                        self.purge_token(&mut inner);
                        self.transition(&mut inner, SessionState::Redirecting);
                    }
                    Error::WindowClosed { positions, .. } => {
                        warn!("{err}");
                        inner.closed_positions = positions.clone();
                        self.transition(&mut inner, SessionState::Ready);
                    }
                    _ => {
                        warn!("Ballot rejected: {err}");
                        self.transition(&mut inner, SessionState::Ready);
                    }
                }
                Err(err)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn ballot(&self) -> Ballot {
        self.lock().ballot.clone()
    }

    pub fn selections(&self) -> SelectionSet {
        self.lock().selections.clone()
    }

    pub fn advisory(&self) -> Option<Advisory> {
        self.lock().advisory
    }

    /// Names of positions reported closed by the last submission attempt.
    pub fn closed_positions(&self) -> Vec<String> {
        self.lock().closed_positions.clone()
    }

    /// Fraction of positions with a selection, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let inner = self.lock();
        inner.selections.progress(inner.ballot.positions.len())
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress() * 100.0
    }

    pub fn candidates_for(&self, position_id: &str) -> Vec<Candidate> {
        self.lock()
            .ballot
            .candidates_for(position_id)
            .cloned()
            .collect()
    }

    pub fn current_step(&self) -> usize {
        self.lock().step
    }

    pub fn current_position(&self) -> Option<Position> {
        let inner = self.lock();
        inner.ballot.positions.get(inner.step).cloned()
    }

    /// Move to the next position. Only allowed once the current one has a
    /// selection; returns whether the step changed.
    pub fn next_step(&self) -> bool {
        let mut inner = self.lock();
        let Some(position) = inner.ballot.positions.get(inner.step) else {
            return false;
        };
        if !inner.selections.contains(&position.id)
            || inner.step + 1 >= inner.ballot.positions.len()
        {
            return false;
        }
        inner.step += 1;
        true
    }

    pub fn previous_step(&self) -> bool {
        let mut inner = self.lock();
        if inner.step == 0 {
            return false;
        }
        inner.step -= 1;
        true
    }

    /// Jump straight to a position by index.
    pub fn go_to_step(&self, step: usize) -> bool {
        let mut inner = self.lock();
        if step >= inner.ballot.positions.len() || step == inner.step {
            return false;
        }
        inner.step = step;
        true
    }
}
