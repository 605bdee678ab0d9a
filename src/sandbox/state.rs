use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

use crate::model::{Ballot, OtpCode, VoteChoice};

/// Sandbox configuration, read from Rocket's figment (`Rocket.toml` and
/// `ROCKET_*` environment variables).
#[derive(Debug, Default, Deserialize)]
pub struct SandboxConfig {
    /// JSON file holding the ballot to serve.
    /// Configured via `SANDBOX_BALLOT`.
    #[serde(default)]
    pub sandbox_ballot: Option<PathBuf>,
}

/// A vote accepted by the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedVote {
    pub choice: VoteChoice,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum TokenStatus {
    Unused,
    Used,
}

#[derive(Debug, Default)]
struct Ledger {
    tokens: HashMap<String, TokenStatus>,
    otps: HashMap<String, OtpCode>,
    votes: Vec<RecordedVote>,
}

/// Managed state of the sandbox: the ballot plus every issued token, pending
/// OTP and accepted vote.
#[derive(Debug)]
pub struct Sandbox {
    ballot: Ballot,
    ledger: Mutex<Ledger>,
}

impl Sandbox {
    pub fn new(ballot: Ballot) -> Self {
        Self {
            ballot,
            ledger: Mutex::default(),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    /// Issue a fresh, unused ballot token.
    pub fn issue_token(&self) -> String {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect::<String>();
        self.ledger()
            .tokens
            .insert(token.clone(), TokenStatus::Unused);
        token
    }

    pub(super) fn token_status(&self, token: &str) -> Option<TokenStatus> {
        self.ledger().tokens.get(token).copied()
    }

    /// Record the votes and burn the token, unless the token was burnt in the
    /// meantime. Returns whether the ballot was accepted.
    pub(super) fn record(&self, token: &str, votes: &[VoteChoice]) -> bool {
        let mut ledger = self.ledger();
        match ledger.tokens.get_mut(token) {
            Some(status @ TokenStatus::Unused) => *status = TokenStatus::Used,
            _ => return false,
        }
        let cast_at = Utc::now();
        ledger.votes.extend(votes.iter().map(|choice| RecordedVote {
            choice: choice.clone(),
            cast_at,
        }));
        true
    }

    pub fn recorded_votes(&self) -> Vec<RecordedVote> {
        self.ledger().votes.clone()
    }

    /// Issue an OTP for `reg_no`, replacing any pending one.
    pub(super) fn issue_otp(&self, reg_no: &str) -> OtpCode {
        let otp = OtpCode::random();
        self.ledger().otps.insert(reg_no.to_string(), otp);
        otp
    }

    pub fn pending_otp(&self, reg_no: &str) -> Option<OtpCode> {
        self.ledger().otps.get(reg_no).copied()
    }

    /// Consume the OTP if it matches. A wrong guess leaves it pending.
    pub(super) fn redeem_otp(&self, reg_no: &str, otp: &OtpCode) -> bool {
        let mut ledger = self.ledger();
        if ledger.otps.get(reg_no) == Some(otp) {
            ledger.otps.remove(reg_no);
            true
        } else {
            false
        }
    }
}
