use serde::{Deserialize, Serialize};

use super::token::BallotToken;

/// One chosen candidate for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteChoice {
    pub position_id: String,
    pub candidate_id: String,
}

/// Body of `POST /vote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteRequest {
    pub token: BallotToken,
    pub votes: Vec<VoteChoice>,
}

/// Proof that the backend accepted a ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Number of positions voted on.
    pub votes_cast: usize,
    /// Confirmation message from the backend, if it sent one.
    pub message: Option<String>,
}
