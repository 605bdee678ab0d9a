use std::collections::HashSet;

use chrono::Utc;
use log::info;
use rocket::{serde::json::Json, Route, State};
use serde::Serialize;

use crate::api::{
    classify::{BALLOT_ALREADY_USED, INVALID_TOKEN, VOTING_CLOSED},
    ClosedPosition,
};
use crate::model::{Ballot, CandidateStatus, CastVoteRequest};

use super::{
    error::{Result, SandboxError},
    state::{Sandbox, TokenStatus},
    RequestId,
};

pub fn routes() -> Vec<Route> {
    routes![get_ballot, cast_vote]
}

#[derive(Debug, Serialize)]
pub struct VoteAccepted {
    message: String,
}

fn check_token(sandbox: &Sandbox, token: &str) -> Result<()> {
    match sandbox.token_status(token) {
        Some(TokenStatus::Unused) => Ok(()),
        Some(TokenStatus::Used) => Err(already_used()),
        None => Err(SandboxError::bad_request("Invalid ballot token").with_code(INVALID_TOKEN)),
    }
}

fn already_used() -> SandboxError {
    SandboxError::bad_request("Ballot already used").with_code(BALLOT_ALREADY_USED)
}

#[get("/vote/ballot?<token>")]
async fn get_ballot(token: Option<&str>, sandbox: &State<Sandbox>) -> Result<Json<Ballot>> {
    check_token(sandbox, token.unwrap_or_default())?;

    // Voters only ever see approved candidates.
    let ballot = sandbox.ballot();
    Ok(Json(Ballot {
        positions: ballot.positions.clone(),
        candidates: ballot
            .candidates
            .iter()
            .filter(|c| c.status == CandidateStatus::Approved)
            .cloned()
            .collect(),
    }))
}

#[post("/vote", data = "<request>", format = "json")]
async fn cast_vote(
    id: &RequestId,
    request: Json<CastVoteRequest>,
    sandbox: &State<Sandbox>,
) -> Result<Json<VoteAccepted>> {
    let token = request.token.expose();
    check_token(sandbox, token)?;
    let ballot = sandbox.ballot();

    // Every vote must name an approved candidate running for the position.
    let mut voted = HashSet::new();
    let mut positions = Vec::new();
    for vote in &request.votes {
        let position = ballot.position(&vote.position_id).ok_or_else(|| {
            SandboxError::bad_request(format!("Unknown position '{}'", vote.position_id))
        })?;
        if !voted.insert(position.id.as_str()) {
            return Err(SandboxError::bad_request(format!(
                "Only one vote is allowed for {}",
                position.name
            )));
        }
        let candidate = ballot
            .candidates_for(&position.id)
            .find(|c| c.id == vote.candidate_id)
            .ok_or_else(|| {
                SandboxError::bad_request(format!(
                    "Candidate '{}' is not running for {}",
                    vote.candidate_id, position.name
                ))
            })?;
        if candidate.status != CandidateStatus::Approved {
            return Err(SandboxError::bad_request(format!(
                "Candidate {} is not approved",
                candidate.name
            )));
        }
        positions.push(position);
    }

    let now = Utc::now();
    let closed = positions
        .iter()
        .filter(|p| !p.is_open_at(now))
        .map(|p| ClosedPosition {
            name: p.name.clone(),
        })
        .collect::<Vec<_>>();
    if !closed.is_empty() {
        let mut err = SandboxError::bad_request("Position(s) not open for voting")
            .with_code(VOTING_CLOSED);
        err.body.closed_positions = closed;
        err.body.hint =
            Some("Contact the administrator to extend the voting window".to_string());
        return Err(err);
    }

    let missing = ballot
        .positions
        .iter()
        .filter(|p| !voted.contains(p.id.as_str()))
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(SandboxError::bad_request(format!(
            "Please vote for: {}",
            missing.join(", ")
        )));
    }

    if !sandbox.record(token, &request.votes) {
        return Err(already_used());
    }
    info!("req{id} recorded {} votes", request.votes.len());
    Ok(Json(VoteAccepted {
        message: "Vote cast successfully".to_string(),
    }))
}
