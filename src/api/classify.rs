//! Translation of raw API failures into session errors.
//!
//! The backend is expected to send a machine readable `code`. Older
//! deployments only send free text, so the known phrases are matched as a
//! fallback.

use crate::error::Error;

use super::{ApiError, ApiErrorBody};

/// The token is unknown or expired.
pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
/// The token has already been used to cast a ballot.
pub const BALLOT_ALREADY_USED: &str = "BALLOT_ALREADY_USED";
/// At least one position's voting window is closed.
pub const VOTING_CLOSED: &str = "VOTING_CLOSED";

const ALREADY_USED_PHRASE: &str = "already used";
const NOT_OPEN_PHRASE: &str = "not open for voting";

fn has_code(body: &ApiErrorBody, code: &str) -> bool {
    body.code.as_deref() == Some(code)
}

fn mentions(body: &ApiErrorBody, phrase: &str) -> bool {
    body.error
        .as_deref()
        .map_or(false, |error| error.to_lowercase().contains(phrase))
}

/// Classify a failed `GET /vote/ballot`.
pub fn classify_fetch(err: ApiError) -> Error {
    match err {
        ApiError::Rejected { status, body } => {
            // Only an authorization failure may cost the voter their token.
            let token_rejected = status == 400 || status == 401;
            if has_code(&body, BALLOT_ALREADY_USED)
                || (token_rejected && mentions(&body, ALREADY_USED_PHRASE))
            {
                Error::ConsumedToken
            } else if has_code(&body, INVALID_TOKEN) || token_rejected {
                Error::InvalidToken
            } else {
                Error::Load(body.error.unwrap_or_else(|| format!("HTTP {status}")))
            }
        }
        ApiError::Transport(e) => Error::Load(e.to_string()),
        ApiError::Decode(msg) => Error::Load(msg),
    }
}

/// Classify a failed `POST /vote`.
pub fn classify_cast(err: ApiError) -> Error {
    match err {
        ApiError::Rejected { status, body } => {
            if has_code(&body, BALLOT_ALREADY_USED)
                || (status == 400 && mentions(&body, ALREADY_USED_PHRASE))
            {
                Error::ConsumedToken
            } else if has_code(&body, INVALID_TOKEN) || status == 401 {
                Error::InvalidToken
            } else if has_code(&body, VOTING_CLOSED)
                || (status == 400 && mentions(&body, NOT_OPEN_PHRASE))
            {
                window_closed(body)
            } else {
                Error::GenericSubmit(
                    body.error
                        .unwrap_or_else(|| "Failed to cast vote".to_string()),
                )
            }
        }
        ApiError::Transport(e) => Error::GenericSubmit(e.to_string()),
        ApiError::Decode(msg) => Error::GenericSubmit(msg),
    }
}

fn window_closed(body: ApiErrorBody) -> Error {
    let positions = body
        .closed_positions
        .into_iter()
        .map(|p| p.name)
        .collect::<Vec<_>>();
    let message = if positions.is_empty() {
        let error = body
            .error
            .unwrap_or_else(|| "Voting is not open".to_string());
        match body.hint {
            Some(hint) => format!("{error}. {hint}"),
            None => error,
        }
    } else {
        format!(
            "Voting window closed for: {}. Contact administrator to extend voting time.",
            positions.join(", ")
        )
    };
    Error::WindowClosed { positions, message }
}
