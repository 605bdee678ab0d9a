//! The remote ballot API consumed by [`crate::session::BallotSession`].

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::{Ballot, BallotToken, CastVoteRequest};

pub mod classify;
mod http;

pub use http::{ApiClient, HttpBallotApi};

/// Operations the backend exposes for casting a ballot.
#[async_trait]
pub trait BallotApi: Send + Sync {
    /// `GET /vote/ballot?token=<token>`
    async fn fetch_ballot(&self, token: &BallotToken) -> Result<Ballot, ApiError>;

    /// `POST /vote`
    async fn cast_vote(&self, request: &CastVoteRequest) -> Result<CastVoteResponse, ApiError>;
}

/// Errors produced by the transport, before any interpretation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {}", .body.error.as_deref().unwrap_or("no details"))]
    Rejected { status: u16, body: ApiErrorBody },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn rejected(status: u16, body: ApiErrorBody) -> Self {
        Self::Rejected { status, body }
    }
}

/// JSON error body sent by the backend alongside a non-2xx status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Human readable reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Suggested remedy, e.g. who to contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Machine readable reason, see [`classify`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Positions whose voting window rejected the ballot.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub closed_positions: Vec<ClosedPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ClosedPosition>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<ClosedPosition>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl ApiErrorBody {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Interpret a raw error body: JSON if possible, otherwise the text itself.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Self>(text) {
            Ok(body) => body,
            Err(_) if text.trim().is_empty() => Self::default(),
            Err(_) => Self::message(text.trim()),
        }
    }
}

/// Success payload of `POST /vote`. Only the message is of interest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteResponse {
    #[serde(default)]
    pub message: Option<String>,
}
