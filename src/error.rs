use thiserror::Error;

use crate::session::SessionState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No ballot token found. Please verify your identity first.")]
    NoToken,
    #[error("Failed to load ballot: {0}")]
    Load(String),
    #[error("Invalid or expired ballot token. Please verify again.")]
    InvalidToken,
    #[error("This ballot has already been used. You can only vote once.")]
    ConsumedToken,
    #[error("Please vote for: {}", .missing.join(", "))]
    IncompleteBallot { missing: Vec<String> },
    #[error("{message}")]
    WindowClosed {
        positions: Vec<String>,
        message: String,
    },
    #[error("A submission is already in progress")]
    SubmissionInFlight,
    #[error("{0}")]
    GenericSubmit(String),
    #[error("The ballot session has ended ({0:?})")]
    SessionEnded(SessionState),
    #[error("Operation not permitted while the ballot session is {0:?}")]
    WrongState(SessionState),
    #[error("Candidate '{candidate}' is not on the ballot for position '{position}'")]
    UnknownSelection { position: String, candidate: String },
    #[error(transparent)]
    Store(#[from] std::io::Error),
    #[error("Corrupt token store: {0}")]
    StoreFormat(#[from] serde_json::Error),
    #[error("Verification failed: {0}")]
    Otp(String),
    #[error("Bad configuration: {0}")]
    Config(String),
}

impl Error {
    /// The user must go back through OTP verification to obtain a new token.
    pub fn requires_reverification(&self) -> bool {
        matches!(self, Self::NoToken | Self::InvalidToken | Self::ConsumedToken)
    }

    /// Rejected by the session itself, without reaching the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::IncompleteBallot { .. }
                | Self::SubmissionInFlight
                | Self::UnknownSelection { .. }
                | Self::SessionEnded(_)
                | Self::WrongState(_)
        )
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
