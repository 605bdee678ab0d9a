pub mod ballot;
pub mod otp;
pub mod selection;
pub mod token;
pub mod vote;

pub use ballot::{Ballot, Candidate, CandidateStatus, Position, PositionRef};
pub use otp::OtpCode;
pub use selection::{Selection, SelectionSet};
pub use token::BallotToken;
pub use vote::{CastVoteRequest, Receipt, VoteChoice};
