#[cfg(feature = "sandbox")]
#[macro_use]
extern crate rocket;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod session;
pub mod store;

#[cfg(feature = "otp")]
pub mod verification;

#[cfg(feature = "sandbox")]
pub mod sandbox;

#[cfg(test)]
mod test_utils;

pub use api::{BallotApi, HttpBallotApi};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use session::{Advisory, BallotSession, SessionState};
pub use store::{FileStore, MemoryStore, TokenStore};
