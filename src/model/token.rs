use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

/// An opaque token granting the right to cast exactly one ballot.
///
/// The token is a bearer credential, so `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallotToken(String);

impl BallotToken {
    /// Wrap a raw token. Blank strings are not tokens.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The raw token, for putting on the wire or into the persistence slot.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for BallotToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("BallotToken(<redacted>)")
    }
}
