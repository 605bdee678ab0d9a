use std::convert::TryInto;
use std::fmt::Display;
use std::str::FromStr;

use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LENGTH: usize = 6;

/// A one-time-password code, as emailed to the voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode {
    code: [u8; LENGTH],
}

impl OtpCode {
    /// Generate a random code.
    pub fn random() -> Self {
        let mut code = [0; LENGTH];
        let digit_dist = Uniform::from(0..=9);
        let mut rng = rand::thread_rng();
        for digit in &mut code {
            *digit = digit_dist.sample(&mut rng);
        }
        Self { code }
    }
}

impl Display for OtpCode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for digit in self.code {
            write!(formatter, "{digit}")?;
        }
        Ok(())
    }
}

impl FromStr for OtpCode {
    type Err = CodeParseError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let string = string.trim();
        let len = string.chars().count();
        if len != LENGTH {
            return Err(Self::Err::InvalidLength(len));
        }
        let digits = string
            .chars()
            .map(|c| match c {
                '0'..='9' => Ok(c as u8 - b'0'),
                _ => Err(Self::Err::InvalidChar(c)),
            })
            .collect::<Result<Vec<u8>, Self::Err>>()?;
        Ok(Self {
            code: digits.try_into().unwrap(), // Valid because digits.len() == LENGTH
        })
    }
}

impl TryFrom<String> for OtpCode {
    type Error = CodeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.to_string()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodeParseError {
    #[error("code must contain exactly 6 characters, found {0}")]
    InvalidLength(usize),
    #[error("code must contain only digits, found '{0}'")]
    InvalidChar(char),
}
